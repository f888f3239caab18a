//! VFS error types.

use std::io;
use thiserror::Error;

/// VFS error type.
///
/// The first group of variants is raised by the mount manager itself; the
/// rest are produced by transports and passed through unchanged.
#[derive(Debug, Error)]
pub enum VfsError {
    /// The named transport is not registered.
    #[error("invalid transport: {0}")]
    InvalidTransport(String),

    /// A mountpoint with this name is already registered.
    #[error("mountpoint already mounted: {0}")]
    AlreadyMounted(String),

    /// No mountpoint with this name is registered (or it is unmounted).
    #[error("mountpoint not mounted: {0}")]
    NotMounted(String),

    /// Mutating operation on a read-only mountpoint.
    #[error("mountpoint is read-only")]
    ReadOnly,

    /// Operation not implemented by the transport.
    #[error("operation unavailable")]
    Unavailable,

    /// Structurally invalid mount options.
    #[error("invalid mountpoint configuration: {0}")]
    InvalidConfig(String),

    /// No mountpoint owns the path.
    #[error("no mount point for path: {0}")]
    NoMountPoint(String),

    /// File or directory not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Path already exists.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Expected a directory.
    #[error("not a directory: {0}")]
    NotADirectory(String),

    /// Expected a file.
    #[error("is a directory: {0}")]
    IsADirectory(String),

    /// Path escapes the backend root.
    #[error("path escapes root: {0}")]
    PathEscapesRoot(String),

    /// Invalid virtual path.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// Source and destination live on different mountpoints.
    #[error("cross-mount operation: {0}")]
    CrossMount(String),

    /// Backing store is full.
    #[error("storage quota exceeded")]
    QuotaExceeded,

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Opaque transport failure.
    #[error("{0}")]
    Backend(String),
}

impl VfsError {
    /// Create an InvalidTransport error.
    pub fn invalid_transport(name: impl Into<String>) -> Self {
        Self::InvalidTransport(name.into())
    }

    /// Create an AlreadyMounted error.
    pub fn already_mounted(name: impl Into<String>) -> Self {
        Self::AlreadyMounted(name.into())
    }

    /// Create a NotMounted error.
    pub fn not_mounted(name: impl Into<String>) -> Self {
        Self::NotMounted(name.into())
    }

    /// Create an InvalidConfig error.
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a NoMountPoint error.
    pub fn no_mount_point(path: impl Into<String>) -> Self {
        Self::NoMountPoint(path.into())
    }

    /// Create a NotFound error.
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound(path.into())
    }

    /// Create an AlreadyExists error.
    pub fn already_exists(path: impl Into<String>) -> Self {
        Self::AlreadyExists(path.into())
    }

    /// Create a NotADirectory error.
    pub fn not_a_directory(path: impl Into<String>) -> Self {
        Self::NotADirectory(path.into())
    }

    /// Create an IsADirectory error.
    pub fn is_a_directory(path: impl Into<String>) -> Self {
        Self::IsADirectory(path.into())
    }

    /// Create a PathEscapesRoot error.
    pub fn path_escapes_root(path: impl Into<String>) -> Self {
        Self::PathEscapesRoot(path.into())
    }

    /// Create an InvalidPath error.
    pub fn invalid_path(path: impl Into<String>) -> Self {
        Self::InvalidPath(path.into())
    }

    /// Create a CrossMount error.
    pub fn cross_mount(path: impl Into<String>) -> Self {
        Self::CrossMount(path.into())
    }

    /// Create a Backend error.
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }

    /// Stable error code, matching the identifiers used by the desktop's
    /// locale tables.
    pub fn code(&self) -> &'static str {
        match self {
            VfsError::InvalidTransport(_) => "ERR_VFSMODULE_INVALID_TYPE",
            VfsError::AlreadyMounted(_) => "ERR_VFSMODULE_ALREADY_MOUNTED",
            VfsError::NotMounted(_) => "ERR_VFSMODULE_NOT_MOUNTED",
            VfsError::ReadOnly => "ERR_VFSMODULE_READONLY",
            VfsError::Unavailable => "ERR_VFS_UNAVAILABLE",
            VfsError::InvalidConfig(_) => "ERR_VFSMODULE_INVALID_CONFIG",
            VfsError::NoMountPoint(_) | VfsError::NotFound(_) => "ERR_VFSMODULE_NOSUCH",
            VfsError::AlreadyExists(_) => "ERR_VFS_FILE_EXISTS",
            VfsError::CrossMount(_) => "ERR_VFS_TARGET_NOT_EXISTS",
            VfsError::NotADirectory(_)
            | VfsError::IsADirectory(_)
            | VfsError::PathEscapesRoot(_)
            | VfsError::InvalidPath(_)
            | VfsError::QuotaExceeded
            | VfsError::Io(_)
            | VfsError::Backend(_) => "ERR_VFS_FATAL",
        }
    }

    /// Returns true for errors raised by the mount manager's own policy
    /// checks rather than by a transport.
    pub fn is_policy(&self) -> bool {
        matches!(
            self,
            VfsError::InvalidTransport(_)
                | VfsError::AlreadyMounted(_)
                | VfsError::NotMounted(_)
                | VfsError::ReadOnly
                | VfsError::Unavailable
                | VfsError::InvalidConfig(_)
                | VfsError::NoMountPoint(_)
        )
    }
}

/// Convert VfsError to std::io::Error for compatibility.
impl From<VfsError> for io::Error {
    fn from(e: VfsError) -> Self {
        match e {
            VfsError::NotFound(msg) | VfsError::NoMountPoint(msg) => {
                io::Error::new(io::ErrorKind::NotFound, msg)
            }
            VfsError::AlreadyExists(msg) => io::Error::new(io::ErrorKind::AlreadyExists, msg),
            VfsError::ReadOnly => {
                io::Error::new(io::ErrorKind::PermissionDenied, "mountpoint is read-only")
            }
            VfsError::PathEscapesRoot(msg) => {
                io::Error::new(io::ErrorKind::PermissionDenied, msg)
            }
            VfsError::NotADirectory(msg) => io::Error::new(io::ErrorKind::NotADirectory, msg),
            VfsError::IsADirectory(msg) => io::Error::new(io::ErrorKind::IsADirectory, msg),
            VfsError::InvalidPath(msg) | VfsError::InvalidConfig(msg) => {
                io::Error::new(io::ErrorKind::InvalidInput, msg)
            }
            VfsError::Unavailable => {
                io::Error::new(io::ErrorKind::Unsupported, "operation unavailable")
            }
            VfsError::QuotaExceeded => {
                io::Error::new(io::ErrorKind::StorageFull, "storage quota exceeded")
            }
            VfsError::Io(e) => e,
            other => io::Error::other(other.to_string()),
        }
    }
}

/// VFS result type.
pub type VfsResult<T> = Result<T, VfsError>;
