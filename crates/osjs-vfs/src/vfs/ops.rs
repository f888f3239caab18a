//! VFS operation vocabulary.
//!
//! A request is a verb plus its positional arguments. Every verb carries
//! at least one virtual path so the mount manager can route it.

use strum::{AsRefStr, Display, EnumIter, EnumString};

use super::types::{FileMetadata, FreeSpace};

/// Operation names understood by transports.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr, EnumIter,
)]
#[strum(serialize_all = "camelCase")]
pub enum Operation {
    Scandir,
    Read,
    Write,
    Unlink,
    Copy,
    Move,
    Exists,
    Fileinfo,
    Mkdir,
    Upload,
    Url,
    Find,
    Trash,
    Untrash,
    EmptyTrash,
    FreeSpace,
}

impl Operation {
    /// Verbs rejected outright on a read-only mountpoint. `Copy` is not in
    /// this set; it is decided by destination.
    pub const MUTATING: [Operation; 8] = [
        Operation::Upload,
        Operation::Unlink,
        Operation::Write,
        Operation::Mkdir,
        Operation::Move,
        Operation::Trash,
        Operation::Untrash,
        Operation::EmptyTrash,
    ];

    /// Returns true if the verb is in the read-only restricted set.
    pub fn is_mutating(&self) -> bool {
        Self::MUTATING.contains(self)
    }
}

/// A VFS request: verb and arguments.
#[derive(Debug, Clone, PartialEq)]
pub enum VfsRequest {
    /// List a directory.
    Scandir { path: String },
    /// Read a whole file.
    Read { path: String },
    /// Write (create or replace) a file.
    Write {
        path: String,
        data: Vec<u8>,
        mime: Option<String>,
    },
    /// Remove a file or directory tree.
    Unlink { path: String },
    /// Copy `src` to `dest`.
    Copy { src: String, dest: String },
    /// Move/rename `src` to `dest`.
    Move { src: String, dest: String },
    /// Test for existence.
    Exists { path: String },
    /// Stat a single entry.
    Fileinfo { path: String },
    /// Create a directory.
    Mkdir { path: String },
    /// Upload a named blob into directory `dest`.
    Upload {
        dest: String,
        name: String,
        data: Vec<u8>,
        mime: Option<String>,
    },
    /// Resolve a URL for the entry.
    Url { path: String },
    /// Search below `path`.
    Find { path: String, query: String },
    /// Move an entry to the trash.
    Trash { path: String },
    /// Restore an entry from the trash.
    Untrash { path: String },
    /// Empty the trash of the mountpoint owning `root`.
    EmptyTrash { root: String },
    /// Report free space of the mountpoint owning `root`.
    FreeSpace { root: String },
}

impl VfsRequest {
    /// The verb of this request.
    pub fn operation(&self) -> Operation {
        match self {
            VfsRequest::Scandir { .. } => Operation::Scandir,
            VfsRequest::Read { .. } => Operation::Read,
            VfsRequest::Write { .. } => Operation::Write,
            VfsRequest::Unlink { .. } => Operation::Unlink,
            VfsRequest::Copy { .. } => Operation::Copy,
            VfsRequest::Move { .. } => Operation::Move,
            VfsRequest::Exists { .. } => Operation::Exists,
            VfsRequest::Fileinfo { .. } => Operation::Fileinfo,
            VfsRequest::Mkdir { .. } => Operation::Mkdir,
            VfsRequest::Upload { .. } => Operation::Upload,
            VfsRequest::Url { .. } => Operation::Url,
            VfsRequest::Find { .. } => Operation::Find,
            VfsRequest::Trash { .. } => Operation::Trash,
            VfsRequest::Untrash { .. } => Operation::Untrash,
            VfsRequest::EmptyTrash { .. } => Operation::EmptyTrash,
            VfsRequest::FreeSpace { .. } => Operation::FreeSpace,
        }
    }

    /// The path used to route this request (the source for two-path verbs).
    pub fn primary_path(&self) -> &str {
        match self {
            VfsRequest::Scandir { path }
            | VfsRequest::Read { path }
            | VfsRequest::Write { path, .. }
            | VfsRequest::Unlink { path }
            | VfsRequest::Exists { path }
            | VfsRequest::Fileinfo { path }
            | VfsRequest::Mkdir { path }
            | VfsRequest::Url { path }
            | VfsRequest::Find { path, .. }
            | VfsRequest::Trash { path }
            | VfsRequest::Untrash { path } => path,
            VfsRequest::Copy { src, .. } | VfsRequest::Move { src, .. } => src,
            VfsRequest::Upload { dest, .. } => dest,
            VfsRequest::EmptyTrash { root } | VfsRequest::FreeSpace { root } => root,
        }
    }

    /// Destination path of two-path verbs.
    pub fn destination(&self) -> Option<&str> {
        match self {
            VfsRequest::Copy { dest, .. } | VfsRequest::Move { dest, .. } => Some(dest),
            _ => None,
        }
    }
}

/// Typed result of a VFS request.
#[derive(Debug, Clone, PartialEq)]
pub enum VfsResponse {
    /// Directory listing or search hits.
    Entries(Vec<FileMetadata>),
    /// File contents.
    Data(Vec<u8>),
    /// Single entry metadata.
    Info(FileMetadata),
    /// Boolean answer (`exists`) or completion flag (mutations).
    Flag(bool),
    /// Resolved URL.
    Url(String),
    /// Free space report.
    FreeSpace(FreeSpace),
}

impl VfsResponse {
    /// Entries, if this is a listing.
    pub fn into_entries(self) -> Option<Vec<FileMetadata>> {
        match self {
            VfsResponse::Entries(e) => Some(e),
            _ => None,
        }
    }

    /// Bytes, if this is file data.
    pub fn into_data(self) -> Option<Vec<u8>> {
        match self {
            VfsResponse::Data(d) => Some(d),
            _ => None,
        }
    }

    /// Metadata, if this is a fileinfo result.
    pub fn into_info(self) -> Option<FileMetadata> {
        match self {
            VfsResponse::Info(i) => Some(i),
            _ => None,
        }
    }

    /// The flag, if this is a boolean result.
    pub fn as_flag(&self) -> Option<bool> {
        match self {
            VfsResponse::Flag(b) => Some(*b),
            _ => None,
        }
    }

    /// The URL, if this is a url result.
    pub fn into_url(self) -> Option<String> {
        match self {
            VfsResponse::Url(u) => Some(u),
            _ => None,
        }
    }
}
