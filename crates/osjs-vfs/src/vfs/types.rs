//! Core VFS types.
//!
//! These mirror the shapes the desktop's file dialogs and applications
//! exchange with the VFS: virtual-path based, serializable.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// File type enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    /// Regular file.
    File,
    /// Directory.
    #[serde(rename = "dir")]
    Directory,
}

impl FileType {
    /// Returns true if this is a regular file.
    pub fn is_file(&self) -> bool {
        matches!(self, FileType::File)
    }

    /// Returns true if this is a directory.
    pub fn is_dir(&self) -> bool {
        matches!(self, FileType::Directory)
    }
}

/// Metadata for one file or directory, addressed by virtual path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMetadata {
    /// Full virtual path (e.g. `home:///Documents/a.txt`).
    pub path: String,
    /// Last path component.
    pub filename: String,
    /// Entry type.
    #[serde(rename = "type")]
    pub kind: FileType,
    /// Size in bytes (0 for directories).
    pub size: u64,
    /// MIME type (files only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime: Option<String>,
}

impl FileMetadata {
    /// Create a file entry.
    pub fn file(path: impl Into<String>, size: u64, mime: Option<String>) -> Self {
        let path = path.into();
        Self {
            filename: filename_of(&path).to_string(),
            path,
            kind: FileType::File,
            size,
            mime,
        }
    }

    /// Create a directory entry.
    pub fn directory(path: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            filename: filename_of(&path).to_string(),
            path,
            kind: FileType::Directory,
            size: 0,
            mime: None,
        }
    }

    /// Returns true if this is a regular file.
    pub fn is_file(&self) -> bool {
        self.kind.is_file()
    }

    /// Returns true if this is a directory.
    pub fn is_dir(&self) -> bool {
        self.kind.is_dir()
    }
}

fn filename_of(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}

/// Free space report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FreeSpace {
    /// Bytes available.
    Bytes(u64),
    /// The backend has no quota.
    Unlimited,
}

/// Per-request options, passed through untouched to the transport.
///
/// Keys are whatever the caller and transport agree on (`url`,
/// `overwrite`, ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestOptions(Map<String, Value>);

impl RequestOptions {
    /// Create empty options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an option.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Get an option.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Boolean option, false when absent or not a bool.
    pub fn flag(&self, key: &str) -> bool {
        self.0.get(key).and_then(Value::as_bool).unwrap_or(false)
    }
}

/// Backend connection configuration for a mountpoint.
///
/// Opaque to the mount manager apart from `username`, which WebDAV mounts
/// require.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConnectionOptions {
    /// Host (full URL).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    /// Username.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Password.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Whether the remote end allows CORS.
    #[serde(default)]
    pub cors: bool,
    /// Transport-specific keys.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ConnectionOptions {
    /// String value of a transport-specific key.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.extra.get(key).and_then(Value::as_str)
    }
}
