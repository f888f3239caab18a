//! Server-side directory transport (`Internal`).
//!
//! Each mountpoint maps to one directory: `options.path` when set, else
//! `<base>/<mountpoint name>`. Virtual paths are resolved below that
//! directory with path security, attempts to escape via `..` are blocked.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tracing::debug;

use crate::vfs::error::{VfsError, VfsResult};
use crate::vfs::mountpoint::MountpointSnapshot;
use crate::vfs::path::{inner_path, join, split_scheme, virtual_path};
use crate::vfs::transport::VfsTransport;
use crate::vfs::types::{FileMetadata, RequestOptions};

/// URL prefix for file downloads.
pub const DEFAULT_FS_URI: &str = "/FS/get/";

/// Filesystem transport registered as `Internal`.
#[derive(Debug, Clone)]
pub struct LocalTransport {
    base: PathBuf,
    fs_uri: String,
}

impl LocalTransport {
    /// Transport name.
    pub const NAME: &'static str = "Internal";

    /// Create a transport whose mountpoints live below `base`.
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self {
            base: base.into(),
            fs_uri: DEFAULT_FS_URI.to_string(),
        }
    }

    /// Set the URL prefix used by `url`.
    pub fn with_fs_uri(mut self, fs_uri: impl Into<String>) -> Self {
        self.fs_uri = fs_uri.into();
        self
    }

    /// Directory backing a mountpoint.
    pub fn mount_root(&self, mount: &MountpointSnapshot) -> PathBuf {
        match mount.options.get_str("path") {
            Some(path) => PathBuf::from(path),
            None => self.base.join(&mount.name),
        }
    }

    /// Resolve a virtual path to a real path below the mountpoint root.
    ///
    /// The path must belong to `mount`; paths routed elsewhere are
    /// [`VfsError::CrossMount`]. Nothing is created on disk, the mutating
    /// verbs create missing directories themselves.
    async fn resolve(&self, mount: &MountpointSnapshot, path: &str) -> VfsResult<PathBuf> {
        if !mount.matcher.as_ref().is_some_and(|m| m.matches(path)) {
            return Err(VfsError::cross_mount(path));
        }

        let root = self.mount_root(mount);
        let root = canonicalize_existing(&root).unwrap_or(root);

        let relative = Path::new(inner_path(path).trim_start_matches('/'));
        if relative
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_)))
        {
            return Err(VfsError::path_escapes_root(path));
        }
        if relative.as_os_str().is_empty() {
            return Ok(root);
        }

        // Symlinks anywhere along the path may point outside, so compare
        // canonical forms of the deepest existing ancestor.
        let canonical = canonicalize_existing(&root.join(relative))
            .ok_or_else(|| VfsError::path_escapes_root(path))?;

        if !canonical.starts_with(&root) {
            return Err(VfsError::path_escapes_root(path));
        }
        Ok(canonical)
    }

    fn metadata(path: &str, meta: &std::fs::Metadata) -> FileMetadata {
        if meta.is_dir() {
            FileMetadata::directory(path)
        } else {
            FileMetadata::file(path, meta.len(), None)
        }
    }
}

/// Canonicalize the deepest existing ancestor of `path` and append the
/// components below it. `None` when that ancestor is a dangling symlink.
fn canonicalize_existing(path: &Path) -> Option<PathBuf> {
    let mut existing = path;
    let mut missing = Vec::new();
    while std::fs::symlink_metadata(existing).is_err() {
        missing.push(existing.file_name()?);
        existing = existing.parent()?;
    }
    let mut canonical = existing.canonicalize().ok()?;
    canonical.extend(missing.into_iter().rev());
    Some(canonical)
}

/// Map an I/O error, keeping "not found" and "exists" as typed errors.
fn io_error(path: &str) -> impl FnOnce(std::io::Error) -> VfsError + '_ {
    move |e| match e.kind() {
        ErrorKind::NotFound => VfsError::not_found(path),
        ErrorKind::AlreadyExists => VfsError::already_exists(path),
        _ => VfsError::Io(e),
    }
}

/// Recursively copy a file or directory tree.
async fn copy_tree(from: &Path, to: &Path) -> std::io::Result<()> {
    let mut pending = vec![(from.to_path_buf(), to.to_path_buf())];
    while let Some((src, dest)) = pending.pop() {
        if fs::metadata(&src).await?.is_dir() {
            fs::create_dir_all(&dest).await?;
            let mut dir = fs::read_dir(&src).await?;
            while let Some(entry) = dir.next_entry().await? {
                pending.push((entry.path(), dest.join(entry.file_name())));
            }
        } else {
            fs::copy(&src, &dest).await?;
        }
    }
    Ok(())
}

#[async_trait]
impl VfsTransport for LocalTransport {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn scandir(
        &self,
        path: &str,
        _options: &RequestOptions,
        mount: &MountpointSnapshot,
    ) -> VfsResult<Vec<FileMetadata>> {
        let full = self.resolve(mount, path).await?;
        let meta = fs::metadata(&full).await.map_err(io_error(path))?;
        if !meta.is_dir() {
            return Err(VfsError::not_a_directory(path));
        }

        let scheme = split_scheme(path).map(|(s, _)| s).unwrap_or(&mount.name);
        let dir_inner = inner_path(path);

        let mut entries = Vec::new();
        let mut dir = fs::read_dir(&full).await?;
        while let Some(entry) = dir.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            let meta = entry.metadata().await?;
            let entry_path = virtual_path(scheme, &join(dir_inner, &name));
            entries.push(Self::metadata(&entry_path, &meta));
        }

        entries.sort_by(|a, b| a.filename.cmp(&b.filename));
        Ok(entries)
    }

    async fn read(
        &self,
        path: &str,
        _options: &RequestOptions,
        mount: &MountpointSnapshot,
    ) -> VfsResult<Vec<u8>> {
        let full = self.resolve(mount, path).await?;
        if fs::metadata(&full).await.map_err(io_error(path))?.is_dir() {
            return Err(VfsError::is_a_directory(path));
        }
        fs::read(&full).await.map_err(io_error(path))
    }

    async fn exists(
        &self,
        path: &str,
        _options: &RequestOptions,
        mount: &MountpointSnapshot,
    ) -> VfsResult<bool> {
        let full = self.resolve(mount, path).await?;
        Ok(fs::try_exists(&full).await?)
    }

    async fn fileinfo(
        &self,
        path: &str,
        _options: &RequestOptions,
        mount: &MountpointSnapshot,
    ) -> VfsResult<FileMetadata> {
        let full = self.resolve(mount, path).await?;
        let meta = fs::metadata(&full).await.map_err(io_error(path))?;
        Ok(Self::metadata(path, &meta))
    }

    async fn url(
        &self,
        path: &str,
        _options: &RequestOptions,
        mount: &MountpointSnapshot,
    ) -> VfsResult<String> {
        self.resolve(mount, path).await?;
        Ok(format!("{}{}", self.fs_uri, path))
    }

    async fn write(
        &self,
        path: &str,
        data: &[u8],
        _mime: Option<&str>,
        _options: &RequestOptions,
        mount: &MountpointSnapshot,
    ) -> VfsResult<bool> {
        let full = self.resolve(mount, path).await?;
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&full, data).await.map_err(io_error(path))?;
        debug!(path, bytes = data.len(), "wrote file");
        Ok(true)
    }

    async fn unlink(
        &self,
        path: &str,
        _options: &RequestOptions,
        mount: &MountpointSnapshot,
    ) -> VfsResult<bool> {
        let full = self.resolve(mount, path).await?;
        if full == self.resolve(mount, &mount.root).await? {
            return Err(VfsError::invalid_path(path));
        }
        let meta = fs::metadata(&full).await.map_err(io_error(path))?;
        if meta.is_dir() {
            fs::remove_dir_all(&full).await?;
        } else {
            fs::remove_file(&full).await?;
        }
        Ok(true)
    }

    async fn copy(
        &self,
        src: &str,
        dest: &str,
        _options: &RequestOptions,
        mount: &MountpointSnapshot,
    ) -> VfsResult<bool> {
        let from = self.resolve(mount, src).await?;
        let to = self.resolve(mount, dest).await?;
        if !fs::try_exists(&from).await? {
            return Err(VfsError::not_found(src));
        }
        if fs::try_exists(&to).await? {
            return Err(VfsError::already_exists(dest));
        }
        if to.starts_with(&from) {
            return Err(VfsError::invalid_path(dest));
        }
        copy_tree(&from, &to).await.map_err(io_error(dest))?;
        Ok(true)
    }

    async fn rename(
        &self,
        src: &str,
        dest: &str,
        _options: &RequestOptions,
        mount: &MountpointSnapshot,
    ) -> VfsResult<bool> {
        let from = self.resolve(mount, src).await?;
        let to = self.resolve(mount, dest).await?;
        if fs::try_exists(&to).await? {
            return Err(VfsError::already_exists(dest));
        }
        if let Some(parent) = to.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::rename(&from, &to).await.map_err(io_error(src))?;
        Ok(true)
    }

    async fn mkdir(
        &self,
        path: &str,
        _options: &RequestOptions,
        mount: &MountpointSnapshot,
    ) -> VfsResult<bool> {
        let full = self.resolve(mount, path).await?;
        if fs::try_exists(&full).await? {
            return Err(VfsError::already_exists(path));
        }
        fs::create_dir_all(&full).await?;
        Ok(true)
    }

    async fn upload(
        &self,
        dest: &str,
        name: &str,
        data: &[u8],
        _mime: Option<&str>,
        options: &RequestOptions,
        mount: &MountpointSnapshot,
    ) -> VfsResult<bool> {
        let scheme = split_scheme(dest).map(|(s, _)| s).unwrap_or(&mount.name);
        let target = virtual_path(scheme, &join(inner_path(dest), name));
        let full = self.resolve(mount, &target).await?;
        if !options.flag("overwrite") && fs::try_exists(&full).await? {
            return Err(VfsError::already_exists(target));
        }
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&full, data).await?;
        Ok(true)
    }
}
