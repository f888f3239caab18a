//! Transport contract and registry.
//!
//! A transport implements the VFS verbs against one kind of storage. Every
//! verb receives its positional arguments, then the per-request options,
//! then the frozen snapshot of the mountpoint the request was routed to.
//! Verbs a transport does not override resolve to [`VfsError::Unavailable`].

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use super::error::{VfsError, VfsResult};
use super::mountpoint::{MountpointParams, MountpointSnapshot};
use super::types::{FileMetadata, FreeSpace, RequestOptions};

/// Storage backend behind one or more mountpoints.
#[async_trait]
pub trait VfsTransport: Send + Sync {
    /// Registry name (e.g. `Internal`, `LocalStorage`, `WebDAV`).
    fn name(&self) -> &str;

    /// Fill in or override mountpoint parameters before the mountpoint is
    /// built.
    fn defaults(&self, params: &mut MountpointParams) {
        let _ = params;
    }

    // ========================================================================
    // Reading
    // ========================================================================

    /// List a directory.
    async fn scandir(
        &self,
        path: &str,
        options: &RequestOptions,
        mount: &MountpointSnapshot,
    ) -> VfsResult<Vec<FileMetadata>> {
        let _ = (path, options, mount);
        Err(VfsError::Unavailable)
    }

    /// Read a whole file.
    async fn read(
        &self,
        path: &str,
        options: &RequestOptions,
        mount: &MountpointSnapshot,
    ) -> VfsResult<Vec<u8>> {
        let _ = (path, options, mount);
        Err(VfsError::Unavailable)
    }

    /// Test for existence.
    async fn exists(
        &self,
        path: &str,
        options: &RequestOptions,
        mount: &MountpointSnapshot,
    ) -> VfsResult<bool> {
        let _ = (path, options, mount);
        Err(VfsError::Unavailable)
    }

    /// Stat a single entry.
    async fn fileinfo(
        &self,
        path: &str,
        options: &RequestOptions,
        mount: &MountpointSnapshot,
    ) -> VfsResult<FileMetadata> {
        let _ = (path, options, mount);
        Err(VfsError::Unavailable)
    }

    /// Resolve a URL for the entry.
    async fn url(
        &self,
        path: &str,
        options: &RequestOptions,
        mount: &MountpointSnapshot,
    ) -> VfsResult<String> {
        let _ = (path, options, mount);
        Err(VfsError::Unavailable)
    }

    /// Search below `path`.
    async fn find(
        &self,
        path: &str,
        query: &str,
        options: &RequestOptions,
        mount: &MountpointSnapshot,
    ) -> VfsResult<Vec<FileMetadata>> {
        let _ = (path, query, options, mount);
        Err(VfsError::Unavailable)
    }

    /// Report free space.
    async fn free_space(
        &self,
        root: &str,
        options: &RequestOptions,
        mount: &MountpointSnapshot,
    ) -> VfsResult<FreeSpace> {
        let _ = (root, options, mount);
        Err(VfsError::Unavailable)
    }

    // ========================================================================
    // Writing
    // ========================================================================

    /// Write (create or replace) a file.
    async fn write(
        &self,
        path: &str,
        data: &[u8],
        mime: Option<&str>,
        options: &RequestOptions,
        mount: &MountpointSnapshot,
    ) -> VfsResult<bool> {
        let _ = (path, data, mime, options, mount);
        Err(VfsError::Unavailable)
    }

    /// Remove a file or directory tree.
    async fn unlink(
        &self,
        path: &str,
        options: &RequestOptions,
        mount: &MountpointSnapshot,
    ) -> VfsResult<bool> {
        let _ = (path, options, mount);
        Err(VfsError::Unavailable)
    }

    /// Copy `src` to `dest`.
    async fn copy(
        &self,
        src: &str,
        dest: &str,
        options: &RequestOptions,
        mount: &MountpointSnapshot,
    ) -> VfsResult<bool> {
        let _ = (src, dest, options, mount);
        Err(VfsError::Unavailable)
    }

    /// Move/rename `src` to `dest`.
    async fn rename(
        &self,
        src: &str,
        dest: &str,
        options: &RequestOptions,
        mount: &MountpointSnapshot,
    ) -> VfsResult<bool> {
        let _ = (src, dest, options, mount);
        Err(VfsError::Unavailable)
    }

    /// Create a directory.
    async fn mkdir(
        &self,
        path: &str,
        options: &RequestOptions,
        mount: &MountpointSnapshot,
    ) -> VfsResult<bool> {
        let _ = (path, options, mount);
        Err(VfsError::Unavailable)
    }

    /// Upload a named blob into directory `dest`.
    async fn upload(
        &self,
        dest: &str,
        name: &str,
        data: &[u8],
        mime: Option<&str>,
        options: &RequestOptions,
        mount: &MountpointSnapshot,
    ) -> VfsResult<bool> {
        let _ = (dest, name, data, mime, options, mount);
        Err(VfsError::Unavailable)
    }

    // ========================================================================
    // Trash
    // ========================================================================

    /// Move an entry to the trash.
    async fn trash(
        &self,
        path: &str,
        options: &RequestOptions,
        mount: &MountpointSnapshot,
    ) -> VfsResult<bool> {
        let _ = (path, options, mount);
        Err(VfsError::Unavailable)
    }

    /// Restore an entry from the trash.
    async fn untrash(
        &self,
        path: &str,
        options: &RequestOptions,
        mount: &MountpointSnapshot,
    ) -> VfsResult<bool> {
        let _ = (path, options, mount);
        Err(VfsError::Unavailable)
    }

    /// Empty the trash.
    async fn empty_trash(
        &self,
        options: &RequestOptions,
        mount: &MountpointSnapshot,
    ) -> VfsResult<bool> {
        let _ = (options, mount);
        Err(VfsError::Unavailable)
    }
}

/// Registry of transports, keyed by name.
#[derive(Default)]
pub struct TransportRegistry {
    transports: HashMap<String, Arc<dyn VfsTransport>>,
}

impl std::fmt::Debug for TransportRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportRegistry")
            .field("transports", &self.transports.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl TransportRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a transport under its own name, replacing any previous one.
    pub fn register(&mut self, transport: Arc<dyn VfsTransport>) {
        self.transports
            .insert(transport.name().to_string(), transport);
    }

    /// Builder form of [`register`](Self::register).
    pub fn with(mut self, transport: Arc<dyn VfsTransport>) -> Self {
        self.register(transport);
        self
    }

    /// Look up a transport.
    pub fn get(&self, name: &str) -> Option<Arc<dyn VfsTransport>> {
        self.transports.get(name).cloned()
    }

    /// Check if a transport is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.transports.contains_key(name)
    }

    /// Registered transport names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.transports.keys().cloned().collect();
        names.sort();
        names
    }
}
