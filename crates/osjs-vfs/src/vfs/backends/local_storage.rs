//! Browser-storage style transport (`LocalStorage`).
//!
//! The whole tree lives in memory and is committed to a [`KeyValueStore`]
//! after every mutation: node metadata as JSON under [`TREE_KEY`], file
//! contents as base64 JSON under [`DATA_KEY`]. A mutation that would exceed
//! the store's quota is rolled back with [`VfsError::QuotaExceeded`].
//!
//! The backend registers itself with [`install`] as the `LocalStorage`
//! mountpoint (`localstorage:///`).

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Component, Path};
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use tracing::{debug, info, warn};

use crate::flows::{MountFlow, SharedMountFlowBus};
use crate::vfs::error::{VfsError, VfsResult};
use crate::vfs::mount::MountManager;
use crate::vfs::mountpoint::{MountHooks, Mountpoint, MountpointParams, MountpointSnapshot};
use crate::vfs::path::{inner_path, join, parent, split_scheme, virtual_path};
use crate::vfs::transport::VfsTransport;
use crate::vfs::types::{FileMetadata, FileType, FreeSpace, RequestOptions};

/// Storage key of the node table.
pub const TREE_KEY: &str = "OSjs/VFS/LocalStorage/tree";

/// Storage key of the file contents.
pub const DATA_KEY: &str = "OSjs/VFS/LocalStorage/data";

/// Quota of a browser origin's local storage.
pub const DEFAULT_QUOTA: u64 = 5 * 1024 * 1024;

/// Registry name of the mountpoint and transport.
pub const NAME: &str = "LocalStorage";

const SCHEME: &str = "localstorage";

// ============================================================================
// Key/value store
// ============================================================================

/// String key/value storage with an optional size quota.
pub trait KeyValueStore: Send + Sync {
    fn get_item(&self, key: &str) -> Option<String>;

    /// Store several items at once. Either all are written or none.
    fn set_items(&self, items: &[(&str, String)]) -> VfsResult<()>;

    /// Bytes currently used.
    fn used(&self) -> u64;

    /// Maximum bytes, `None` for unbounded.
    fn quota(&self) -> Option<u64>;
}

/// In-process [`KeyValueStore`]. Usage counts key and value bytes.
#[derive(Debug)]
pub struct MemoryStore {
    items: RwLock<HashMap<String, String>>,
    quota: Option<u64>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Store with the default 5 MiB quota.
    pub fn new() -> Self {
        Self::with_quota(Some(DEFAULT_QUOTA))
    }

    pub fn with_quota(quota: Option<u64>) -> Self {
        Self {
            items: RwLock::new(HashMap::new()),
            quota,
        }
    }

    fn item_size(key: &str, value: &str) -> u64 {
        (key.len() + value.len()) as u64
    }
}

impl KeyValueStore for MemoryStore {
    fn get_item(&self, key: &str) -> Option<String> {
        self.items.read().get(key).cloned()
    }

    fn set_items(&self, items: &[(&str, String)]) -> VfsResult<()> {
        let mut stored = self.items.write();

        if let Some(quota) = self.quota {
            let mut used: u64 = stored.iter().map(|(k, v)| Self::item_size(k, v)).sum();
            for (key, value) in items {
                if let Some(old) = stored.get(*key) {
                    used -= Self::item_size(key, old);
                }
                used += Self::item_size(key, value);
            }
            if used > quota {
                return Err(VfsError::QuotaExceeded);
            }
        }

        for (key, value) in items {
            stored.insert((*key).to_string(), value.clone());
        }
        Ok(())
    }

    fn used(&self) -> u64 {
        self.items
            .read()
            .iter()
            .map(|(k, v)| Self::item_size(k, v))
            .sum()
    }

    fn quota(&self) -> Option<u64> {
        self.quota
    }
}

// ============================================================================
// Tree
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Node {
    #[serde(rename = "type")]
    kind: FileType,
    size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    mime: Option<String>,
}

impl Node {
    fn dir() -> Self {
        Self {
            kind: FileType::Directory,
            size: 0,
            mime: None,
        }
    }
}

/// Nodes keyed by inner path (`/a/b.txt`). The root `/` is implicit.
#[derive(Debug, Clone, Default)]
struct Tree {
    nodes: BTreeMap<String, Node>,
    data: BTreeMap<String, Vec<u8>>,
}

impl Tree {
    fn load(store: &dyn KeyValueStore) -> Self {
        let nodes = match store.get_item(TREE_KEY) {
            Some(json) => match serde_json::from_str(&json) {
                Ok(nodes) => nodes,
                Err(e) => {
                    warn!(error = %e, "discarding unreadable LocalStorage tree");
                    return Self::default();
                }
            },
            None => return Self::default(),
        };

        let encoded: BTreeMap<String, String> = store
            .get_item(DATA_KEY)
            .and_then(|json| serde_json::from_str(&json).ok())
            .unwrap_or_default();
        let data = encoded
            .into_iter()
            .filter_map(|(k, v)| BASE64.decode(v).ok().map(|bytes| (k, bytes)))
            .collect();

        Self { nodes, data }
    }

    fn is_dir(&self, key: &str) -> bool {
        key == "/" || self.nodes.get(key).is_some_and(|n| n.kind.is_dir())
    }

    fn exists(&self, key: &str) -> bool {
        key == "/" || self.nodes.contains_key(key)
    }

    /// `key` and everything below it.
    fn subtree(&self, key: &str) -> Vec<String> {
        let prefix = format!("{key}/");
        self.nodes
            .keys()
            .filter(|k| *k == key || k.starts_with(&prefix))
            .cloned()
            .collect()
    }

    /// Create missing parent directories of `key`.
    fn ensure_parents(&mut self, key: &str, path: &str) -> VfsResult<()> {
        let mut current = String::new();
        let dir = parent(key);
        for part in dir.split('/').filter(|p| !p.is_empty()) {
            current.push('/');
            current.push_str(part);
            match self.nodes.get(&current) {
                Some(node) if !node.kind.is_dir() => {
                    return Err(VfsError::not_a_directory(path));
                }
                Some(_) => {}
                None => {
                    self.nodes.insert(current.clone(), Node::dir());
                }
            }
        }
        Ok(())
    }

    fn put_file(&mut self, key: &str, data: &[u8], mime: Option<&str>) {
        self.nodes.insert(
            key.to_string(),
            Node {
                kind: FileType::File,
                size: data.len() as u64,
                mime: mime.map(str::to_string),
            },
        );
        self.data.insert(key.to_string(), data.to_vec());
    }

    fn remove_subtree(&mut self, key: &str) {
        for k in self.subtree(key) {
            self.nodes.remove(&k);
            self.data.remove(&k);
        }
    }

    /// Duplicate `from` and its descendants under `to`.
    fn copy_subtree(&mut self, from: &str, to: &str) {
        for k in self.subtree(from) {
            let target = format!("{to}{}", &k[from.len()..]);
            if let Some(node) = self.nodes.get(&k).cloned() {
                self.nodes.insert(target.clone(), node);
            }
            if let Some(bytes) = self.data.get(&k).cloned() {
                self.data.insert(target, bytes);
            }
        }
    }

    fn encode(&self) -> VfsResult<[(&'static str, String); 2]> {
        let nodes =
            serde_json::to_string(&self.nodes).map_err(|e| VfsError::backend(e.to_string()))?;
        let data: BTreeMap<&str, String> = self
            .data
            .iter()
            .map(|(k, v)| (k.as_str(), BASE64.encode(v)))
            .collect();
        let data = serde_json::to_string(&data).map_err(|e| VfsError::backend(e.to_string()))?;
        Ok([(TREE_KEY, nodes), (DATA_KEY, data)])
    }
}

// ============================================================================
// Mount state
// ============================================================================

const PENDING: u8 = 0;
const MOUNTED: u8 = 1;
const UNMOUNTED: u8 = 2;

/// Shared between the transport (first request mounts) and the hooks.
#[derive(Debug)]
struct MountState {
    status: AtomicU8,
    events: Option<SharedMountFlowBus>,
}

impl MountState {
    /// Mark as mounted on first use and announce it.
    fn touch(&self) {
        if self
            .status
            .compare_exchange(PENDING, MOUNTED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            info!("LocalStorage mounted");
            if let Some(events) = &self.events {
                events.publish(MountFlow::mounted(NAME));
            }
        }
    }
}

/// Lifecycle hooks of the `LocalStorage` mountpoint.
#[derive(Debug)]
pub struct LocalStorageHooks {
    state: Arc<MountState>,
    enabled: bool,
}

#[async_trait]
impl MountHooks for LocalStorageHooks {
    fn mounted(&self) -> bool {
        self.state.status.load(Ordering::Acquire) != UNMOUNTED
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    async fn unmount(&self) -> VfsResult<bool> {
        self.state.status.store(UNMOUNTED, Ordering::Release);
        if let Some(events) = &self.state.events {
            events.publish(MountFlow::unmounted(NAME));
        }
        Ok(true)
    }
}

// ============================================================================
// Transport
// ============================================================================

/// Key/value backed transport.
pub struct LocalStorageTransport {
    store: Arc<dyn KeyValueStore>,
    tree: Mutex<Tree>,
    state: Arc<MountState>,
}

impl std::fmt::Debug for LocalStorageTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalStorageTransport")
            .field("nodes", &self.tree.lock().nodes.len())
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl LocalStorageTransport {
    /// Open the tree stored in `store`. Unreadable contents start empty.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_events(store, None)
    }

    fn with_events(store: Arc<dyn KeyValueStore>, events: Option<SharedMountFlowBus>) -> Self {
        let tree = Tree::load(store.as_ref());
        Self {
            store,
            tree: Mutex::new(tree),
            state: Arc::new(MountState {
                status: AtomicU8::new(PENDING),
                events,
            }),
        }
    }

    /// Hooks bound to this transport's mount state.
    pub fn hooks(&self, enabled: bool) -> LocalStorageHooks {
        LocalStorageHooks {
            state: Arc::clone(&self.state),
            enabled,
        }
    }

    /// Read-only access to the tree.
    fn view<R>(&self, f: impl FnOnce(&Tree) -> VfsResult<R>) -> VfsResult<R> {
        self.state.touch();
        f(&self.tree.lock())
    }

    /// Apply a mutation and commit it; on failure nothing changes.
    fn mutate<R>(&self, f: impl FnOnce(&mut Tree) -> VfsResult<R>) -> VfsResult<R> {
        self.state.touch();
        let mut tree = self.tree.lock();
        let mut next = tree.clone();
        let result = f(&mut next)?;
        self.store.set_items(&next.encode()?)?;
        *tree = next;
        Ok(result)
    }
}

/// Inner key of a path routed to `mount`.
fn key(mount: &MountpointSnapshot, path: &str) -> VfsResult<String> {
    if !mount.matcher.as_ref().is_some_and(|m| m.matches(path)) {
        return Err(VfsError::cross_mount(path));
    }
    let inner = inner_path(path);
    if Path::new(inner)
        .components()
        .any(|c| matches!(c, Component::ParentDir | Component::CurDir))
    {
        return Err(VfsError::invalid_path(path));
    }
    Ok(inner.to_string())
}

/// A single path segment, as accepted for upload file names.
fn entry_name(name: &str) -> VfsResult<&str> {
    if name.is_empty() || name.contains('/') || name == "." || name == ".." {
        return Err(VfsError::invalid_path(name));
    }
    Ok(name)
}

fn scheme(mount: &MountpointSnapshot) -> &str {
    split_scheme(&mount.root).map(|(s, _)| s).unwrap_or(SCHEME)
}

fn metadata(mount: &MountpointSnapshot, key: &str, node: &Node) -> FileMetadata {
    let path = virtual_path(scheme(mount), key);
    match node.kind {
        FileType::Directory => FileMetadata::directory(path),
        FileType::File => FileMetadata::file(path, node.size, node.mime.clone()),
    }
}

/// Shared checks of copy and move.
fn check_transfer(tree: &Tree, from: &str, to: &str, src: &str, dest: &str) -> VfsResult<()> {
    if from == "/" || !tree.exists(from) {
        return Err(VfsError::not_found(src));
    }
    if tree.exists(to) {
        return Err(VfsError::already_exists(dest));
    }
    if to.starts_with(&format!("{from}/")) {
        return Err(VfsError::invalid_path(dest));
    }
    if !tree.is_dir(parent(to)) {
        return Err(VfsError::not_found(dest));
    }
    Ok(())
}

#[async_trait]
impl VfsTransport for LocalStorageTransport {
    fn name(&self) -> &str {
        NAME
    }

    async fn scandir(
        &self,
        path: &str,
        _options: &RequestOptions,
        mount: &MountpointSnapshot,
    ) -> VfsResult<Vec<FileMetadata>> {
        let dir = key(mount, path)?;
        self.view(|tree| {
            if !tree.exists(&dir) {
                return Err(VfsError::not_found(path));
            }
            if !tree.is_dir(&dir) {
                return Err(VfsError::not_a_directory(path));
            }
            Ok(tree
                .nodes
                .iter()
                .filter(|(k, _)| parent(k) == dir)
                .map(|(k, node)| metadata(mount, k, node))
                .collect())
        })
    }

    async fn read(
        &self,
        path: &str,
        _options: &RequestOptions,
        mount: &MountpointSnapshot,
    ) -> VfsResult<Vec<u8>> {
        let file = key(mount, path)?;
        self.view(|tree| {
            if tree.is_dir(&file) {
                return Err(VfsError::is_a_directory(path));
            }
            tree.data
                .get(&file)
                .cloned()
                .ok_or_else(|| VfsError::not_found(path))
        })
    }

    async fn exists(
        &self,
        path: &str,
        _options: &RequestOptions,
        mount: &MountpointSnapshot,
    ) -> VfsResult<bool> {
        let entry = key(mount, path)?;
        self.view(|tree| Ok(tree.exists(&entry)))
    }

    async fn fileinfo(
        &self,
        path: &str,
        _options: &RequestOptions,
        mount: &MountpointSnapshot,
    ) -> VfsResult<FileMetadata> {
        let entry = key(mount, path)?;
        self.view(|tree| {
            if entry == "/" {
                return Ok(metadata(mount, &entry, &Node::dir()));
            }
            tree.nodes
                .get(&entry)
                .map(|node| metadata(mount, &entry, node))
                .ok_or_else(|| VfsError::not_found(path))
        })
    }

    async fn url(
        &self,
        path: &str,
        _options: &RequestOptions,
        mount: &MountpointSnapshot,
    ) -> VfsResult<String> {
        let file = key(mount, path)?;
        self.view(|tree| {
            let bytes = tree.data.get(&file).ok_or_else(|| VfsError::not_found(path))?;
            let mime = tree
                .nodes
                .get(&file)
                .and_then(|n| n.mime.as_deref())
                .unwrap_or("application/octet-stream");
            Ok(format!("data:{mime};base64,{}", BASE64.encode(bytes)))
        })
    }

    async fn free_space(
        &self,
        _root: &str,
        _options: &RequestOptions,
        _mount: &MountpointSnapshot,
    ) -> VfsResult<FreeSpace> {
        self.state.touch();
        Ok(match self.store.quota() {
            Some(quota) => FreeSpace::Bytes(quota.saturating_sub(self.store.used())),
            None => FreeSpace::Unlimited,
        })
    }

    async fn write(
        &self,
        path: &str,
        data: &[u8],
        mime: Option<&str>,
        _options: &RequestOptions,
        mount: &MountpointSnapshot,
    ) -> VfsResult<bool> {
        let file = key(mount, path)?;
        self.mutate(|tree| {
            if tree.is_dir(&file) {
                return Err(VfsError::is_a_directory(path));
            }
            tree.ensure_parents(&file, path)?;
            tree.put_file(&file, data, mime);
            Ok(true)
        })?;
        debug!(path, bytes = data.len(), "wrote file");
        Ok(true)
    }

    async fn unlink(
        &self,
        path: &str,
        _options: &RequestOptions,
        mount: &MountpointSnapshot,
    ) -> VfsResult<bool> {
        let entry = key(mount, path)?;
        self.mutate(|tree| {
            if entry == "/" {
                return Err(VfsError::invalid_path(path));
            }
            if !tree.exists(&entry) {
                return Err(VfsError::not_found(path));
            }
            tree.remove_subtree(&entry);
            Ok(true)
        })
    }

    async fn copy(
        &self,
        src: &str,
        dest: &str,
        _options: &RequestOptions,
        mount: &MountpointSnapshot,
    ) -> VfsResult<bool> {
        let from = key(mount, src)?;
        let to = key(mount, dest)?;
        self.mutate(|tree| {
            check_transfer(tree, &from, &to, src, dest)?;
            tree.copy_subtree(&from, &to);
            Ok(true)
        })
    }

    async fn rename(
        &self,
        src: &str,
        dest: &str,
        _options: &RequestOptions,
        mount: &MountpointSnapshot,
    ) -> VfsResult<bool> {
        let from = key(mount, src)?;
        let to = key(mount, dest)?;
        self.mutate(|tree| {
            check_transfer(tree, &from, &to, src, dest)?;
            tree.copy_subtree(&from, &to);
            tree.remove_subtree(&from);
            Ok(true)
        })
    }

    async fn mkdir(
        &self,
        path: &str,
        _options: &RequestOptions,
        mount: &MountpointSnapshot,
    ) -> VfsResult<bool> {
        let dir = key(mount, path)?;
        self.mutate(|tree| {
            if tree.exists(&dir) {
                return Err(VfsError::already_exists(path));
            }
            tree.ensure_parents(&dir, path)?;
            tree.nodes.insert(dir.clone(), Node::dir());
            Ok(true)
        })
    }

    async fn upload(
        &self,
        dest: &str,
        name: &str,
        data: &[u8],
        mime: Option<&str>,
        _options: &RequestOptions,
        mount: &MountpointSnapshot,
    ) -> VfsResult<bool> {
        let dir = key(mount, dest)?;
        let file = join(&dir, entry_name(name)?);
        let target = virtual_path(scheme(mount), &file);
        self.mutate(|tree| {
            if !tree.is_dir(&dir) {
                return Err(VfsError::not_found(dest));
            }
            if tree.exists(&file) {
                return Err(VfsError::already_exists(target));
            }
            tree.put_file(&file, data, mime);
            Ok(true)
        })
    }
}

// ============================================================================
// Registration
// ============================================================================

/// Register the transport and the `LocalStorage` mountpoint with `manager`.
///
/// The mountpoint is enabled only if `local_storage.enabled` is set in the
/// manager's configuration. Before `init` the registration is queued.
pub fn install(
    manager: &MountManager,
    store: Arc<dyn KeyValueStore>,
) -> VfsResult<(Arc<LocalStorageTransport>, Arc<Mountpoint>)> {
    let config = manager.config().local_storage.clone();
    let transport = Arc::new(LocalStorageTransport::with_events(
        store,
        Some(Arc::clone(manager.events())),
    ));
    manager.register_transport(transport.clone());

    let mut params = MountpointParams::new(NAME, NAME)
        .with_scheme(SCHEME)
        .with_hooks(Arc::new(transport.hooks(config.enabled)));
    params.description = config.description;
    params.icon = config.icon;
    params.searchable = false;

    let mount = manager.register_builtin(params, false)?;
    Ok((transport, mount))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mount() -> MountpointSnapshot {
        MountpointSnapshot::from(&MountpointParams::new(NAME, NAME).with_scheme(SCHEME))
    }

    fn opts() -> RequestOptions {
        RequestOptions::new()
    }

    fn transport() -> LocalStorageTransport {
        LocalStorageTransport::new(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn test_write_creates_parents() {
        let t = transport();
        let m = mount();
        t.write("localstorage:///a/b/c.txt", b"hi", Some("text/plain"), &opts(), &m)
            .await
            .unwrap();

        let root = t.scandir("localstorage:///", &opts(), &m).await.unwrap();
        assert_eq!(root.len(), 1);
        assert_eq!(root[0].path, "localstorage:///a");
        assert!(root[0].is_dir());

        let info = t.fileinfo("localstorage:///a/b/c.txt", &opts(), &m).await.unwrap();
        assert_eq!(info.size, 2);
        assert_eq!(info.mime.as_deref(), Some("text/plain"));
    }

    #[tokio::test]
    async fn test_scandir_errors() {
        let t = transport();
        let m = mount();
        t.write("localstorage:///f", b"", None, &opts(), &m).await.unwrap();

        let err = t.scandir("localstorage:///missing", &opts(), &m).await.unwrap_err();
        assert!(matches!(err, VfsError::NotFound(_)));
        let err = t.scandir("localstorage:///f", &opts(), &m).await.unwrap_err();
        assert!(matches!(err, VfsError::NotADirectory(_)));
    }

    #[tokio::test]
    async fn test_persists_across_instances() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let m = mount();
        {
            let t = LocalStorageTransport::new(store.clone());
            t.write("localstorage:///x.bin", &[0, 159, 255], None, &opts(), &m)
                .await
                .unwrap();
        }
        assert!(store.get_item(TREE_KEY).is_some());

        let t = LocalStorageTransport::new(store);
        assert_eq!(
            t.read("localstorage:///x.bin", &opts(), &m).await.unwrap(),
            vec![0, 159, 255]
        );
    }

    #[tokio::test]
    async fn test_copy_rules() {
        let t = transport();
        let m = mount();
        t.write("localstorage:///d/one", b"1", None, &opts(), &m).await.unwrap();

        let err = t
            .copy("localstorage:///d", "localstorage:///d/inner", &opts(), &m)
            .await
            .unwrap_err();
        assert!(matches!(err, VfsError::InvalidPath(_)));

        let err = t
            .copy("localstorage:///d", "localstorage:///nope/d", &opts(), &m)
            .await
            .unwrap_err();
        assert!(matches!(err, VfsError::NotFound(p) if p == "localstorage:///nope/d"));

        t.copy("localstorage:///d", "localstorage:///e", &opts(), &m).await.unwrap();
        assert_eq!(t.read("localstorage:///e/one", &opts(), &m).await.unwrap(), b"1");
        assert!(t.exists("localstorage:///d/one", &opts(), &m).await.unwrap());
    }

    #[tokio::test]
    async fn test_move_and_existing_targets() {
        let t = transport();
        let m = mount();
        t.write("localstorage:///a", b"a", None, &opts(), &m).await.unwrap();
        t.write("localstorage:///b", b"b", None, &opts(), &m).await.unwrap();

        let err = t
            .rename("localstorage:///a", "localstorage:///b", &opts(), &m)
            .await
            .unwrap_err();
        assert!(matches!(err, VfsError::AlreadyExists(_)));

        t.rename("localstorage:///a", "localstorage:///c", &opts(), &m).await.unwrap();
        assert!(!t.exists("localstorage:///a", &opts(), &m).await.unwrap());
        assert_eq!(t.read("localstorage:///c", &opts(), &m).await.unwrap(), b"a");

        let err = t.mkdir("localstorage:///c", &opts(), &m).await.unwrap_err();
        assert!(matches!(err, VfsError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn test_upload_and_url() {
        let t = transport();
        let m = mount();
        t.upload("localstorage:///", "n.txt", b"hey", Some("text/plain"), &opts(), &m)
            .await
            .unwrap();
        let err = t
            .upload("localstorage:///", "n.txt", b"again", None, &opts(), &m)
            .await
            .unwrap_err();
        assert!(matches!(err, VfsError::AlreadyExists(_)));

        let url = t.url("localstorage:///n.txt", &opts(), &m).await.unwrap();
        assert_eq!(url, "data:text/plain;base64,aGV5");
    }

    #[tokio::test]
    async fn test_upload_rejects_non_segment_names() {
        let t = transport();
        let m = mount();
        for name in ["", ".", "..", "../evil", "a/b.txt"] {
            let err = t
                .upload("localstorage:///", name, b"x", None, &opts(), &m)
                .await
                .unwrap_err();
            assert!(matches!(err, VfsError::InvalidPath(_)), "{name:?}");
        }

        assert!(t.scandir("localstorage:///", &opts(), &m).await.unwrap().is_empty());
        assert!(!t.exists("localstorage:///a", &opts(), &m).await.unwrap());
        assert!(t.view(|tree| Ok(tree.nodes.is_empty())).unwrap());
        assert!(t.store.get_item(TREE_KEY).is_none());
    }

    #[tokio::test]
    async fn test_quota_rolls_back() {
        let t = LocalStorageTransport::new(Arc::new(MemoryStore::with_quota(Some(256))));
        let m = mount();
        let err = t
            .write("localstorage:///big", &[7u8; 1024], None, &opts(), &m)
            .await
            .unwrap_err();
        assert!(matches!(err, VfsError::QuotaExceeded));
        assert!(!t.exists("localstorage:///big", &opts(), &m).await.unwrap());

        match t.free_space("localstorage:///", &opts(), &m).await.unwrap() {
            FreeSpace::Bytes(free) => assert_eq!(free, 256),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unsupported_verbs() {
        let t = transport();
        let m = mount();
        let result = t.find("localstorage:///", "x", &opts(), &m).await;
        assert!(matches!(result, Err(VfsError::Unavailable)));
        let result = t.trash("localstorage:///x", &opts(), &m).await;
        assert!(matches!(result, Err(VfsError::Unavailable)));
    }

    #[tokio::test]
    async fn test_unlink_recursive() {
        let t = transport();
        let m = mount();
        t.write("localstorage:///d/e/f", b"x", None, &opts(), &m).await.unwrap();
        t.unlink("localstorage:///d", &opts(), &m).await.unwrap();
        assert!(t.scandir("localstorage:///", &opts(), &m).await.unwrap().is_empty());

        let err = t.unlink("localstorage:///", &opts(), &m).await.unwrap_err();
        assert!(matches!(err, VfsError::InvalidPath(_)));
    }
}
