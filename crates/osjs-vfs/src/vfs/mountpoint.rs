//! Mountpoint descriptors and request dispatch.
//!
//! A [`Mountpoint`] binds a scheme to a transport. Its
//! [`request`](Mountpoint::request) is the single entry point into the
//! backend and applies, in order:
//!
//! 1. transport must be registered ([`VfsError::InvalidTransport`])
//! 2. read-only policy ([`VfsError::ReadOnly`])
//! 3. verb must be implemented ([`VfsError::Unavailable`], via the
//!    transport trait's default methods)
//! 4. the transport verb, with `(args.., options, snapshot)`

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tracing::debug;

use super::error::{VfsError, VfsResult};
use super::mount::Registry;
use super::ops::{VfsRequest, VfsResponse};
use super::path::PathMatcher;
use super::transport::VfsTransport;
use super::types::{ConnectionOptions, RequestOptions};
use crate::flows::{MountFlow, SharedMountFlowBus};

// ============================================================================
// Lifecycle hooks
// ============================================================================

/// Lifecycle behaviour of a mountpoint.
///
/// The defaults describe a static mountpoint: always mounted, always
/// enabled, and not unmountable.
#[async_trait]
pub trait MountHooks: Send + Sync {
    /// Live/connected state.
    fn mounted(&self) -> bool {
        true
    }

    /// Whether path resolution should consider this mountpoint.
    fn enabled(&self) -> bool {
        true
    }

    /// Tear down the live connection. Does not touch the registry.
    async fn unmount(&self) -> VfsResult<bool> {
        Err(VfsError::Unavailable)
    }
}

/// Hooks of a statically configured mountpoint.
#[derive(Debug, Default)]
pub struct StaticHooks;

impl MountHooks for StaticHooks {}

/// Hooks of a mountpoint added at runtime: unmounting flips a flag and
/// announces it, the registry entry stays.
#[derive(Debug)]
pub struct DynamicHooks {
    name: String,
    mounted: AtomicBool,
    events: SharedMountFlowBus,
}

impl DynamicHooks {
    /// Create hooks for a freshly mounted dynamic mountpoint.
    pub fn new(name: impl Into<String>, events: SharedMountFlowBus) -> Self {
        Self {
            name: name.into(),
            mounted: AtomicBool::new(true),
            events,
        }
    }
}

#[async_trait]
impl MountHooks for DynamicHooks {
    fn mounted(&self) -> bool {
        self.mounted.load(Ordering::Acquire)
    }

    async fn unmount(&self) -> VfsResult<bool> {
        self.mounted.store(false, Ordering::Release);
        self.events.publish(MountFlow::unmounted(&self.name));
        Ok(true)
    }
}

// ============================================================================
// Construction parameters
// ============================================================================

/// Raw parameters a mountpoint is built from.
///
/// Transports may adjust these in [`VfsTransport::defaults`] before the
/// mountpoint is frozen.
#[derive(Clone)]
pub struct MountpointParams {
    /// Unique registry key.
    pub name: String,
    /// Transport name.
    pub transport: String,
    pub description: String,
    pub icon: String,
    /// Canonical root, `<scheme>:///`.
    pub root: String,
    /// Routing rule; `None` means the mountpoint never matches a path.
    pub matcher: Option<PathMatcher>,
    pub read_only: bool,
    pub visible: bool,
    pub searchable: bool,
    pub internal: bool,
    /// Added at runtime rather than configured.
    pub dynamic: bool,
    /// Hidden from listings unless explicitly requested.
    pub special: bool,
    /// Backend connection options.
    pub options: ConnectionOptions,
    /// Lifecycle hooks; [`StaticHooks`] when `None`.
    pub hooks: Option<Arc<dyn MountHooks>>,
}

impl std::fmt::Debug for MountpointParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MountpointParams")
            .field("name", &self.name)
            .field("transport", &self.transport)
            .field("root", &self.root)
            .field("read_only", &self.read_only)
            .field("internal", &self.internal)
            .field("hooks", &self.hooks.as_ref().map(|_| "<custom>"))
            .finish_non_exhaustive()
    }
}

impl MountpointParams {
    /// Parameters for `name` served by `transport`, rooted at `<name>:///`.
    pub fn new(name: impl Into<String>, transport: impl Into<String>) -> Self {
        let name = name.into();
        let root = format!("{name}:///");
        Self {
            description: name.clone(),
            matcher: Some(PathMatcher::scheme(name.clone())),
            name,
            transport: transport.into(),
            icon: crate::config::DEFAULT_ICON.to_string(),
            root,
            read_only: false,
            visible: true,
            searchable: true,
            internal: false,
            dynamic: false,
            special: false,
            options: ConnectionOptions::default(),
            hooks: None,
        }
    }

    /// Route a different scheme than the name (sets root and matcher).
    pub fn with_scheme(mut self, scheme: &str) -> Self {
        self.root = format!("{scheme}:///");
        self.matcher = Some(PathMatcher::scheme(scheme));
        self
    }

    pub fn with_read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    pub fn with_internal(mut self, internal: bool) -> Self {
        self.internal = internal;
        self
    }

    pub fn with_options(mut self, options: ConnectionOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_hooks(mut self, hooks: Arc<dyn MountHooks>) -> Self {
        self.hooks = Some(hooks);
        self
    }
}

/// Immutable, function-free view of a mountpoint, handed to every
/// transport call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MountpointSnapshot {
    pub name: String,
    pub transport: String,
    pub description: String,
    pub icon: String,
    pub root: String,
    #[serde(rename = "match")]
    pub matcher: Option<PathMatcher>,
    pub read_only: bool,
    pub visible: bool,
    pub searchable: bool,
    pub internal: bool,
    pub dynamic: bool,
    pub special: bool,
    pub options: ConnectionOptions,
}

impl From<&MountpointParams> for MountpointSnapshot {
    fn from(p: &MountpointParams) -> Self {
        Self {
            name: p.name.clone(),
            transport: p.transport.clone(),
            description: p.description.clone(),
            icon: p.icon.clone(),
            root: p.root.clone(),
            matcher: p.matcher.clone(),
            read_only: p.read_only,
            visible: p.visible,
            searchable: p.searchable,
            internal: p.internal,
            dynamic: p.dynamic,
            special: p.special,
            options: p.options.clone(),
        }
    }
}

impl MountpointSnapshot {
    #[cfg(test)]
    pub(crate) fn for_tests(name: &str, transport: &str) -> Self {
        Self::from(&MountpointParams::new(name, transport))
    }
}

// ============================================================================
// Mountpoint
// ============================================================================

/// A registered binding between a scheme and a transport.
pub struct Mountpoint {
    snapshot: Arc<MountpointSnapshot>,
    transport: Option<Arc<dyn VfsTransport>>,
    hooks: Arc<dyn MountHooks>,
    /// Used to resolve copy destinations for the read-only check.
    registry: Weak<RwLock<Registry>>,
}

impl std::fmt::Debug for Mountpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mountpoint")
            .field("snapshot", &self.snapshot)
            .field("transport", &self.transport.as_ref().map(|t| t.name().to_string()))
            .finish_non_exhaustive()
    }
}

impl Mountpoint {
    pub(crate) fn new(
        params: MountpointParams,
        transport: Option<Arc<dyn VfsTransport>>,
        registry: Weak<RwLock<Registry>>,
    ) -> Self {
        let snapshot = Arc::new(MountpointSnapshot::from(&params));
        let hooks = params
            .hooks
            .unwrap_or_else(|| Arc::new(StaticHooks) as Arc<dyn MountHooks>);
        Self {
            snapshot,
            transport,
            hooks,
            registry,
        }
    }

    /// The frozen snapshot.
    pub fn snapshot(&self) -> &Arc<MountpointSnapshot> {
        &self.snapshot
    }

    pub fn name(&self) -> &str {
        &self.snapshot.name
    }

    pub fn root(&self) -> &str {
        &self.snapshot.root
    }

    pub fn transport_name(&self) -> &str {
        &self.snapshot.transport
    }

    pub fn is_read_only(&self) -> bool {
        self.snapshot.read_only
    }

    pub fn is_internal(&self) -> bool {
        self.snapshot.internal
    }

    pub fn is_visible(&self) -> bool {
        self.snapshot.visible
    }

    pub fn is_special(&self) -> bool {
        self.snapshot.special
    }

    /// One snapshot property by its serialized (camelCase) name, e.g.
    /// `readOnly` or `match`.
    pub fn property(&self, name: &str) -> Option<serde_json::Value> {
        let value = serde_json::to_value(self.snapshot.as_ref()).ok()?;
        value.get(name).cloned()
    }

    /// Test whether a virtual path routes here.
    pub fn matches(&self, path: &str) -> bool {
        self.snapshot
            .matcher
            .as_ref()
            .is_some_and(|m| m.matches(path))
    }

    pub fn mounted(&self) -> bool {
        self.hooks.mounted()
    }

    pub fn enabled(&self) -> bool {
        self.hooks.enabled()
    }

    /// Tear down the live connection.
    pub async fn unmount(&self) -> VfsResult<bool> {
        self.hooks.unmount().await
    }

    /// Returns true when the read-only policy forbids this request.
    fn violates_read_only(&self, request: &VfsRequest) -> bool {
        if !self.snapshot.read_only {
            return false;
        }

        match request {
            // Copying stays forbidden within the same kind of store and is
            // allowed towards a store with a different `internal` flag.
            VfsRequest::Copy { dest, .. } => self
                .destination_internal(dest)
                .is_some_and(|internal| internal == self.snapshot.internal),
            other => other.operation().is_mutating(),
        }
    }

    fn destination_internal(&self, dest: &str) -> Option<bool> {
        let registry = self.registry.upgrade()?;
        let registry = registry.read();
        registry.resolve(dest).map(|m| m.is_internal())
    }

    /// Dispatch a request to the transport.
    #[tracing::instrument(
        skip(self, request, options),
        fields(mount = %self.snapshot.name, op = %request.operation())
    )]
    pub async fn request(
        &self,
        request: VfsRequest,
        options: &RequestOptions,
    ) -> VfsResult<VfsResponse> {
        let Some(transport) = self.transport.as_ref() else {
            debug!(transport = %self.snapshot.transport, "transport not registered");
            return Err(VfsError::invalid_transport(&self.snapshot.transport));
        };

        if self.violates_read_only(&request) {
            debug!("rejected by read-only policy");
            return Err(VfsError::ReadOnly);
        }

        let mount = self.snapshot.as_ref();
        match request {
            VfsRequest::Scandir { path } => transport
                .scandir(&path, options, mount)
                .await
                .map(VfsResponse::Entries),
            VfsRequest::Read { path } => transport
                .read(&path, options, mount)
                .await
                .map(VfsResponse::Data),
            VfsRequest::Write { path, data, mime } => transport
                .write(&path, &data, mime.as_deref(), options, mount)
                .await
                .map(VfsResponse::Flag),
            VfsRequest::Unlink { path } => transport
                .unlink(&path, options, mount)
                .await
                .map(VfsResponse::Flag),
            VfsRequest::Copy { src, dest } => transport
                .copy(&src, &dest, options, mount)
                .await
                .map(VfsResponse::Flag),
            VfsRequest::Move { src, dest } => transport
                .rename(&src, &dest, options, mount)
                .await
                .map(VfsResponse::Flag),
            VfsRequest::Exists { path } => transport
                .exists(&path, options, mount)
                .await
                .map(VfsResponse::Flag),
            VfsRequest::Fileinfo { path } => transport
                .fileinfo(&path, options, mount)
                .await
                .map(VfsResponse::Info),
            VfsRequest::Mkdir { path } => transport
                .mkdir(&path, options, mount)
                .await
                .map(VfsResponse::Flag),
            VfsRequest::Upload {
                dest,
                name,
                data,
                mime,
            } => transport
                .upload(&dest, &name, &data, mime.as_deref(), options, mount)
                .await
                .map(VfsResponse::Flag),
            VfsRequest::Url { path } => transport
                .url(&path, options, mount)
                .await
                .map(VfsResponse::Url),
            VfsRequest::Find { path, query } => transport
                .find(&path, &query, options, mount)
                .await
                .map(VfsResponse::Entries),
            VfsRequest::Trash { path } => transport
                .trash(&path, options, mount)
                .await
                .map(VfsResponse::Flag),
            VfsRequest::Untrash { path } => transport
                .untrash(&path, options, mount)
                .await
                .map(VfsResponse::Flag),
            VfsRequest::EmptyTrash { .. } => transport
                .empty_trash(options, mount)
                .await
                .map(VfsResponse::Flag),
            VfsRequest::FreeSpace { root } => transport
                .free_space(&root, options, mount)
                .await
                .map(VfsResponse::FreeSpace),
        }
    }
}
