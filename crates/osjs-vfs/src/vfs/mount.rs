//! Mount manager: registry of mountpoints and path routing.
//!
//! The registry is an insertion-ordered map. When two mountpoints claim the
//! same scheme the one registered first wins; entries are never re-sorted.
//!
//! Registrations made before [`MountManager::init`] (self-registering
//! backends, early `add` calls) are queued and flushed at init, ahead of
//! the configured mountpoints.

use futures::future::{BoxFuture, FutureExt};
use indexmap::IndexMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::error::{VfsError, VfsResult};
use super::mountpoint::{DynamicHooks, Mountpoint, MountpointParams};
use super::ops::{VfsRequest, VfsResponse};
use super::path::sanitize_scheme;
use super::transport::{TransportRegistry, VfsTransport};
use super::types::{ConnectionOptions, RequestOptions};
use crate::config::{MountpointConfig, VfsConfig};
use crate::flows::{MountFlow, SharedMountFlowBus, shared_mount_flow_bus};

/// Mountpoint used when a path matches nothing.
pub const DEFAULT_MODULE: &str = "User";

/// Transport name of WebDAV mounts (and of the `owndrive` alias).
pub const WEBDAV: &str = "WebDAV";

const OWNDRIVE: &str = "owndrive";

/// Capacity of the mount event bus.
const EVENT_CAPACITY: usize = 64;

// ============================================================================
// Registry
// ============================================================================

struct Queued {
    mount: Arc<Mountpoint>,
    emit: bool,
}

/// Ordered table of registered mountpoints.
pub(crate) struct Registry {
    modules: IndexMap<String, Arc<Mountpoint>>,
    queue: Vec<Queued>,
    inited: bool,
}

impl Registry {
    fn new() -> Self {
        Self {
            modules: IndexMap::new(),
            queue: Vec::new(),
            inited: false,
        }
    }

    /// First enabled mountpoint whose matcher accepts `path`.
    pub(crate) fn resolve(&self, path: &str) -> Option<&Arc<Mountpoint>> {
        self.modules
            .values()
            .find(|m| m.enabled() && m.matches(path))
    }

    /// Registered or waiting in the init queue.
    fn contains(&self, name: &str) -> bool {
        self.modules.contains_key(name) || self.queue.iter().any(|q| q.mount.name() == name)
    }
}

// ============================================================================
// Public types
// ============================================================================

/// Options for a runtime-added mount.
///
/// Also the on-disk shape of saved mounts, see [`crate::settings`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NewMount {
    pub name: String,
    pub transport: String,
    pub description: String,
    pub icon: String,
    pub options: ConnectionOptions,
    pub read_only: bool,
    pub visible: bool,
    pub searchable: bool,
}

impl Default for NewMount {
    fn default() -> Self {
        Self {
            name: "MyModule".to_string(),
            transport: crate::config::DEFAULT_TRANSPORT.to_string(),
            description: "My VFS Module".to_string(),
            icon: "places/server.png".to_string(),
            options: ConnectionOptions::default(),
            read_only: false,
            visible: true,
            searchable: false,
        }
    }
}

impl NewMount {
    pub fn new(name: impl Into<String>, transport: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transport: transport.into(),
            ..Default::default()
        }
    }

    pub fn with_options(mut self, options: ConnectionOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }
}

/// Filter for [`MountManager::get_modules`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModuleFilter {
    /// Only visible mountpoints.
    pub visible: bool,
    /// Include special mountpoints.
    pub special: bool,
}

impl Default for ModuleFilter {
    fn default() -> Self {
        Self {
            visible: true,
            special: false,
        }
    }
}

/// One listing entry of [`MountManager::get_modules`].
#[derive(Debug, Clone)]
pub struct ModuleEntry {
    pub name: String,
    pub module: Arc<Mountpoint>,
}

/// A mountpoint given either by registry name or directly.
#[derive(Debug, Clone, Copy)]
pub enum ModuleRef<'a> {
    Name(&'a str),
    Module(&'a Mountpoint),
}

impl<'a> From<&'a str> for ModuleRef<'a> {
    fn from(name: &'a str) -> Self {
        Self::Name(name)
    }
}

impl<'a> From<&'a Mountpoint> for ModuleRef<'a> {
    fn from(module: &'a Mountpoint) -> Self {
        Self::Module(module)
    }
}

impl<'a> From<&'a Arc<Mountpoint>> for ModuleRef<'a> {
    fn from(module: &'a Arc<Mountpoint>) -> Self {
        Self::Module(module.as_ref())
    }
}

// ============================================================================
// MountManager
// ============================================================================

/// Registry of mountpoints, routing virtual paths to their transports.
pub struct MountManager {
    registry: Arc<RwLock<Registry>>,
    transports: RwLock<TransportRegistry>,
    config: VfsConfig,
    events: SharedMountFlowBus,
}

impl std::fmt::Debug for MountManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let registry = self.registry.read();
        f.debug_struct("MountManager")
            .field("modules", &registry.modules.keys().collect::<Vec<_>>())
            .field("queued", &registry.queue.len())
            .field("inited", &registry.inited)
            .field("transports", &*self.transports.read())
            .finish()
    }
}

impl MountManager {
    /// Create a manager over the given configuration and transports.
    ///
    /// Nothing is registered until [`init`](Self::init).
    pub fn new(config: VfsConfig, transports: TransportRegistry) -> Self {
        Self {
            registry: Arc::new(RwLock::new(Registry::new())),
            transports: RwLock::new(transports),
            config,
            events: shared_mount_flow_bus(EVENT_CAPACITY),
        }
    }

    /// Mount lifecycle events (`vfs.mount`, `vfs.unmount`).
    pub fn events(&self) -> &SharedMountFlowBus {
        &self.events
    }

    /// The configuration this manager was built from.
    pub fn config(&self) -> &VfsConfig {
        &self.config
    }

    pub fn is_inited(&self) -> bool {
        self.registry.read().inited
    }

    // ========================================================================
    // Transports
    // ========================================================================

    /// Register a transport. Mountpoints created earlier keep the transport
    /// they were built with.
    pub fn register_transport(&self, transport: Arc<dyn VfsTransport>) {
        debug!(transport = transport.name(), "registering transport");
        self.transports.write().register(transport);
    }

    pub fn get_transport(&self, name: &str) -> Option<Arc<dyn VfsTransport>> {
        self.transports.read().get(name)
    }

    // ========================================================================
    // Construction
    // ========================================================================

    /// Build a mountpoint without registering it.
    ///
    /// The transport's `defaults` hook runs first and may rewrite the
    /// parameters. An unknown transport still yields a mountpoint whose
    /// every request fails with [`VfsError::InvalidTransport`].
    pub fn create(&self, mut params: MountpointParams) -> Arc<Mountpoint> {
        let transport = self.transports.read().get(&params.transport);
        if let Some(transport) = &transport {
            transport.defaults(&mut params);
        }
        Arc::new(Mountpoint::new(
            params,
            transport,
            Arc::downgrade(&self.registry),
        ))
    }

    /// Register a mountpoint built by a backend at load time.
    ///
    /// Queued until [`init`](Self::init) if the manager is not initialized
    /// yet. `emit` publishes `vfs.mount` once the mountpoint is registered.
    #[tracing::instrument(skip(self, params), fields(name = %params.name))]
    pub fn register_builtin(
        &self,
        params: MountpointParams,
        emit: bool,
    ) -> VfsResult<Arc<Mountpoint>> {
        if self.registry.read().contains(&params.name) {
            return Err(VfsError::already_mounted(&params.name));
        }
        let mount = self.create(params);
        self.insert_or_queue(mount, emit)
    }

    fn insert_or_queue(&self, mount: Arc<Mountpoint>, emit: bool) -> VfsResult<Arc<Mountpoint>> {
        let name = mount.name().to_string();
        let inserted = {
            let mut registry = self.registry.write();
            if registry.contains(&name) {
                return Err(VfsError::already_mounted(name));
            }
            if registry.inited {
                registry.modules.insert(name.clone(), Arc::clone(&mount));
                true
            } else {
                registry.queue.push(Queued {
                    mount: Arc::clone(&mount),
                    emit,
                });
                false
            }
        };

        if inserted {
            info!(name = %name, "mountpoint registered");
            if emit {
                self.events.publish(MountFlow::mounted(&name));
            }
        } else {
            debug!(name = %name, "mountpoint queued until init");
        }
        Ok(mount)
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Initialize the registry: flush queued registrations, then register
    /// every enabled configured mountpoint.
    ///
    /// Idempotent. All entries are validated first; on error nothing is
    /// registered and the queue is kept.
    #[tracing::instrument(skip(self))]
    pub fn init(&self) -> VfsResult<()> {
        if self.registry.read().inited {
            return Ok(());
        }

        let mut configured = Vec::with_capacity(self.config.mountpoints.len());
        for (name, entry) in &self.config.mountpoints {
            if !entry.enabled {
                debug!(name = %name, "skipping disabled mountpoint");
                continue;
            }
            validate_name(name)?;
            configured.push(self.create(configured_params(name, entry)));
        }

        let mut announce = Vec::new();
        {
            let mut registry = self.registry.write();
            if registry.inited {
                return Ok(());
            }

            let mut seen: HashSet<&str> = registry.modules.keys().map(String::as_str).collect();
            seen.extend(registry.queue.iter().map(|q| q.mount.name()));
            for mount in &configured {
                if !seen.insert(mount.name()) {
                    return Err(VfsError::already_mounted(mount.name()));
                }
            }

            let queued = std::mem::take(&mut registry.queue);
            for Queued { mount, emit } in queued {
                if emit {
                    announce.push(mount.name().to_string());
                }
                registry.modules.insert(mount.name().to_string(), mount);
            }
            for mount in configured {
                registry.modules.insert(mount.name().to_string(), mount);
            }
            registry.inited = true;

            info!(count = registry.modules.len(), "mount registry initialized");
        }

        for name in announce {
            self.events.publish(MountFlow::mounted(name));
        }
        Ok(())
    }

    /// Mount a backend at runtime.
    ///
    /// The scheme is the name with whitespace replaced by `-`, lowercased.
    #[tracing::instrument(
        skip(self, mount),
        fields(name = %mount.name, transport = %mount.transport)
    )]
    pub fn add(&self, mount: NewMount) -> VfsResult<Arc<Mountpoint>> {
        if self.registry.read().contains(&mount.name) {
            return Err(VfsError::already_mounted(&mount.name));
        }

        let transport = if mount.transport.eq_ignore_ascii_case(OWNDRIVE) {
            WEBDAV.to_string()
        } else {
            mount.transport
        };

        if !self.transports.read().contains(&transport) {
            return Err(VfsError::invalid_config(format!(
                "No such transport '{transport}'"
            )));
        }

        if transport == WEBDAV
            && mount
                .options
                .username
                .as_deref()
                .is_none_or(str::is_empty)
        {
            return Err(VfsError::invalid_config(
                "Connection requires username (authorization)",
            ));
        }

        let scheme = sanitize_scheme(&mount.name);
        let hooks = Arc::new(DynamicHooks::new(&mount.name, Arc::clone(&self.events)));
        let mut params = MountpointParams::new(mount.name, transport)
            .with_scheme(&scheme)
            .with_options(mount.options)
            .with_read_only(mount.read_only)
            .with_internal(false)
            .with_hooks(hooks);
        params.description = mount.description;
        params.icon = mount.icon;
        params.visible = mount.visible;
        params.searchable = mount.searchable;
        params.dynamic = true;

        let mount = self.create(params);
        self.insert_or_queue(mount, true)
    }

    /// Add several mounts, stopping at the first error.
    pub fn add_list(
        &self,
        mounts: impl IntoIterator<Item = NewMount>,
    ) -> VfsResult<Vec<Arc<Mountpoint>>> {
        mounts.into_iter().map(|m| self.add(m)).collect()
    }

    /// Re-add saved mounts, skipping the ones that fail. Returns how many
    /// were mounted.
    pub fn restore(&self, saved: impl IntoIterator<Item = NewMount>) -> usize {
        let mut restored = 0;
        for mount in saved {
            let name = mount.name.clone();
            match self.add(mount) {
                Ok(_) => restored += 1,
                Err(e) => warn!(name = %name, error = %e, "failed to restore mount"),
            }
        }
        restored
    }

    /// Unmount and unregister a mountpoint.
    ///
    /// Fails synchronously with [`VfsError::NotMounted`] for unknown names.
    /// The returned future calls `unmount`, drops the registry entry
    /// whatever the outcome, and yields the unmount result.
    pub fn remove(&self, name: &str) -> VfsResult<BoxFuture<'static, VfsResult<bool>>> {
        let mount = self
            .registry
            .read()
            .modules
            .get(name)
            .cloned()
            .ok_or_else(|| VfsError::not_mounted(name))?;

        let registry = Arc::clone(&self.registry);
        let name = name.to_string();
        Ok(async move {
            let result = mount.unmount().await;
            {
                let mut registry = registry.write();
                if registry
                    .modules
                    .get(&name)
                    .is_some_and(|m| Arc::ptr_eq(m, &mount))
                {
                    registry.modules.shift_remove(&name);
                }
            }
            match &result {
                Ok(_) => info!(name = %name, "mountpoint removed"),
                Err(e) => warn!(name = %name, error = %e, "unmount failed, mountpoint removed"),
            }
            result
        }
        .boxed())
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    /// Name of the mountpoint owning `path`.
    ///
    /// On a miss returns [`DEFAULT_MODULE`] if `default_on_miss`, even when
    /// no such mountpoint is registered.
    pub fn get_module_from_path(&self, path: &str, default_on_miss: bool) -> Option<String> {
        match self.registry.read().resolve(path) {
            Some(m) => Some(m.name().to_string()),
            None if default_on_miss => Some(DEFAULT_MODULE.to_string()),
            None => None,
        }
    }

    /// Mountpoint owning `path`, falling back to the default mountpoint if
    /// `default_on_miss`.
    pub fn get_module_object_from_path(
        &self,
        path: &str,
        default_on_miss: bool,
    ) -> Option<Arc<Mountpoint>> {
        let registry = self.registry.read();
        match registry.resolve(path) {
            Some(m) => Some(Arc::clone(m)),
            None if default_on_miss => registry.modules.get(DEFAULT_MODULE).cloned(),
            None => None,
        }
    }

    /// Root of the mountpoint owning `path`.
    pub fn get_root_from_path(&self, path: &str) -> Option<String> {
        self.registry
            .read()
            .resolve(path)
            .map(|m| m.root().to_string())
    }

    /// Whether an internal mountpoint matches `path`. Enabled state is not
    /// consulted.
    pub fn is_internal(&self, path: &str) -> bool {
        self.registry
            .read()
            .modules
            .values()
            .any(|m| m.is_internal() && m.matches(path))
    }

    /// Whether the built-in module `name` is enabled in configuration.
    pub fn is_internal_enabled(&self, name: &str) -> bool {
        self.config.is_internal_enabled(name)
    }

    /// Enabled mountpoints in registration order.
    pub fn get_modules(&self, filter: ModuleFilter) -> Vec<ModuleEntry> {
        self.registry
            .read()
            .modules
            .iter()
            .filter(|(_, m)| m.enabled())
            .filter(|(_, m)| filter.special || !m.is_special())
            .filter(|(_, m)| !filter.visible || m.is_visible())
            .map(|(name, m)| ModuleEntry {
                name: name.clone(),
                module: Arc::clone(m),
            })
            .collect()
    }

    pub fn get_module(&self, name: &str) -> Option<Arc<Mountpoint>> {
        self.registry.read().modules.get(name).cloned()
    }

    /// One property of a mountpoint, given by name or as the mountpoint
    /// itself. See [`Mountpoint::property`].
    pub fn get_module_property<'a>(
        &self,
        module: impl Into<ModuleRef<'a>>,
        property: &str,
    ) -> Option<Value> {
        match module.into() {
            ModuleRef::Name(name) => self.get_module(name)?.property(property),
            ModuleRef::Module(module) => module.property(property),
        }
    }

    // ========================================================================
    // Dispatch
    // ========================================================================

    /// Route a request to the mountpoint owning its primary path.
    #[tracing::instrument(skip(self, request, options), fields(op = %request.operation()))]
    pub async fn request(
        &self,
        request: VfsRequest,
        options: &RequestOptions,
    ) -> VfsResult<VfsResponse> {
        let path = request.primary_path();
        let mount = self
            .get_module_object_from_path(path, true)
            .ok_or_else(|| VfsError::no_mount_point(path))?;

        if !mount.mounted() {
            return Err(VfsError::not_mounted(mount.name()));
        }

        mount.request(request, options).await
    }
}

fn validate_name(name: &str) -> VfsResult<()> {
    if name.is_empty() {
        return Err(VfsError::invalid_config("mountpoint name is empty"));
    }
    if name.contains(':') || name.contains('/') {
        return Err(VfsError::invalid_config(format!(
            "invalid mountpoint name '{name}'"
        )));
    }
    Ok(())
}

fn configured_params(name: &str, entry: &MountpointConfig) -> MountpointParams {
    let mut params = MountpointParams::new(name, entry.transport.as_str())
        .with_internal(true)
        .with_read_only(entry.read_only)
        .with_options(entry.options.clone());
    if let Some(description) = &entry.description {
        params.description = description.clone();
    }
    if let Some(icon) = &entry.icon {
        params.icon = icon.clone();
    }
    params.visible = entry.visible;
    params
}
