//! # osjs-vfs
//!
//! Mount manager and VFS routing layer for the OS.js web desktop.
//!
//! Applications address files by virtual path (`home:///docs/a.txt`). The
//! [`MountManager`] owns a registry of mountpoints, each backed by a
//! transport (server directory, browser storage, WebDAV, ...), and forwards
//! every request to the mountpoint owning the path's scheme while enforcing
//! read-only policy.

pub mod config;
pub mod flows;
pub mod settings;
pub mod vfs;

pub use config::{ConfigError, MountpointConfig, VfsConfig};
pub use flows::{
    FlowBus, FlowMessage, HasSubject, MountFlow, SharedMountFlowBus, Subscription,
    matches_pattern, shared_mount_flow_bus,
};
pub use settings::SavedMounts;
pub use vfs::{
    ConnectionOptions, FileMetadata, FileType, FreeSpace, ModuleEntry, ModuleFilter, ModuleRef,
    MountManager, Mountpoint, MountpointParams, MountpointSnapshot, NewMount, Operation,
    RequestOptions, TransportRegistry, VfsError, VfsRequest, VfsResponse, VfsResult,
    VfsTransport,
};
