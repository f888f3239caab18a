//! Virtual filesystem routing.
//!
//! Virtual paths look like `home:///docs/a.txt`; the scheme before `://`
//! picks the mountpoint, the mountpoint's transport does the work.
//! Key components:
//!
//! - [`MountManager`] - Registry of mountpoints, routes requests by scheme
//! - [`Mountpoint`] - One registered backend plus its read-only policy
//! - [`VfsTransport`] - Core trait for backend verbs
//! - [`LocalStorageTransport`] - Browser-storage style key/value backend
//! - [`LocalTransport`] - Server-side directory backend (`Internal`)
//! - [`WebTransport`] - Read-only `http(s)://` URLs
//!
//! ## Design Decisions
//!
//! - **First registered wins**: the registry keeps insertion order and
//!   resolution returns the first enabled match.
//! - **Policy before transport**: read-only and missing-transport checks
//!   run before any backend code is reached.
//! - **Snapshots, not live records**: transports only ever see an immutable
//!   [`MountpointSnapshot`].

pub mod backends;
mod error;
mod mount;
mod mountpoint;
mod ops;
pub mod path;
mod transport;
mod types;

pub use backends::{LocalStorageTransport, LocalTransport, WebTransport};
pub use error::{VfsError, VfsResult};
pub use mount::{
    DEFAULT_MODULE, ModuleEntry, ModuleFilter, ModuleRef, MountManager, NewMount, WEBDAV,
};
pub use mountpoint::{
    DynamicHooks, MountHooks, Mountpoint, MountpointParams, MountpointSnapshot, StaticHooks,
};
pub use ops::{Operation, VfsRequest, VfsResponse};
pub use path::PathMatcher;
pub use transport::{TransportRegistry, VfsTransport};
pub use types::{ConnectionOptions, FileMetadata, FileType, FreeSpace, RequestOptions};
