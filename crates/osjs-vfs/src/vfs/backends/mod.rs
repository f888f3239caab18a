//! Transports shipped with the crate.
//!
//! Backends implement [`VfsTransport`](crate::vfs::VfsTransport) for
//! different storage types.

pub mod local;
pub mod local_storage;
mod web;

pub use local::LocalTransport;
pub use local_storage::{KeyValueStore, LocalStorageTransport, MemoryStore};
pub use web::WebTransport;
