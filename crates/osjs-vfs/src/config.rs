//! VFS configuration.
//!
//! Loaded from TOML. Mountpoint order in the file is preserved; it decides
//! which mountpoint wins when two claim the same scheme.
//!
//! ```toml
//! [mountpoints.home]
//! description = "Home"
//! icon = "places/folder_home.png"
//!
//! [mountpoints.shared]
//! transport = "Internal"
//! read_only = true
//!
//! [internal.User]
//! enabled = true
//!
//! [local_storage]
//! enabled = true
//! ```

use std::collections::HashMap;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::vfs::ConnectionOptions;

/// Transport used when a configured mountpoint names none.
pub const DEFAULT_TRANSPORT: &str = "Internal";

/// Icon used when a configured mountpoint names none.
pub const DEFAULT_ICON: &str = "devices/harddrive.png";

/// Configuration loading error.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Top-level VFS configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VfsConfig {
    /// Statically configured mountpoints, keyed by name.
    pub mountpoints: IndexMap<String, MountpointConfig>,
    /// Toggles for built-in internal modules.
    pub internal: HashMap<String, InternalModuleConfig>,
    /// Browser-storage backend settings.
    pub local_storage: LocalStorageConfig,
}

impl VfsConfig {
    /// Parse from a TOML string.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Load from a TOML file.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = tokio::fs::read_to_string(path.as_ref()).await?;
        Self::from_toml_str(&text)
    }

    /// Whether the built-in module `name` is enabled. Defaults to true.
    pub fn is_internal_enabled(&self, name: &str) -> bool {
        self.internal.get(name).map(|m| m.enabled).unwrap_or(true)
    }
}

/// One configured mountpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MountpointConfig {
    /// Transport name.
    pub transport: String,
    /// Display description (defaults to the mountpoint name).
    pub description: Option<String>,
    /// Icon resource path.
    pub icon: Option<String>,
    /// Backend connection options.
    pub options: ConnectionOptions,
    pub read_only: bool,
    pub visible: bool,
    /// `false` excludes the entry at init.
    pub enabled: bool,
}

impl Default for MountpointConfig {
    fn default() -> Self {
        Self {
            transport: DEFAULT_TRANSPORT.to_string(),
            description: None,
            icon: None,
            options: ConnectionOptions::default(),
            read_only: false,
            visible: true,
            enabled: true,
        }
    }
}

/// Toggle for a built-in module.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InternalModuleConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// Settings for the LocalStorage backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalStorageConfig {
    pub enabled: bool,
    pub description: String,
    pub icon: String,
}

impl Default for LocalStorageConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            description: "LocalStorage".to_string(),
            icon: "apps/web-browser.png".to_string(),
        }
    }
}

fn default_true() -> bool {
    true
}
