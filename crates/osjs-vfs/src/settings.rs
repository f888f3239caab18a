//! User-saved mounts.
//!
//! Mounts a user added at runtime are persisted as JSON and re-added on the
//! next start through [`MountManager::restore`](crate::vfs::MountManager::restore).
//!
//! ```json
//! { "mounts": [ { "name": "Share", "transport": "WebDAV", "options": { ... } } ] }
//! ```

use std::io::ErrorKind;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ConfigError;
use crate::vfs::NewMount;

/// Saved runtime mounts, in the order they were added.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SavedMounts {
    #[serde(default)]
    pub mounts: Vec<NewMount>,
}

impl SavedMounts {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load from disk. A missing file is an empty list.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        match tokio::fs::read_to_string(path).await {
            Ok(text) => Self::from_json(&text),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "no saved mounts");
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Write to disk, creating parent directories as needed.
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, self.to_json()?).await?;
        Ok(())
    }

    /// Remember a mount, replacing an earlier one of the same name.
    pub fn insert(&mut self, mount: NewMount) {
        match self.mounts.iter_mut().find(|m| m.name == mount.name) {
            Some(existing) => *existing = mount,
            None => self.mounts.push(mount),
        }
    }

    /// Forget a mount. Returns true if it was saved.
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.mounts.len();
        self.mounts.retain(|m| m.name != name);
        self.mounts.len() != before
    }
}

impl IntoIterator for SavedMounts {
    type Item = NewMount;
    type IntoIter = std::vec::IntoIter<NewMount>;

    fn into_iter(self) -> Self::IntoIter {
        self.mounts.into_iter()
    }
}
