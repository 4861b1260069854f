//! On-disk persistence of port profiles.

use crate::domain::error::{ComTermError, ComTermResult};
use crate::domain::profile::PortProfile;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Save/load capability for the profile collection.
///
/// The core only calls these two operations; the encoding is an
/// implementation detail of the store.
pub trait SettingsStore: Send + Sync {
    fn load(&self) -> ComTermResult<Vec<PortProfile>>;
    fn save(&self, profiles: &[PortProfile]) -> ComTermResult<()>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct SettingsFile {
    #[serde(default)]
    profiles: Vec<PortProfile>,
}

/// TOML settings store under the user configuration directory.
pub struct TomlSettings {
    path: PathBuf,
}

impl TomlSettings {
    pub fn new() -> ComTermResult<Self> {
        let home = dirs::home_dir().ok_or_else(|| {
            ComTermError::settings("could not determine home directory")
        })?;
        Ok(Self {
            path: home.join(".config").join("comterm").join("profiles.toml"),
        })
    }

    pub fn at_path(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

impl SettingsStore for TomlSettings {
    fn load(&self) -> ComTermResult<Vec<PortProfile>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&self.path).map_err(|e| {
            ComTermError::settings(format!("failed to read {}: {}", self.path.display(), e))
        })?;
        let file: SettingsFile = toml::from_str(&content).map_err(|e| {
            ComTermError::settings(format!("failed to parse {}: {}", self.path.display(), e))
        })?;
        Ok(file.profiles)
    }

    fn save(&self, profiles: &[PortProfile]) -> ComTermResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                ComTermError::settings(format!("failed to create settings directory: {}", e))
            })?;
        }
        let file = SettingsFile {
            profiles: profiles.to_vec(),
        };
        let content = toml::to_string_pretty(&file).map_err(|e| {
            ComTermError::settings(format!("failed to serialize profiles: {}", e))
        })?;
        fs::write(&self.path, content).map_err(|e| {
            ComTermError::settings(format!("failed to write {}: {}", self.path.display(), e))
        })
    }
}
