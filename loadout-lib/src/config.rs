//! Core configuration, stored as TOML in the XDG config directory.

use std::{
    fs, io,
    path::{Path, PathBuf},
    sync::Arc,
};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::fs::{config_dir, default_profiles_dir};

const CURRENT_CONFIG_VERSION: u16 = 1;
const FILE_NAME: &str = "loadout.toml";

/// Shared handle to the core configuration
pub type Cfg = Arc<RwLock<CoreConfig>>;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Failed to access configuration: {0}")]
    Io(#[from] io::Error),
    #[error("Failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    version: u16,
    /// Overrides the directory profiles are stored in
    profiles_dir: Option<PathBuf>,
    /// Keep a copy of a profile's file before rewriting it with a newer schema
    backup_on_upgrade: bool,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            version: CURRENT_CONFIG_VERSION,
            profiles_dir: None,
            backup_on_upgrade: true,
        }
    }
}

impl CoreConfig {
    /// Load the configuration from the default location, writing defaults if there is none.
    pub fn load() -> Result<Self> {
        Self::load_from(&config_dir()?.join(FILE_NAME))
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            let cfg = Self::default();
            cfg.save_to(path)?;
            return Ok(cfg);
        }

        let contents = fs::read_to_string(path)?;
        match toml::from_str(&contents) {
            Ok(cfg) => Ok(cfg),
            Err(err) => {
                warn!("Ignoring invalid configuration at {}: {err}", path.display());
                Ok(Self::default())
            }
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, contents)?;

        debug!("Saved configuration to {}", path.display());

        Ok(())
    }

    pub fn into_handle(self) -> Cfg {
        Arc::new(RwLock::new(self))
    }

    pub fn profiles_dir(&self) -> Result<PathBuf> {
        match &self.profiles_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(default_profiles_dir()?),
        }
    }

    pub fn set_profiles_dir(&mut self, dir: Option<PathBuf>) {
        self.profiles_dir = dir;
    }

    pub fn backup_on_upgrade(&self) -> bool {
        self.backup_on_upgrade
    }

    pub fn set_backup_on_upgrade(&mut self, backup: bool) {
        self.backup_on_upgrade = backup;
    }

    #[cfg(test)]
    /// Configuration that keeps everything inside `dir`.
    pub(crate) fn mock(dir: &Path) -> Self {
        Self {
            profiles_dir: Some(dir.to_path_buf()),
            ..Self::default()
        }
    }
}
