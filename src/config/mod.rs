use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::errors::StorageError;
use crate::ledger::contributor::validate_share_weight;
use crate::utils::{ensure_dir, write_atomic, PathResolver};

pub const DEFAULT_STORAGE_KEY: &str = "splitsies-people";
const DEFAULT_BACKUP_RETENTION: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub storage_key: String,
    pub backup_retention: usize,
    pub default_share_weight: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_filter: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_STORAGE_KEY.into(),
            backup_retention: DEFAULT_BACKUP_RETENTION,
            default_share_weight: 1,
            log_filter: None,
        }
    }
}

impl Config {
    /// Share weight for new contributors, clamped back to 1 if the stored value is out of range.
    pub fn share_weight(&self) -> u8 {
        match validate_share_weight(self.default_share_weight) {
            Ok(()) => self.default_share_weight,
            Err(_) => 1,
        }
    }
}

pub struct ConfigManager {
    base: PathBuf,
    path: PathBuf,
}

impl ConfigManager {
    pub fn new() -> Result<Self, StorageError> {
        Self::with_base_dir(PathResolver::base_dir())
    }

    pub fn with_base_dir(base: PathBuf) -> Result<Self, StorageError> {
        ensure_dir(&base)?;
        ensure_dir(&PathResolver::config_dir_in(&base))?;
        Ok(Self {
            path: PathResolver::config_file_in(&base),
            base,
        })
    }

    pub fn load(&self) -> Result<Config, StorageError> {
        if self.path.exists() {
            let data = fs::read_to_string(&self.path)?;
            Ok(serde_json::from_str(&data)?)
        } else {
            Ok(Config::default())
        }
    }

    pub fn save(&self, config: &Config) -> Result<(), StorageError> {
        let json = serde_json::to_string_pretty(config)?;
        write_atomic(&self.path, &json)?;
        Ok(())
    }

    pub fn base_dir(&self) -> &Path {
        &self.base
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
