use crate::error::{CubikError, CubikResult};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Where the solve log and best averages are kept
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum, strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum StorageBackend {
    Json,
    Sqlite,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Minimum hold before a release starts the timer
    pub min_hold_ms: u64,
    /// How long a settled time stays on screen before returning to ready
    pub settle_ms: u64,
    /// Period of the live display refresh while running
    pub refresh_ms: u64,
    /// Event loop tick
    pub tick_rate_ms: u64,
    pub storage: StorageBackend,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            min_hold_ms: 100,
            settle_ms: 750,
            refresh_ms: 10,
            tick_rate_ms: 10,
            storage: StorageBackend::Json,
        }
    }
}

/// Command line values that take precedence over the config file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigOverrides {
    pub min_hold_ms: Option<u64>,
    pub settle_ms: Option<u64>,
    pub tick_rate_ms: Option<u64>,
    pub storage: Option<StorageBackend>,
}

impl Config {
    pub fn apply(&mut self, overrides: &ConfigOverrides) {
        if let Some(v) = overrides.min_hold_ms {
            self.min_hold_ms = v;
        }
        if let Some(v) = overrides.settle_ms {
            self.settle_ms = v;
        }
        if let Some(v) = overrides.tick_rate_ms {
            self.tick_rate_ms = v;
        }
        if let Some(v) = overrides.storage {
            self.storage = v;
        }
    }

    pub fn validate(&self) -> CubikResult<()> {
        if self.tick_rate_ms == 0 {
            return Err(CubikError::Config("tick_rate_ms must be positive".into()));
        }
        if self.refresh_ms == 0 {
            return Err(CubikError::Config("refresh_ms must be positive".into()));
        }
        Ok(())
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> CubikResult<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    pub fn new() -> Self {
        let path = if let Some(pd) = ProjectDirs::from("", "", "cubik") {
            pd.config_dir().join("config.json")
        } else {
            PathBuf::from("cubik_config.json")
        };
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Config {
        if let Ok(bytes) = fs::read(&self.path) {
            match serde_json::from_slice::<Config>(&bytes) {
                Ok(cfg) => return cfg,
                Err(e) => {
                    tracing::warn!(path = %self.path.display(), error = %e, "ignoring unreadable config")
                }
            }
        }
        Config::default()
    }

    fn save(&self, cfg: &Config) -> CubikResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg)?;
        fs::write(&self.path, data)?;
        Ok(())
    }
}
