//! Server configuration loaded from RON

use idlecraft_core::{EngineConfig, NewUser};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Configuration error
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),

    #[error("Validation error: {0}")]
    Validation(String),
}

fn default_database_path() -> PathBuf {
    PathBuf::from("data/idlecraft.db")
}

fn default_catalog_path() -> PathBuf {
    PathBuf::from("content")
}

fn default_interval_secs() -> u64 {
    5
}

fn default_log_filter() -> String {
    "info,idlecraft_core=info,idlecraft_server=debug".to_string()
}

/// Everything the scheduler host needs at startup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
    /// A catalog file or a directory of `.ron` catalog files
    #[serde(default = "default_catalog_path")]
    pub catalog_path: PathBuf,
    #[serde(default = "default_interval_secs")]
    pub generation_interval_secs: u64,
    #[serde(default = "default_interval_secs")]
    pub crafting_interval_secs: u64,
    /// Used when `RUST_LOG` is unset
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
    /// Accounts registered at startup; existing ones are left alone
    #[serde(default)]
    pub seed_users: Vec<NewUser>,
    #[serde(default)]
    pub engine: EngineConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            catalog_path: default_catalog_path(),
            generation_interval_secs: default_interval_secs(),
            crafting_interval_secs: default_interval_secs(),
            log_filter: default_log_filter(),
            seed_users: Vec::new(),
            engine: EngineConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from a RON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Parse and validate configuration text
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: ServerConfig = ron::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.generation_interval_secs == 0 || self.crafting_interval_secs == 0 {
            return Err(ConfigError::Validation(
                "sweep intervals must be at least one second".to_string(),
            ));
        }
        if self.engine.xp_multiplier == 0 {
            return Err(ConfigError::Validation(
                "xp_multiplier must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn generation_interval(&self) -> Duration {
        Duration::from_secs(self.generation_interval_secs)
    }

    pub fn crafting_interval(&self) -> Duration {
        Duration::from_secs(self.crafting_interval_secs)
    }
}
