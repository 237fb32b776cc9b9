//! Engine configuration loaded from `witness-config.yaml`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use witness_validator::{ConfigError, ValidatorConfig};

/// Default configuration file, relative to the working directory.
pub const CONFIG_FILE: &str = "witness-config.yaml";

/// Environment variable overriding [`EngineConfig::journal_path`].
pub const JOURNAL_ENV: &str = "WITNESS_JOURNAL";

/// Top-level engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// JSON-lines journal every accepted record is appended to.
    pub journal_path: PathBuf,
    /// Rule configuration handed to the validator.
    pub validator: ValidatorConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            journal_path: PathBuf::from("data/witness.jsonl"),
            validator: ValidatorConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Parse configuration from YAML text.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yml::from_str(yaml)?)
    }

    /// Load `path` if it exists, else defaults; then apply the environment.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut config = if path.exists() {
            Self::parse(&std::fs::read_to_string(path)?)?
        } else {
            info!(path = %path.display(), "Config file not found, using defaults");
            Self::default()
        };
        if let Some(journal) = std::env::var_os(JOURNAL_ENV) {
            config.journal_path = PathBuf::from(journal);
        }
        Ok(config)
    }
}
