//! Configuration for the validator pipeline.
//!
//! A [`ValidatorConfig`] is passed to [`crate::Validator::new`] and scoped to
//! whoever constructed the validator. There is no process-wide rule table.
//! The same structure is embedded under the `validator` key of
//! `witness-config.yaml`.

use serde::{Deserialize, Serialize};

use witness_types::MeaningSource;

use crate::safety::MarkerCategory;

/// Errors that can occur when loading or compiling configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A configured marker pattern is not a valid regular expression.
    #[error("invalid marker pattern `{pattern}`: {source}")]
    InvalidPattern {
        /// The offending pattern.
        pattern: String,
        /// The underlying regex error.
        source: regex::Error,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level validator configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorConfig {
    /// Safety layer settings.
    #[serde(default)]
    pub safety: SafetyConfig,

    /// No-agency layer settings.
    #[serde(default)]
    pub provenance: ProvenanceConfig,

    /// Integrity layer settings.
    #[serde(default)]
    pub integrity: IntegrityConfig,

    /// Meaning overlay settings.
    #[serde(default)]
    pub meaning: MeaningConfig,
}

impl ValidatorConfig {
    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yml::from_str(yaml)?)
    }
}

/// A marker pattern added on top of the built-in set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerSpec {
    /// Category the marker reports under.
    pub category: MarkerCategory,
    /// Regular expression, matched case-insensitively.
    pub pattern: String,
}

/// Safety layer configuration.
///
/// The built-in prediction, prescription, destiny and agency markers are
/// always active. Configuration can only add to them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetyConfig {
    /// Whether evaluative wording is rejected in `facts`.
    #[serde(default = "default_true")]
    pub opinion_in_facts: bool,

    /// Deployment-specific markers.
    #[serde(default)]
    pub extra_markers: Vec<MarkerSpec>,
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            opinion_in_facts: true,
            extra_markers: Vec::new(),
        }
    }
}

/// No-agency layer configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvenanceConfig {
    /// Phrases that betray content copied out of a derived artifact.
    ///
    /// Matched case-insensitively as plain substrings.
    #[serde(default = "default_derived_markers")]
    pub derived_markers: Vec<String>,
}

impl Default for ProvenanceConfig {
    fn default() -> Self {
        Self {
            derived_markers: default_derived_markers(),
        }
    }
}

/// Integrity layer configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrityConfig {
    /// How far past the current time an incident date may lie, in seconds.
    ///
    /// Covers clock skew between recording systems. Anything later is a
    /// record of something that has not happened.
    #[serde(default = "default_future_tolerance_secs")]
    pub future_tolerance_secs: i64,
}

impl Default for IntegrityConfig {
    fn default() -> Self {
        Self {
            future_tolerance_secs: default_future_tolerance_secs(),
        }
    }
}

/// Meaning overlay configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeaningConfig {
    /// Sources accepted by this deployment.
    #[serde(default = "default_allowed_sources")]
    pub allowed_sources: Vec<MeaningSource>,
}

impl Default for MeaningConfig {
    fn default() -> Self {
        Self {
            allowed_sources: default_allowed_sources(),
        }
    }
}

impl MeaningConfig {
    /// Whether `source` is accepted.
    pub fn allows(&self, source: MeaningSource) -> bool {
        self.allowed_sources.contains(&source)
    }
}

// ---------------------------------------------------------------------------
// Default value functions
// ---------------------------------------------------------------------------

const fn default_true() -> bool {
    true
}

fn default_derived_markers() -> Vec<String> {
    [
        "not authoritative",
        "snapshot_id",
        "annotation_id",
        "generated from snapshot",
        "derived from snapshot",
        "according to the snapshot",
        "based on the snapshot",
        "per the identity view",
    ]
    .into_iter()
    .map(str::to_owned)
    .collect()
}

const fn default_future_tolerance_secs() -> i64 {
    300
}

fn default_allowed_sources() -> Vec<MeaningSource> {
    MeaningSource::DEFAULT_ALLOWED.to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_yaml_yields_defaults() {
        let config = ValidatorConfig::parse("{}").ok();
        assert_eq!(config, Some(ValidatorConfig::default()));
    }

    #[test]
    fn defaults_allow_four_sources() {
        let config = ValidatorConfig::default();
        assert!(config.meaning.allows(MeaningSource::Etymology));
        assert!(config.meaning.allows(MeaningSource::Narrative));
        assert!(!config.meaning.allows(MeaningSource::Technical));
    }

    #[test]
    fn yaml_overrides_sources_and_markers() {
        let yaml = r"
meaning:
  allowed_sources: [etymology, technical]
safety:
  extra_markers:
    - category: prediction
      pattern: '\bin due course\b'
";
        let config = ValidatorConfig::parse(yaml).unwrap_or_default();
        assert!(config.meaning.allows(MeaningSource::Technical));
        assert!(!config.meaning.allows(MeaningSource::Cultural));
        assert_eq!(config.safety.extra_markers.len(), 1);
        assert!(config.safety.opinion_in_facts);
    }

    #[test]
    fn invalid_yaml_is_an_error() {
        let result = ValidatorConfig::parse("meaning: [unclosed");
        assert!(matches!(result, Err(ConfigError::Yaml { .. })));
    }
}
