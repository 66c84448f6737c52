//! Configuration loading and management.

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::core::Result;

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Project identity.
    pub project: ProjectConfig,
    /// History mining configuration.
    pub history: HistoryConfig,
    /// Lifecycle estimator configuration.
    pub lifecycle: LifecycleConfig,
    /// Issue tracker configuration.
    pub tracker: TrackerConfig,
    /// Dataset emission configuration.
    pub dataset: DatasetConfig,
}

impl Config {
    /// Load configuration from an explicit file path.
    ///
    /// Errors if the file does not exist. Use this for explicit `--config`
    /// flags. Env vars with `AUGUR_` prefix override file values.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(crate::core::Error::Config(format!(
                "config file not found: {}",
                path.display()
            )));
        }
        let config: Self = Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file_exact(path))
            .merge(Env::prefixed("AUGUR_").split("__"))
            .extract()
            .map_err(|e| crate::core::Error::Config(e.to_string()))?;
        Ok(config)
    }

    /// Load configuration from a directory, looking for augur.toml or
    /// .augur/augur.toml.
    ///
    /// Missing files are silently skipped (defaults are used). Env vars with
    /// `AUGUR_` prefix override file/default values.
    pub fn load_default(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let config: Self = Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(dir.join("augur.toml")))
            .merge(Toml::file(dir.join(".augur/augur.toml")))
            .merge(Env::prefixed("AUGUR_").split("__"))
            .extract()
            .map_err(|e| crate::core::Error::Config(e.to_string()))?;
        Ok(config)
    }
}

/// Project identity.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Project name stamped into every dataset row. Empty means "use the
    /// repository directory name".
    pub name: String,
}

/// History mining configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Source file extension to mine, e.g. `.java`.
    pub extension: String,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            extension: ".java".to_string(),
        }
    }
}

/// Lifecycle estimator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// Minimum ground-truth samples before the observed median is trusted.
    pub cold_start_threshold: usize,
    /// Proportion assumed below the threshold.
    pub fallback_proportion: f64,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            cold_start_threshold: crate::lifecycle::COLD_START_THRESHOLD,
            fallback_proportion: crate::lifecycle::FALLBACK_PROPORTION,
        }
    }
}

/// Issue tracker configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Jira base URL.
    pub jira_url: String,
    /// Tracker project key, e.g. `BOOKKEEPER`. Empty disables the tracker.
    pub project_key: String,
    /// Local JSON ticket file. When set it replaces the Jira client.
    pub tickets_file: Option<String>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            jira_url: "https://issues.apache.org/jira".to_string(),
            project_key: String::new(),
            tickets_file: None,
        }
    }
}

/// Dataset emission configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    /// Fraction of the release history emitted, oldest first.
    pub release_fraction: f64,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            release_fraction: crate::dataset::DEFAULT_RELEASE_FRACTION,
        }
    }
}
