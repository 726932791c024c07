//! Experiment configuration (TOML).
//!
//! ```toml
//! seed = 42
//! fitness = "mean"
//!
//! [dataset]
//! path = "data/brasileirao.csv"   # or: selector = "brasileirao"
//!
//! [plan]
//! starting_year = 2003
//! backtest_years = 8
//!
//! [policy]
//! k_factor = 20.0
//! w_division = [0.0]
//!
//! [[leagues]]
//! name = "brasileirao"
//! bit = 0
//!
//! [cache]
//! path = "results/history.jsonl"
//!
//! [logging]
//! level = "info"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use ratelab_core::domain::{LeagueCatalog, LeagueSpec};
use ratelab_core::{BacktestPlan, EngineError, RatingPolicy};

use crate::fitness::FitnessReduction;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error("invalid config: {0}")]
    Engine(#[from] EngineError),
}

/// Where the matches come from. Exactly one of `path` / `selector`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatasetConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
    /// Directory selectors resolve against.
    #[serde(default = "default_data_root")]
    pub data_root: PathBuf,
}

fn default_data_root() -> PathBuf {
    PathBuf::from("data")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,
}

fn default_level() -> String {
    "info".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentConfig {
    #[serde(default)]
    pub seed: u64,
    pub dataset: DatasetConfig,
    #[serde(default)]
    pub plan: BacktestPlan,
    #[serde(default)]
    pub policy: RatingPolicy,
    /// League catalog override; empty means the default catalog.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub leagues: Vec<LeagueSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache: Option<CacheConfig>,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub fitness: FitnessReduction,
}

impl ExperimentConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Checks that need no data: dataset source, catalog, plan domain, and the
    /// policy's scalar fields (the division count is only known after loading).
    pub fn validate(&self) -> Result<(), ConfigError> {
        match (&self.dataset.path, &self.dataset.selector) {
            (Some(_), None) | (None, Some(_)) => {}
            (None, None) => {
                return Err(ConfigError::Invalid(
                    "[dataset] needs either `path` or `selector`".into(),
                ))
            }
            (Some(_), Some(_)) => {
                return Err(ConfigError::Invalid(
                    "[dataset] takes `path` or `selector`, not both".into(),
                ))
            }
        }
        let catalog = self.catalog()?;
        catalog.validate(self.plan.leagues_to_use)?;
        self.plan.validate()?;
        self.policy.validate(self.policy.w_division.len())?;
        Ok(())
    }

    pub fn catalog(&self) -> Result<LeagueCatalog, ConfigError> {
        if self.leagues.is_empty() {
            Ok(LeagueCatalog::default())
        } else {
            Ok(LeagueCatalog::new(self.leagues.clone())?)
        }
    }
}
