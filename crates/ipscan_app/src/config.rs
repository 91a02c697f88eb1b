//! Application settings, read from a RON file.
//!
//! Every field is optional in the file; anything left out keeps its default.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use ipscan_core::{BatchLimits, LifecycleConfig};
use ipscan_engine::BackendSettings;
use ipscan_logging::scan_info;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "ipscan.ron";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cannot parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ron::error::SpannedError,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub base_url: String,
    pub poll_interval_ms: u64,
    /// Average analysis time per address, for the remaining-time estimate.
    pub unit_cost_ms: u64,
    pub soft_limit: usize,
    pub hard_limit: usize,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub output_dir: PathBuf,
    /// Where the persisted credential lives.
    pub state_dir: PathBuf,
    /// Remote key check route. `None` accepts any non-empty key locally.
    pub validate_path: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000".to_string(),
            poll_interval_ms: 2_000,
            unit_cost_ms: 1_200,
            soft_limit: 800,
            hard_limit: 1_000,
            connect_timeout_secs: 10,
            request_timeout_secs: 30,
            output_dir: PathBuf::from("output"),
            state_dir: PathBuf::from("."),
            validate_path: None,
        }
    }
}

impl AppConfig {
    /// Loads `path`, or `./ipscan.ron` when present, or the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => {
                let fallback = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !fallback.exists() {
                    return Ok(Self::default());
                }
                fallback
            }
        };
        let text = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        let config = Self::parse(&text, &path)?;
        scan_info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_ron(text: &str) -> Result<Self, ConfigError> {
        Self::parse(text, Path::new("<inline>"))
    }

    fn parse(text: &str, path: &Path) -> Result<Self, ConfigError> {
        let config: AppConfig = ron::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "poll_interval_ms must be positive".into(),
            ));
        }
        if self.soft_limit > self.hard_limit {
            return Err(ConfigError::Invalid(format!(
                "soft_limit {} exceeds hard_limit {}",
                self.soft_limit, self.hard_limit
            )));
        }
        Ok(())
    }

    pub fn lifecycle(&self) -> LifecycleConfig {
        LifecycleConfig {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            unit_cost: Duration::from_millis(self.unit_cost_ms),
            limits: BatchLimits {
                soft: self.soft_limit,
                hard: self.hard_limit,
            },
        }
    }

    pub fn backend(&self) -> BackendSettings {
        BackendSettings {
            base_url: self.base_url.clone(),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            validate_path: self.validate_path.clone(),
            ..BackendSettings::default()
        }
    }
}
