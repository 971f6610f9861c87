//! Configuration loading.
//!
//! Every setting comes from an environment variable with a default. Parsing goes
//! through a lookup function so callers (and tests) can supply their own source.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::logbook::LogFormatKind;

pub const DATABASE_URL: &str = "ZOO_DATABASE_URL";
pub const LOG_FORMAT: &str = "ZOO_LOG_FORMAT";
pub const LOG_PATH: &str = "ZOO_LOG_PATH";
pub const NIGHT_INTERVAL_SECS: &str = "ZOO_NIGHT_INTERVAL_SECS";

pub const DEFAULT_NIGHT_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key}: invalid value '{value}': {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("no data directory available; set ZOO_DATABASE_URL")]
    NoDataDir,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ZooConfig {
    pub database_url: String,
    pub log_format: LogFormatKind,
    pub log_path: PathBuf,
    pub night_interval: Duration,
}

impl ZooConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let database_url = match get(DATABASE_URL) {
            Some(url) => url,
            None => default_database_url()?,
        };

        let log_format = match get(LOG_FORMAT) {
            Some(raw) => raw.parse().map_err(|reason| ConfigError::InvalidValue {
                key: LOG_FORMAT,
                value: raw.clone(),
                reason,
            })?,
            None => LogFormatKind::default(),
        };

        let log_path = get(LOG_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(format!("zoo-log.{}", log_format.extension())));

        let night_interval = match get(NIGHT_INTERVAL_SECS) {
            Some(raw) => parse_interval(&raw)?,
            None => DEFAULT_NIGHT_INTERVAL,
        };

        Ok(Self {
            database_url,
            log_format,
            log_path,
            night_interval,
        })
    }

    /// Filesystem path behind a `sqlite://` URL, if it names a file.
    pub fn database_path(&self) -> Option<PathBuf> {
        let rest = self
            .database_url
            .strip_prefix("sqlite://")
            .or_else(|| self.database_url.strip_prefix("sqlite:"))?;
        let path = rest.split('?').next().unwrap_or(rest);
        if path.is_empty() || path.starts_with(":memory:") {
            return None;
        }
        Some(PathBuf::from(path))
    }
}

fn default_database_url() -> Result<String, ConfigError> {
    let dir = dirs::data_dir().ok_or(ConfigError::NoDataDir)?;
    let path = dir.join("crazyzoo").join("zoo.db");
    Ok(format!("sqlite://{}", path.to_string_lossy()))
}

fn parse_interval(raw: &str) -> Result<Duration, ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidValue {
        key: NIGHT_INTERVAL_SECS,
        value: raw.to_string(),
        reason: reason.to_string(),
    };
    let secs: f64 = raw.parse().map_err(|_| invalid("not a number"))?;
    if !secs.is_finite() || secs <= 0.0 {
        return Err(invalid("must be a positive number of seconds"));
    }
    Duration::try_from_secs_f64(secs).map_err(|_| invalid("out of range"))
}
