/// Runtime settings, loaded from TOML.
///
/// ```toml
/// [scheduler]
/// serialize_bookings = true
/// transition_policy = "forward"
///
/// [log]
/// filter = "clinic_scheduler=debug"
/// ```

use crate::models::AppointmentStatus;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable naming the settings file.
pub const CONFIG_ENV: &str = "CLINIC_SCHEDULER_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Which status changes `update_status` accepts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransitionPolicy {
    /// Any status may move to any other.
    #[default]
    Unrestricted,
    /// Cancelled and Completed are terminal.
    Forward,
}

impl TransitionPolicy {
    pub fn allows(&self, from: AppointmentStatus, to: AppointmentStatus) -> bool {
        match self {
            TransitionPolicy::Unrestricted => true,
            TransitionPolicy::Forward => from == to || !from.is_terminal(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Hold the scheduler's booking gate across check and write.
    pub serialize_bookings: bool,
    pub transition_policy: TransitionPolicy,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        SchedulerConfig {
            serialize_bookings: true,
            transition_policy: TransitionPolicy::Unrestricted,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `tracing_subscriber::EnvFilter` directive, used when `RUST_LOG` is unset.
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            filter: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub scheduler: SchedulerConfig,
    pub log: LogConfig,
}

impl Settings {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Load from the file named by `CLINIC_SCHEDULER_CONFIG`, or defaults
    /// when it is unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::load(PathBuf::from(path)),
            None => Ok(Self::default()),
        }
    }
}
