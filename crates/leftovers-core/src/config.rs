//! Runtime configuration from `LEFTOVERS_*` environment variables.

use std::path::PathBuf;

use thiserror::Error;

pub const ENV_REMOTE_URL: &str = "LEFTOVERS_REMOTE_URL";
pub const ENV_REMOTE_KEY: &str = "LEFTOVERS_REMOTE_KEY";
pub const ENV_DATA_PATH: &str = "LEFTOVERS_DATA_PATH";
pub const ENV_SEED_DEMO: &str = "LEFTOVERS_SEED_DEMO";
pub const ENV_ACCESS_SECRET: &str = "LEFTOVERS_ACCESS_SECRET";

/// Configuration errors.
#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("{set} is set but {missing} is not; remote mode needs both")]
    IncompleteRemote {
        set: &'static str,
        missing: &'static str,
    },

    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },
}

/// Remote service endpoint and key.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteConfig {
    pub url: String,
    pub api_key: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// `None` runs in local fallback mode.
    pub remote: Option<RemoteConfig>,
    /// SQLite file holding local snapshots
    pub data_path: PathBuf,
    /// Store the example leftovers when the local store is empty
    pub seed_demo_data: bool,
    /// Shared secret for the session gate; `None` leaves it open
    pub access_secret: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            remote: None,
            data_path: default_data_path(),
            seed_demo_data: true,
            access_secret: None,
        }
    }
}

/// `<data dir>/pharmacy-leftovers/leftovers.db`
pub fn default_data_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("pharmacy-leftovers")
        .join("leftovers.db")
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Resolve from an arbitrary variable source. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let remote = match (get(ENV_REMOTE_URL), get(ENV_REMOTE_KEY)) {
            (Some(url), Some(api_key)) => Some(RemoteConfig { url, api_key }),
            (None, None) => None,
            (Some(_), None) => {
                return Err(ConfigError::IncompleteRemote {
                    set: ENV_REMOTE_URL,
                    missing: ENV_REMOTE_KEY,
                })
            }
            (None, Some(_)) => {
                return Err(ConfigError::IncompleteRemote {
                    set: ENV_REMOTE_KEY,
                    missing: ENV_REMOTE_URL,
                })
            }
        };

        let seed_demo_data = match get(ENV_SEED_DEMO) {
            None => true,
            Some(v) => parse_flag(&v).ok_or(ConfigError::InvalidValue {
                name: ENV_SEED_DEMO,
                value: v,
            })?,
        };

        Ok(Self {
            remote,
            data_path: get(ENV_DATA_PATH)
                .map(PathBuf::from)
                .unwrap_or_else(default_data_path),
            seed_demo_data,
            access_secret: get(ENV_ACCESS_SECRET),
        })
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
