use crate::api::DEFAULT_GENERATE_PATH;
use std::path::PathBuf;
use std::time::Duration;

pub const ENV_API_URL: &str = "KNOWLEDGE_NAVIGATOR_API_URL";
pub const ENV_GENERATE_PATH: &str = "KNOWLEDGE_NAVIGATOR_GENERATE_PATH";
pub const ENV_DATA_DIR: &str = "KNOWLEDGE_NAVIGATOR_DATA_DIR";
pub const ENV_TIMEOUT_SECS: &str = "KNOWLEDGE_NAVIGATOR_TIMEOUT_SECS";

const DEFAULT_API_URL: &str = "http://localhost:8000";
const DEFAULT_DATA_DIR: &str = ".knowledge-navigator";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} must be a whole number of seconds, got '{value}'")]
    InvalidTimeout { var: &'static str, value: String },
}

/// Where the graph service lives and where local state is kept.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub api_url: String,
    pub generate_path: String,
    pub data_dir: PathBuf,
    /// Transport timeout. `None` leaves requests unbounded.
    pub timeout: Option<Duration>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            generate_path: DEFAULT_GENERATE_PATH.to_string(),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            timeout: None,
        }
    }
}

impl AppConfig {
    /// Load from the process environment (after `.env`, if present).
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let timeout = match non_empty(ENV_TIMEOUT_SECS) {
            Some(raw) => {
                let secs = raw.trim().parse::<u64>().map_err(|_| ConfigError::InvalidTimeout {
                    var: ENV_TIMEOUT_SECS,
                    value: raw.clone(),
                })?;
                Some(Duration::from_secs(secs))
            }
            None => None,
        };

        Ok(Self {
            api_url: non_empty(ENV_API_URL)
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.api_url),
            generate_path: non_empty(ENV_GENERATE_PATH).unwrap_or(defaults.generate_path),
            data_dir: non_empty(ENV_DATA_DIR)
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            timeout,
        })
    }
}
