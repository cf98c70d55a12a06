//! Client configuration
//!
//! Resolution order, later sources winning: compiled defaults, the
//! `config.toml` file in the platform config directory, then `PARLEY_*`
//! environment variables. Callers (the CLI) apply their own flags last.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub const ENV_BASE_URL: &str = "PARLEY_API_URL";
pub const ENV_TIMEOUT: &str = "PARLEY_TIMEOUT";
pub const ENV_SESSION_PATH: &str = "PARLEY_SESSION_PATH";

const CONFIG_FILE: &str = "config.toml";
const SESSION_FILE: &str = "session.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Unable to determine config directory")]
    NoConfigDir,

    #[error("Failed to read config file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid timeout '{value}'")]
    InvalidTimeout {
        value: String,
        #[source]
        source: humantime::DurationError,
    },

    #[error("Failed to serialize config")]
    Serialize(#[from] toml::ser::Error),

    #[error("Failed to write config file {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Resolved settings for [`ApiClient`](crate::infra::ApiClient) and the
/// file-backed session store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// API origin including any path prefix, e.g. `https://host/api`
    pub base_url: String,
    /// Per-request timeout applied by the HTTP client
    pub timeout: Duration,
    /// Location of the persisted session document
    pub session_path: PathBuf,
}

/// On-disk shape: every key optional so a partial file only overrides what
/// it names.
#[derive(Debug, Default, Serialize, Deserialize)]
struct ConfigFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    timeout: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    session_path: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        let session_path = match project_dirs() {
            Some(dirs) => dirs.data_dir().join(SESSION_FILE),
            None => {
                log::warn!(
                    "[Config] No platform data directory; storing session in ./.parley"
                );
                PathBuf::from(".parley").join(SESSION_FILE)
            }
        };

        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            session_path,
        }
    }
}

impl ClientConfig {
    /// Defaults, then the platform config file, then the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_config_path();
        let mut config = match path.as_deref() {
            Some(path) => Self::load_from(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Defaults overridden by `path` when it exists.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if !path.exists() {
            log::debug!("[Config] No config file at {:?}", path);
            return Ok(config);
        }

        let content =
            std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        let file: ConfigFile =
            toml::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        if let Some(base_url) = file.base_url {
            config.base_url = base_url;
        }
        if let Some(timeout) = file.timeout {
            config.timeout = parse_timeout(&timeout)?;
        }
        if let Some(session_path) = file.session_path {
            config.session_path = session_path;
        }

        log::debug!("[Config] Loaded config file {:?}", path);
        Ok(config)
    }

    /// Override from environment variables looked up through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        if let Some(base_url) = non_empty(ENV_BASE_URL) {
            self.base_url = base_url;
        }
        if let Some(timeout) = non_empty(ENV_TIMEOUT) {
            self.timeout = parse_timeout(&timeout)?;
        }
        if let Some(session_path) = non_empty(ENV_SESSION_PATH) {
            self.session_path = PathBuf::from(session_path);
        }
        Ok(())
    }

    /// Write this config as TOML to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let file = ConfigFile {
            base_url: Some(self.base_url.clone()),
            timeout: Some(humantime::format_duration(self.timeout).to_string()),
            session_path: Some(self.session_path.clone()),
        };
        let content = toml::to_string_pretty(&file)?;

        let write_err = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }
        std::fs::write(path, content).map_err(write_err)
    }

    /// Write to the platform config file.
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::default_config_path().ok_or(ConfigError::NoConfigDir)?;
        self.save_to(&path)
    }

    pub fn default_config_path() -> Option<PathBuf> {
        project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE))
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "parley", "parley")
}

fn parse_timeout(value: &str) -> Result<Duration, ConfigError> {
    humantime::parse_duration(value).map_err(|source| {
        ConfigError::InvalidTimeout {
            value: value.to_string(),
            source,
        }
    })
}
