//! Configuration loading.
//!
//! Every field has a default, so a missing file is not an error. Values are
//! read from TOML, then the `PHARMACY_*` environment overrides are applied,
//! then the result is validated.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::import::MAX_UPLOAD_BYTES;
use crate::session::DEFAULT_SESSION_TTL_SECS;
use crate::sync::DEFAULT_SYNC_INTERVAL_SECS;

pub const CONFIG_PATH_ENV: &str = "PHARMACY_CONFIG";
pub const STORE_URL_ENV: &str = "PHARMACY_STORE_URL";
pub const STORE_KEY_ENV: &str = "PHARMACY_STORE_KEY";
pub const ADMIN_PASSWORD_ENV: &str = "PHARMACY_ADMIN_PASSWORD";

/// Longest accepted staleness interval (one day).
pub const MAX_SYNC_INTERVAL_SECS: u64 = 24 * 60 * 60;
/// Longest accepted admin session (one year).
pub const MAX_SESSION_TTL_SECS: u64 = 365 * 24 * 60 * 60;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PharmacyConfig {
    /// Base URL of the PostgREST endpoint, e.g. `https://<project>.supabase.co`
    pub store_url: Option<String>,
    /// API key sent as `apikey` and bearer token
    pub store_api_key: Option<String>,
    pub table: String,
    pub request_timeout_ms: u64,
    /// SQLite file holding the offline snapshot and admin session
    pub cache_path: PathBuf,
    pub admin_password: String,
    pub sync_interval_secs: u64,
    pub session_ttl_secs: u64,
    pub max_import_bytes: usize,
}

impl Default for PharmacyConfig {
    fn default() -> Self {
        Self {
            store_url: None,
            store_api_key: None,
            table: "medicines".to_string(),
            request_timeout_ms: 10_000,
            cache_path: PathBuf::from("pharmacy-cache.sqlite3"),
            admin_password: "admin".to_string(),
            sync_interval_secs: DEFAULT_SYNC_INTERVAL_SECS as u64,
            session_ttl_secs: DEFAULT_SESSION_TTL_SECS as u64,
            max_import_bytes: MAX_UPLOAD_BYTES,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid config value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

impl PharmacyConfig {
    /// Load from `path`, else `PHARMACY_CONFIG`, else defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path.map(Path::to_path_buf).or_else(config_path_from_env);
        let mut config = match path {
            Some(path) => Self::from_path(&path)?,
            None => Self::default(),
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    /// Apply overrides from any lookup. Empty values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        if let Some(url) = lookup(STORE_URL_ENV) {
            self.store_url = Some(url);
        }
        if let Some(key) = lookup(STORE_KEY_ENV) {
            self.store_api_key = Some(key);
        }
        if let Some(password) = lookup(ADMIN_PASSWORD_ENV) {
            self.admin_password = password;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(url) = &self.store_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::InvalidValue {
                    field: "store_url",
                    reason: "must start with http:// or https://".to_string(),
                });
            }
        }
        if self.table.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "table",
                reason: "must not be empty".to_string(),
            });
        }
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "request_timeout_ms",
                reason: "must be > 0".to_string(),
            });
        }
        if self.cache_path.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "cache_path",
                reason: "must not be empty".to_string(),
            });
        }
        if self.admin_password.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "admin_password",
                reason: "must not be empty".to_string(),
            });
        }
        check_range("sync_interval_secs", self.sync_interval_secs, MAX_SYNC_INTERVAL_SECS)?;
        check_range("session_ttl_secs", self.session_ttl_secs, MAX_SESSION_TTL_SECS)?;
        if self.max_import_bytes == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_import_bytes",
                reason: "must be > 0".to_string(),
            });
        }
        Ok(())
    }

    /// The store URL, required to talk to the remote table.
    pub fn require_store_url(&self) -> Result<&str, ConfigError> {
        self.store_url
            .as_deref()
            .ok_or_else(|| ConfigError::InvalidValue {
                field: "store_url",
                reason: format!("must be set (or {})", STORE_URL_ENV),
            })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync_interval_secs)
    }

    pub fn session_ttl(&self) -> chrono::Duration {
        chrono_seconds(self.session_ttl_secs)
    }

    pub fn staleness_interval(&self) -> chrono::Duration {
        chrono_seconds(self.sync_interval_secs)
    }
}

fn check_range(field: &'static str, value: u64, max: u64) -> Result<(), ConfigError> {
    if value == 0 || value > max {
        return Err(ConfigError::InvalidValue {
            field,
            reason: format!("must be between 1 and {}", max),
        });
    }
    Ok(())
}

fn chrono_seconds(secs: u64) -> chrono::Duration {
    let secs = i64::try_from(secs).unwrap_or(i64::MAX).min(i64::MAX / 1000);
    chrono::Duration::seconds(secs)
}

fn config_path_from_env() -> Option<PathBuf> {
    std::env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from)
}
