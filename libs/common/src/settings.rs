//! Dashboard settings
//!
//! Settings are merged from an optional configuration file, then from
//! environment variables prefixed with `DASHBOARD` (nested keys separated by
//! `__`, e.g. `DASHBOARD__API__BASE_URL`), with built-in defaults for
//! anything left unset.

use std::time::Duration;

use serde::Deserialize;
use tracing::info;

use crate::error::{SettingsError, SettingsResult};

/// Environment variable naming the configuration file (default: `dashboard`)
pub const CONFIG_PATH_VAR: &str = "DASHBOARD_CONFIG";

/// Prefix of the environment variables overriding settings
pub const ENV_PREFIX: &str = "DASHBOARD";

/// Application settings
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Backend API settings
    pub api: ApiSettings,
    /// Persisted session storage settings
    pub storage: StorageSettings,
    /// Dashboard polling settings
    pub polling: PollingSettings,
    /// Session keep-alive settings
    pub session: SessionSettings,
    /// Log settings
    pub log: LogSettings,
}

impl Settings {
    /// Load settings from the file named by `DASHBOARD_CONFIG` and the environment
    pub fn from_env() -> SettingsResult<Self> {
        let path = std::env::var(CONFIG_PATH_VAR).unwrap_or_else(|_| "dashboard".to_string());
        Self::load(&path)
    }

    /// Load settings from `path` (optional, any format the extension names)
    /// merged with the environment
    pub fn load(path: &str) -> SettingsResult<Self> {
        let settings: Settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        info!("Settings loaded (backend: {})", settings.api.base_url);
        Ok(settings)
    }

    fn validate(&self) -> SettingsResult<()> {
        let base_url = self.api.base_url.trim();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(SettingsError::Invalid {
                key: "api.base_url",
                reason: format!("`{}` is not an http(s) URL", self.api.base_url),
            });
        }

        if self.api.request_timeout_secs == 0 {
            return Err(SettingsError::Invalid {
                key: "api.request_timeout_secs",
                reason: "must be greater than zero".to_string(),
            });
        }

        if self.polling.interval_secs == 0 {
            return Err(SettingsError::Invalid {
                key: "polling.interval_secs",
                reason: "must be greater than zero".to_string(),
            });
        }

        Ok(())
    }
}

/// Backend API settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    /// Base URL every endpoint path is appended to
    pub base_url: String,
    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/api/v1".to_string(),
            request_timeout_secs: 10,
        }
    }
}

impl ApiSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Absolute URL of an endpoint path such as `/auth/login`
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

/// Persisted session storage settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// File holding the persisted session entries
    pub path: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            path: ".dashboard/session.json".to_string(),
        }
    }
}

/// Dashboard polling settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PollingSettings {
    /// Seconds between two refreshes
    pub interval_secs: u64,
}

impl Default for PollingSettings {
    fn default() -> Self {
        Self { interval_secs: 30 }
    }
}

impl PollingSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

/// Session keep-alive settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Refresh the token once it expires within this many minutes
    pub refresh_threshold_minutes: i64,
    /// Seconds between two expiry checks
    pub keepalive_interval_secs: u64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            refresh_threshold_minutes: 5,
            keepalive_interval_secs: 60,
        }
    }
}

impl SessionSettings {
    pub fn keepalive_interval(&self) -> Duration {
        Duration::from_secs(self.keepalive_interval_secs.max(1))
    }
}

/// Log settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// Filter directive used when `RUST_LOG` is not set
    pub level: String,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}
