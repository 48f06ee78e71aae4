//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (FADEBIN_*)
//! 2. TOML config file (if FADEBIN_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::expiry::Lifetime;
use crate::ratelimit::{ClassLimit, RateLimitConfig};
use crate::service::PublishPolicy;

mod validation;

pub use validation::ConfigError;

/// Environment variable naming an optional TOML config file.
pub const CONFIG_FILE_ENV: &str = "FADEBIN_CONFIG_FILE";

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (FADEBIN_*)
/// 2. TOML config file (if FADEBIN_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Socket address the HTTP server listens on.
    ///
    /// Set via FADEBIN_BIND_ADDR environment variable.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Public origin used to build entry URLs, without a trailing slash.
    ///
    /// Set via FADEBIN_BASE_URL environment variable.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Path to the SQLite database.
    ///
    /// Set via FADEBIN_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Largest accepted body in bytes.
    ///
    /// Set via FADEBIN_MAX_CONTENT_BYTES environment variable.
    #[serde(default = "default_max_content_bytes")]
    pub max_content_bytes: usize,

    /// Lifetime used when a publish names none, e.g. `3d`.
    ///
    /// Set via FADEBIN_DEFAULT_EXPIRY environment variable.
    #[serde(default = "default_expiry")]
    pub default_expiry: Lifetime,

    /// Shortest accepted lifetime.
    ///
    /// Set via FADEBIN_MIN_EXPIRY environment variable.
    #[serde(default = "default_min_expiry")]
    pub min_expiry: Lifetime,

    /// Longest accepted lifetime.
    ///
    /// Set via FADEBIN_MAX_EXPIRY environment variable.
    #[serde(default = "default_max_expiry")]
    pub max_expiry: Lifetime,

    /// Seconds between eviction passes.
    ///
    /// Set via FADEBIN_SWEEP_INTERVAL_SECS environment variable.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    /// Bound on a single store read or write, in milliseconds.
    ///
    /// Set via FADEBIN_STORE_TIMEOUT_MS environment variable.
    #[serde(default = "default_store_timeout_ms")]
    pub store_timeout_ms: u64,

    /// Bound on one eviction pass, in milliseconds.
    ///
    /// Set via FADEBIN_SWEEP_TIMEOUT_MS environment variable.
    #[serde(default = "default_sweep_timeout_ms")]
    pub sweep_timeout_ms: u64,

    /// Publishes admitted per client per window.
    ///
    /// Set via FADEBIN_WRITE_RATE_LIMIT environment variable.
    #[serde(default = "default_write_rate_limit")]
    pub write_rate_limit: u32,

    /// Reads admitted per client per window.
    ///
    /// Set via FADEBIN_READ_RATE_LIMIT environment variable.
    #[serde(default = "default_read_rate_limit")]
    pub read_rate_limit: u32,

    /// Rate-limit window length in seconds.
    ///
    /// Set via FADEBIN_RATE_LIMIT_WINDOW_SECS environment variable.
    #[serde(default = "default_rate_limit_window_secs")]
    pub rate_limit_window_secs: u64,

    /// Identifier allocation attempts per publish.
    ///
    /// Set via FADEBIN_MAX_PUBLISH_ATTEMPTS environment variable.
    #[serde(default = "default_max_publish_attempts")]
    pub max_publish_attempts: u32,

    /// Key clients by X-Forwarded-For / X-Real-IP instead of the peer address.
    /// Only enable behind a proxy that overwrites these headers.
    ///
    /// Set via FADEBIN_TRUST_PROXY_HEADERS environment variable.
    #[serde(default)]
    pub trust_proxy_headers: bool,

    /// Grace period for in-flight requests on shutdown, in seconds.
    ///
    /// Set via FADEBIN_SHUTDOWN_TIMEOUT_SECS environment variable.
    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,
}

fn default_bind_addr() -> String {
    "0.0.0.0:8080".into()
}

fn default_base_url() -> String {
    "http://localhost:8080".into()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./fadebin.sqlite")
}

fn default_max_content_bytes() -> usize {
    1_048_576 // 1MB
}

fn default_expiry() -> Lifetime {
    Lifetime::days(3)
}

fn default_min_expiry() -> Lifetime {
    Lifetime::minutes(10)
}

fn default_max_expiry() -> Lifetime {
    Lifetime::days(30)
}

fn default_sweep_interval_secs() -> u64 {
    300
}

fn default_store_timeout_ms() -> u64 {
    5_000
}

fn default_sweep_timeout_ms() -> u64 {
    30_000
}

fn default_write_rate_limit() -> u32 {
    30
}

fn default_read_rate_limit() -> u32 {
    300
}

fn default_rate_limit_window_secs() -> u64 {
    60
}

fn default_max_publish_attempts() -> u32 {
    3
}

fn default_shutdown_timeout_secs() -> u64 {
    30
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            base_url: default_base_url(),
            db_path: default_db_path(),
            max_content_bytes: default_max_content_bytes(),
            default_expiry: default_expiry(),
            min_expiry: default_min_expiry(),
            max_expiry: default_max_expiry(),
            sweep_interval_secs: default_sweep_interval_secs(),
            store_timeout_ms: default_store_timeout_ms(),
            sweep_timeout_ms: default_sweep_timeout_ms(),
            write_rate_limit: default_write_rate_limit(),
            read_rate_limit: default_read_rate_limit(),
            rate_limit_window_secs: default_rate_limit_window_secs(),
            max_publish_attempts: default_max_publish_attempts(),
            trust_proxy_headers: false,
            shutdown_timeout_secs: default_shutdown_timeout_secs(),
        }
    }
}

impl AppConfig {
    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `FADEBIN_`
    /// 2. TOML file from `FADEBIN_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var(CONFIG_FILE_ENV) {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("FADEBIN_")
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// Entry URL for `id` under the configured public origin.
    pub fn entry_url(&self, id: &str) -> String {
        format!("{}/{id}", self.base_url.trim_end_matches('/'))
    }

    pub fn publish_policy(&self) -> PublishPolicy {
        PublishPolicy {
            max_content_bytes: self.max_content_bytes,
            default_lifetime: self.default_expiry,
            min_lifetime: self.min_expiry,
            max_lifetime: self.max_expiry,
            max_attempts: self.max_publish_attempts,
        }
    }

    pub fn rate_limits(&self) -> RateLimitConfig {
        RateLimitConfig {
            write: ClassLimit { max_requests: self.write_rate_limit, window_secs: self.rate_limit_window_secs },
            read: ClassLimit { max_requests: self.read_rate_limit, window_secs: self.rate_limit_window_secs },
        }
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    pub fn sweep_timeout(&self) -> Duration {
        Duration::from_millis(self.sweep_timeout_ms)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}
