//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use std::net::SocketAddr;

use crate::config::AppConfig;
use thiserror::Error;
use url::Url;

/// Upper bound on `max_content_bytes`.
const MAX_CONTENT_CEILING: usize = 50 * 1024 * 1024;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `bind_addr` is not a socket address
    /// - `base_url` is not an absolute http(s) URL
    /// - `max_content_bytes` is 0 or exceeds 50MB
    /// - `min_expiry` exceeds `max_expiry`, or `default_expiry` falls outside them
    /// - any interval, timeout, threshold or attempt count is 0
    ///
    /// Returns `ConfigError::Missing` if `db_path` is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bind_addr.parse::<SocketAddr>().is_err() {
            return Err(invalid("bind_addr", format!("{:?} is not a socket address", self.bind_addr)));
        }

        match Url::parse(&self.base_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => {}
            Ok(_) => return Err(invalid("base_url", "must be an http or https URL")),
            Err(e) => return Err(invalid("base_url", e.to_string())),
        }

        if self.db_path.as_os_str().is_empty() {
            return Err(ConfigError::Missing {
                field: "db_path".into(),
                hint: "Set FADEBIN_DB_PATH environment variable".into(),
            });
        }

        if self.max_content_bytes == 0 {
            return Err(invalid("max_content_bytes", "must be greater than 0"));
        }
        if self.max_content_bytes > MAX_CONTENT_CEILING {
            return Err(invalid("max_content_bytes", "must not exceed 50MB"));
        }

        if self.min_expiry > self.max_expiry {
            return Err(invalid(
                "min_expiry",
                format!("{} is greater than max_expiry {}", self.min_expiry, self.max_expiry),
            ));
        }
        if let Err(e) = self.default_expiry.check_bounds(self.min_expiry, self.max_expiry) {
            return Err(invalid("default_expiry", e.to_string()));
        }

        let positive = [
            ("sweep_interval_secs", self.sweep_interval_secs),
            ("store_timeout_ms", self.store_timeout_ms),
            ("sweep_timeout_ms", self.sweep_timeout_ms),
            ("rate_limit_window_secs", self.rate_limit_window_secs),
            ("write_rate_limit", u64::from(self.write_rate_limit)),
            ("read_rate_limit", u64::from(self.read_rate_limit)),
            ("max_publish_attempts", u64::from(self.max_publish_attempts)),
        ];
        if let Some((field, _)) = positive.iter().find(|(_, value)| *value == 0) {
            return Err(invalid(field, "must be greater than 0"));
        }

        if self.sweep_timeout_ms > self.sweep_interval_secs.saturating_mul(1000) {
            tracing::warn!(
                sweep_timeout_ms = self.sweep_timeout_ms,
                sweep_interval_secs = self.sweep_interval_secs,
                "sweep_timeout_ms exceeds the sweep interval; \
                 slow passes will delay the next tick"
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::expiry::Lifetime;

    #[test]
    fn test_validate_default_config() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_bind_addr() {
        let config = AppConfig { bind_addr: "localhost".into(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "bind_addr"));
    }

    #[test]
    fn test_validate_base_url_scheme() {
        let config = AppConfig { base_url: "ftp://example.com".into(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "base_url"));

        let config = AppConfig { base_url: "not a url".into(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "base_url"));
    }

    #[test]
    fn test_validate_empty_db_path() {
        let config = AppConfig { db_path: PathBuf::new(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Missing { field, .. }) if field == "db_path"));
    }

    #[test]
    fn test_validate_max_content_bytes_zero() {
        let config = AppConfig { max_content_bytes: 0, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "max_content_bytes"));
    }

    #[test]
    fn test_validate_max_content_bytes_exceeds_limit() {
        let config = AppConfig { max_content_bytes: 51 * 1024 * 1024, ..Default::default() }; // 51MB
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "max_content_bytes"));
    }

    #[test]
    fn test_validate_inverted_expiry_bounds() {
        let config = AppConfig { min_expiry: Lifetime::days(2), max_expiry: Lifetime::days(1), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "min_expiry"));
    }

    #[test]
    fn test_validate_default_expiry_out_of_bounds() {
        let config = AppConfig { default_expiry: Lifetime::weeks(8), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "default_expiry"));

        let config = AppConfig { default_expiry: Lifetime::minutes(1), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "default_expiry"));
    }

    #[test]
    fn test_validate_zero_values() {
        let config = AppConfig { sweep_interval_secs: 0, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "sweep_interval_secs"));

        let config = AppConfig { write_rate_limit: 0, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "write_rate_limit"));

        let config = AppConfig { max_publish_attempts: 0, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "max_publish_attempts"));
    }

    #[test]
    fn test_validate_edge_case_values() {
        let config = AppConfig {
            max_content_bytes: 1,
            min_expiry: Lifetime::hours(1),
            max_expiry: Lifetime::hours(1),
            default_expiry: Lifetime::hours(1),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_max_values() {
        let config = AppConfig { max_content_bytes: 50 * 1024 * 1024, ..Default::default() }; // exactly 50MB
        assert!(config.validate().is_ok());
    }
}
