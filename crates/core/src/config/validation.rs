//! Configuration validation rules.
//!
//! This module provides validation logic for `WorkerConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::WorkerConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

impl WorkerConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `cache.name` or `cache.version` is empty or contains `/`
    /// - `scope` is not an absolute URL
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - `user_agent` is empty
    /// - an asset extension is empty or not lowercase
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache.name.is_empty() {
            return Err(ConfigError::Invalid { field: "cache.name".into(), reason: "must not be empty".into() });
        }
        if self.cache.version.is_empty() {
            return Err(ConfigError::Invalid { field: "cache.version".into(), reason: "must not be empty".into() });
        }
        if self.cache.name.contains('/') || self.cache.version.contains('/') {
            return Err(ConfigError::Invalid {
                field: "cache".into(),
                reason: "name and version must not contain '/'".into(),
            });
        }

        if !self.scope.contains("://") {
            return Err(ConfigError::Invalid { field: "scope".into(), reason: "must be an absolute URL".into() });
        }

        if self.timeout_ms < 100 {
            return Err(ConfigError::Invalid { field: "timeout_ms".into(), reason: "must be at least 100ms".into() });
        }
        if self.timeout_ms > 300_000 {
            return Err(ConfigError::Invalid {
                field: "timeout_ms".into(),
                reason: "must not exceed 5 minutes (300000ms)".into(),
            });
        }

        if self.max_bytes == 0 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must be greater than 0".into() });
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must not exceed 50MB".into() });
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }

        for ext in &self.asset_extensions {
            if ext.is_empty() || ext.starts_with('.') || ext.chars().any(|c| c.is_ascii_uppercase()) {
                return Err(ConfigError::Invalid {
                    field: "asset_extensions".into(),
                    reason: format!("'{ext}' must be a lowercase extension without the leading dot"),
                });
            }
        }

        if self.precache_manifest.is_empty() {
            tracing::warn!("precache_manifest is empty; offline shell fallback will have nothing to serve");
        }

        Ok(())
    }
}
