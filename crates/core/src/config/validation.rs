//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `version_tag` is empty or contains `/`
    /// - `namespace` is empty or has a leading/trailing `/`
    /// - `origin` is not an absolute http(s) URL
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - `timeout_ms` is set below 100ms or above 5 minutes
    /// - `user_agent` is empty
    /// - `offline_pages` does not contain `offline_page`
    /// - either trim bound is 0
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version_tag.is_empty() {
            return Err(ConfigError::Invalid { field: "version_tag".into(), reason: "must not be empty".into() });
        }
        if self.version_tag.contains('/') {
            return Err(ConfigError::Invalid { field: "version_tag".into(), reason: "must not contain '/'".into() });
        }

        if self.namespace.is_empty() || self.namespace.starts_with('/') || self.namespace.ends_with('/') {
            return Err(ConfigError::Invalid {
                field: "namespace".into(),
                reason: "must be non-empty without leading or trailing '/'".into(),
            });
        }

        match url::Url::parse(&self.origin) {
            Ok(origin) if matches!(origin.scheme(), "http" | "https") => {}
            Ok(origin) => {
                return Err(ConfigError::Invalid {
                    field: "origin".into(),
                    reason: format!("unsupported scheme: {}", origin.scheme()),
                });
            }
            Err(e) => return Err(ConfigError::Invalid { field: "origin".into(), reason: e.to_string() }),
        }

        if self.max_bytes == 0 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must be greater than 0".into() });
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must not exceed 50MB".into() });
        }

        if let Some(timeout_ms) = self.timeout_ms {
            if timeout_ms < 100 {
                return Err(ConfigError::Invalid {
                    field: "timeout_ms".into(),
                    reason: "must be at least 100ms".into(),
                });
            }
            if timeout_ms > 300_000 {
                return Err(ConfigError::Invalid {
                    field: "timeout_ms".into(),
                    reason: "must not exceed 5 minutes (300000ms)".into(),
                });
            }
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }

        if !self.offline_pages.iter().any(|page| page == &self.offline_page) {
            return Err(ConfigError::Invalid {
                field: "offline_pages".into(),
                reason: format!("must include the offline page {}", self.offline_page),
            });
        }

        if self.pages_max_entries == 0 {
            return Err(ConfigError::Invalid {
                field: "pages_max_entries".into(),
                reason: "must be greater than 0".into(),
            });
        }
        if self.images_max_entries == 0 {
            return Err(ConfigError::Invalid {
                field: "images_max_entries".into(),
                reason: "must be greater than 0".into(),
            });
        }

        if self.static_assets.iter().any(|asset| self.offline_pages.contains(asset)) {
            tracing::warn!(
                static_assets = self.static_assets.len(),
                offline_pages = self.offline_pages.len(),
                "An asset is listed as both mandatory and offline; \
                 it will be fetched twice during install"
            );
        }

        Ok(())
    }
}
