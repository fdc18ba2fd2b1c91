//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (ACADIA_*)
//! 2. TOML config file (if ACADIA_CONFIG_FILE set)
//! 3. Built-in defaults
//!
//! The release version tag is stamped by the build pipeline through the
//! `HEROKU_RELEASE_VERSION` variable at compile time.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Version tag used when the build pipeline did not stamp one.
pub const DEFAULT_VERSION_TAG: &str = "v1";

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (ACADIA_*)
/// 2. TOML config file (if ACADIA_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Release identifier prefixing every partition name.
    ///
    /// On activation every partition whose name does not start with
    /// `"{version_tag}/"` is deleted, including ones whose tag merely shares
    /// a prefix (`v10/...` when running `v1`).
    ///
    /// Set via ACADIA_VERSION_TAG environment variable.
    #[serde(default = "default_version_tag")]
    pub version_tag: String,

    /// Application namespace between the version tag and the role.
    ///
    /// Set via ACADIA_NAMESPACE environment variable.
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Origin that relative asset paths are resolved against.
    ///
    /// Set via ACADIA_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Path to SQLite cache database.
    ///
    /// Set via ACADIA_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via ACADIA_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum bytes to fetch per request.
    ///
    /// Set via ACADIA_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Optional HTTP request timeout in milliseconds.
    ///
    /// Unset means a hung fetch stays pending, like the host fetch contract.
    /// Set via ACADIA_TIMEOUT_MS environment variable.
    #[serde(default)]
    pub timeout_ms: Option<u64>,

    /// Document served when a navigation fails.
    ///
    /// Set via ACADIA_OFFLINE_PAGE environment variable.
    #[serde(default = "default_offline_page")]
    pub offline_page: String,

    /// Offline fallback set, cached best-effort at install.
    ///
    /// Set via ACADIA_OFFLINE_PAGES environment variable.
    #[serde(default = "default_offline_pages")]
    pub offline_pages: Vec<String>,

    /// Assets that must be cached for install to succeed.
    ///
    /// Set via ACADIA_STATIC_ASSETS environment variable.
    #[serde(default)]
    pub static_assets: Vec<String>,

    /// Entry bound applied to the pages partition on `trimCaches`.
    #[serde(default = "default_pages_max_entries")]
    pub pages_max_entries: usize,

    /// Entry bound applied to the images partition on `trimCaches`.
    #[serde(default = "default_images_max_entries")]
    pub images_max_entries: usize,
}

fn default_version_tag() -> String {
    option_env!("HEROKU_RELEASE_VERSION").unwrap_or(DEFAULT_VERSION_TAG).into()
}

fn default_namespace() -> String {
    "acadia/sw".into()
}

fn default_origin() -> String {
    "http://0.0.0.0:4567/".into()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./acadia-sw-cache.sqlite")
}

fn default_user_agent() -> String {
    "acadia-sw/0.1".into()
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_offline_page() -> String {
    "/offline.html".into()
}

fn default_offline_pages() -> Vec<String> {
    vec![default_offline_page()]
}

fn default_pages_max_entries() -> usize {
    35
}

fn default_images_max_entries() -> usize {
    20
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version_tag: default_version_tag(),
            namespace: default_namespace(),
            origin: default_origin(),
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: None,
            offline_page: default_offline_page(),
            offline_pages: default_offline_pages(),
            static_assets: Vec::new(),
            pages_max_entries: default_pages_max_entries(),
            images_max_entries: default_images_max_entries(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest, if one is configured.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `ACADIA_`
    /// 2. TOML file from `ACADIA_CONFIG_FILE` (if set)
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

        if let Ok(config_path) = std::env::var("ACADIA_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("ACADIA_")
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
