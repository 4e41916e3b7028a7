//! Worker configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (VIGIL_*)
//! 2. TOML config file (if VIGIL_CONFIG_FILE set)
//! 3. Built-in defaults
//!
//! The defaults describe a typical app-shell deployment: a handful of
//! pre-cached shell files, real-time backend hosts excluded from
//! interception, and font/CDN hosts treated as immutable assets.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Identity of the versioned cache region.
///
/// Injected at initialization rather than read from module-level constants;
/// bumping `version` at deployment supersedes the previous region.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Stable cache name shared across versions.
    pub name: String,

    /// Version tag for the current deployment (e.g. "v3").
    pub version: String,
}

impl CacheConfig {
    /// Full tag of the current region: `{name}-{version}`.
    pub fn region_tag(&self) -> String {
        format!("{}-{}", self.name, self.version)
    }
}

/// Fixed metadata attached to displayed notifications.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Title used when the push payload omits one.
    pub default_title: String,
    pub icon: String,
    pub badge: String,
    pub dir: String,
    pub lang: String,
}

/// Worker configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (VIGIL_*)
/// 2. TOML config file (if VIGIL_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Name and version of the cache region.
    ///
    /// Nested fields use `__` in environment variables,
    /// e.g. VIGIL_CACHE__VERSION.
    #[serde(default = "default_cache")]
    pub cache: CacheConfig,

    /// Absolute base URL of the controlled application scope.
    ///
    /// Relative precache and fallback paths resolve against this.
    #[serde(default = "default_scope")]
    pub scope: String,

    /// URLs pre-populated into the current region at install time.
    ///
    /// Relative entries resolve against `scope`. Fetches settle
    /// independently; one failure never aborts the rest.
    #[serde(default = "default_precache_manifest")]
    pub precache_manifest: Vec<String>,

    /// Fallback document identities tried, in order, when a document
    /// fetch fails offline.
    #[serde(default = "default_document_fallbacks")]
    pub document_fallbacks: Vec<String>,

    /// Host substrings whose traffic is never intercepted
    /// (auth/database/storage backends).
    #[serde(default = "default_backend_hosts")]
    pub backend_hosts: Vec<String>,

    /// Host substrings excluded only when the path carries the
    /// versioned API segment.
    #[serde(default = "default_gated_api_hosts")]
    pub gated_api_hosts: Vec<String>,

    /// Path segment marking versioned API traffic on gated hosts.
    #[serde(default = "default_gated_api_segment")]
    pub gated_api_segment: String,

    /// Host substrings served cache-first as immutable assets
    /// (font/CDN hosts).
    #[serde(default = "default_asset_hosts")]
    pub asset_hosts: Vec<String>,

    /// Path extensions served cache-first as immutable assets.
    #[serde(default = "default_asset_extensions")]
    pub asset_extensions: Vec<String>,

    /// Path to the SQLite cache database.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent string for outbound fetches.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Network fetch timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum response body bytes accepted per fetch.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Fixed notification metadata for push events.
    #[serde(default = "default_notification")]
    pub notification: NotificationConfig,
}

fn default_cache() -> CacheConfig {
    CacheConfig { name: "vigil".into(), version: "v1".into() }
}

fn default_scope() -> String {
    "http://localhost:8080/".into()
}

fn default_precache_manifest() -> Vec<String> {
    vec![
        "./".into(),
        "./index.html".into(),
        "./manifest.json".into(),
        "./apple-touch-icon.png".into(),
        "./icons/icon-192.png".into(),
        "./icons/icon-512.png".into(),
        "https://fonts.googleapis.com/css2?family=Inter&display=swap".into(),
        "https://cdnjs.cloudflare.com/ajax/libs/font-awesome/6.5.0/css/all.min.css".into(),
    ]
}

fn default_document_fallbacks() -> Vec<String> {
    vec!["./index.html".into(), "./".into()]
}

fn default_backend_hosts() -> Vec<String> {
    vec!["firebase".into(), "firestore".into(), "storage.googleapis".into()]
}

fn default_gated_api_hosts() -> Vec<String> {
    vec!["googleapis.com".into()]
}

fn default_gated_api_segment() -> String {
    "/v1/".into()
}

fn default_asset_hosts() -> Vec<String> {
    vec![
        "fonts.googleapis.com".into(),
        "cdnjs.cloudflare.com".into(),
        "fonts.gstatic.com".into(),
    ]
}

fn default_asset_extensions() -> Vec<String> {
    vec![
        "png".into(),
        "ico".into(),
        "svg".into(),
        "woff".into(),
        "woff2".into(),
        "ttf".into(),
    ]
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./vigil-cache.sqlite")
}

fn default_user_agent() -> String {
    "vigil/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_notification() -> NotificationConfig {
    NotificationConfig {
        default_title: "vigil".into(),
        icon: "./icons/icon-192.png".into(),
        badge: "./icons/icon-72.png".into(),
        dir: "auto".into(),
        lang: "en".into(),
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            cache: default_cache(),
            scope: default_scope(),
            precache_manifest: default_precache_manifest(),
            document_fallbacks: default_document_fallbacks(),
            backend_hosts: default_backend_hosts(),
            gated_api_hosts: default_gated_api_hosts(),
            gated_api_segment: default_gated_api_segment(),
            asset_hosts: default_asset_hosts(),
            asset_extensions: default_asset_extensions(),
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            max_bytes: default_max_bytes(),
            notification: default_notification(),
        }
    }
}

impl WorkerConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Tag of the current cache region.
    pub fn region_tag(&self) -> String {
        self.cache.region_tag()
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `VIGIL_`
    /// 2. TOML file from `VIGIL_CONFIG_FILE` (if set)
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

        if let Ok(config_path) = std::env::var("VIGIL_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("VIGIL_")
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
