//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (MCP_OFFLINE_*)
//! 2. TOML config file (if MCP_OFFLINE_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::Error;
use crate::scope::Scope;

mod validation;

pub use validation::ConfigError;

/// Which [`CacheStorage`](crate::store::CacheStorage) backend to open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    #[default]
    Sqlite,
}

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (MCP_OFFLINE_*)
/// 2. TOML config file (if MCP_OFFLINE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Base URL the engine governs. Requests outside it are not intercepted.
    ///
    /// Set via MCP_OFFLINE_SCOPE_URL environment variable.
    #[serde(default = "default_scope_url")]
    pub scope_url: String,

    /// Generation tag binding the static/runtime store pair to a build.
    ///
    /// Set via MCP_OFFLINE_GENERATION environment variable.
    #[serde(default = "default_generation")]
    pub generation: String,

    /// Scope-relative paths fetched into the static store at install.
    ///
    /// Set via MCP_OFFLINE_MANIFEST environment variable (`["./", "./index.html"]`).
    #[serde(default = "default_manifest")]
    pub manifest: Vec<String>,

    /// Scope-relative path of the document served to failed navigations.
    #[serde(default = "default_offline_shell")]
    pub offline_shell: String,

    /// Prefix of every store name owned by this engine.
    #[serde(default = "default_store_prefix")]
    pub store_prefix: String,

    /// Store backend: `memory` or `sqlite`.
    #[serde(default)]
    pub store_backend: StoreBackend,

    /// Path to SQLite cache database.
    ///
    /// Set via MCP_OFFLINE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent string for HTTP requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// HTTP request timeout in milliseconds.
    ///
    /// Set via MCP_OFFLINE_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum bytes to fetch per request.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Maximum redirects followed by the transport.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,

    /// File extensions served cache-first.
    #[serde(default = "default_static_extensions")]
    pub static_extensions: Vec<String>,
}

fn default_scope_url() -> String {
    "http://127.0.0.1:8080/".into()
}

fn default_generation() -> String {
    env!("CARGO_PKG_VERSION").into()
}

fn default_manifest() -> Vec<String> {
    vec!["./".into(), "./index.html".into()]
}

fn default_offline_shell() -> String {
    "./index.html".into()
}

fn default_store_prefix() -> String {
    "stowaway".into()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./stowaway-cache.sqlite")
}

fn default_user_agent() -> String {
    "stowaway/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_max_redirects() -> usize {
    5
}

/// Styles, scripts, fonts, images, markup and manifests.
pub fn default_static_extensions() -> Vec<String> {
    [
        "css",
        "js",
        "mjs",
        "woff",
        "woff2",
        "ttf",
        "otf",
        "eot",
        "png",
        "jpg",
        "jpeg",
        "gif",
        "svg",
        "webp",
        "avif",
        "ico",
        "html",
        "htm",
        "webmanifest",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            scope_url: default_scope_url(),
            generation: default_generation(),
            manifest: default_manifest(),
            offline_shell: default_offline_shell(),
            store_prefix: default_store_prefix(),
            store_backend: StoreBackend::default(),
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            max_bytes: default_max_bytes(),
            max_redirects: default_max_redirects(),
            static_extensions: default_static_extensions(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Parsed scope.
    pub fn scope(&self) -> Result<Scope, Error> {
        Scope::parse(&self.scope_url)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `MCP_OFFLINE_`
    /// 2. TOML file from `MCP_OFFLINE_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file or environment cannot be read or
    /// validation fails after loading.
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("MCP_OFFLINE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("MCP_OFFLINE_")
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.scope_url, "http://127.0.0.1:8080/");
        assert_eq!(config.generation, env!("CARGO_PKG_VERSION"));
        assert_eq!(config.manifest, vec!["./".to_string(), "./index.html".to_string()]);
        assert_eq!(config.offline_shell, "./index.html");
        assert_eq!(config.store_prefix, "stowaway");
        assert_eq!(config.store_backend, StoreBackend::Sqlite);
        assert_eq!(config.db_path, PathBuf::from("./stowaway-cache.sqlite"));
        assert_eq!(config.timeout_ms, 20_000);
        assert!(config.static_extensions.iter().any(|e| e == "svg"));
    }

    #[test]
    fn test_timeout_duration() {
        let config = AppConfig::default();
        assert_eq!(config.timeout(), Duration::from_millis(20_000));
    }

    #[test]
    fn test_scope_from_config() {
        let config = AppConfig { scope_url: "https://example.com/app".into(), ..Default::default() };
        assert_eq!(config.scope().unwrap().base().as_str(), "https://example.com/app/");
    }

    #[test]
    fn test_load_layers_file_and_env() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "offline.toml",
                r#"
                scope_url = "https://example.com/app/"
                generation = "from-file"
                store_backend = "memory"
                manifest = ["./", "./index.html", "./app.css"]
                "#,
            )?;
            jail.set_env("MCP_OFFLINE_CONFIG_FILE", "offline.toml");
            jail.set_env("MCP_OFFLINE_GENERATION", "v7");

            let config = AppConfig::load().map_err(|e| e.to_string())?;
            assert_eq!(config.scope_url, "https://example.com/app/");
            assert_eq!(config.generation, "v7");
            assert_eq!(config.store_backend, StoreBackend::Memory);
            assert_eq!(config.manifest.len(), 3);
            Ok(())
        });
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        Jail::expect_with(|jail| {
            jail.set_env("MCP_OFFLINE_SCOPE_URL", "ftp://example.com/");
            assert!(matches!(AppConfig::load(), Err(ConfigError::Invalid { .. })));
            Ok(())
        });
    }
}
