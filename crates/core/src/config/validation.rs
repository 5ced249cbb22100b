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

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

/// Store names embed the prefix and generation verbatim.
fn check_name_part(field: &str, value: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(invalid(field, "must not be empty"));
    }
    if value.chars().any(char::is_whitespace) {
        return Err(invalid(field, "must not contain whitespace"));
    }
    Ok(())
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `scope_url` is not an http(s) URL
    /// - `generation` or `store_prefix` is empty or contains whitespace
    /// - a `manifest` entry is empty
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `user_agent` is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.scope().map_err(|e| invalid("scope_url", e.to_string()))?;

        check_name_part("generation", &self.generation)?;
        check_name_part("store_prefix", &self.store_prefix)?;

        if self.manifest.iter().any(|path| path.trim().is_empty()) {
            return Err(invalid("manifest", "entries must not be empty"));
        }

        if self.offline_shell.trim().is_empty() {
            return Err(invalid("offline_shell", "must not be empty"));
        }

        if self.max_bytes == 0 {
            return Err(invalid("max_bytes", "must be greater than 0"));
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(invalid("max_bytes", "must not exceed 50MB"));
        }

        if self.timeout_ms < 100 {
            return Err(invalid("timeout_ms", "must be at least 100ms"));
        }
        if self.timeout_ms > 300_000 {
            return Err(invalid("timeout_ms", "must not exceed 5 minutes (300000ms)"));
        }

        if self.user_agent.is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }

        if !self.manifest.iter().any(|path| path == &self.offline_shell) {
            tracing::warn!(
                offline_shell = %self.offline_shell,
                manifest_len = self.manifest.len(),
                "offline_shell is not precached; failed navigations fall back to the scope root"
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field_of(result: Result<(), ConfigError>) -> String {
        match result {
            Err(ConfigError::Invalid { field, .. }) => field,
            other => panic!("expected Invalid, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_default_config() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_scope_url() {
        let config = AppConfig { scope_url: "not a url at all".into(), ..Default::default() };
        assert_eq!(field_of(config.validate()), "scope_url");

        let config = AppConfig { scope_url: "file:///srv/app/".into(), ..Default::default() };
        assert_eq!(field_of(config.validate()), "scope_url");
    }

    #[test]
    fn test_validate_generation_and_prefix() {
        let config = AppConfig { generation: String::new(), ..Default::default() };
        assert_eq!(field_of(config.validate()), "generation");

        let config = AppConfig { generation: "v 2".into(), ..Default::default() };
        assert_eq!(field_of(config.validate()), "generation");

        let config = AppConfig { store_prefix: " ".into(), ..Default::default() };
        assert_eq!(field_of(config.validate()), "store_prefix");
    }

    #[test]
    fn test_validate_manifest_entries() {
        let config = AppConfig { manifest: vec!["./".into(), "  ".into()], ..Default::default() };
        assert_eq!(field_of(config.validate()), "manifest");
    }

    #[test]
    fn test_validate_empty_manifest_allowed() {
        let config = AppConfig { manifest: Vec::new(), ..Default::default() };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_max_bytes() {
        let config = AppConfig { max_bytes: 0, ..Default::default() };
        assert_eq!(field_of(config.validate()), "max_bytes");

        let config = AppConfig { max_bytes: 51 * 1024 * 1024, ..Default::default() };
        assert_eq!(field_of(config.validate()), "max_bytes");
    }

    #[test]
    fn test_validate_timeout() {
        let config = AppConfig { timeout_ms: 50, ..Default::default() };
        assert_eq!(field_of(config.validate()), "timeout_ms");

        let config = AppConfig { timeout_ms: 301_000, ..Default::default() };
        assert_eq!(field_of(config.validate()), "timeout_ms");
    }

    #[test]
    fn test_validate_empty_user_agent() {
        let config = AppConfig { user_agent: String::new(), ..Default::default() };
        assert_eq!(field_of(config.validate()), "user_agent");
    }

    #[test]
    fn test_validate_edge_case_values() {
        let config = AppConfig { max_bytes: 1, timeout_ms: 100, ..Default::default() };
        assert!(config.validate().is_ok());

        let config = AppConfig { max_bytes: 50 * 1024 * 1024, timeout_ms: 300_000, ..Default::default() };
        assert!(config.validate().is_ok());
    }
}
