//! Configuration management for atchat
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.

use crate::error::{AtchatError, Result};
use crate::prompt::AttachmentBudget;
use crate::workspace::{DEFAULT_SHALLOW_LIMIT, DEFAULT_TARGETED_LIMIT};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Longest debounce window accepted by [`Config::validate`]
pub const MAX_DEBOUNCE_MS: u64 = 10_000;

/// Main configuration structure for atchat
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Completion endpoint settings
    #[serde(default)]
    pub endpoint: EndpointConfig,
    /// Where the API key is kept
    #[serde(default)]
    pub credentials: CredentialsConfig,
    /// Workspace search behaviour
    #[serde(default)]
    pub search: SearchConfig,
    /// Optional limits on attached file content
    #[serde(default)]
    pub attachments: AttachmentBudget,
}

/// Completion endpoint configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// Base URL of the API (useful for tests and local mocks)
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Model name used in the request path
    #[serde(default = "default_model")]
    pub model: String,

    /// Deadline for one completion request (seconds)
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_api_base() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_model() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_timeout_seconds() -> u64 {
    60
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            model: default_model(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

impl EndpointConfig {
    /// URL of the `generateContent` method for the configured model
    pub fn generate_content_url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.api_base.trim_end_matches('/'),
            self.model
        )
    }
}

/// Credential lookup configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialsConfig {
    /// Keyring service name
    #[serde(default = "default_service")]
    pub service: String,

    /// Secret name holding the API key
    #[serde(default = "default_secret_name")]
    pub secret_name: String,

    /// Read the key from this environment variable instead of the keyring
    #[serde(default)]
    pub env_var: Option<String>,
}

fn default_service() -> String {
    "atchat".to_string()
}

fn default_secret_name() -> String {
    "geminiApiKey".to_string()
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            service: default_service(),
            secret_name: default_secret_name(),
            env_var: None,
        }
    }
}

/// Workspace search configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Quiet window before a search is issued (milliseconds)
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Result cap for the shallow listing
    #[serde(default = "default_shallow_limit")]
    pub shallow_limit: usize,

    /// Result cap for targeted searches
    #[serde(default = "default_targeted_limit")]
    pub targeted_limit: usize,
}

fn default_debounce_ms() -> u64 {
    300
}

fn default_shallow_limit() -> usize {
    DEFAULT_SHALLOW_LIMIT
}

fn default_targeted_limit() -> usize {
    DEFAULT_TARGETED_LIMIT
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            shallow_limit: default_shallow_limit(),
            targeted_limit: default_targeted_limit(),
        }
    }
}

impl SearchConfig {
    /// Debounce window as a duration
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// # Arguments
    ///
    /// * `path` - Path to configuration file
    /// * `cli` - CLI arguments for overrides
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| AtchatError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| AtchatError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        if let Ok(api_base) = std::env::var("ATCHAT_API_BASE") {
            self.endpoint.api_base = api_base;
        }

        if let Ok(model) = std::env::var("ATCHAT_MODEL") {
            self.endpoint.model = model;
        }

        if let Ok(timeout) = std::env::var("ATCHAT_TIMEOUT_SECONDS") {
            if let Ok(value) = timeout.parse() {
                self.endpoint.timeout_seconds = value;
            } else {
                tracing::warn!("Invalid ATCHAT_TIMEOUT_SECONDS: {}", timeout);
            }
        }

        if let Ok(secret_name) = std::env::var("ATCHAT_SECRET_NAME") {
            self.credentials.secret_name = secret_name;
        }

        if let Ok(env_var) = std::env::var("ATCHAT_CREDENTIAL_ENV") {
            self.credentials.env_var = Some(env_var).filter(|v| !v.is_empty());
        }

        if let Ok(debounce) = std::env::var("ATCHAT_DEBOUNCE_MS") {
            if let Ok(value) = debounce.parse() {
                self.search.debounce_ms = value;
            } else {
                tracing::warn!("Invalid ATCHAT_DEBOUNCE_MS: {}", debounce);
            }
        }

        if let Ok(max_file) = std::env::var("ATCHAT_MAX_FILE_BYTES") {
            if let Ok(value) = max_file.parse() {
                self.attachments.max_file_bytes = Some(value);
            } else {
                tracing::warn!("Invalid ATCHAT_MAX_FILE_BYTES: {}", max_file);
            }
        }

        if let Ok(max_total) = std::env::var("ATCHAT_MAX_TOTAL_BYTES") {
            if let Ok(value) = max_total.parse() {
                self.attachments.max_total_bytes = Some(value);
            } else {
                tracing::warn!("Invalid ATCHAT_MAX_TOTAL_BYTES: {}", max_total);
            }
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if let Some(model) = &cli.model {
            tracing::debug!("Using model override: {}", model);
            self.endpoint.model = model.clone();
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns error if any validation check fails
    pub fn validate(&self) -> Result<()> {
        let api_base = url::Url::parse(&self.endpoint.api_base).map_err(|e| {
            AtchatError::Config(format!(
                "endpoint.api_base '{}' is not a valid URL: {}",
                self.endpoint.api_base, e
            ))
        })?;
        if !matches!(api_base.scheme(), "http" | "https") {
            return Err(AtchatError::Config(format!(
                "endpoint.api_base must use http or https, got {}",
                api_base.scheme()
            ))
            .into());
        }

        if self.endpoint.model.trim().is_empty() {
            return Err(AtchatError::Config("endpoint.model cannot be empty".to_string()).into());
        }

        if self.endpoint.timeout_seconds == 0 {
            return Err(AtchatError::Config(
                "endpoint.timeout_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        if self.credentials.secret_name.is_empty() {
            return Err(
                AtchatError::Config("credentials.secret_name cannot be empty".to_string()).into(),
            );
        }

        if self.search.debounce_ms > MAX_DEBOUNCE_MS {
            return Err(AtchatError::Config(format!(
                "search.debounce_ms must be less than or equal to {}",
                MAX_DEBOUNCE_MS
            ))
            .into());
        }

        if self.search.shallow_limit == 0 || self.search.targeted_limit == 0 {
            return Err(AtchatError::Config(
                "search limits must be greater than 0".to_string(),
            )
            .into());
        }

        if self.attachments.max_file_bytes == Some(0) || self.attachments.max_total_bytes == Some(0)
        {
            return Err(AtchatError::Config(
                "attachment budgets must be greater than 0 when set".to_string(),
            )
            .into());
        }

        if let (Some(file), Some(total)) = (
            self.attachments.max_file_bytes,
            self.attachments.max_total_bytes,
        ) {
            if file > total {
                return Err(AtchatError::Config(
                    "attachments.max_file_bytes cannot exceed attachments.max_total_bytes"
                        .to_string(),
                )
                .into());
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    fn cli_with_model(model: Option<&str>) -> crate::cli::Cli {
        crate::cli::Cli {
            model: model.map(str::to_string),
            ..crate::cli::Cli::default()
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(
            config.endpoint.api_base,
            "https://generativelanguage.googleapis.com"
        );
        assert_eq!(config.endpoint.model, "gemini-2.0-flash");
        assert_eq!(config.endpoint.timeout_seconds, 60);
        assert_eq!(config.credentials.service, "atchat");
        assert_eq!(config.credentials.secret_name, "geminiApiKey");
        assert_eq!(config.search.debounce(), Duration::from_millis(300));
        assert_eq!(config.search.shallow_limit, 100);
        assert_eq!(config.search.targeted_limit, 200);
        assert!(config.attachments.is_unlimited());
    }

    #[test]
    fn test_config_validation_success() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_generate_content_url() {
        let endpoint = EndpointConfig {
            api_base: "http://localhost:8080/".to_string(),
            model: "m1".to_string(),
            timeout_seconds: 5,
        };
        assert_eq!(
            endpoint.generate_content_url(),
            "http://localhost:8080/v1beta/models/m1:generateContent"
        );
    }

    #[test]
    fn test_config_validation_rejects_bad_api_base() {
        let mut config = Config::default();
        config.endpoint.api_base = "not a url".to_string();
        assert!(config.validate().is_err());

        config.endpoint.api_base = "ftp://example.com".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_empty_model() {
        let mut config = Config::default();
        config.endpoint.model = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_zero_timeout() {
        let mut config = Config::default();
        config.endpoint.timeout_seconds = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_debounce_too_large() {
        let mut config = Config::default();
        config.search.debounce_ms = MAX_DEBOUNCE_MS + 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_zero_limits() {
        let mut config = Config::default();
        config.search.targeted_limit = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_budgets() {
        let mut config = Config::default();
        config.attachments.max_file_bytes = Some(0);
        assert!(config.validate().is_err());

        config.attachments.max_file_bytes = Some(2048);
        config.attachments.max_total_bytes = Some(1024);
        assert!(config.validate().is_err());

        config.attachments.max_total_bytes = Some(4096);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_from_yaml() {
        let yaml = r#"
endpoint:
  api_base: http://127.0.0.1:9999
  model: gemini-test
search:
  debounce_ms: 150
attachments:
  max_file_bytes: 1000
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.endpoint.api_base, "http://127.0.0.1:9999");
        assert_eq!(config.endpoint.model, "gemini-test");
        assert_eq!(config.endpoint.timeout_seconds, 60);
        assert_eq!(config.search.debounce_ms, 150);
        assert_eq!(config.search.shallow_limit, 100);
        assert_eq!(config.attachments.max_file_bytes, Some(1000));
        assert_eq!(config.attachments.max_total_bytes, None);
        assert_eq!(config.credentials, CredentialsConfig::default());
    }

    #[test]
    #[serial]
    fn test_load_nonexistent_file_uses_defaults() {
        let config = Config::load("nonexistent.yaml", &cli_with_model(None)).unwrap();
        assert_eq!(config.endpoint.model, "gemini-2.0-flash");
    }

    #[test]
    #[serial]
    fn test_load_reads_file_and_applies_cli_override() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "endpoint:\n  model: from-file\n  timeout_seconds: 7").unwrap();
        let path = file.path().to_string_lossy().to_string();

        let config = Config::load(&path, &cli_with_model(None)).unwrap();
        assert_eq!(config.endpoint.model, "from-file");
        assert_eq!(config.endpoint.timeout_seconds, 7);

        let config = Config::load(&path, &cli_with_model(Some("from-cli"))).unwrap();
        assert_eq!(config.endpoint.model, "from-cli");
    }

    #[test]
    #[serial]
    fn test_load_invalid_yaml_fails() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "endpoint: [unclosed").unwrap();
        let path = file.path().to_string_lossy().to_string();

        assert!(Config::load(&path, &cli_with_model(None)).is_err());
    }

    #[test]
    #[serial]
    fn test_apply_env_vars_overrides_fields() {
        std::env::set_var("ATCHAT_API_BASE", "http://localhost:1234");
        std::env::set_var("ATCHAT_MODEL", "env-model");
        std::env::set_var("ATCHAT_TIMEOUT_SECONDS", "12");
        std::env::set_var("ATCHAT_DEBOUNCE_MS", "50");
        std::env::set_var("ATCHAT_MAX_FILE_BYTES", "512");
        std::env::set_var("ATCHAT_CREDENTIAL_ENV", "MY_KEY");

        let mut config = Config::default();
        config.apply_env_vars();

        std::env::remove_var("ATCHAT_API_BASE");
        std::env::remove_var("ATCHAT_MODEL");
        std::env::remove_var("ATCHAT_TIMEOUT_SECONDS");
        std::env::remove_var("ATCHAT_DEBOUNCE_MS");
        std::env::remove_var("ATCHAT_MAX_FILE_BYTES");
        std::env::remove_var("ATCHAT_CREDENTIAL_ENV");

        assert_eq!(config.endpoint.api_base, "http://localhost:1234");
        assert_eq!(config.endpoint.model, "env-model");
        assert_eq!(config.endpoint.timeout_seconds, 12);
        assert_eq!(config.search.debounce_ms, 50);
        assert_eq!(config.attachments.max_file_bytes, Some(512));
        assert_eq!(config.credentials.env_var.as_deref(), Some("MY_KEY"));
    }

    #[test]
    #[serial]
    fn test_apply_env_vars_ignores_unparsable_numbers() {
        std::env::set_var("ATCHAT_TIMEOUT_SECONDS", "soon");
        let mut config = Config::default();
        config.apply_env_vars();
        std::env::remove_var("ATCHAT_TIMEOUT_SECONDS");

        assert_eq!(config.endpoint.timeout_seconds, 60);
    }

    #[test]
    fn test_shipped_config_matches_defaults() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/config/atchat.yaml");
        let config = Config::from_file(path).unwrap();
        assert_eq!(config, Config::default());
    }
}
