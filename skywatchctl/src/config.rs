//! CLI configuration management
//!
//! Handles loading, saving, and layering of CLI-specific configuration.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::client::ClientConfig;
use crate::transport::RequestPolicy;

/// CLI configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CliConfig {
    /// Lobby base URL
    pub lobby_url: String,

    /// Default output format
    pub output_format: String,

    /// Enable verbose logging by default
    pub verbose: bool,

    /// Request timeout in seconds
    pub timeout: u64,

    /// Retry ceiling for transient request failures
    pub max_retries: u32,

    /// Initial retry backoff in milliseconds
    pub retry_delay_ms: u64,

    /// Backoff ceiling in milliseconds
    pub retry_max_delay_ms: u64,

    /// Minimum spacing between game requests in milliseconds
    pub min_interval_ms: u64,

    /// Seconds before the session is considered expired
    pub session_lifetime_secs: u64,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            lobby_url: "https://lobby.ogame.gameforge.com".to_string(),
            output_format: "table".to_string(),
            verbose: false,
            timeout: 10,
            max_retries: 3,
            retry_delay_ms: 500,
            retry_max_delay_ms: 30_000,
            min_interval_ms: 1000,
            session_lifetime_secs: 900,
        }
    }
}

impl CliConfig {
    /// Load configuration from file or create default
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let content =
                std::fs::read_to_string(&config_path).context("Failed to read CLI config file")?;

            toml::from_str(&content).context("Failed to parse CLI config file")
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize CLI config")?;

        std::fs::write(&config_path, content).context("Failed to write CLI config file")?;

        Ok(())
    }

    /// Get the configuration file path
    fn config_path() -> Result<PathBuf> {
        let config_dir = if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
            PathBuf::from(xdg_config)
        } else if let Ok(home) = std::env::var("HOME") {
            PathBuf::from(home).join(".config")
        } else {
            return Err(anyhow::anyhow!("Cannot determine config directory"));
        };

        Ok(config_dir.join("skywatch").join("cli.toml"))
    }

    /// Create a new builder for constructing configuration
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    /// Derive the core client configuration from the CLI settings.
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            lobby_url: self.lobby_url.clone(),
            session_lifetime: Duration::from_secs(self.session_lifetime_secs),
            policy: RequestPolicy {
                timeout: Duration::from_secs(self.timeout),
                max_retries: self.max_retries,
                initial_backoff: Duration::from_millis(self.retry_delay_ms),
                max_backoff: Duration::from_millis(self.retry_max_delay_ms),
                min_interval: Duration::from_millis(self.min_interval_ms),
            },
        }
    }
}

/// Builder for CLI configuration with validation and priority chain support
///
/// Priority chain (lowest to highest):
/// 1. Defaults
/// 2. Config file
/// 3. Environment variables
/// 4. CLI arguments
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    lobby_url: Option<String>,
    output_format: Option<String>,
    verbose: Option<bool>,
    timeout: Option<u64>,
    max_retries: Option<u32>,
    min_interval_ms: Option<u64>,
}

impl ConfigBuilder {
    /// Create a new configuration builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set lobby URL (with validation)
    pub fn with_lobby_url(mut self, url: impl Into<String>) -> Result<Self> {
        let url = url.into();
        Self::validate_url(&url)?;
        self.lobby_url = Some(url);
        Ok(self)
    }

    /// Set output format (with validation)
    pub fn with_output_format(mut self, format: impl Into<String>) -> Result<Self> {
        let format = format.into();
        Self::validate_output_format(&format)?;
        self.output_format = Some(format);
        Ok(self)
    }

    /// Set verbose flag
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = Some(verbose);
        self
    }

    /// Set timeout (with validation)
    pub fn with_timeout(mut self, timeout: u64) -> Result<Self> {
        Self::validate_timeout(timeout)?;
        self.timeout = Some(timeout);
        Ok(self)
    }

    /// Load configuration from file
    pub fn with_config_file(self, load_file: bool) -> Result<Self> {
        if !load_file {
            return Ok(self);
        }

        match CliConfig::load() {
            Ok(config) => {
                let builder = self;
                // Only use file values if they weren't already set (preserving priority)
                Ok(Self {
                    lobby_url: builder.lobby_url.or(Some(config.lobby_url)),
                    output_format: builder.output_format.or(Some(config.output_format)),
                    verbose: builder.verbose.or(Some(config.verbose)),
                    timeout: builder.timeout.or(Some(config.timeout)),
                    max_retries: builder.max_retries.or(Some(config.max_retries)),
                    min_interval_ms: builder.min_interval_ms.or(Some(config.min_interval_ms)),
                })
            }
            Err(_) => {
                // If file doesn't exist or can't be loaded, continue with current builder
                Ok(self)
            }
        }
    }

    /// Apply environment variable overrides
    pub fn with_env_overrides(mut self) -> Self {
        // Only apply env vars if values weren't already set (preserving priority)
        if self.lobby_url.is_none() {
            if let Ok(url) = std::env::var("SKYWATCH_LOBBY") {
                if Self::validate_url(&url).is_ok() {
                    self.lobby_url = Some(url);
                }
            }
        }

        if self.output_format.is_none() {
            if let Ok(format) = std::env::var("SKYWATCH_FORMAT") {
                if Self::validate_output_format(&format).is_ok() {
                    self.output_format = Some(format);
                }
            }
        }

        if self.verbose.is_none() {
            if let Ok(verbose) = std::env::var("SKYWATCH_VERBOSE") {
                self.verbose = Some(verbose.to_lowercase() == "true" || verbose == "1");
            }
        }

        if self.timeout.is_none() {
            if let Ok(timeout) = std::env::var("SKYWATCH_TIMEOUT") {
                if let Ok(timeout) = timeout.parse() {
                    if Self::validate_timeout(timeout).is_ok() {
                        self.timeout = Some(timeout);
                    }
                }
            }
        }

        if self.max_retries.is_none() {
            if let Ok(retries) = std::env::var("SKYWATCH_MAX_RETRIES") {
                if let Ok(retries) = retries.parse() {
                    if Self::validate_max_retries(retries).is_ok() {
                        self.max_retries = Some(retries);
                    }
                }
            }
        }

        if self.min_interval_ms.is_none() {
            if let Ok(interval) = std::env::var("SKYWATCH_MIN_INTERVAL_MS") {
                if let Ok(interval) = interval.parse() {
                    if Self::validate_min_interval(interval).is_ok() {
                        self.min_interval_ms = Some(interval);
                    }
                }
            }
        }

        self
    }

    /// Build the final configuration with validation
    pub fn build(self) -> Result<CliConfig> {
        let defaults = CliConfig::default();

        let lobby_url = self.lobby_url.unwrap_or(defaults.lobby_url);
        let output_format = self.output_format.unwrap_or(defaults.output_format);
        let timeout = self.timeout.unwrap_or(defaults.timeout);
        let max_retries = self.max_retries.unwrap_or(defaults.max_retries);
        let min_interval_ms = self.min_interval_ms.unwrap_or(defaults.min_interval_ms);

        // Validate final values
        Self::validate_url(&lobby_url)?;
        Self::validate_output_format(&output_format)?;
        Self::validate_timeout(timeout)?;
        Self::validate_max_retries(max_retries)?;
        Self::validate_min_interval(min_interval_ms)?;

        Ok(CliConfig {
            lobby_url,
            output_format,
            verbose: self.verbose.unwrap_or(defaults.verbose),
            timeout,
            max_retries,
            min_interval_ms,
            retry_delay_ms: defaults.retry_delay_ms,
            retry_max_delay_ms: defaults.retry_max_delay_ms,
            session_lifetime_secs: defaults.session_lifetime_secs,
        })
    }

    /// Validate URL format
    fn validate_url(url: &str) -> Result<()> {
        if url.is_empty() {
            return Err(anyhow::anyhow!("Lobby URL cannot be empty"));
        }

        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(anyhow::anyhow!(
                "Lobby URL must start with http:// or https://"
            ));
        }

        Ok(())
    }

    /// Validate output format
    fn validate_output_format(format: &str) -> Result<()> {
        match format {
            "table" | "json" => Ok(()),
            _ => Err(anyhow::anyhow!(
                "Invalid output format '{}'. Must be 'table' or 'json'",
                format
            )),
        }
    }

    /// Validate timeout value
    fn validate_timeout(timeout: u64) -> Result<()> {
        if timeout == 0 {
            return Err(anyhow::anyhow!("Timeout must be greater than 0"));
        }

        if timeout > 300 {
            return Err(anyhow::anyhow!(
                "Timeout must be less than or equal to 300 seconds"
            ));
        }

        Ok(())
    }

    /// Validate retry ceiling
    fn validate_max_retries(retries: u32) -> Result<()> {
        if retries > 10 {
            return Err(anyhow::anyhow!("Retry ceiling must be at most 10"));
        }
        Ok(())
    }

    /// Validate request spacing
    fn validate_min_interval(interval_ms: u64) -> Result<()> {
        if interval_ms > 60_000 {
            return Err(anyhow::anyhow!(
                "Minimum request interval must be at most 60000 ms"
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_default_config() {
        let config = CliConfig::default();
        assert_eq!(config.lobby_url, "https://lobby.ogame.gameforge.com");
        assert_eq!(config.output_format, "table");
        assert!(!config.verbose);
        assert_eq!(config.timeout, 10);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.min_interval_ms, 1000);
    }

    #[test]
    fn test_config_serialization() {
        let config = CliConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: CliConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(config, parsed);
    }

    #[test]
    #[serial]
    fn test_config_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        std::env::set_var("XDG_CONFIG_HOME", dir.path());

        let config = CliConfig {
            timeout: 42,
            min_interval_ms: 2500,
            ..Default::default()
        };
        config.save().unwrap();

        let loaded = CliConfig::load().unwrap();
        assert_eq!(loaded, config);

        std::env::remove_var("XDG_CONFIG_HOME");
    }

    #[test]
    fn test_client_config_conversion() {
        let config = CliConfig {
            timeout: 20,
            max_retries: 5,
            retry_delay_ms: 250,
            min_interval_ms: 1500,
            session_lifetime_secs: 600,
            ..Default::default()
        };
        let client_config = config.client_config();

        assert_eq!(client_config.policy.timeout, Duration::from_secs(20));
        assert_eq!(client_config.policy.max_retries, 5);
        assert_eq!(
            client_config.policy.initial_backoff,
            Duration::from_millis(250)
        );
        assert_eq!(
            client_config.policy.min_interval,
            Duration::from_millis(1500)
        );
        assert_eq!(client_config.session_lifetime, Duration::from_secs(600));
    }

    #[test]
    fn test_builder_with_defaults() {
        let config = ConfigBuilder::new().build().unwrap();
        let defaults = CliConfig::default();
        assert_eq!(config, defaults);
    }

    #[test]
    fn test_builder_with_custom_values() {
        let config = ConfigBuilder::new()
            .with_lobby_url("http://lobby.example.com:8080")
            .unwrap()
            .with_output_format("json")
            .unwrap()
            .with_verbose(true)
            .with_timeout(30)
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(config.lobby_url, "http://lobby.example.com:8080");
        assert_eq!(config.output_format, "json");
        assert!(config.verbose);
        assert_eq!(config.timeout, 30);
    }

    #[test]
    fn test_builder_url_validation() {
        assert!(ConfigBuilder::new().with_lobby_url("").is_err());
        assert!(ConfigBuilder::new()
            .with_lobby_url("ftp://lobby.example.com")
            .is_err());

        assert!(ConfigBuilder::new()
            .with_lobby_url("http://localhost:3000")
            .is_ok());
        assert!(ConfigBuilder::new()
            .with_lobby_url("https://lobby.example.com")
            .is_ok());
    }

    #[test]
    fn test_builder_format_validation() {
        assert!(ConfigBuilder::new().with_output_format("xml").is_err());
        assert!(ConfigBuilder::new().with_output_format("table").is_ok());
        assert!(ConfigBuilder::new().with_output_format("json").is_ok());
    }

    #[test]
    fn test_builder_timeout_validation() {
        assert!(ConfigBuilder::new().with_timeout(0).is_err());
        assert!(ConfigBuilder::new().with_timeout(301).is_err());
        assert!(ConfigBuilder::new().with_timeout(1).is_ok());
        assert!(ConfigBuilder::new().with_timeout(300).is_ok());
    }

    #[test]
    #[serial]
    fn test_builder_with_env_overrides() {
        std::env::set_var("SKYWATCH_LOBBY", "http://env.example.com:9000");
        std::env::set_var("SKYWATCH_FORMAT", "json");
        std::env::set_var("SKYWATCH_VERBOSE", "true");
        std::env::set_var("SKYWATCH_TIMEOUT", "25");
        std::env::set_var("SKYWATCH_MAX_RETRIES", "5");
        std::env::set_var("SKYWATCH_MIN_INTERVAL_MS", "2000");

        let config = ConfigBuilder::new().with_env_overrides().build().unwrap();

        assert_eq!(config.lobby_url, "http://env.example.com:9000");
        assert_eq!(config.output_format, "json");
        assert!(config.verbose);
        assert_eq!(config.timeout, 25);
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.min_interval_ms, 2000);

        std::env::remove_var("SKYWATCH_LOBBY");
        std::env::remove_var("SKYWATCH_FORMAT");
        std::env::remove_var("SKYWATCH_VERBOSE");
        std::env::remove_var("SKYWATCH_TIMEOUT");
        std::env::remove_var("SKYWATCH_MAX_RETRIES");
        std::env::remove_var("SKYWATCH_MIN_INTERVAL_MS");
    }

    #[test]
    #[serial]
    fn test_builder_priority_chain() {
        std::env::set_var("SKYWATCH_LOBBY", "http://env.example.com:9000");
        std::env::set_var("SKYWATCH_TIMEOUT", "25");

        // CLI args should override env vars
        let config = ConfigBuilder::new()
            .with_env_overrides()
            .with_lobby_url("http://cli.example.com:7000")
            .unwrap()
            .build()
            .unwrap();

        // CLI arg wins
        assert_eq!(config.lobby_url, "http://cli.example.com:7000");
        // Env var applies for timeout
        assert_eq!(config.timeout, 25);

        std::env::remove_var("SKYWATCH_LOBBY");
        std::env::remove_var("SKYWATCH_TIMEOUT");
    }

    #[test]
    #[serial]
    fn test_builder_invalid_env_values_ignored() {
        std::env::set_var("SKYWATCH_TIMEOUT", "invalid");
        std::env::set_var("SKYWATCH_FORMAT", "xml");

        let config = ConfigBuilder::new().with_env_overrides().build().unwrap();

        // Should fall back to defaults
        assert_eq!(config.timeout, 10);
        assert_eq!(config.output_format, "table");

        std::env::remove_var("SKYWATCH_TIMEOUT");
        std::env::remove_var("SKYWATCH_FORMAT");
    }
}
