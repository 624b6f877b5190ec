//! Configuration loading and environment variable handling

use crate::domains::TestHostConfig;
use crate::error::{ConfigError, ConfigResult};
use std::path::Path;
use std::str::FromStr;

/// Configuration loader with environment variable support
pub struct ConfigLoader {
    /// Environment variable prefix
    prefix: String,
}

impl ConfigLoader {
    /// Create a new config loader with default prefix
    pub fn new() -> Self {
        Self {
            prefix: "TESTHOST".to_string(),
        }
    }

    /// Create a new config loader with custom prefix
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Load configuration from a YAML file with environment overrides
    pub fn from_file(&self, path: impl AsRef<Path>) -> ConfigResult<TestHostConfig> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let mut config: TestHostConfig = if content.trim().is_empty() {
            TestHostConfig::default()
        } else {
            serde_yaml::from_str(&content)?
        };

        // Apply environment variable overrides
        self.apply_env_overrides(&mut config)?;

        // Validate all domains
        config.validate_all()?;

        tracing::debug!(
            target: "config",
            path = %path.display(),
            extensions = config.extensions.len(),
            "Configuration loaded"
        );

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env(&self) -> ConfigResult<TestHostConfig> {
        let mut config = TestHostConfig::default();
        self.apply_env_overrides(&mut config)?;
        config.validate_all()?;
        Ok(config)
    }

    /// Load configuration with fallback chain
    pub fn load(&self, config_path: Option<impl AsRef<Path>>) -> ConfigResult<TestHostConfig> {
        match config_path {
            Some(path) => self.from_file(path),
            None => self.from_env(),
        }
    }

    /// Apply environment variable overrides to configuration
    fn apply_env_overrides(&self, config: &mut TestHostConfig) -> ConfigResult<()> {
        self.apply_logging_overrides(&mut config.logging)?;
        self.apply_ipc_overrides(&mut config.ipc)?;
        Ok(())
    }

    /// Apply logging config overrides
    fn apply_logging_overrides(
        &self,
        config: &mut crate::domains::logging::LoggingConfig,
    ) -> ConfigResult<()> {
        if let Ok(log_level) = self.get_env_var("LOG_LEVEL") {
            config.level = crate::domains::logging::LogLevel::from_str(&log_level)
                .map_err(|_| ConfigError::EnvError(format!("Invalid LOG_LEVEL: {}", log_level)))?;
        }

        if let Ok(format) = self.get_env_var("LOG_FORMAT") {
            config.format = crate::domains::logging::LogFormat::from_str(&format)
                .map_err(|_| ConfigError::EnvError(format!("Invalid LOG_FORMAT: {}", format)))?;
        }

        Ok(())
    }

    /// Apply IPC config overrides
    fn apply_ipc_overrides(&self, config: &mut crate::domains::ipc::IpcConfig) -> ConfigResult<()> {
        if let Ok(pipe_name) = self.get_env_var("PIPE_NAME") {
            config.pipe_name = Some(pipe_name);
        }

        if let Ok(timeout) = self.get_env_var("IPC_REQUEST_TIMEOUT") {
            let seconds: u64 = timeout.parse().map_err(|e| {
                ConfigError::EnvError(format!("Invalid IPC_REQUEST_TIMEOUT: {}", e))
            })?;
            config.request_timeout = std::time::Duration::from_secs(seconds);
        }

        if let Ok(max_frame_size) = self.get_env_var("IPC_MAX_FRAME_SIZE") {
            config.max_frame_size = max_frame_size.parse().map_err(|e| {
                ConfigError::EnvError(format!("Invalid IPC_MAX_FRAME_SIZE: {}", e))
            })?;
        }

        Ok(())
    }

    /// Get environment variable with prefix
    fn get_env_var(&self, name: &str) -> Result<String, std::env::VarError> {
        std::env::var(format!("{}_{}", self.prefix, name))
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
