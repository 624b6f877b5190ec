//! Domain-specific configuration modules

pub mod extensions;
pub mod ipc;
pub mod logging;
pub mod utils;

use crate::error::ConfigResult;
use crate::validation::Validatable;
use serde::{Deserialize, Serialize};

/// Main test host configuration combining all domains
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct TestHostConfig {
    /// Logging configuration
    #[serde(default)]
    pub logging: logging::LoggingConfig,

    /// Pipe and channel configuration
    #[serde(default)]
    pub ipc: ipc::IpcConfig,

    /// Extension option providers
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extensions: Vec<extensions::ExtensionConfig>,
}

impl TestHostConfig {
    /// Validate all domain configurations
    pub fn validate_all(&self) -> ConfigResult<()> {
        self.logging.validate()?;
        self.ipc.validate()?;
        extensions::validate_extensions(&self.extensions)?;
        Ok(())
    }

    /// Generate a sample configuration file
    pub fn generate_sample() -> String {
        let config = TestHostConfig::default();
        serde_yaml::to_string(&config)
            .unwrap_or_else(|_| "# Failed to generate sample config".to_string())
    }
}
