//! Domain-driven configuration for the test host
//!
//! Configuration is split by functional domain (logging, ipc, declared
//! extensions), loaded from YAML, overridden from `TESTHOST_` environment
//! variables and validated per domain.

pub mod domains;
pub mod error;
pub mod loader;
pub mod validation;

// Re-export main types
pub use error::{ConfigError, ConfigResult};
pub use loader::ConfigLoader;
pub use validation::Validatable;

// Re-export domain configurations
pub use domains::{
    extensions::{ExtensionConfig, ExtensionOptionConfig},
    ipc::IpcConfig,
    logging::{LogFormat, LogLevel, LoggingConfig},
    TestHostConfig,
};

// Re-export utilities
pub use domains::utils::serde_duration;
