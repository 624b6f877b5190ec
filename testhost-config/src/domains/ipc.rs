//! IPC channel configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::ConfigResult;
use crate::validation::{validate_identifier, validate_positive, Validatable};

/// Pipe and channel settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IpcConfig {
    /// Pipe name to serve or connect to; a unique name is generated when
    /// absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pipe_name: Option<String>,

    /// Time to wait for a response to a request
    #[serde(with = "crate::domains::utils::serde_duration")]
    pub request_timeout: Duration,

    /// Time to wait for the pipe server to accept a connection
    #[serde(with = "crate::domains::utils::serde_duration")]
    pub connect_timeout: Duration,

    /// Largest accepted frame payload in bytes
    pub max_frame_size: usize,
}

impl Default for IpcConfig {
    fn default() -> Self {
        Self {
            pipe_name: None,
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            max_frame_size: 16 * 1024 * 1024,
        }
    }
}

impl Validatable for IpcConfig {
    fn validate(&self) -> ConfigResult<()> {
        if let Some(pipe_name) = &self.pipe_name {
            validate_identifier(pipe_name, "pipe_name", self.domain_name())?;
        }

        validate_positive(self.request_timeout.as_secs(), "request_timeout", self.domain_name())?;
        validate_positive(self.connect_timeout.as_secs(), "connect_timeout", self.domain_name())?;
        validate_positive(self.max_frame_size, "max_frame_size", self.domain_name())?;

        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "ipc"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ipc_defaults() {
        let config = IpcConfig::default();
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_ipc_validation() {
        let config = IpcConfig {
            pipe_name: Some("host/pipe".to_string()),
            ..IpcConfig::default()
        };
        assert!(config.validate().is_err());

        let config = IpcConfig {
            max_frame_size: 0,
            ..IpcConfig::default()
        };
        assert!(config.validate().is_err());

        let config = IpcConfig {
            request_timeout: Duration::ZERO,
            ..IpcConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_ipc_yaml() {
        let config: IpcConfig =
            serde_yaml::from_str("pipe_name: host\nrequest_timeout: 5\n").unwrap();
        assert_eq!(config.pipe_name.as_deref(), Some("host"));
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.max_frame_size, IpcConfig::default().max_frame_size);
    }
}
