//! Subcommand implementations

pub mod pipe;
pub mod validate;

use testhost_config::IpcConfig;
use testhost_ipc::ChannelConfig;

/// Channel tuning taken from the `ipc` configuration domain
pub fn channel_config(config: &IpcConfig) -> ChannelConfig {
    ChannelConfig {
        request_timeout: config.request_timeout,
        connect_timeout: config.connect_timeout,
        max_frame_size: config.max_frame_size,
    }
}
