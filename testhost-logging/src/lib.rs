//! Logging initialisation for the test host
//!
//! Library crates only emit `tracing` events; the binary installs the global
//! subscriber once through [`init_logging_from_config`].

pub mod init;

pub use init::{build_env_filter, init_logging_from_config};
