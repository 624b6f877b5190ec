//! CLI argument parsing definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Set the log level (trace, debug, info, warn, error)
    #[arg(long, value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate a test host command line against the declared options
    Validate {
        /// Command line to validate (example: testhost validate -- --timeout 10m)
        #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "ARGS")]
        args: Vec<String>,
    },

    /// Host side: accept pipe connections and answer handshakes
    Serve {
        /// Pipe name (defaults to the configured name, or a generated one)
        #[arg(long, value_name = "NAME")]
        pipe: Option<String>,
    },

    /// Controller side: connect to a host and exchange a handshake
    Ping {
        /// Pipe name of the host
        #[arg(long, value_name = "NAME")]
        pipe: String,
    },
}
