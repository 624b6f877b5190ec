use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use testhost_config::{ConfigLoader, LogLevel, TestHostConfig};
use testhost_ipc::{CancellationToken, HANDSHAKE_MODULE, HANDSHAKE_PID};
use testhost_logging::init_logging_from_config;
use testhost_options::ProcessModuleInfo;
use tracing::{debug, info, warn};

mod cli;
mod commands;
mod console;

use cli::{Cli, Commands};
use commands::{pipe, validate};
use console::{ConsoleHelp, ConsoleOutput};

/// Load configuration from file or use defaults
fn load_config(config_path: Option<&PathBuf>) -> Result<TestHostConfig> {
    let loader = ConfigLoader::new();

    match config_path {
        Some(path) => {
            if path.exists() {
                loader
                    .from_file(path)
                    .context(format!("Failed to load configuration from {:?}", path))
            } else {
                warn!("Configuration file not found: {:?}. Using defaults.", path);
                loader
                    .from_env()
                    .context("Failed to load configuration from environment")
            }
        }
        None => {
            debug!("No configuration file specified. Loading from environment or defaults.");
            loader
                .from_env()
                .context("Failed to load configuration from environment")
        }
    }
}

/// Cancelled on Ctrl-C
fn shutdown_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let signalled = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown requested");
        }
        signalled.cancel();
    });
    token
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration first
    let mut config = load_config(cli.config.as_ref())?;

    if let Some(level) = &cli.log_level {
        config.logging.level = level
            .parse::<LogLevel>()
            .map_err(anyhow::Error::msg)
            .context("Invalid --log-level")?;
    }
    init_logging_from_config(&config.logging)?;

    debug!("Test host CLI starting");

    match &cli.command {
        Commands::Validate { args } => {
            let registry = validate::build_registry(&config)?;
            let help = ConsoleHelp::new(ProcessModuleInfo);

            if !validate::validate_command(registry, args, &ConsoleOutput, &help).await {
                std::process::exit(1);
            }
            info!("Command line is valid");
        }
        Commands::Serve { pipe: name } => {
            pipe::serve_command(&config, name.as_deref(), shutdown_on_ctrl_c()).await?;
        }
        Commands::Ping { pipe: name } => {
            let handshake = pipe::ping_command(&config, name).await?;
            println!(
                "Connected to {} (pid {}), protocol version {}",
                handshake.property(HANDSHAKE_MODULE).unwrap_or("unknown"),
                handshake.property(HANDSHAKE_PID).unwrap_or("unknown"),
                handshake.protocol_version
            );
        }
    }

    Ok(())
}
