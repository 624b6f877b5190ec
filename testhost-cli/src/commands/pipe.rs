//! `testhost serve` and `testhost ping`: both ends of the host pipe

use anyhow::{Context, Result};
use std::sync::Arc;
use testhost_config::TestHostConfig;
use testhost_ipc::{
    CancellationToken, Handshake, IpcError, NamedPipeChannel, NamedPipeClient, NamedPipeServer,
    PipeName, SerializerRegistry, VoidResponse, HANDSHAKE_MODULE,
};

use super::channel_config;

/// Module name announced in handshakes sent by this binary
pub const HOST_MODULE: &str = "testhost";

fn resolve_pipe_name(config: &TestHostConfig, pipe: Option<&str>) -> Result<PipeName> {
    match pipe.or(config.ipc.pipe_name.as_deref()) {
        Some(name) => PipeName::new(name).context("Invalid pipe name"),
        None => Ok(PipeName::unique()),
    }
}

/// Accept connections until `shutdown` is cancelled, serving each one on its
/// own task
pub async fn serve_command(
    config: &TestHostConfig,
    pipe: Option<&str>,
    shutdown: CancellationToken,
) -> Result<()> {
    let name = resolve_pipe_name(config, pipe)?;
    let registry = Arc::new(SerializerRegistry::with_defaults());
    let mut server = NamedPipeServer::bind(name, registry, channel_config(&config.ipc))
        .context("Failed to bind pipe server")?;

    // Controllers read the pipe name from stdout
    println!("{}", server.name());

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            accepted = server.accept() => match accepted {
                Ok(channel) => {
                    tokio::spawn(handle_connection(channel, shutdown.child_token()));
                }
                Err(e) if e.is_retryable() => {
                    tracing::warn!(target: "ipc", error = %e, "Failed to accept connection");
                }
                Err(e) => return Err(e).context("Pipe server failed"),
            },
        }
    }

    tracing::info!(target: "ipc", pipe = %server.name(), "Pipe server stopped");
    Ok(())
}

/// Answer handshakes with the host's own handshake and acknowledge any other
/// request with a [`VoidResponse`]
pub async fn handle_connection(channel: NamedPipeChannel, shutdown: CancellationToken) {
    loop {
        let incoming = match channel.recv(&shutdown).await {
            Ok(incoming) => incoming,
            Err(IpcError::Cancelled | IpcError::ConnectionClosed) => break,
            Err(e) => {
                tracing::warn!(target: "ipc", error = %e, "Connection failed");
                break;
            }
        };

        if let Some(handshake) = incoming.downcast_ref::<Handshake>() {
            tracing::debug!(
                target: "ipc",
                version = handshake.protocol_version,
                module = ?handshake.property(HANDSHAKE_MODULE),
                "Handshake received"
            );

            let compatible = handshake.ensure_compatible();
            if let Err(e) = channel
                .reply(&incoming, &Handshake::for_current_process(HOST_MODULE))
                .await
            {
                tracing::warn!(target: "ipc", error = %e, "Failed to answer handshake");
                break;
            }
            if let Err(e) = compatible {
                tracing::warn!(target: "ipc", error = %e, "Closing incompatible connection");
                break;
            }
        } else if incoming.is_request() {
            if let Err(e) = channel.reply(&incoming, &VoidResponse).await {
                tracing::warn!(target: "ipc", error = %e, "Failed to acknowledge request");
                break;
            }
        } else {
            tracing::debug!(target: "ipc", type_id = incoming.type_id(), "Notification ignored");
        }
    }

    channel.close();
}

/// Connect to a host and exchange handshakes, returning the host's
pub async fn ping_command(config: &TestHostConfig, pipe: &str) -> Result<Handshake> {
    let name = PipeName::new(pipe).context("Invalid pipe name")?;
    let registry = Arc::new(SerializerRegistry::with_defaults());
    let channel = NamedPipeClient::connect(&name, registry, channel_config(&config.ipc))
        .await
        .with_context(|| format!("Failed to connect to pipe '{}'", name))?;

    let handshake: Handshake = channel
        .request(
            &Handshake::for_current_process(HOST_MODULE),
            &CancellationToken::new(),
        )
        .await
        .context("Handshake failed")?;
    handshake.ensure_compatible()?;

    channel.close();
    Ok(handshake)
}
