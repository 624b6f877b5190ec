//! Platform pipe transport: named pipes on Windows, Unix domain sockets
//! elsewhere

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::channel::{ChannelConfig, NamedPipeChannel};
use crate::error::{IpcError, IpcResult};
use crate::serializer::SerializerRegistry;

/// Delay between connection attempts while the server is not ready
const CONNECT_RETRY_DELAY: Duration = Duration::from_millis(50);

/// Logical pipe name shared by server and client
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PipeName {
    name: String,
}

impl PipeName {
    /// Create a pipe name; path separators are not allowed
    pub fn new(name: impl Into<String>) -> IpcResult<Self> {
        let name: String = name.into();
        let name = name.trim();
        if name.is_empty() || name.contains(['/', '\\']) {
            return Err(IpcError::InvalidPipeName(name.to_string()));
        }
        Ok(Self {
            name: name.to_string(),
        })
    }

    /// Fresh name, unique per call
    pub fn unique() -> Self {
        Self {
            name: format!("testhost-{}", Uuid::new_v4().simple()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Platform path of the pipe
    #[cfg(unix)]
    pub fn path(&self) -> PathBuf {
        std::env::temp_dir().join(format!("{}.sock", self.name))
    }

    /// Platform path of the pipe
    #[cfg(windows)]
    pub fn path(&self) -> PathBuf {
        PathBuf::from(format!(r"\\.\pipe\{}", self.name))
    }
}

impl fmt::Display for PipeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Accepting side of a pipe; every accepted connection becomes a channel
pub struct NamedPipeServer {
    name: PipeName,
    registry: Arc<SerializerRegistry>,
    config: ChannelConfig,
    #[cfg(unix)]
    listener: tokio::net::UnixListener,
    #[cfg(windows)]
    next_instance: tokio::net::windows::named_pipe::NamedPipeServer,
}

impl NamedPipeServer {
    /// Start listening on the pipe. A stale socket file left by a previous
    /// run is replaced.
    #[cfg(unix)]
    pub fn bind(
        name: PipeName,
        registry: Arc<SerializerRegistry>,
        config: ChannelConfig,
    ) -> IpcResult<Self> {
        let path = name.path();
        if path.exists() {
            tracing::debug!(target: "ipc", path = %path.display(), "Removing stale socket");
            std::fs::remove_file(&path)?;
        }

        let listener = tokio::net::UnixListener::bind(&path)?;
        tracing::info!(
            target: "ipc",
            pipe = %name,
            path = %path.display(),
            "Pipe server listening"
        );

        Ok(Self {
            name,
            registry,
            config,
            listener,
        })
    }

    /// Start listening on the pipe
    #[cfg(windows)]
    pub fn bind(
        name: PipeName,
        registry: Arc<SerializerRegistry>,
        config: ChannelConfig,
    ) -> IpcResult<Self> {
        use tokio::net::windows::named_pipe::ServerOptions;

        let next_instance = ServerOptions::new()
            .first_pipe_instance(true)
            .create(name.path())?;
        tracing::info!(target: "ipc", pipe = %name, "Pipe server listening");

        Ok(Self {
            name,
            registry,
            config,
            next_instance,
        })
    }

    pub fn name(&self) -> &PipeName {
        &self.name
    }

    /// Wait for the next client connection
    #[cfg(unix)]
    pub async fn accept(&mut self) -> IpcResult<NamedPipeChannel> {
        let (stream, _) = self.listener.accept().await?;
        tracing::debug!(target: "ipc", pipe = %self.name, "Client connected");
        Ok(NamedPipeChannel::new(
            stream,
            self.registry.clone(),
            self.config.clone(),
        ))
    }

    /// Wait for the next client connection
    #[cfg(windows)]
    pub async fn accept(&mut self) -> IpcResult<NamedPipeChannel> {
        use tokio::net::windows::named_pipe::ServerOptions;

        self.next_instance.connect().await?;
        let replacement = ServerOptions::new().create(self.name.path())?;
        let connected = std::mem::replace(&mut self.next_instance, replacement);
        tracing::debug!(target: "ipc", pipe = %self.name, "Client connected");
        Ok(NamedPipeChannel::new(
            connected,
            self.registry.clone(),
            self.config.clone(),
        ))
    }
}

#[cfg(unix)]
impl Drop for NamedPipeServer {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(self.name.path());
    }
}

/// Connecting side of a pipe
pub struct NamedPipeClient;

impl NamedPipeClient {
    /// Connect to a server, retrying until it is ready or the configured
    /// connect timeout elapses
    pub async fn connect(
        name: &PipeName,
        registry: Arc<SerializerRegistry>,
        config: ChannelConfig,
    ) -> IpcResult<NamedPipeChannel> {
        let stream = tokio::time::timeout(config.connect_timeout, open_with_retry(name))
            .await
            .map_err(|_| IpcError::Timeout)??;

        tracing::debug!(target: "ipc", pipe = %name, "Connected to pipe server");
        Ok(NamedPipeChannel::new(stream, registry, config))
    }
}

#[cfg(unix)]
async fn open_with_retry(name: &PipeName) -> IpcResult<tokio::net::UnixStream> {
    use std::io::ErrorKind;

    let path = name.path();
    loop {
        match tokio::net::UnixStream::connect(&path).await {
            Ok(stream) => return Ok(stream),
            Err(e) if matches!(e.kind(), ErrorKind::NotFound | ErrorKind::ConnectionRefused) => {
                tracing::trace!(target: "ipc", pipe = %name, "Pipe server not ready");
            }
            Err(e) => return Err(e.into()),
        }
        tokio::time::sleep(CONNECT_RETRY_DELAY).await;
    }
}

#[cfg(windows)]
async fn open_with_retry(
    name: &PipeName,
) -> IpcResult<tokio::net::windows::named_pipe::NamedPipeClient> {
    use std::io::ErrorKind;
    use tokio::net::windows::named_pipe::ClientOptions;

    const ERROR_PIPE_BUSY: i32 = 231;

    let path = name.path();
    loop {
        match ClientOptions::new().open(&path) {
            Ok(client) => return Ok(client),
            Err(e)
                if e.raw_os_error() == Some(ERROR_PIPE_BUSY) || e.kind() == ErrorKind::NotFound =>
            {
                tracing::trace!(target: "ipc", pipe = %name, "Pipe server not ready");
            }
            Err(e) => return Err(e.into()),
        }
        tokio::time::sleep(CONNECT_RETRY_DELAY).await;
    }
}
