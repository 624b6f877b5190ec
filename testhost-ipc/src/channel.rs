//! Duplex framed-message channel over one connection
//!
//! A channel owns its stream through two background tasks. The reader task is
//! the only reader of the stream: it routes responses to the caller awaiting
//! them and queues requests and notifications for [`NamedPipeChannel::recv`].
//! The writer task is the only writer: callers hand it fully encoded frames
//! over a bounded queue and wait until their frame is flushed, so frames never
//! interleave, stay in FIFO order and a slow peer suspends its senders.
//!
//! The first error that ends either task is kept and returned by every later
//! operation on the channel; a clean close reports
//! [`IpcError::ConnectionClosed`].

use bytes::Bytes;
use std::any::Any;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio_util::sync::CancellationToken;

use crate::error::{IpcError, IpcResult};
use crate::protocol::{read_frame, Frame, FrameKind, IpcMessage, DEFAULT_MAX_FRAME_SIZE};
use crate::serializer::SerializerRegistry;

/// Frames waiting for the writer before senders are suspended
const OUTBOUND_QUEUE_CAPACITY: usize = 64;

/// Decoded messages waiting for [`NamedPipeChannel::recv`] before the reader
/// stops reading from the stream
const INBOUND_QUEUE_CAPACITY: usize = 64;

/// Channel tuning
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelConfig {
    /// Upper bound for awaiting a response
    pub request_timeout: Duration,
    /// Upper bound for establishing a client connection
    pub connect_timeout: Duration,
    /// Largest accepted payload in either direction
    pub max_frame_size: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }
}

type PendingRequests = Arc<Mutex<HashMap<u64, oneshot::Sender<IpcResult<Frame>>>>>;

/// First error that terminated the connection
type Termination = Arc<OnceLock<IpcError>>;

/// An encoded frame and the sender awaiting its write
struct OutboundFrame {
    bytes: Bytes,
    written: oneshot::Sender<IpcResult<()>>,
}

/// A decoded request or notification received from the peer
pub struct IncomingMessage {
    type_id: u32,
    kind: FrameKind,
    sequence: u64,
    message: Box<dyn Any + Send + Sync>,
}

impl IncomingMessage {
    pub fn type_id(&self) -> u32 {
        self.type_id
    }

    pub fn kind(&self) -> FrameKind {
        self.kind
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Whether the peer awaits a reply
    pub fn is_request(&self) -> bool {
        self.kind == FrameKind::Request
    }

    /// Whether the message carries a `T`
    pub fn is<T: IpcMessage>(&self) -> bool {
        self.type_id == T::TYPE_ID && self.message.is::<T>()
    }

    /// Borrow the message as `T`
    pub fn downcast_ref<T: IpcMessage>(&self) -> Option<&T> {
        self.message.downcast_ref::<T>()
    }

    /// Take the message as `T`
    pub fn into_message<T: IpcMessage>(self) -> IpcResult<T> {
        let type_id = self.type_id;
        self.message
            .downcast::<T>()
            .map(|boxed| *boxed)
            .map_err(|_| IpcError::UnexpectedResponse {
                expected: T::TYPE_ID,
                actual: type_id,
            })
    }
}

impl std::fmt::Debug for IncomingMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IncomingMessage")
            .field("type_id", &self.type_id)
            .field("kind", &self.kind)
            .field("sequence", &self.sequence)
            .finish_non_exhaustive()
    }
}

/// Typed message channel over a single duplex stream
pub struct NamedPipeChannel {
    registry: Arc<SerializerRegistry>,
    config: ChannelConfig,
    outbound: mpsc::Sender<OutboundFrame>,
    inbound: Mutex<mpsc::Receiver<IncomingMessage>>,
    pending: PendingRequests,
    next_sequence: AtomicU64,
    termination: Termination,
    shutdown: CancellationToken,
}

impl NamedPipeChannel {
    /// Take ownership of the stream and start the reader and writer tasks.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new<S>(stream: S, registry: Arc<SerializerRegistry>, config: ChannelConfig) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (read_half, write_half) = tokio::io::split(stream);
        let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_QUEUE_CAPACITY);
        let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_QUEUE_CAPACITY);
        let pending: PendingRequests = Arc::new(Mutex::new(HashMap::new()));
        let termination: Termination = Arc::new(OnceLock::new());
        let shutdown = CancellationToken::new();

        tokio::spawn(writer_task(
            write_half,
            outbound_rx,
            termination.clone(),
            shutdown.clone(),
        ));
        tokio::spawn(reader_task(
            read_half,
            ReaderContext {
                registry: registry.clone(),
                max_frame_size: config.max_frame_size,
                pending: pending.clone(),
                inbound: inbound_tx,
                termination: termination.clone(),
                shutdown: shutdown.clone(),
            },
        ));

        tracing::debug!(target: "ipc", "Channel opened");

        Self {
            registry,
            config,
            outbound: outbound_tx,
            inbound: Mutex::new(inbound_rx),
            pending,
            next_sequence: AtomicU64::new(1),
            termination,
            shutdown,
        }
    }

    pub fn registry(&self) -> &Arc<SerializerRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    /// Send a one-way notification, returning once it is flushed
    pub async fn send<T: IpcMessage>(&self, message: &T) -> IpcResult<()> {
        let payload = self.registry.encode(message)?;
        self.write(Frame::new(T::TYPE_ID, FrameKind::Notification, 0, payload))
            .await
    }

    /// Send a request and await the correlated response.
    ///
    /// Fails with [`IpcError::Cancelled`] when `cancel` fires and with
    /// [`IpcError::Timeout`] after the configured request timeout. In both
    /// cases the pending entry is removed and a late response is discarded.
    pub async fn request<Req, Resp>(
        &self,
        message: &Req,
        cancel: &CancellationToken,
    ) -> IpcResult<Resp>
    where
        Req: IpcMessage,
        Resp: IpcMessage,
    {
        let payload = self.registry.encode(message)?;
        let sequence = self.next_sequence.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();

        self.pending.lock().await.insert(sequence, tx);
        if self.shutdown.is_cancelled() {
            self.pending.lock().await.remove(&sequence);
            return Err(self.termination_error());
        }

        let outcome = tokio::select! {
            _ = cancel.cancelled() => Err(IpcError::Cancelled),
            _ = tokio::time::sleep(self.config.request_timeout) => Err(IpcError::Timeout),
            response = self.write_then_wait(
                Frame::new(Req::TYPE_ID, FrameKind::Request, sequence, payload),
                rx,
            ) => response,
        };

        let response = match outcome {
            Ok(response) => response,
            Err(e) => {
                self.pending.lock().await.remove(&sequence);
                tracing::debug!(target: "ipc", sequence, error = %e, "Request abandoned");
                return Err(e);
            }
        };

        if response.type_id != Resp::TYPE_ID {
            return Err(IpcError::UnexpectedResponse {
                expected: Resp::TYPE_ID,
                actual: response.type_id,
            });
        }

        self.registry.decode::<Resp>(&response.payload)
    }

    async fn write_then_wait(
        &self,
        frame: Frame,
        response: oneshot::Receiver<IpcResult<Frame>>,
    ) -> IpcResult<Frame> {
        self.write(frame).await?;
        response.await.unwrap_or_else(|_| Err(self.termination_error()))
    }

    /// Next request or notification from the peer.
    ///
    /// Only one receive is ever in flight; concurrent callers wait their turn.
    /// Messages already queued are delivered before the error that closed the
    /// connection.
    pub async fn recv(&self, cancel: &CancellationToken) -> IpcResult<IncomingMessage> {
        let mut inbound = self.inbound.lock().await;
        tokio::select! {
            _ = cancel.cancelled() => Err(IpcError::Cancelled),
            message = inbound.recv() => message.ok_or_else(|| self.termination_error()),
        }
    }

    /// Answer a request received through [`recv`](Self::recv)
    pub async fn reply<T: IpcMessage>(
        &self,
        incoming: &IncomingMessage,
        message: &T,
    ) -> IpcResult<()> {
        if !incoming.is_request() {
            return Err(IpcError::InvalidMessage(format!(
                "cannot reply to a {} (type {})",
                incoming.kind, incoming.type_id
            )));
        }

        let payload = self.registry.encode(message)?;
        self.write(Frame::new(
            T::TYPE_ID,
            FrameKind::Response,
            incoming.sequence,
            payload,
        ))
        .await
    }

    /// Stop both background tasks. Frames already queued are still written;
    /// pending requests fail with [`IpcError::ConnectionClosed`].
    pub fn close(&self) {
        if !self.shutdown.is_cancelled() {
            tracing::debug!(target: "ipc", "Closing channel");
        }
        self.shutdown.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Resolves once the connection has terminated for any reason
    pub async fn closed(&self) {
        self.shutdown.cancelled().await
    }

    /// Error that terminated the connection, if it did not close cleanly
    pub fn termination(&self) -> Option<&IpcError> {
        self.termination.get()
    }

    fn termination_error(&self) -> IpcError {
        self.termination
            .get()
            .cloned()
            .unwrap_or(IpcError::ConnectionClosed)
    }

    /// Queue a frame for the writer and wait until it is flushed
    async fn write(&self, frame: Frame) -> IpcResult<()> {
        if self.shutdown.is_cancelled() {
            return Err(self.termination_error());
        }

        let bytes = frame.encode(self.config.max_frame_size)?;
        let (written, flushed) = oneshot::channel();
        if self
            .outbound
            .send(OutboundFrame { bytes, written })
            .await
            .is_err()
        {
            return Err(self.termination_error());
        }

        flushed
            .await
            .unwrap_or_else(|_| Err(self.termination_error()))
    }
}

impl Drop for NamedPipeChannel {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Record the error ending the connection; the first one wins
fn terminate(termination: &Termination, error: IpcError) {
    if termination.set(error).is_err() {
        tracing::trace!(target: "ipc", "Connection already terminated");
    }
}

async fn writer_task<S>(
    mut writer: WriteHalf<S>,
    mut outbound: mpsc::Receiver<OutboundFrame>,
    termination: Termination,
    shutdown: CancellationToken,
) where
    S: AsyncRead + AsyncWrite,
{
    loop {
        let frame = tokio::select! {
            biased;
            _ = shutdown.cancelled() => {
                flush_queued(&mut writer, &mut outbound).await;
                break;
            }
            frame = outbound.recv() => match frame {
                Some(frame) => frame,
                None => break,
            },
        };

        match write_all_flush(&mut writer, &frame.bytes).await {
            Ok(()) => {
                let _ = frame.written.send(Ok(()));
            }
            Err(e) => {
                if e.kind() == std::io::ErrorKind::BrokenPipe {
                    tracing::debug!(target: "ipc", "Peer closed the pipe");
                } else {
                    tracing::error!(target: "ipc", error = %e, "Failed to write frame");
                }
                let error = IpcError::from(e);
                terminate(&termination, error.clone());
                let _ = frame.written.send(Err(error));
                break;
            }
        }
    }

    let _ = writer.shutdown().await;
    shutdown.cancel();
}

/// Write frames queued before the channel was closed
async fn flush_queued<W>(writer: &mut W, outbound: &mut mpsc::Receiver<OutboundFrame>)
where
    W: AsyncWrite + Unpin,
{
    while let Ok(frame) = outbound.try_recv() {
        let result = write_all_flush(writer, &frame.bytes)
            .await
            .map_err(IpcError::from);
        let failed = result.is_err();
        let _ = frame.written.send(result);
        if failed {
            break;
        }
    }
}

async fn write_all_flush<W>(writer: &mut W, bytes: &[u8]) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(bytes).await?;
    writer.flush().await
}

struct ReaderContext {
    registry: Arc<SerializerRegistry>,
    max_frame_size: usize,
    pending: PendingRequests,
    inbound: mpsc::Sender<IncomingMessage>,
    termination: Termination,
    shutdown: CancellationToken,
}

async fn reader_task<S>(mut reader: ReadHalf<S>, ctx: ReaderContext)
where
    S: AsyncRead + AsyncWrite,
{
    if let Err(e) = read_loop(&mut reader, &ctx).await {
        if e.is_fatal() {
            tracing::error!(target: "ipc", error = %e, "Protocol error, closing connection");
        } else {
            tracing::debug!(target: "ipc", error = %e, "Connection read failed");
        }
        terminate(&ctx.termination, e);
    }

    ctx.shutdown.cancel();

    let error = ctx
        .termination
        .get()
        .cloned()
        .unwrap_or(IpcError::ConnectionClosed);
    for (_, waiter) in ctx.pending.lock().await.drain() {
        let _ = waiter.send(Err(error.clone()));
    }
    tracing::debug!(target: "ipc", "Channel reader stopped");
}

/// Route inbound frames until shutdown, a clean end of stream, or an error
async fn read_loop<S>(reader: &mut ReadHalf<S>, ctx: &ReaderContext) -> IpcResult<()>
where
    S: AsyncRead + AsyncWrite,
{
    loop {
        let frame = tokio::select! {
            biased;
            _ = ctx.shutdown.cancelled() => return Ok(()),
            frame = read_frame(reader, ctx.max_frame_size) => frame?,
        };

        let Some(frame) = frame else {
            tracing::debug!(target: "ipc", "Peer closed the connection");
            return Ok(());
        };

        if frame.kind == FrameKind::Response {
            let waiter = ctx.pending.lock().await.remove(&frame.sequence);
            match waiter {
                Some(waiter) => {
                    let _ = waiter.send(Ok(frame));
                }
                None => tracing::debug!(
                    target: "ipc",
                    sequence = frame.sequence,
                    type_id = frame.type_id,
                    "Dropping response without a pending request"
                ),
            }
            continue;
        }

        let message = ctx
            .registry
            .decode_any(frame.type_id, &frame.payload)
            .inspect_err(|e| {
                tracing::error!(
                    target: "ipc",
                    type_id = frame.type_id,
                    error = %e,
                    "Cannot decode inbound message"
                )
            })?;

        let incoming = IncomingMessage {
            type_id: frame.type_id,
            kind: frame.kind,
            sequence: frame.sequence,
            message,
        };

        // A full queue suspends reading until the application catches up
        tokio::select! {
            biased;
            _ = ctx.shutdown.cancelled() => return Ok(()),
            sent = ctx.inbound.send(incoming) => {
                if sent.is_err() {
                    tracing::debug!(target: "ipc", "No receiver for inbound message");
                }
            }
        }
    }
}
