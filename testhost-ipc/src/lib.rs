//! Typed named-pipe IPC for the test host
//!
//! This crate provides the frame protocol, the serializer registry and the
//! channel used for communication between the test host and an external
//! controller over a local pipe.

pub mod channel;
pub mod error;
pub mod protocol;
pub mod serializer;
pub mod transport;

// Re-export commonly used types
pub use channel::{ChannelConfig, IncomingMessage, NamedPipeChannel};
pub use error::{IpcError, IpcResult};
pub use protocol::{
    read_frame, Frame, FrameKind, Handshake, IpcMessage, VoidResponse, DEFAULT_MAX_FRAME_SIZE,
    FRAME_HEADER_LEN, HANDSHAKE_MODULE, HANDSHAKE_PID, HANDSHAKE_VERSION, IPC_PROTOCOL_VERSION,
};
pub use serializer::{JsonSerializer, MessageSerializer, SerializerRegistry};
pub use transport::{NamedPipeClient, NamedPipeServer, PipeName};

pub use tokio_util::sync::CancellationToken;
