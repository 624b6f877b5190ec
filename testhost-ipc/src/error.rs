//! IPC error types

use thiserror::Error;

/// IPC error types
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IpcError {
    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Deserialization error
    #[error("Deserialization error: {0}")]
    DeserializationError(String),

    /// IO error
    #[error("IO error: {0}")]
    IoError(String),

    /// Connection closed
    #[error("Connection closed")]
    ConnectionClosed,

    /// Protocol version mismatch
    #[error("Protocol version mismatch: expected {expected}, got {actual}")]
    ProtocolVersionMismatch { expected: u32, actual: u32 },

    /// Timeout waiting for response
    #[error("Timeout waiting for response")]
    Timeout,

    /// The caller cancelled the pending operation
    #[error("Operation cancelled")]
    Cancelled,

    /// No serializer for the message type identifier
    #[error("No serializer registered for message type {type_id}")]
    NoSerializerRegistered { type_id: u32 },

    /// Frame header or payload could not be decoded
    #[error("Malformed frame: {0}")]
    MalformedFrame(String),

    /// Frame payload exceeds the configured limit
    #[error("Frame of {size} bytes exceeds the maximum of {max} bytes")]
    FrameTooLarge { size: usize, max: usize },

    /// Response type does not match the awaited type
    #[error("Unexpected response type: expected {expected}, got {actual}")]
    UnexpectedResponse { expected: u32, actual: u32 },

    /// Invalid message format
    #[error("Invalid message format: {0}")]
    InvalidMessage(String),

    /// Pipe name cannot be used
    #[error("Invalid pipe name '{0}'")]
    InvalidPipeName(String),
}

/// Result alias for IPC operations
pub type IpcResult<T> = Result<T, IpcError>;

impl IpcError {
    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            IpcError::IoError(_) | IpcError::Timeout | IpcError::ConnectionClosed
        )
    }

    /// Check if this error indicates a fatal condition for the connection
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            IpcError::ProtocolVersionMismatch { .. }
                | IpcError::InvalidMessage(_)
                | IpcError::NoSerializerRegistered { .. }
                | IpcError::MalformedFrame(_)
                | IpcError::FrameTooLarge { .. }
        )
    }
}

impl From<std::io::Error> for IpcError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::UnexpectedEof
            | std::io::ErrorKind::BrokenPipe
            | std::io::ErrorKind::ConnectionReset => IpcError::ConnectionClosed,
            _ => IpcError::IoError(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for IpcError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_io() {
            IpcError::IoError(err.to_string())
        } else if err.is_data() || err.is_syntax() || err.is_eof() {
            IpcError::DeserializationError(err.to_string())
        } else {
            IpcError::SerializationError(err.to_string())
        }
    }
}
