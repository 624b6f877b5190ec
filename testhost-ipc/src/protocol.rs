//! IPC protocol definitions: frame layout and built-in message types

use bytes::{Buf, BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::{IpcError, IpcResult};

/// IPC protocol version for compatibility checking
pub const IPC_PROTOCOL_VERSION: u32 = 1;

/// Header size: payload length, type id, kind, sequence
pub const FRAME_HEADER_LEN: usize = 4 + 4 + 1 + 8;

/// Default upper bound for a single frame payload (16 MiB)
pub const DEFAULT_MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Role of a frame in the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FrameKind {
    /// Expects a response carrying the same sequence number
    Request = 0,
    /// Answers the request with the same sequence number
    Response = 1,
    /// One-way message
    Notification = 2,
}

impl TryFrom<u8> for FrameKind {
    type Error = IpcError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Request),
            1 => Ok(Self::Response),
            2 => Ok(Self::Notification),
            other => Err(IpcError::MalformedFrame(format!(
                "unknown frame kind {}",
                other
            ))),
        }
    }
}

impl fmt::Display for FrameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Request => write!(f, "request"),
            Self::Response => write!(f, "response"),
            Self::Notification => write!(f, "notification"),
        }
    }
}

/// One complete typed message unit on the wire.
///
/// Layout (little-endian): `u32 payload length`, `u32 type id`, `u8 kind`,
/// `u64 sequence`, then the payload bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub type_id: u32,
    pub kind: FrameKind,
    pub sequence: u64,
    pub payload: Bytes,
}

impl Frame {
    pub fn new(type_id: u32, kind: FrameKind, sequence: u64, payload: impl Into<Bytes>) -> Self {
        Self {
            type_id,
            kind,
            sequence,
            payload: payload.into(),
        }
    }

    /// Encode header and payload into one contiguous buffer
    pub fn encode(&self, max_frame_size: usize) -> IpcResult<Bytes> {
        if self.payload.len() > max_frame_size || self.payload.len() > u32::MAX as usize {
            return Err(IpcError::FrameTooLarge {
                size: self.payload.len(),
                max: max_frame_size,
            });
        }

        let mut buf = BytesMut::with_capacity(FRAME_HEADER_LEN + self.payload.len());
        buf.put_u32_le(self.payload.len() as u32);
        buf.put_u32_le(self.type_id);
        buf.put_u8(self.kind as u8);
        buf.put_u64_le(self.sequence);
        buf.put_slice(&self.payload);
        Ok(buf.freeze())
    }
}

/// Read one frame from the stream.
///
/// Returns `Ok(None)` on a clean end of stream at a frame boundary. A stream
/// ending inside a frame is reported as [`IpcError::ConnectionClosed`].
/// Nothing is returned to the caller until the whole frame has been read.
pub async fn read_frame<R>(reader: &mut R, max_frame_size: usize) -> IpcResult<Option<Frame>>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; FRAME_HEADER_LEN];
    let mut filled = 0;
    while filled < FRAME_HEADER_LEN {
        let read = reader.read(&mut header[filled..]).await?;
        if read == 0 {
            if filled == 0 {
                return Ok(None);
            }
            return Err(IpcError::ConnectionClosed);
        }
        filled += read;
    }

    let mut cursor = &header[..];
    let length = cursor.get_u32_le() as usize;
    let type_id = cursor.get_u32_le();
    let kind = FrameKind::try_from(cursor.get_u8())?;
    let sequence = cursor.get_u64_le();

    if length > max_frame_size {
        return Err(IpcError::FrameTooLarge {
            size: length,
            max: max_frame_size,
        });
    }

    let mut payload = vec![0u8; length];
    reader.read_exact(&mut payload).await?;

    Ok(Some(Frame::new(type_id, kind, sequence, payload)))
}

/// A message type that can travel over a channel.
///
/// `TYPE_ID` selects the serializer on both peers and must be unique within a
/// [`SerializerRegistry`](crate::SerializerRegistry).
pub trait IpcMessage: Send + Sync + 'static {
    const TYPE_ID: u32;
}

/// Handshake property: process id of the sender
pub const HANDSHAKE_PID: &str = "pid";
/// Handshake property: module name of the sender
pub const HANDSHAKE_MODULE: &str = "module";
/// Handshake property: crate version of the sender
pub const HANDSHAKE_VERSION: &str = "version";

/// First request exchanged on a new connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Handshake {
    pub protocol_version: u32,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

impl Handshake {
    /// Create a handshake for the current protocol version
    pub fn new() -> Self {
        Self {
            protocol_version: IPC_PROTOCOL_VERSION,
            properties: BTreeMap::new(),
        }
    }

    /// Handshake describing the current process
    pub fn for_current_process(module: impl Into<String>) -> Self {
        Self::new()
            .with_property(HANDSHAKE_PID, std::process::id().to_string())
            .with_property(HANDSHAKE_MODULE, module)
            .with_property(HANDSHAKE_VERSION, env!("CARGO_PKG_VERSION"))
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    /// Check if protocol version is compatible
    pub fn is_compatible(&self) -> bool {
        self.protocol_version == IPC_PROTOCOL_VERSION
    }

    /// Fail with a version mismatch when the peer speaks another protocol
    pub fn ensure_compatible(&self) -> IpcResult<()> {
        if self.is_compatible() {
            Ok(())
        } else {
            Err(IpcError::ProtocolVersionMismatch {
                expected: IPC_PROTOCOL_VERSION,
                actual: self.protocol_version,
            })
        }
    }
}

impl Default for Handshake {
    fn default() -> Self {
        Self::new()
    }
}

impl IpcMessage for Handshake {
    const TYPE_ID: u32 = 1;
}

/// Empty acknowledgement for requests without a meaningful answer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoidResponse;

impl IpcMessage for VoidResponse {
    const TYPE_ID: u32 = 0;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_frame_layout() {
        let frame = Frame::new(7, FrameKind::Request, 42, vec![1u8, 2, 3]);
        let encoded = frame.encode(DEFAULT_MAX_FRAME_SIZE).unwrap();

        assert_eq!(encoded.len(), FRAME_HEADER_LEN + 3);
        assert_eq!(&encoded[0..4], &3u32.to_le_bytes());
        assert_eq!(&encoded[4..8], &7u32.to_le_bytes());
        assert_eq!(encoded[8], 0);
        assert_eq!(&encoded[9..17], &42u64.to_le_bytes());

        let mut reader = &encoded[..];
        let decoded = read_frame(&mut reader, DEFAULT_MAX_FRAME_SIZE)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(decoded, frame);
        assert_eq!(read_frame(&mut reader, DEFAULT_MAX_FRAME_SIZE).await, Ok(None));
    }

    #[tokio::test]
    async fn test_truncated_frame() {
        let encoded = Frame::new(1, FrameKind::Notification, 0, vec![9u8; 8])
            .encode(DEFAULT_MAX_FRAME_SIZE)
            .unwrap();

        let mut header_only = &encoded[..5];
        assert_eq!(
            read_frame(&mut header_only, DEFAULT_MAX_FRAME_SIZE).await,
            Err(IpcError::ConnectionClosed)
        );

        let mut partial_payload = &encoded[..FRAME_HEADER_LEN + 2];
        assert_eq!(
            read_frame(&mut partial_payload, DEFAULT_MAX_FRAME_SIZE).await,
            Err(IpcError::ConnectionClosed)
        );
    }

    #[tokio::test]
    async fn test_malformed_frames() {
        let mut encoded = Frame::new(1, FrameKind::Request, 1, vec![0u8; 4])
            .encode(DEFAULT_MAX_FRAME_SIZE)
            .unwrap()
            .to_vec();

        let mut oversized = &encoded[..];
        assert_eq!(
            read_frame(&mut oversized, 2).await,
            Err(IpcError::FrameTooLarge { size: 4, max: 2 })
        );

        encoded[8] = 9;
        let mut bad_kind = &encoded[..];
        assert!(matches!(
            read_frame(&mut bad_kind, DEFAULT_MAX_FRAME_SIZE).await,
            Err(IpcError::MalformedFrame(_))
        ));

        assert!(Frame::new(1, FrameKind::Request, 1, vec![0u8; 4])
            .encode(3)
            .is_err());
    }

    #[test]
    fn test_handshake_compatibility() {
        let handshake = Handshake::for_current_process("testhost");
        assert!(handshake.is_compatible());
        assert_eq!(handshake.property(HANDSHAKE_MODULE), Some("testhost"));
        assert!(handshake.property(HANDSHAKE_PID).is_some());

        let old = Handshake {
            protocol_version: 0,
            properties: BTreeMap::new(),
        };
        assert_eq!(
            old.ensure_compatible(),
            Err(IpcError::ProtocolVersionMismatch {
                expected: IPC_PROTOCOL_VERSION,
                actual: 0
            })
        );
    }
}
