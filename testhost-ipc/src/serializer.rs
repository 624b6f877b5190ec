//! Message serializers and the registry mapping type ids to them

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::error::{IpcError, IpcResult};
use crate::protocol::{Handshake, IpcMessage, VoidResponse};

/// Encodes and decodes one message type.
///
/// The channel never inspects payloads; it only hands them to the serializer
/// registered for the frame's type id.
pub trait MessageSerializer: Send + Sync {
    fn serialize(&self, message: &dyn Any) -> IpcResult<Vec<u8>>;

    fn deserialize(&self, payload: &[u8]) -> IpcResult<Box<dyn Any + Send + Sync>>;
}

/// serde_json serializer for `T`
pub struct JsonSerializer<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonSerializer<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for JsonSerializer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> MessageSerializer for JsonSerializer<T>
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    fn serialize(&self, message: &dyn Any) -> IpcResult<Vec<u8>> {
        let message = message.downcast_ref::<T>().ok_or_else(|| {
            IpcError::SerializationError(format!(
                "serializer for {} received another message type",
                std::any::type_name::<T>()
            ))
        })?;
        serde_json::to_vec(message).map_err(|e| IpcError::SerializationError(e.to_string()))
    }

    fn deserialize(&self, payload: &[u8]) -> IpcResult<Box<dyn Any + Send + Sync>> {
        let message: T = serde_json::from_slice(payload)
            .map_err(|e| IpcError::DeserializationError(e.to_string()))?;
        Ok(Box::new(message))
    }
}

/// Type id to serializer map shared by every channel in the process.
///
/// Populated during startup through `&mut self`, then frozen behind an `Arc`
/// so lookups from concurrent channels need no locking.
#[derive(Clone, Default)]
pub struct SerializerRegistry {
    serializers: HashMap<u32, Arc<dyn MessageSerializer>>,
}

impl SerializerRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in protocol messages
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register_json::<Handshake>();
        registry.register_json::<VoidResponse>();
        registry
    }

    /// Register a serializer for a type id. The last registration wins; the
    /// replaced serializer is returned.
    pub fn register(
        &mut self,
        type_id: u32,
        serializer: Arc<dyn MessageSerializer>,
    ) -> Option<Arc<dyn MessageSerializer>> {
        let previous = self.serializers.insert(type_id, serializer);
        if previous.is_some() {
            tracing::debug!(target: "ipc", type_id, "Serializer replaced");
        }
        previous
    }

    /// Register a [`JsonSerializer`] under the message's own type id
    pub fn register_json<T>(&mut self) -> Option<Arc<dyn MessageSerializer>>
    where
        T: IpcMessage + Serialize + DeserializeOwned,
    {
        self.register(T::TYPE_ID, Arc::new(JsonSerializer::<T>::new()))
    }

    /// Serializer for the type id
    pub fn resolve(&self, type_id: u32) -> IpcResult<Arc<dyn MessageSerializer>> {
        self.serializers
            .get(&type_id)
            .cloned()
            .ok_or(IpcError::NoSerializerRegistered { type_id })
    }

    pub fn contains(&self, type_id: u32) -> bool {
        self.serializers.contains_key(&type_id)
    }

    pub fn len(&self) -> usize {
        self.serializers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.serializers.is_empty()
    }

    /// Encode a message with the serializer registered for its type id
    pub fn encode<T: IpcMessage>(&self, message: &T) -> IpcResult<Vec<u8>> {
        self.resolve(T::TYPE_ID)?.serialize(message)
    }

    /// Decode a payload into a type-erased message
    pub fn decode_any(
        &self,
        type_id: u32,
        payload: &[u8],
    ) -> IpcResult<Box<dyn Any + Send + Sync>> {
        self.resolve(type_id)?.deserialize(payload)
    }

    /// Decode a payload into `T`
    pub fn decode<T: IpcMessage>(&self, payload: &[u8]) -> IpcResult<T> {
        let message = self.decode_any(T::TYPE_ID, payload)?;
        message.downcast::<T>().map(|boxed| *boxed).map_err(|_| {
            IpcError::DeserializationError(format!(
                "serializer for type {} produced another message type",
                T::TYPE_ID
            ))
        })
    }
}

impl fmt::Debug for SerializerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut type_ids: Vec<u32> = self.serializers.keys().copied().collect();
        type_ids.sort_unstable();
        f.debug_struct("SerializerRegistry")
            .field("type_ids", &type_ids)
            .finish()
    }
}
