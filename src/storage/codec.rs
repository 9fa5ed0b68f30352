//! Wire encoding for persisted values.
//!
//! Everything the repository persists is a protobuf message; the key-scoped
//! shape (which message type lives under which key prefix) is enforced by the
//! repository, not here.

use prost::Message;

use crate::core::error::RegistryResult;

/// Protobuf codec for persisted values.
///
/// Stateless; shared freely across tasks.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProtoCodec;

impl ProtoCodec {
    /// Encode a message to its wire bytes.
    pub fn encode<T: Message>(value: &T) -> Vec<u8> {
        value.encode_to_vec()
    }

    /// Decode wire bytes into a message.
    pub fn decode<T: Message + Default>(data: &[u8]) -> RegistryResult<T> {
        Ok(T::decode(data)?)
    }
}
