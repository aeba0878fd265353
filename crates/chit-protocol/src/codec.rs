//! Codec trait and the JSON implementation.
//!
//! Everything above this crate talks in [`Event`](crate::Event)s and
//! [`RelayFrame`](crate::RelayFrame)s; the codec is the one place that
//! knows they become JSON on the wire.

use serde::{Serialize, de::DeserializeOwned};

use crate::{Frame, ProtocolError};

/// Encodes Rust values to bytes and decodes bytes back.
///
/// `Send + Sync + 'static` so a codec can live inside long-running tasks
/// shared across Tokio's worker threads.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Encode`] if the value cannot be represented.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes into a value.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Decode`] if the bytes are malformed or don't
    /// match `T`.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;

    /// Encodes a value straight into a shareable outbound [`Frame`].
    fn frame<T: Serialize>(&self, value: &T) -> Result<Frame, ProtocolError> {
        self.encode(value).map(Frame::from)
    }
}

/// A [`Codec`] backed by `serde_json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}
