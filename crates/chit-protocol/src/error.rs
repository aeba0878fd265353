//! Error types for the protocol layer.

/// Errors that can occur while encoding or decoding messages.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning bytes into a Rust type).
    ///
    /// Common causes: malformed JSON, a missing `type` tag, or a payload
    /// that is not an object.
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The message decoded but violates protocol rules.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
