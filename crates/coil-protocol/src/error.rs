//! Error types for the protocol layer.
//!
//! Each coil crate defines its own error enum, so a `ProtocolError` always
//! means a serialization problem, never networking or room state.

/// Errors that can occur while encoding or decoding events.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed. Rare in practice: every outbound event is a
    /// plain data struct.
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed: malformed JSON, an unknown event tag, or a
    /// missing required field. The offending frame is dropped by the
    /// caller.
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),
}
