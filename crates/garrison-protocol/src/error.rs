//! Error types for the payload layer.
//!
//! Each crate in Garrison defines its own error enum. A `ProtocolError`
//! always means the problem is in serialization, not in broker topology
//! or delivery plumbing.

/// Source error from whichever serializer produced the failure.
///
/// Boxed so the enum shape stays the same regardless of which codec is
/// compiled in.
type Source = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur while encoding or decoding payloads.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a value into bytes).
    #[error("encode failed: {0}")]
    Encode(#[source] Source),

    /// Deserialization failed: malformed bytes, a type-incompatible
    /// structure, or a payload produced by an incompatible schema.
    #[error("decode failed: {0}")]
    Decode(#[source] Source),
}

impl ProtocolError {
    pub(crate) fn encode(
        err: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Encode(Box::new(err))
    }

    pub(crate) fn decode(
        err: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Decode(Box::new(err))
    }
}
