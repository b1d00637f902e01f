//! Codec trait and the two wire formats Garrison ships with.
//!
//! A codec converts between typed values and the opaque byte body of a
//! broker message. The dispatch engine doesn't care HOW a payload is
//! serialized — it takes any [`Codec`] implementation and uses it for one
//! subscription or publisher. Both ends of a routing key must pick the
//! same codec; the `content_type` tag travels with each message for
//! diagnostics but is never used for negotiation.
//!
//! [`JsonCodec`] is self-describing and tolerant of unknown fields, which
//! makes it the right choice for player-facing event streams that evolve.
//! [`BincodeCodec`] is dense and schema-coupled; both ends must be built
//! from the same type definitions. Garrison uses it for the high-volume
//! game-log stream.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Encodes typed values to bytes and decodes them back.
///
/// `Send + Sync + 'static` because a codec is moved into the long-lived
/// subscription task and may be shared across publisher clones.
pub trait Codec: Send + Sync + 'static {
    /// The content-type tag stamped on every message this codec encodes.
    fn content_type(&self) -> &'static str;

    /// Serializes a value into a byte body.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Encode`] if the value cannot be
    /// represented in this format.
    fn encode<T: Serialize>(
        &self,
        value: &T,
    ) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes a byte body back into a value.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Decode`] if the bytes are malformed,
    /// truncated, or were produced for an incompatible type.
    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// Human-readable structured-text codec backed by `serde_json`.
///
/// Field names are preserved on the wire, so decoding skips unknown
/// fields and only fails on malformed or type-incompatible input.
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn content_type(&self) -> &'static str {
        "application/json"
    }

    fn encode<T: Serialize>(
        &self,
        value: &T,
    ) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::encode)
    }

    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::decode)
    }
}

// ---------------------------------------------------------------------------
// BincodeCodec
// ---------------------------------------------------------------------------

/// Compact binary codec backed by `bincode`.
///
/// Field order and types are fixed at compile time on both ends. Fixed
/// int widths keep the layout stable across values of different
/// magnitudes.
#[cfg(feature = "bincode")]
#[derive(Debug, Clone, Copy, Default)]
pub struct BincodeCodec;

#[cfg(feature = "bincode")]
impl BincodeCodec {
    fn config() -> impl bincode::config::Config {
        bincode::config::standard().with_fixed_int_encoding()
    }
}

#[cfg(feature = "bincode")]
impl Codec for BincodeCodec {
    fn content_type(&self) -> &'static str {
        "application/x-bincode"
    }

    fn encode<T: Serialize>(
        &self,
        value: &T,
    ) -> Result<Vec<u8>, ProtocolError> {
        bincode::serde::encode_to_vec(value, Self::config())
            .map_err(ProtocolError::encode)
    }

    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError> {
        bincode::serde::decode_from_slice(data, Self::config())
            .map(|(value, _read)| value)
            .map_err(ProtocolError::decode)
    }
}

// =========================================================================
// Tests
// =========================================================================
