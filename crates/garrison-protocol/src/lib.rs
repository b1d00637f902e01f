//! Payload layer for Garrison.
//!
//! This crate defines everything both ends of a routing key must agree on:
//!
//! - **Codecs** ([`Codec`] trait, [`JsonCodec`], [`BincodeCodec`]) — how a
//!   typed value becomes the byte body of a broker message and back.
//! - **Event types** ([`PlayingState`], [`ArmyMove`], [`WarRecognition`],
//!   [`GameLog`]) — the payloads that travel between players.
//! - **Routing conventions** ([`routing`]) — exchange names and the
//!   dot-delimited key scheme.
//! - **Errors** ([`ProtocolError`]) — what can go wrong while encoding or
//!   decoding.
//!
//! The dispatch engine in the `garrison` crate is generic over payload
//! types; it only touches this crate through the [`Codec`] trait. Which
//! codec a given routing key uses is a deployment convention chosen at the
//! call site, never negotiated on the wire.

mod codec;
mod error;
mod events;
pub mod routing;

#[cfg(feature = "bincode")]
pub use codec::BincodeCodec;
pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use events::{
    ArmyMove, Combatant, GameLog, PlayingState, Unit, UnitRank,
    WarRecognition,
};
