//! # Garrison
//!
//! Typed publish/subscribe dispatch for a turn-based multiplayer game
//! coordinated entirely through broker events.
//!
//! The engine is three small pieces layered over `garrison-broker`:
//!
//! - [`Publisher`] — encodes a typed value with a
//!   [`Codec`](garrison_protocol::Codec) and hands it to the broker for
//!   routing. Fire-and-forget; retry is the caller's business.
//! - [`subscribe`] — declares topology, applies flow control, and runs
//!   one consumer loop per subscription in its own task. Each delivery
//!   is decoded, handed to the caller's handler, and resolved according
//!   to the returned [`DeliveryOutcome`] — exactly once, strictly in
//!   arrival order.
//! - [`DeliveryOutcome`] — the three-valued contract every handler
//!   returns: accept, retry-requeue, or discard.
//!
//! The [`game`] module binds a small domain state machine to specific
//! routing keys through handlers built on this contract; [`logs`] holds
//! the sink collaborator that persists game-log entries.

mod error;
mod outcome;
mod publish;
mod subscribe;

pub mod game;
pub mod logs;

pub use error::GarrisonError;
pub use outcome::DeliveryOutcome;
pub use publish::{Publisher, publish_game_log};
pub use subscribe::{
    DEFAULT_PREFETCH, SubscribeConfig, Subscription, subscribe,
};
