//! Game-domain glue over the dispatch engine.
//!
//! The engine itself is parametric over payload types; this module is
//! where the game's state machine meets concrete routing keys. Each
//! handler closes over the shared [`GameState`] (behind a
//! `tokio::sync::Mutex`, since pause, move, and war subscriptions all
//! mutate it from different tasks) and maps domain decisions to
//! [`DeliveryOutcome`](crate::DeliveryOutcome)s.

mod handlers;
mod state;

pub use handlers::{
    handle_game_log, handle_move, handle_pause, handle_war,
};
pub use state::{GameState, MoveOutcome, WarOutcome};
