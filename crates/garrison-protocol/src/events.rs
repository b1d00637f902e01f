//! Event payloads that travel between players.
//!
//! The dispatch engine treats all of these as opaque: it only needs them
//! to be serializable by whichever [`Codec`](crate::Codec) the routing key
//! uses. Field names matter for the JSON codec (they appear on the wire);
//! field order matters for the bincode codec (it is the wire).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Broadcast when the game is paused or resumed for a player.
///
/// Published on the direct exchange under `pause.<username>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayingState {
    pub is_paused: bool,
}

/// The rank of a unit. Flavor only as far as the messaging layer is
/// concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnitRank {
    Infantry,
    Cavalry,
    Artillery,
}

/// One army unit and where it currently stands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    pub id: u64,
    pub rank: UnitRank,
    pub location: String,
}

/// A player ordering units toward another player's position.
///
/// Published on the topic exchange under `army_moves.<from_player>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArmyMove {
    pub from_player: String,
    pub to_player: String,
    pub location: String,
    pub units: Vec<Unit>,
}

/// One side of a war: who they are and what they brought.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Combatant {
    pub username: String,
    pub units: Vec<Unit>,
}

/// Declares that a move has created a conflict between two players.
///
/// Published on the topic exchange under `war.<attacker>`. Every player
/// subscribed to `war.*` sees it; only the two named combatants can act
/// on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarRecognition {
    pub attacker: Combatant,
    pub defender: Combatant,
    pub location: String,
}

/// A structured game-log entry.
///
/// Published on the topic exchange under `game_logs.<username>` with the
/// compact binary codec, and persisted by whoever owns the log sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameLog {
    pub current_time: DateTime<Utc>,
    pub message: String,
    pub username: String,
}
