//! Exchange names and routing-key conventions.
//!
//! Keys are dot-delimited strings. Per-player streams use
//! `<prefix>.<username>` (exact match on the direct exchange, or a
//! concrete key under a wildcard binding on the topic exchange); shared
//! streams subscribe with `<prefix>.*`.
//!
//! The exchanges themselves are provisioned by the broker administrator,
//! not declared by this crate's consumers.

/// Key-exact routing. Per-player pause notifications live here.
pub const EXCHANGE_DIRECT: &str = "garrison_direct";

/// Wildcard-pattern routing. Moves, wars, and game logs live here.
pub const EXCHANGE_TOPIC: &str = "garrison_topic";

/// Where rejected and expired messages are diverted when a queue opts
/// into dead-lettering.
pub const EXCHANGE_DEAD_LETTER: &str = "garrison_dlx";

/// Key prefix for pause-state notifications.
pub const PAUSE_PREFIX: &str = "pause";

/// Key prefix for army-move commands.
pub const ARMY_MOVES_PREFIX: &str = "army_moves";

/// Key prefix for war recognitions.
pub const WAR_PREFIX: &str = "war";

/// Key prefix for game-log entries.
pub const GAME_LOGS_PREFIX: &str = "game_logs";

/// Builds the concrete key for one player's stream: `<prefix>.<username>`.
pub fn per_player(prefix: &str, username: &str) -> String {
    format!("{prefix}.{username}")
}

/// Builds the wildcard pattern covering every player: `<prefix>.*`.
pub fn wildcard(prefix: &str) -> String {
    format!("{prefix}.*")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_per_player_key() {
        assert_eq!(per_player(PAUSE_PREFIX, "alice"), "pause.alice");
        assert_eq!(per_player(GAME_LOGS_PREFIX, "bob"), "game_logs.bob");
    }

    #[test]
    fn test_wildcard_key() {
        assert_eq!(wildcard(ARMY_MOVES_PREFIX), "army_moves.*");
        assert_eq!(wildcard(WAR_PREFIX), "war.*");
    }
}
