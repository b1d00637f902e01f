//! The per-player game state machine.

use std::collections::HashMap;

use garrison_protocol::{ArmyMove, Unit, WarRecognition};

/// The domain decision for an incoming army move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveOutcome {
    /// The move names the same player on both sides — malformed.
    SamePlayer,
    /// The move does not concern this player.
    Safe,
    /// The move creates a conflict with this player.
    MakeWar,
}

/// The domain decision for an incoming war recognition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WarOutcome {
    /// Neither combatant is this player; the recognition may apply
    /// once game state catches up.
    NotInvolved,
    /// A combatant has an empty roster — malformed.
    NoUnits,
    /// This player won.
    YouWon { winner: String, loser: String },
    /// The opponent won.
    OpponentWon { winner: String, loser: String },
    /// Both sides lost their forces.
    Draw { attacker: String, defender: String },
}

/// One player's view of the game.
///
/// Shared between subscription tasks; callers guard it with a mutex
/// and hold the lock for the duration of each handler decision.
#[derive(Debug)]
pub struct GameState {
    username: String,
    paused: bool,
    units: HashMap<u64, Unit>,
}

impl GameState {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            paused: false,
            units: HashMap::new(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    pub fn add_unit(&mut self, unit: Unit) {
        self.units.insert(unit.id, unit);
    }

    /// A snapshot of this player's units, ordered by id.
    pub fn roster(&self) -> Vec<Unit> {
        let mut units: Vec<Unit> = self.units.values().cloned().collect();
        units.sort_by_key(|unit| unit.id);
        units
    }

    /// Decides what an incoming move means for this player.
    pub fn evaluate_move(&self, mv: &ArmyMove) -> MoveOutcome {
        if mv.from_player == mv.to_player {
            MoveOutcome::SamePlayer
        } else if mv.to_player == self.username {
            MoveOutcome::MakeWar
        } else {
            MoveOutcome::Safe
        }
    }

    /// Decides a war this player may be party to, removing lost units
    /// from the roster when the war settles against them.
    pub fn resolve_war(&mut self, war: &WarRecognition) -> WarOutcome {
        let attacker = &war.attacker;
        let defender = &war.defender;

        if attacker.username != self.username
            && defender.username != self.username
        {
            return WarOutcome::NotInvolved;
        }
        if attacker.units.is_empty() || defender.units.is_empty() {
            return WarOutcome::NoUnits;
        }

        if attacker.units.len() == defender.units.len() {
            self.remove_units_at(&war.location);
            return WarOutcome::Draw {
                attacker: attacker.username.clone(),
                defender: defender.username.clone(),
            };
        }

        let (winner, loser) = if attacker.units.len() > defender.units.len()
        {
            (attacker, defender)
        } else {
            (defender, attacker)
        };

        if loser.username == self.username {
            self.remove_units_at(&war.location);
            WarOutcome::OpponentWon {
                winner: winner.username.clone(),
                loser: loser.username.clone(),
            }
        } else {
            WarOutcome::YouWon {
                winner: winner.username.clone(),
                loser: loser.username.clone(),
            }
        }
    }

    fn remove_units_at(&mut self, location: &str) {
        self.units.retain(|_, unit| unit.location != location);
    }
}

#[cfg(test)]
mod tests {
    use garrison_protocol::{Combatant, UnitRank};

    use super::*;

    fn unit(id: u64, location: &str) -> Unit {
        Unit {
            id,
            rank: UnitRank::Infantry,
            location: location.into(),
        }
    }

    fn war(
        attacker: (&str, usize),
        defender: (&str, usize),
        location: &str,
    ) -> WarRecognition {
        WarRecognition {
            attacker: Combatant {
                username: attacker.0.into(),
                units: (0..attacker.1 as u64)
                    .map(|id| unit(id, location))
                    .collect(),
            },
            defender: Combatant {
                username: defender.0.into(),
                units: (0..defender.1 as u64)
                    .map(|id| unit(100 + id, location))
                    .collect(),
            },
            location: location.into(),
        }
    }

    #[test]
    fn test_move_naming_one_player_twice_is_malformed() {
        let state = GameState::new("bob");
        let mv = ArmyMove {
            from_player: "alice".into(),
            to_player: "alice".into(),
            location: "ridge".into(),
            units: vec![],
        };
        assert_eq!(state.evaluate_move(&mv), MoveOutcome::SamePlayer);
    }

    #[test]
    fn test_move_toward_this_player_makes_war() {
        let state = GameState::new("bob");
        let mv = ArmyMove {
            from_player: "alice".into(),
            to_player: "bob".into(),
            location: "ridge".into(),
            units: vec![unit(1, "ridge")],
        };
        assert_eq!(state.evaluate_move(&mv), MoveOutcome::MakeWar);
    }

    #[test]
    fn test_move_between_other_players_is_safe() {
        let state = GameState::new("carol");
        let mv = ArmyMove {
            from_player: "alice".into(),
            to_player: "bob".into(),
            location: "ridge".into(),
            units: vec![],
        };
        assert_eq!(state.evaluate_move(&mv), MoveOutcome::Safe);
    }

    #[test]
    fn test_war_between_strangers_is_not_ours() {
        let mut state = GameState::new("carol");
        let outcome = state.resolve_war(&war(("alice", 2), ("bob", 1), "ridge"));
        assert_eq!(outcome, WarOutcome::NotInvolved);
    }

    #[test]
    fn test_war_with_empty_roster_is_malformed() {
        let mut state = GameState::new("bob");
        let outcome = state.resolve_war(&war(("alice", 0), ("bob", 3), "ridge"));
        assert_eq!(outcome, WarOutcome::NoUnits);
    }

    #[test]
    fn test_losing_a_war_clears_units_at_the_location() {
        let mut state = GameState::new("bob");
        state.add_unit(unit(7, "ridge"));
        state.add_unit(unit(8, "valley"));

        let outcome = state.resolve_war(&war(("alice", 3), ("bob", 1), "ridge"));
        assert_eq!(
            outcome,
            WarOutcome::OpponentWon {
                winner: "alice".into(),
                loser: "bob".into(),
            }
        );
        // Only the ridge garrison is gone.
        assert_eq!(state.roster(), vec![unit(8, "valley")]);
    }

    #[test]
    fn test_winning_a_war_keeps_units() {
        let mut state = GameState::new("bob");
        state.add_unit(unit(7, "ridge"));

        let outcome = state.resolve_war(&war(("alice", 1), ("bob", 4), "ridge"));
        assert_eq!(
            outcome,
            WarOutcome::YouWon {
                winner: "bob".into(),
                loser: "alice".into(),
            }
        );
        assert_eq!(state.roster().len(), 1);
    }

    #[test]
    fn test_equal_forces_draw() {
        let mut state = GameState::new("alice");
        let outcome = state.resolve_war(&war(("alice", 2), ("bob", 2), "ridge"));
        assert_eq!(
            outcome,
            WarOutcome::Draw {
                attacker: "alice".into(),
                defender: "bob".into(),
            }
        );
    }

    #[test]
    fn test_pause_flag() {
        let mut state = GameState::new("alice");
        assert!(!state.is_paused());
        state.set_paused(true);
        assert!(state.is_paused());
    }
}
