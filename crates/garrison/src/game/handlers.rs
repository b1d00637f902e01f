//! Event handlers binding the state machine to routing keys.
//!
//! Each handler takes the shared state (and a publisher, where it emits
//! derivative events) and returns the outcome that resolves the
//! triggering delivery. They are meant to be wrapped in the closure
//! passed to [`subscribe`](crate::subscribe), which fixes the payload
//! type and codec for the routing key.

use garrison_broker::BrokerChannel;
use garrison_protocol::{
    ArmyMove, BincodeCodec, Codec, Combatant, GameLog, PlayingState,
    WarRecognition, routing,
};
use tokio::sync::Mutex;

use crate::game::{GameState, MoveOutcome, WarOutcome};
use crate::logs::LogSink;
use crate::{DeliveryOutcome, Publisher, publish_game_log};

/// Applies a pause-state notification. Always accepted.
pub async fn handle_pause(
    state: &Mutex<GameState>,
    event: PlayingState,
) -> DeliveryOutcome {
    let mut state = state.lock().await;
    state.set_paused(event.is_paused);
    tracing::info!(
        username = state.username(),
        paused = event.is_paused,
        "pause state changed"
    );
    DeliveryOutcome::Accept
}

/// Handles another player's army move.
///
/// A conflict with this player publishes a war recognition on
/// `war.<attacker>` before the move is accepted; if that publish
/// fails, the move is requeued so the side effect is retried.
pub async fn handle_move<B: BrokerChannel, C: Codec>(
    state: &Mutex<GameState>,
    publisher: &Publisher<B, C>,
    mv: ArmyMove,
) -> DeliveryOutcome {
    let (outcome, defender_units, username) = {
        let state = state.lock().await;
        (
            state.evaluate_move(&mv),
            state.roster(),
            state.username().to_string(),
        )
    };

    match outcome {
        MoveOutcome::SamePlayer => {
            tracing::warn!(
                player = %mv.from_player,
                "discarding self-referential move"
            );
            DeliveryOutcome::Discard
        }
        MoveOutcome::Safe => DeliveryOutcome::Accept,
        MoveOutcome::MakeWar => {
            let war = WarRecognition {
                attacker: Combatant {
                    username: mv.from_player.clone(),
                    units: mv.units.clone(),
                },
                defender: Combatant {
                    username,
                    units: defender_units,
                },
                location: mv.location.clone(),
            };
            let key =
                routing::per_player(routing::WAR_PREFIX, &mv.from_player);
            match publisher
                .publish(routing::EXCHANGE_TOPIC, &key, &war)
                .await
            {
                Ok(()) => DeliveryOutcome::Accept,
                Err(error) => {
                    tracing::warn!(
                        %error,
                        "war recognition publish failed, requeueing move"
                    );
                    DeliveryOutcome::RetryRequeue
                }
            }
        }
    }
}

/// Handles a war recognition seen on the shared `war.*` stream.
///
/// Recognitions for other players' wars are requeued — they may apply
/// once game state catches up. Settled wars are written to the game
/// log; a failed log publish requeues the recognition.
pub async fn handle_war<B: BrokerChannel>(
    state: &Mutex<GameState>,
    publisher: &Publisher<B, BincodeCodec>,
    war: WarRecognition,
) -> DeliveryOutcome {
    let (outcome, username) = {
        let mut state = state.lock().await;
        (state.resolve_war(&war), state.username().to_string())
    };

    let message = match outcome {
        WarOutcome::NotInvolved => {
            tracing::debug!(
                attacker = %war.attacker.username,
                defender = %war.defender.username,
                "war does not involve this player yet"
            );
            return DeliveryOutcome::RetryRequeue;
        }
        WarOutcome::NoUnits => {
            tracing::warn!("discarding war recognition with empty roster");
            return DeliveryOutcome::Discard;
        }
        WarOutcome::YouWon { winner, loser }
        | WarOutcome::OpponentWon { winner, loser } => {
            format!("{winner} won a war against {loser}")
        }
        WarOutcome::Draw { attacker, defender } => {
            format!("A war between {attacker} and {defender} ended in a draw")
        }
    };

    match publish_game_log(publisher, &username, message).await {
        Ok(()) => DeliveryOutcome::Accept,
        Err(error) => {
            tracing::warn!(
                %error,
                "game log publish failed, requeueing war recognition"
            );
            DeliveryOutcome::RetryRequeue
        }
    }
}

/// Hands a game-log entry to the persistent sink. A failed write
/// requeues the entry so nothing is lost.
pub async fn handle_game_log<S: LogSink>(
    sink: &S,
    entry: GameLog,
) -> DeliveryOutcome {
    match sink.record(&entry).await {
        Ok(()) => DeliveryOutcome::Accept,
        Err(error) => {
            tracing::warn!(%error, "log sink write failed, requeueing entry");
            DeliveryOutcome::RetryRequeue
        }
    }
}
