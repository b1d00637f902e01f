//! Typed publishing: encode with a codec, hand off to the broker.

use chrono::Utc;
use garrison_broker::BrokerChannel;
use garrison_protocol::{BincodeCodec, Codec, GameLog, routing};
use serde::Serialize;

use crate::GarrisonError;

/// Publishes typed values to an exchange through one codec.
///
/// Fire-and-forget at the exchange-routing layer: no queue-side
/// acknowledgment is awaited, no retry is performed. Errors surface
/// only when encoding fails or the channel itself is unusable.
#[derive(Clone)]
pub struct Publisher<B, C> {
    channel: B,
    codec: C,
}

impl<B: BrokerChannel, C: Codec> Publisher<B, C> {
    pub fn new(channel: B, codec: C) -> Self {
        Self { channel, codec }
    }

    /// Encodes `value` and requests routing to `exchange` under
    /// `routing_key`.
    pub async fn publish<T: Serialize>(
        &self,
        exchange: &str,
        routing_key: &str,
        value: &T,
    ) -> Result<(), GarrisonError> {
        let body = self.codec.encode(value)?;
        self.channel
            .publish(
                exchange,
                routing_key,
                self.codec.content_type(),
                body,
            )
            .await?;
        tracing::trace!(exchange, key = routing_key, "published");
        Ok(())
    }
}

/// Stamps and publishes a [`GameLog`] entry on
/// `game_logs.<username>`.
///
/// Game logs always travel in the compact binary format; the publisher
/// passed here fixes that choice in its type.
pub async fn publish_game_log<B: BrokerChannel>(
    publisher: &Publisher<B, BincodeCodec>,
    username: &str,
    message: impl Into<String>,
) -> Result<(), GarrisonError> {
    let entry = GameLog {
        current_time: Utc::now(),
        message: message.into(),
        username: username.to_string(),
    };
    publisher
        .publish(
            routing::EXCHANGE_TOPIC,
            &routing::per_player(routing::GAME_LOGS_PREFIX, username),
            &entry,
        )
        .await
}
