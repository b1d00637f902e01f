//! Broker abstraction layer for Garrison.
//!
//! Provides the [`BrokerChannel`], [`Deliveries`], and [`Delivery`] traits
//! that model the client-side contract with a topic-capable message
//! broker: declare topology, bound outstanding deliveries, publish raw
//! bytes, and pull an effectively infinite sequence of deliveries that
//! each require exactly one resolution.
//!
//! The broker itself is an external collaborator. Exchanges are
//! provisioned by its administrator; this layer only declares queues and
//! bindings on top of them.
//!
//! # Feature Flags
//!
//! - `amqp` (default) — AMQP 0.9.1 backend via `lapin`
//! - `memory` (default) — in-process backend for tests and embedded use

mod error;

#[cfg(feature = "amqp")]
mod amqp;
#[cfg(feature = "memory")]
mod memory;

pub use error::BrokerError;

#[cfg(feature = "amqp")]
pub use amqp::{AmqpBroker, AmqpChannel, AmqpDeliveries, AmqpDelivery};
#[cfg(feature = "memory")]
pub use memory::{
    MemoryBroker, MemoryChannel, MemoryDeliveries, MemoryDelivery,
};

use std::future::Future;

/// How long a queue lives and who may touch it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueLifetime {
    /// Survives a broker restart, shared between connections, never
    /// auto-deleted. For shared event streams (wars, game logs).
    Durable,
    /// Exclusive to the declaring connection and auto-deleted when that
    /// connection goes away. For per-player ephemeral streams.
    Transient,
}

/// The routing discipline of an exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeKind {
    /// Key-exact matching.
    Direct,
    /// Wildcard pattern matching: `*` matches one dot-delimited word,
    /// `#` matches zero or more.
    Topic,
}

/// A queue bound to an exchange under one routing key.
///
/// Declaring the same binding repeatedly is idempotent. The dead-letter
/// attribute is a per-deployment option: when set, messages this queue
/// rejects without requeue are diverted to that exchange instead of
/// being lost.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopologyBinding {
    exchange: String,
    queue: String,
    routing_key: String,
    lifetime: QueueLifetime,
    dead_letter_exchange: Option<String>,
}

impl TopologyBinding {
    /// Creates a binding of `queue` to `exchange` under `routing_key`.
    pub fn new(
        exchange: impl Into<String>,
        queue: impl Into<String>,
        routing_key: impl Into<String>,
        lifetime: QueueLifetime,
    ) -> Self {
        Self {
            exchange: exchange.into(),
            queue: queue.into(),
            routing_key: routing_key.into(),
            lifetime,
            dead_letter_exchange: None,
        }
    }

    /// Diverts rejected and expired messages to `exchange` instead of
    /// dropping them.
    pub fn with_dead_letter_exchange(
        mut self,
        exchange: impl Into<String>,
    ) -> Self {
        self.dead_letter_exchange = Some(exchange.into());
        self
    }

    /// The exchange this queue is bound to.
    pub fn exchange(&self) -> &str {
        &self.exchange
    }

    /// The queue name.
    pub fn queue(&self) -> &str {
        &self.queue
    }

    /// The routing key (or pattern, on a topic exchange).
    pub fn routing_key(&self) -> &str {
        &self.routing_key
    }

    /// The queue's lifetime policy.
    pub fn lifetime(&self) -> QueueLifetime {
        self.lifetime
    }

    /// The configured dead-letter exchange, if any.
    pub fn dead_letter_exchange(&self) -> Option<&str> {
        self.dead_letter_exchange.as_deref()
    }
}

/// One channel onto the broker: the unit that declares topology,
/// publishes, and consumes.
///
/// Futures are `Send` because subscriptions run inside spawned tasks.
pub trait BrokerChannel: Send + Sync + 'static {
    /// The delivery sequence type produced by [`consume`](Self::consume).
    type Deliveries: Deliveries;

    /// Ensures the queue exists with the attributes implied by its
    /// lifetime policy and is bound under the routing key. Idempotent
    /// for identical arguments.
    ///
    /// Fails with [`BrokerError::Topology`] if the broker rejects the
    /// declaration (attribute conflict with an existing queue) or the
    /// binding (unknown exchange).
    fn declare_and_bind(
        &self,
        binding: &TopologyBinding,
    ) -> impl Future<Output = Result<(), BrokerError>> + Send;

    /// Bounds the number of deliveries held unacknowledged at once.
    /// The broker pauses delivery once `limit` are outstanding.
    fn set_prefetch(
        &self,
        limit: u16,
    ) -> impl Future<Output = Result<(), BrokerError>> + Send;

    /// Requests that the broker route `body` to `exchange` under
    /// `routing_key`. Fire-and-forget: no queue-side acknowledgment is
    /// awaited; errors only when the channel itself is unusable.
    fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        content_type: &str,
        body: Vec<u8>,
    ) -> impl Future<Output = Result<(), BrokerError>> + Send;

    /// Begins consuming `queue`, returning its delivery sequence.
    fn consume(
        &self,
        queue: &str,
    ) -> impl Future<Output = Result<Self::Deliveries, BrokerError>> + Send;
}

/// A lazy, effectively infinite sequence of deliveries from one queue.
pub trait Deliveries: Send + 'static {
    /// The delivery type this sequence yields.
    type Delivery: Delivery;

    /// Waits for the next delivery, in broker arrival order.
    ///
    /// Returns `None` when the sequence ends (broker or connection
    /// closed). Cancel-safe: dropping the future never loses a message.
    fn next(
        &mut self,
    ) -> impl Future<Output = Option<Self::Delivery>> + Send;
}

/// One unit of message handoff, requiring exactly one resolution.
///
/// Both resolution methods consume the delivery, so the type system
/// rules out resolving twice; a dropped delivery without resolution
/// leaks broker-side redelivery state, which is why the consumer loop
/// in `garrison` always resolves before pulling the next one.
pub trait Delivery: Send + 'static {
    /// The opaque byte body.
    fn body(&self) -> &[u8];

    /// The content-type tag the publisher stamped on the message.
    fn content_type(&self) -> Option<&str>;

    /// Durably removes the message from the queue.
    fn ack(self) -> impl Future<Output = Result<(), BrokerError>> + Send;

    /// Negatively acknowledges the message. With `requeue`, it returns
    /// to the front of the queue for redelivery; without, it is dropped
    /// (or dead-lettered, if the queue is configured for it).
    fn nack(
        self,
        requeue: bool,
    ) -> impl Future<Output = Result<(), BrokerError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binding_accessors() {
        let binding = TopologyBinding::new(
            "garrison_topic",
            "war",
            "war.*",
            QueueLifetime::Durable,
        );
        assert_eq!(binding.exchange(), "garrison_topic");
        assert_eq!(binding.queue(), "war");
        assert_eq!(binding.routing_key(), "war.*");
        assert_eq!(binding.lifetime(), QueueLifetime::Durable);
        assert_eq!(binding.dead_letter_exchange(), None);
    }

    #[test]
    fn test_binding_dead_letter_option() {
        let binding = TopologyBinding::new(
            "garrison_direct",
            "pause.alice",
            "pause.alice",
            QueueLifetime::Transient,
        )
        .with_dead_letter_exchange("garrison_dlx");
        assert_eq!(binding.dead_letter_exchange(), Some("garrison_dlx"));
    }

    #[test]
    fn test_identical_bindings_compare_equal() {
        let a = TopologyBinding::new("e", "q", "k", QueueLifetime::Durable);
        let b = TopologyBinding::new("e", "q", "k", QueueLifetime::Durable);
        assert_eq!(a, b);
    }
}
