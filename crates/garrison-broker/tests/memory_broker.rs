//! Integration tests for the in-process broker backend.

use std::time::Duration;

use garrison_broker::{
    BrokerChannel, Deliveries, Delivery, ExchangeKind, MemoryBroker,
    QueueLifetime, TopologyBinding,
};
use tokio::time::timeout;

const DIRECT: &str = "garrison_direct";
const TOPIC: &str = "garrison_topic";
const DLX: &str = "garrison_dlx";

fn broker() -> MemoryBroker {
    let broker = MemoryBroker::new();
    broker.declare_exchange(DIRECT, ExchangeKind::Direct);
    broker.declare_exchange(TOPIC, ExchangeKind::Topic);
    broker.declare_exchange(DLX, ExchangeKind::Topic);
    broker
}

async fn publish(
    channel: &impl BrokerChannel,
    exchange: &str,
    key: &str,
    body: &[u8],
) {
    channel
        .publish(exchange, key, "application/octet-stream", body.to_vec())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_declare_twice_is_idempotent() {
    let channel = broker().channel();
    let binding = TopologyBinding::new(
        TOPIC,
        "war",
        "war.*",
        QueueLifetime::Durable,
    );
    channel.declare_and_bind(&binding).await.unwrap();
    channel.declare_and_bind(&binding).await.unwrap();
}

#[tokio::test]
async fn test_conflicting_redeclare_is_a_topology_error() {
    let channel = broker().channel();
    channel
        .declare_and_bind(&TopologyBinding::new(
            TOPIC,
            "war",
            "war.*",
            QueueLifetime::Durable,
        ))
        .await
        .unwrap();
    let err = channel
        .declare_and_bind(&TopologyBinding::new(
            TOPIC,
            "war",
            "war.*",
            QueueLifetime::Transient,
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, garrison_broker::BrokerError::Topology(_)));
}

#[tokio::test]
async fn test_binding_to_missing_exchange_fails() {
    let channel = broker().channel();
    let err = channel
        .declare_and_bind(&TopologyBinding::new(
            "no_such_exchange",
            "q",
            "k",
            QueueLifetime::Durable,
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, garrison_broker::BrokerError::Topology(_)));
}

#[tokio::test]
async fn test_direct_routing_is_key_exact() {
    let channel = broker().channel();
    for user in ["alice", "bob"] {
        channel
            .declare_and_bind(&TopologyBinding::new(
                DIRECT,
                format!("pause.{user}"),
                format!("pause.{user}"),
                QueueLifetime::Transient,
            ))
            .await
            .unwrap();
    }

    publish(&channel, DIRECT, "pause.alice", b"pause").await;

    let mut alice = channel.consume("pause.alice").await.unwrap();
    let delivery = alice.next().await.unwrap();
    assert_eq!(delivery.body(), b"pause");
    delivery.ack().await.unwrap();

    // Bob's queue saw nothing.
    let mut bob = channel.consume("pause.bob").await.unwrap();
    assert!(timeout(Duration::from_millis(50), bob.next()).await.is_err());
}

#[tokio::test]
async fn test_topic_wildcard_fans_out() {
    let channel = broker().channel();
    channel
        .declare_and_bind(&TopologyBinding::new(
            TOPIC,
            "moves",
            "army_moves.*",
            QueueLifetime::Durable,
        ))
        .await
        .unwrap();

    publish(&channel, TOPIC, "army_moves.alice", b"a").await;
    publish(&channel, TOPIC, "army_moves.bob", b"b").await;

    let mut moves = channel.consume("moves").await.unwrap();
    let first = moves.next().await.unwrap();
    assert_eq!(first.body(), b"a");
    first.ack().await.unwrap();
    let second = moves.next().await.unwrap();
    assert_eq!(second.body(), b"b");
    second.ack().await.unwrap();
}

#[tokio::test]
async fn test_prefetch_bounds_outstanding_deliveries() {
    let channel = broker().channel();
    channel
        .declare_and_bind(&TopologyBinding::new(
            TOPIC,
            "flood",
            "flood.*",
            QueueLifetime::Durable,
        ))
        .await
        .unwrap();
    channel.set_prefetch(3).await.unwrap();

    for i in 0..10u8 {
        publish(&channel, TOPIC, "flood.x", &[i]).await;
    }

    let mut deliveries = channel.consume("flood").await.unwrap();
    let mut held = Vec::new();
    for _ in 0..3 {
        held.push(deliveries.next().await.unwrap());
    }

    // The limit is reached: no fourth delivery until one resolves.
    assert!(
        timeout(Duration::from_millis(50), deliveries.next())
            .await
            .is_err()
    );

    held.pop().unwrap().ack().await.unwrap();
    let fourth = timeout(Duration::from_millis(200), deliveries.next())
        .await
        .expect("slot freed")
        .unwrap();
    fourth.ack().await.unwrap();
}

#[tokio::test]
async fn test_requeue_redelivers_at_the_front() {
    let channel = broker().channel();
    channel
        .declare_and_bind(&TopologyBinding::new(
            TOPIC,
            "war",
            "war.*",
            QueueLifetime::Durable,
        ))
        .await
        .unwrap();

    publish(&channel, TOPIC, "war.alice", b"first").await;
    publish(&channel, TOPIC, "war.alice", b"second").await;

    let mut deliveries = channel.consume("war").await.unwrap();
    let delivery = deliveries.next().await.unwrap();
    assert_eq!(delivery.body(), b"first");
    delivery.nack(true).await.unwrap();

    // The requeued message comes back before anything newer.
    let redelivered = deliveries.next().await.unwrap();
    assert_eq!(redelivered.body(), b"first");
    redelivered.ack().await.unwrap();
}

#[tokio::test]
async fn test_discard_dead_letters_when_configured() {
    let channel = broker().channel();
    channel
        .declare_and_bind(
            &TopologyBinding::new(
                TOPIC,
                "moves",
                "army_moves.*",
                QueueLifetime::Durable,
            )
            .with_dead_letter_exchange(DLX),
        )
        .await
        .unwrap();
    channel
        .declare_and_bind(&TopologyBinding::new(
            DLX,
            "graveyard",
            "#",
            QueueLifetime::Durable,
        ))
        .await
        .unwrap();

    publish(&channel, TOPIC, "army_moves.alice", b"bad").await;

    let mut moves = channel.consume("moves").await.unwrap();
    moves.next().await.unwrap().nack(false).await.unwrap();

    let mut graveyard = channel.consume("graveyard").await.unwrap();
    let dead = timeout(Duration::from_millis(200), graveyard.next())
        .await
        .expect("dead-lettered")
        .unwrap();
    assert_eq!(dead.body(), b"bad");
    dead.ack().await.unwrap();

    // The original queue no longer redelivers it.
    assert!(
        timeout(Duration::from_millis(50), moves.next()).await.is_err()
    );
}

#[tokio::test]
async fn test_one_consumer_per_queue_at_a_time() {
    let channel = broker().channel();
    channel
        .declare_and_bind(&TopologyBinding::new(
            TOPIC,
            "war",
            "war.*",
            QueueLifetime::Durable,
        ))
        .await
        .unwrap();

    let deliveries = channel.consume("war").await.unwrap();
    let err = channel.consume("war").await.unwrap_err();
    assert!(matches!(err, garrison_broker::BrokerError::Consume(_)));

    // The slot frees up once the first sequence is dropped.
    drop(deliveries);
    channel.consume("war").await.unwrap();
}

#[tokio::test]
async fn test_transient_queue_removed_with_its_consumer() {
    let channel = broker().channel();
    channel
        .declare_and_bind(&TopologyBinding::new(
            DIRECT,
            "pause.alice",
            "pause.alice",
            QueueLifetime::Transient,
        ))
        .await
        .unwrap();

    let deliveries = channel.consume("pause.alice").await.unwrap();
    drop(deliveries);

    let err = channel.consume("pause.alice").await.unwrap_err();
    assert!(matches!(err, garrison_broker::BrokerError::Consume(_)));
}

#[tokio::test]
async fn test_shutdown_ends_the_delivery_sequence() {
    let broker = broker();
    let channel = broker.channel();
    channel
        .declare_and_bind(&TopologyBinding::new(
            TOPIC,
            "war",
            "war.*",
            QueueLifetime::Durable,
        ))
        .await
        .unwrap();

    let mut deliveries = channel.consume("war").await.unwrap();
    let waiter = tokio::spawn(async move { deliveries.next().await });

    broker.shutdown();
    let ended = timeout(Duration::from_millis(500), waiter)
        .await
        .expect("woken by shutdown")
        .unwrap();
    assert!(ended.is_none());

    let err = channel
        .publish(TOPIC, "war.alice", "application/json", b"x".to_vec())
        .await
        .unwrap_err();
    assert!(matches!(err, garrison_broker::BrokerError::Closed));
}
