//! The consumer loop — the core state machine of the dispatch engine.
//!
//! One subscription owns one topology binding, one codec, one
//! flow-control limit, and one handler. [`subscribe`] performs the
//! setup steps synchronously (so failures reach the caller) and then
//! spawns a task that pulls deliveries for the life of the connection:
//!
//! ```text
//! declare topology → set prefetch → consume
//!     loop: pull → decode → handler → resolve (ack / requeue / drop)
//! ```
//!
//! Within a subscription, deliveries are handled strictly one at a
//! time in arrival order — a slow handler throttles only its own queue,
//! bounded by the prefetch limit. Subscriptions never block each other.

use std::future::Future;
use std::sync::Arc;

use garrison_broker::{
    BrokerChannel, Deliveries, Delivery, TopologyBinding,
};
use garrison_protocol::Codec;
use serde::de::DeserializeOwned;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use crate::{DeliveryOutcome, GarrisonError};

/// Default bound on deliveries held unacknowledged per subscription.
pub const DEFAULT_PREFETCH: u16 = 10;

/// Per-subscription tuning.
#[derive(Debug, Clone, Copy)]
pub struct SubscribeConfig {
    /// Maximum deliveries outstanding before the broker pauses this
    /// subscription. The system's only backpressure mechanism.
    pub prefetch: u16,
}

impl Default for SubscribeConfig {
    fn default() -> Self {
        Self {
            prefetch: DEFAULT_PREFETCH,
        }
    }
}

/// Handle to a running subscription task.
///
/// Dropping the handle leaves the subscription running for the life of
/// the connection; call [`shutdown`](Self::shutdown) to tear it down
/// deterministically.
pub struct Subscription {
    shutdown: Arc<Notify>,
    task: JoinHandle<()>,
}

impl Subscription {
    /// Stops pulling new deliveries, lets the in-flight one resolve,
    /// and waits for the loop to exit.
    pub async fn shutdown(self) {
        self.shutdown.notify_one();
        if let Err(error) = self.task.await {
            tracing::error!(%error, "subscription task failed");
        }
    }

    /// Waits for the subscription to end on its own (broker or
    /// connection closed).
    pub async fn join(self) {
        if let Err(error) = self.task.await {
            tracing::error!(%error, "subscription task failed");
        }
    }
}

/// Declares topology, applies flow control, and starts the consumer
/// loop for one subscription.
///
/// `handler` receives each decoded payload and returns the
/// [`DeliveryOutcome`] that resolves it. Handlers may publish
/// derivative events before returning.
///
/// # Errors
///
/// Setup failures — topology declaration, prefetch, registering the
/// consumer — propagate here and no task is spawned. After setup,
/// per-message problems are resolved through outcomes and never
/// surface as errors.
pub async fn subscribe<B, C, T, H, Fut>(
    channel: B,
    binding: TopologyBinding,
    codec: C,
    config: SubscribeConfig,
    mut handler: H,
) -> Result<Subscription, GarrisonError>
where
    B: BrokerChannel,
    C: Codec,
    T: DeserializeOwned + Send + 'static,
    H: FnMut(T) -> Fut + Send + 'static,
    Fut: Future<Output = DeliveryOutcome> + Send,
{
    channel.declare_and_bind(&binding).await?;
    channel.set_prefetch(config.prefetch).await?;
    let mut deliveries = channel.consume(binding.queue()).await?;

    let queue = binding.queue().to_string();
    tracing::info!(
        queue = %queue,
        key = binding.routing_key(),
        prefetch = config.prefetch,
        "subscription started"
    );

    let shutdown = Arc::new(Notify::new());
    let signal = Arc::clone(&shutdown);

    let task = tokio::spawn(async move {
        loop {
            let delivery = tokio::select! {
                _ = signal.notified() => break,
                next = deliveries.next() => match next {
                    Some(delivery) => delivery,
                    None => break,
                },
            };

            let outcome = match codec.decode::<T>(delivery.body()) {
                Ok(value) => handler(value).await,
                Err(error) => {
                    // An undecodable payload can never become valid for
                    // this consumer; requeueing would redeliver forever.
                    tracing::warn!(
                        queue = %queue,
                        %error,
                        "discarding undecodable delivery"
                    );
                    DeliveryOutcome::Discard
                }
            };

            let resolved = match outcome {
                DeliveryOutcome::Accept => delivery.ack().await,
                DeliveryOutcome::RetryRequeue => delivery.nack(true).await,
                DeliveryOutcome::Discard => delivery.nack(false).await,
            };
            if let Err(error) = resolved {
                // The channel is gone; the broker will redeliver the
                // unresolved message to whoever consumes next.
                tracing::error!(
                    queue = %queue,
                    %error,
                    "failed to resolve delivery"
                );
                break;
            }
        }
        tracing::info!(queue = %queue, "subscription ended");
    });

    Ok(Subscription { shutdown, task })
}
