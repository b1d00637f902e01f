//! In-process broker backend.
//!
//! Substitutes for a real AMQP broker in tests and embedded deployments:
//! exchanges with direct and topic routing, per-queue prefetch gating,
//! requeue-to-front redelivery, dead-lettering, and transient queue
//! teardown, all inside one process.
//!
//! Exchanges are pre-provisioned through
//! [`MemoryBroker::declare_exchange`], mirroring a real deployment where
//! the administrator provisions them and clients only declare queues.
//!
//! One deliberate divergence from AMQP: each queue allows a single
//! consumer at a time. A second `consume` on the same queue fails until
//! the first delivery sequence is dropped; there is no competing-consumer
//! round-robin. The dispatch engine attaches one subscription per queue,
//! so embedders sharing a durable queue across processes need the real
//! broker.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;

use crate::{
    BrokerChannel, BrokerError, Deliveries, Delivery, ExchangeKind,
    QueueLifetime, TopologyBinding,
};

#[derive(Debug)]
struct StoredMessage {
    body: Vec<u8>,
    content_type: String,
    routing_key: String,
}

#[derive(Debug)]
struct QueueState {
    lifetime: QueueLifetime,
    dead_letter_exchange: Option<String>,
    /// (exchange, routing key) pairs. Many-to-one: one queue may hold
    /// several bindings.
    bindings: Vec<(String, String)>,
    messages: VecDeque<StoredMessage>,
    /// Prefetch snapshot taken when the consumer attached. 0 = unlimited.
    prefetch: u16,
    unacked: u16,
    consuming: bool,
    notify: Arc<Notify>,
}

#[derive(Debug)]
struct BrokerInner {
    exchanges: HashMap<String, ExchangeKind>,
    queues: HashMap<String, QueueState>,
    closed: bool,
}

fn lock(inner: &Mutex<BrokerInner>) -> MutexGuard<'_, BrokerInner> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Routes one message copy into every queue whose binding matches.
/// Unroutable messages are dropped, as a real broker would.
fn route(
    inner: &mut BrokerInner,
    exchange: &str,
    routing_key: &str,
    content_type: &str,
    body: &[u8],
) -> Result<(), BrokerError> {
    let kind = *inner.exchanges.get(exchange).ok_or_else(|| {
        BrokerError::Publish(format!("exchange {exchange} does not exist"))
    })?;

    let targets: Vec<String> = inner
        .queues
        .iter()
        .filter(|(_, queue)| {
            queue.bindings.iter().any(|(bound_exchange, bound_key)| {
                bound_exchange == exchange
                    && match kind {
                        ExchangeKind::Direct => bound_key == routing_key,
                        ExchangeKind::Topic => {
                            topic_matches(bound_key, routing_key)
                        }
                    }
            })
        })
        .map(|(name, _)| name.clone())
        .collect();

    for name in targets {
        if let Some(queue) = inner.queues.get_mut(&name) {
            queue.messages.push_back(StoredMessage {
                body: body.to_vec(),
                content_type: content_type.to_string(),
                routing_key: routing_key.to_string(),
            });
            queue.notify.notify_one();
        }
    }
    Ok(())
}

/// Wildcard matching for topic bindings: `*` matches exactly one
/// dot-delimited word, `#` matches zero or more.
fn topic_matches(pattern: &str, key: &str) -> bool {
    fn matches(pattern: &[&str], key: &[&str]) -> bool {
        match (pattern.split_first(), key.split_first()) {
            (None, None) => true,
            (Some((&"#", rest)), _) => {
                matches(rest, key)
                    || key
                        .split_first()
                        .is_some_and(|(_, key_rest)| {
                            matches(pattern, key_rest)
                        })
            }
            (Some((&"*", pattern_rest)), Some((_, key_rest))) => {
                matches(pattern_rest, key_rest)
            }
            (Some((word, pattern_rest)), Some((key_word, key_rest))) => {
                word == key_word && matches(pattern_rest, key_rest)
            }
            _ => false,
        }
    }
    let pattern: Vec<&str> = pattern.split('.').collect();
    let key: Vec<&str> = key.split('.').collect();
    matches(&pattern, &key)
}

/// An in-process topic-capable broker.
///
/// Cheaply cloneable; every clone and every [`MemoryChannel`] shares the
/// same state.
#[derive(Clone)]
pub struct MemoryBroker {
    inner: Arc<Mutex<BrokerInner>>,
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(BrokerInner {
                exchanges: HashMap::new(),
                queues: HashMap::new(),
                closed: false,
            })),
        }
    }

    /// Provisions an exchange. The embedder plays the role of the
    /// broker administrator here.
    pub fn declare_exchange(&self, name: &str, kind: ExchangeKind) {
        lock(&self.inner).exchanges.insert(name.to_string(), kind);
    }

    /// Opens a channel onto this broker.
    pub fn channel(&self) -> MemoryChannel {
        MemoryChannel {
            inner: Arc::clone(&self.inner),
            prefetch: Arc::new(AtomicU16::new(0)),
        }
    }

    /// Closes the broker: every delivery sequence ends after draining
    /// its in-flight delivery, and further publishes fail.
    pub fn shutdown(&self) {
        let mut inner = lock(&self.inner);
        inner.closed = true;
        for queue in inner.queues.values() {
            queue.notify.notify_one();
        }
    }
}

impl Default for MemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

/// A channel onto a [`MemoryBroker`].
#[derive(Clone)]
pub struct MemoryChannel {
    inner: Arc<Mutex<BrokerInner>>,
    prefetch: Arc<AtomicU16>,
}

impl BrokerChannel for MemoryChannel {
    type Deliveries = MemoryDeliveries;

    async fn declare_and_bind(
        &self,
        binding: &TopologyBinding,
    ) -> Result<(), BrokerError> {
        let mut inner = lock(&self.inner);
        if inner.closed {
            return Err(BrokerError::Closed);
        }
        if !inner.exchanges.contains_key(binding.exchange()) {
            return Err(BrokerError::Topology(format!(
                "exchange {} does not exist",
                binding.exchange()
            )));
        }

        let queue = inner
            .queues
            .entry(binding.queue().to_string())
            .or_insert_with(|| QueueState {
                lifetime: binding.lifetime(),
                dead_letter_exchange: binding
                    .dead_letter_exchange()
                    .map(str::to_string),
                bindings: Vec::new(),
                messages: VecDeque::new(),
                prefetch: 0,
                unacked: 0,
                consuming: false,
                notify: Arc::new(Notify::new()),
            });

        if queue.lifetime != binding.lifetime()
            || queue.dead_letter_exchange.as_deref()
                != binding.dead_letter_exchange()
        {
            return Err(BrokerError::Topology(format!(
                "queue {} already exists with incompatible attributes",
                binding.queue()
            )));
        }

        let entry = (
            binding.exchange().to_string(),
            binding.routing_key().to_string(),
        );
        if !queue.bindings.contains(&entry) {
            queue.bindings.push(entry);
        }
        Ok(())
    }

    async fn set_prefetch(&self, limit: u16) -> Result<(), BrokerError> {
        self.prefetch.store(limit, Ordering::Relaxed);
        Ok(())
    }

    async fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        content_type: &str,
        body: Vec<u8>,
    ) -> Result<(), BrokerError> {
        let mut inner = lock(&self.inner);
        if inner.closed {
            return Err(BrokerError::Closed);
        }
        route(&mut inner, exchange, routing_key, content_type, &body)
    }

    async fn consume(
        &self,
        queue: &str,
    ) -> Result<Self::Deliveries, BrokerError> {
        let mut inner = lock(&self.inner);
        if inner.closed {
            return Err(BrokerError::Closed);
        }
        let state = inner.queues.get_mut(queue).ok_or_else(|| {
            BrokerError::Consume(format!("queue {queue} does not exist"))
        })?;
        if state.consuming {
            return Err(BrokerError::Consume(format!(
                "queue {queue} already has a consumer"
            )));
        }
        state.consuming = true;
        state.prefetch = self.prefetch.load(Ordering::Relaxed);
        state.unacked = 0;
        let notify = Arc::clone(&state.notify);

        Ok(MemoryDeliveries {
            queue: queue.to_string(),
            inner: Arc::clone(&self.inner),
            notify,
        })
    }
}

/// The delivery sequence of one in-process consumer.
///
/// Dropping it detaches the consumer; a transient queue is deleted with
/// it, matching the auto-delete semantics of the real broker.
#[derive(Debug)]
pub struct MemoryDeliveries {
    queue: String,
    inner: Arc<Mutex<BrokerInner>>,
    notify: Arc<Notify>,
}

impl Deliveries for MemoryDeliveries {
    type Delivery = MemoryDelivery;

    async fn next(&mut self) -> Option<Self::Delivery> {
        loop {
            // Register interest before re-checking state so a publish
            // between the check and the await leaves a stored permit.
            let notified = self.notify.notified();
            {
                let mut inner = lock(&self.inner);
                if inner.closed {
                    return None;
                }
                let queue = inner.queues.get_mut(&self.queue)?;
                if queue.prefetch == 0 || queue.unacked < queue.prefetch {
                    if let Some(message) = queue.messages.pop_front() {
                        queue.unacked += 1;
                        return Some(MemoryDelivery {
                            queue: self.queue.clone(),
                            message,
                            inner: Arc::clone(&self.inner),
                            notify: Arc::clone(&self.notify),
                        });
                    }
                }
            }
            notified.await;
        }
    }
}

impl Drop for MemoryDeliveries {
    fn drop(&mut self) {
        let mut inner = lock(&self.inner);
        let remove = match inner.queues.get_mut(&self.queue) {
            Some(queue) => {
                queue.consuming = false;
                queue.lifetime == QueueLifetime::Transient
            }
            None => false,
        };
        if remove {
            inner.queues.remove(&self.queue);
        }
    }
}

enum Resolution {
    Ack,
    Requeue,
    Discard,
}

/// One in-process delivery awaiting resolution.
pub struct MemoryDelivery {
    queue: String,
    message: StoredMessage,
    inner: Arc<Mutex<BrokerInner>>,
    notify: Arc<Notify>,
}

impl MemoryDelivery {
    fn settle(self, resolution: Resolution) {
        let mut inner = lock(&self.inner);
        let dead_letter = {
            let Some(queue) = inner.queues.get_mut(&self.queue) else {
                return;
            };
            queue.unacked = queue.unacked.saturating_sub(1);
            match resolution {
                Resolution::Ack => None,
                Resolution::Requeue => {
                    // Redelivery happens before anything newer.
                    queue.messages.push_front(self.message);
                    None
                }
                Resolution::Discard => queue
                    .dead_letter_exchange
                    .clone()
                    .map(|dlx| (dlx, self.message)),
            }
        };

        if let Some((dlx, message)) = dead_letter {
            if route(
                &mut inner,
                &dlx,
                &message.routing_key,
                &message.content_type,
                &message.body,
            )
            .is_err()
            {
                tracing::debug!(
                    exchange = %dlx,
                    "dead-letter exchange missing, dropping message"
                );
            }
        }

        self.notify.notify_one();
    }
}

impl Delivery for MemoryDelivery {
    fn body(&self) -> &[u8] {
        &self.message.body
    }

    fn content_type(&self) -> Option<&str> {
        Some(&self.message.content_type)
    }

    async fn ack(self) -> Result<(), BrokerError> {
        self.settle(Resolution::Ack);
        Ok(())
    }

    async fn nack(self, requeue: bool) -> Result<(), BrokerError> {
        self.settle(if requeue {
            Resolution::Requeue
        } else {
            Resolution::Discard
        });
        Ok(())
    }
}
