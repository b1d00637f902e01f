/// What to do with a delivery once domain logic has seen it.
///
/// Every handler returns exactly one of these per message, and the
/// consumer loop applies it exactly once: no delivery is ever resolved
/// twice or left dangling unacknowledged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// The message was processed; remove it from the queue for good.
    Accept,

    /// The message does not apply yet, or a dependent side effect
    /// failed. Return it to the front of the queue so it is seen again.
    RetryRequeue,

    /// The message is malformed for this consumer's logic. Drop it
    /// permanently (dead-lettered if the queue is configured for it).
    Discard,
}
