/// Errors that can occur in the broker layer.
///
/// Setup-time variants (`Connect`, `Topology`, `Consume`) are fatal to
/// whatever was being set up and propagate to the caller; `Publish` and
/// `Resolve` surface per-operation failures on an otherwise live
/// channel.
#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    /// Establishing the connection or channel failed.
    #[error("connect failed: {0}")]
    Connect(String),

    /// Declaring the queue or binding it to its exchange failed.
    #[error("topology declaration failed: {0}")]
    Topology(String),

    /// The broker refused to route a message.
    #[error("publish failed: {0}")]
    Publish(String),

    /// Establishing the delivery sequence failed.
    #[error("consume setup failed: {0}")]
    Consume(String),

    /// Acknowledging or rejecting a delivery failed.
    #[error("delivery resolution failed: {0}")]
    Resolve(String),

    /// The underlying connection is closed.
    #[error("broker connection closed")]
    Closed,
}
