//! Unified error type for the dispatch engine.

use garrison_broker::BrokerError;
use garrison_protocol::ProtocolError;

/// Top-level error wrapping the layer-specific errors.
///
/// Setup-time failures (topology, consume registration) reach the
/// caller through this type and are typically fatal to the process;
/// steady-state per-message failures never do — they resolve through
/// [`DeliveryOutcome`](crate::DeliveryOutcome) instead.
#[derive(Debug, thiserror::Error)]
pub enum GarrisonError {
    /// A broker-level error (topology, publish, consume, resolution).
    #[error(transparent)]
    Broker(#[from] BrokerError),

    /// A payload-level error (encode, decode).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}
