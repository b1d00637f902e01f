//! The game-log sink collaborator.
//!
//! Persisting logs to disk is outside the engine's concern; this trait
//! is the seam where a real writer plugs in. A failed write makes the
//! game-log handler requeue the triggering delivery, so entries are
//! never silently lost.

use std::future::Future;
use std::sync::{Mutex, PoisonError};

use garrison_protocol::GameLog;

/// Errors from a log sink.
#[derive(Debug, thiserror::Error)]
pub enum LogError {
    #[error("log write failed: {0}")]
    Write(String),
}

/// Accepts structured game-log entries for persistence.
pub trait LogSink: Send + Sync + 'static {
    /// Persists one entry.
    fn record(
        &self,
        entry: &GameLog,
    ) -> impl Future<Output = Result<(), LogError>> + Send;
}

/// Writes entries to standard output. Used by the demo server.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleLogSink;

impl LogSink for ConsoleLogSink {
    async fn record(&self, entry: &GameLog) -> Result<(), LogError> {
        println!(
            "{} [{}] {}",
            entry.current_time.format("%Y-%m-%d %H:%M:%S"),
            entry.username,
            entry.message
        );
        Ok(())
    }
}

/// Collects entries in memory. Used by tests and embedded setups.
#[derive(Debug, Default)]
pub struct MemoryLogSink {
    entries: Mutex<Vec<GameLog>>,
}

impl MemoryLogSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A snapshot of everything recorded so far.
    pub fn entries(&self) -> Vec<GameLog> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl LogSink for MemoryLogSink {
    async fn record(&self, entry: &GameLog) -> Result<(), LogError> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry.clone());
        Ok(())
    }
}
