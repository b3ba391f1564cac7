//! # Retry Backoff
//!
//! Quadratic backoff between upsert attempts and the sleep abstraction that
//! waits it out. The controller never calls `tokio::time::sleep` directly, so
//! tests can record delays without waiting and callers can abort a wait
//! through a [`CancellationToken`].

use crate::constants::DEFAULT_BACKOFF_UNIT;
use crate::error::{Result, SyncError};
use async_trait::async_trait;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Delay before retrying after attempt `n` is `unit × n²`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub unit: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            unit: DEFAULT_BACKOFF_UNIT,
        }
    }
}

impl BackoffPolicy {
    pub fn new(unit: Duration) -> Self {
        Self { unit }
    }

    /// Delay to wait after a retryable failure on attempt `attempt` (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.unit.saturating_mul(attempt.saturating_mul(attempt))
    }
}

/// Waits between attempts; implementations must return early on cancellation
#[async_trait]
pub trait Sleeper: Send + Sync {
    /// Sleep for `duration`, or fail with [`SyncError::Cancelled`] once `cancel` fires
    async fn sleep(&self, duration: Duration, cancel: &CancellationToken) -> Result<()>;
}

/// Real-time sleeper backed by the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration, cancel: &CancellationToken) -> Result<()> {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!(delay_ms = duration.as_millis() as u64, "Backoff sleep cancelled");
                Err(SyncError::Cancelled)
            }
            _ = tokio::time::sleep(duration) => Ok(()),
        }
    }
}
