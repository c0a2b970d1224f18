//! Bounded retries with exponential backoff and jitter

use rand::Rng;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

pub const DEFAULT_MAX_RETRY_COUNT: u32 = 10;

#[derive(Error, Debug)]
pub enum RetryError<E> {
    #[error("Operation cancelled")]
    Cancelled,

    #[error(transparent)]
    Operation(E),
}

impl<E> RetryError<E> {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, RetryError::Cancelled)
    }
}

/// Backoff schedule.
///
/// Retry `n` (starting at 1) waits `base^n * scale` plus a uniform jitter in
/// `[0, max_jitter)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retry_count: u32,
    pub base: u32,
    pub scale: Duration,
    pub max_jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retry_count: DEFAULT_MAX_RETRY_COUNT,
            base: 2,
            scale: Duration::from_millis(500),
            max_jitter: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    pub fn with_max_retry_count(mut self, max_retry_count: u32) -> Self {
        self.max_retry_count = max_retry_count;
        self
    }

    /// Policy that retries immediately
    pub fn immediate(max_retry_count: u32) -> Self {
        Self {
            max_retry_count,
            base: 2,
            scale: Duration::ZERO,
            max_jitter: Duration::ZERO,
        }
    }

    /// Backoff before retry `attempt`, without jitter
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.scale.saturating_mul(self.base.saturating_pow(attempt))
    }

    /// Backoff before retry `attempt`, with jitter
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let jitter = if self.max_jitter.is_zero() {
            Duration::ZERO
        } else {
            self.max_jitter.mul_f64(rand::rng().random_range(0.0..1.0))
        };
        self.backoff(attempt).saturating_add(jitter)
    }
}

/// Run `operation` until it succeeds.
///
/// Failures in the first `max_retry_count` attempts are followed by a backoff
/// sleep; after those, one final attempt is made and its result returned as
/// is. Cancelling `cancel` interrupts a running sleep and prevents further
/// attempts.
pub async fn retrying<T, E, F, Fut>(
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    mut operation: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    for attempt in 1..=policy.max_retry_count {
        if cancel.is_cancelled() {
            return Err(RetryError::Cancelled);
        }

        let error = match operation().await {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };

        let delay = policy.delay_for(attempt);
        warn!(
            attempt,
            max_retry_count = policy.max_retry_count,
            delay_ms = delay.as_millis() as u64,
            error = %error,
            "Attempt failed, retrying"
        );

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(attempt, "Backoff interrupted by cancellation");
                return Err(RetryError::Cancelled);
            }
            _ = tokio::time::sleep(delay) => {}
        }
    }

    if cancel.is_cancelled() {
        return Err(RetryError::Cancelled);
    }
    operation().await.map_err(RetryError::Operation)
}
