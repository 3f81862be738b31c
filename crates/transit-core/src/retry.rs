//! Retry logic for remote service calls.
//!
//! Every failure is retried the same way: there is no distinction between
//! errors worth retrying and errors that are not. After a failed attempt `n`
//! the next attempt waits `step × n`, so the default schedule sleeps 200, 400,
//! 600 and 800 ms between five attempts.
//!
//! # Example
//!
//! ```
//! use transit_core::{RetryConfig, with_retry, Error};
//!
//! # async fn example() -> Result<(), Error> {
//! let attempts = RetryConfig::new(3);
//! let count = with_retry(&attempts, "stops", || async { Ok::<_, Error>(12usize) }).await?;
//! assert_eq!(count, 12);
//! # Ok(())
//! # }
//! ```

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use chrono::DateTime;
use chrono_tz::Tz;
use tokio::time::sleep;
use tracing::{debug, warn};

use transit_types::{Area, LineKey, LineRecord, StopKey, StopRecord, TripBatch, TripRecord};

use crate::client::{TransitClient, TripWindow};
use crate::error::Result;

/// Attempt count and backoff unit for [`with_retry`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Total number of attempts, including the first one.
    pub max_attempts: u32,
    /// Backoff unit; the wait after attempt `n` is `step * n`.
    pub step: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            step: Duration::from_millis(200),
        }
    }
}

impl RetryConfig {
    /// Default backoff with `max_attempts` attempts in total.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Default::default()
        }
    }

    /// Set the total number of attempts.
    #[must_use]
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Set the backoff unit.
    #[must_use]
    pub fn step(mut self, step: Duration) -> Self {
        self.step = step;
        self
    }

    /// Delay to wait after the failed attempt number `attempt` (1-based).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.step * attempt
    }
}

/// Run `operation` until it succeeds or `config.max_attempts` calls have
/// failed, in which case the last error is returned.
pub async fn with_retry<F, Fut, T>(
    config: &RetryConfig,
    operation_name: &str,
    operation: F,
) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    debug!(
                        "{} succeeded on attempt {} after {} failures",
                        operation_name,
                        attempt,
                        attempt - 1
                    );
                }
                return Ok(result);
            }
            Err(e) if attempt >= max_attempts => return Err(e),
            Err(e) => {
                let delay = config.delay_for_attempt(attempt);
                warn!(
                    "{} failed (attempt {}/{}): {}; retrying in {:?}",
                    operation_name, attempt, max_attempts, e, delay
                );
                sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

/// [`TransitClient`] decorator running every call through [`with_retry`].
#[derive(Debug, Clone)]
pub struct RetryingClient<C> {
    inner: C,
    config: RetryConfig,
}

impl<C: TransitClient> RetryingClient<C> {
    pub fn new(inner: C, config: RetryConfig) -> Self {
        Self { inner, config }
    }
}

#[async_trait]
impl<C: TransitClient> TransitClient for RetryingClient<C> {
    async fn stops(&self, limit: Option<usize>) -> Result<Vec<StopRecord>> {
        with_retry(&self.config, "stops", || self.inner.stops(limit)).await
    }

    async fn lines(&self, areas: &[Area]) -> Result<Vec<LineRecord>> {
        with_retry(&self.config, "lines", || self.inner.lines(areas)).await
    }

    async fn trips_by_stop(
        &self,
        stop: StopKey,
        reference: DateTime<Tz>,
        limit: usize,
    ) -> Result<Vec<TripRecord>> {
        with_retry(&self.config, "trips_by_stop", || {
            self.inner.trips_by_stop(stop, reference, limit)
        })
        .await
    }

    async fn trips_by_line(
        &self,
        line: LineKey,
        reference: DateTime<Tz>,
        window: TripWindow,
    ) -> Result<TripBatch> {
        with_retry(&self.config, "trips_by_line", || {
            self.inner.trips_by_line(line, reference, window)
        })
        .await
    }

    async fn trip_by_id(&self, trip_id: &str, reference: DateTime<Tz>) -> Result<TripRecord> {
        with_retry(&self.config, "trip_by_id", || {
            self.inner.trip_by_id(trip_id, reference)
        })
        .await
    }
}
