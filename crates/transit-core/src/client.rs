//! Trait abstraction over the remote transit service.
//!
//! [`TransitClient`] is implemented by [`HttpTransitClient`](crate::HttpTransitClient)
//! for the real service, by [`RetryingClient`](crate::RetryingClient) as a
//! decorator, and by [`MockTransitClient`](crate::MockTransitClient) for tests.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::DateTime;
use chrono_tz::Tz;

use transit_types::{Area, LineKey, LineRecord, StopKey, StopRecord, TripBatch, TripRecord};

use crate::error::Result;

/// How a by-line trip query selects its trips.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TripWindow {
    /// The server picks the `limit` trips closest to the reference time.
    Nearest { limit: usize },
    /// Trips with a day index in `from..=to`.
    IndexRange { from: usize, to: usize },
}

/// Queries the remote service answers.
///
/// Every trip query is scoped to a transport type and anchored to a
/// reference instant, which is also the day local stop times are resolved
/// against.
///
/// # Example
///
/// ```ignore
/// use transit_core::{TransitClient, Result};
/// use transit_types::Area;
///
/// async fn count_lines<C: TransitClient>(client: &C) -> Result<usize> {
///     Ok(client.lines(&Area::ALL).await?.len())
/// }
/// ```
#[async_trait]
pub trait TransitClient: Send + Sync {
    /// Every stop of the network, optionally capped to `limit` entries.
    async fn stops(&self, limit: Option<usize>) -> Result<Vec<StopRecord>>;

    /// Every line belonging to one of `areas`, with its news items.
    async fn lines(&self, areas: &[Area]) -> Result<Vec<LineRecord>>;

    /// Trips passing by a stop around `reference`.
    async fn trips_by_stop(
        &self,
        stop: StopKey,
        reference: DateTime<Tz>,
        limit: usize,
    ) -> Result<Vec<TripRecord>>;

    /// Trips of a line on the day of `reference`, tagged with their day index.
    async fn trips_by_line(
        &self,
        line: LineKey,
        reference: DateTime<Tz>,
        window: TripWindow,
    ) -> Result<TripBatch>;

    /// One trip by its opaque id.
    async fn trip_by_id(&self, trip_id: &str, reference: DateTime<Tz>) -> Result<TripRecord>;
}

#[async_trait]
impl<C: TransitClient + ?Sized> TransitClient for Arc<C> {
    async fn stops(&self, limit: Option<usize>) -> Result<Vec<StopRecord>> {
        (**self).stops(limit).await
    }

    async fn lines(&self, areas: &[Area]) -> Result<Vec<LineRecord>> {
        (**self).lines(areas).await
    }

    async fn trips_by_stop(
        &self,
        stop: StopKey,
        reference: DateTime<Tz>,
        limit: usize,
    ) -> Result<Vec<TripRecord>> {
        (**self).trips_by_stop(stop, reference, limit).await
    }

    async fn trips_by_line(
        &self,
        line: LineKey,
        reference: DateTime<Tz>,
        window: TripWindow,
    ) -> Result<TripBatch> {
        (**self).trips_by_line(line, reference, window).await
    }

    async fn trip_by_id(&self, trip_id: &str, reference: DateTime<Tz>) -> Result<TripRecord> {
        (**self).trip_by_id(trip_id, reference).await
    }
}
