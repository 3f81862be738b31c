//! Mock remote service for testing.
//!
//! [`MockTransitClient`] implements [`TransitClient`] over in-memory data and
//! records every call it receives, so tests can assert both on results and
//! on the network traffic a component generated.
//!
//! # Features
//!
//! - **Server-like trip windows**: by-line queries pick the trips nearest to
//!   the reference time, or an index range, out of a full day list
//! - **Failure injection**: fail every call, or only the next few
//! - **Call log**: inspect which queries were issued and how often

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use tokio::sync::RwLock;

use transit_types::{Area, LineKey, LineRecord, StopKey, StopRecord, TripBatch, TripRecord};

use crate::client::{TransitClient, TripWindow};
use crate::error::{Error, Result};
use crate::sync::Clock;

/// A call received by [`MockTransitClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    Stops,
    Lines,
    TripsByStop(StopKey),
    TripsByLine(LineKey, TripWindow),
    TripById(String),
}

/// An in-memory [`TransitClient`].
///
/// # Example
///
/// ```
/// use transit_core::{MockTransitClient, TransitClient};
/// use transit_types::Area;
///
/// #[tokio::main]
/// async fn main() {
///     let client = MockTransitClient::new();
///     assert!(client.lines(&Area::ALL).await.unwrap().is_empty());
///     assert_eq!(client.call_count(), 1);
/// }
/// ```
#[derive(Debug, Default)]
pub struct MockTransitClient {
    lines: RwLock<Vec<LineRecord>>,
    stops: RwLock<Vec<StopRecord>>,
    /// Full day of trips per line, in day order.
    line_trips: RwLock<Vec<(LineKey, Vec<TripRecord>)>>,
    stop_trips: RwLock<Vec<(StopKey, Vec<TripRecord>)>>,
    trips_by_id: RwLock<Vec<TripRecord>>,
    calls: Mutex<Vec<MockCall>>,
    should_fail: AtomicBool,
    /// Number of calls to fail before succeeding again.
    remaining_failures: AtomicU32,
}

impl MockTransitClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the reference dataset returned by `lines` and `stops`.
    pub async fn set_dataset(&self, lines: Vec<LineRecord>, stops: Vec<StopRecord>) {
        *self.lines.write().await = lines;
        *self.stops.write().await = stops;
    }

    /// Set the full list of trips `line` runs in a day.
    pub async fn set_line_trips(&self, line: LineKey, trips: Vec<TripRecord>) {
        let mut all = self.line_trips.write().await;
        all.retain(|(key, _)| *key != line);
        all.push((line, trips));
    }

    /// Set the trips returned for `stop`.
    pub async fn set_stop_trips(&self, stop: StopKey, trips: Vec<TripRecord>) {
        let mut all = self.stop_trips.write().await;
        all.retain(|(key, _)| *key != stop);
        all.push((stop, trips));
    }

    /// Set the copy of a trip returned by `trip_by_id`.
    pub async fn set_trip(&self, trip: TripRecord) {
        let mut all = self.trips_by_id.write().await;
        all.retain(|t| t.trip_id != trip.trip_id);
        all.push(trip);
    }

    /// Make every call fail (or succeed again).
    pub fn set_should_fail(&self, fail: bool) {
        self.should_fail.store(fail, Ordering::Relaxed);
    }

    /// Fail the next `count` calls, then behave normally.
    pub fn set_transient_failures(&self, count: u32) {
        self.remaining_failures.store(count, Ordering::Relaxed);
    }

    /// Every call received so far, oldest first.
    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.calls().len()
    }

    /// Number of calls matching `predicate`.
    pub fn count_calls(&self, predicate: impl Fn(&MockCall) -> bool) -> usize {
        self.calls().iter().filter(|c| predicate(c)).count()
    }

    /// Number of trip queries of any kind.
    pub fn trip_call_count(&self) -> usize {
        self.count_calls(|c| !matches!(c, MockCall::Stops | MockCall::Lines))
    }

    pub fn reset_calls(&self) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.clear();
        }
    }

    fn record(&self, call: MockCall) -> Result<()> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }

        let remaining = self.remaining_failures.load(Ordering::Relaxed);
        if remaining > 0 {
            self.remaining_failures.store(remaining - 1, Ordering::Relaxed);
            return Err(Self::failure());
        }
        if self.should_fail.load(Ordering::Relaxed) {
            return Err(Self::failure());
        }
        Ok(())
    }

    fn failure() -> Error {
        Error::Api {
            status: 503,
            message: "Mock failure".to_string(),
        }
    }
}

#[async_trait]
impl TransitClient for MockTransitClient {
    async fn stops(&self, limit: Option<usize>) -> Result<Vec<StopRecord>> {
        self.record(MockCall::Stops)?;
        let stops = self.stops.read().await;
        Ok(stops
            .iter()
            .take(limit.unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }

    async fn lines(&self, areas: &[Area]) -> Result<Vec<LineRecord>> {
        self.record(MockCall::Lines)?;
        let lines = self.lines.read().await;
        Ok(lines
            .iter()
            .filter(|l| l.area.is_none_or(|a| areas.contains(&a)))
            .cloned()
            .collect())
    }

    async fn trips_by_stop(
        &self,
        stop: StopKey,
        _reference: DateTime<Tz>,
        limit: usize,
    ) -> Result<Vec<TripRecord>> {
        self.record(MockCall::TripsByStop(stop))?;
        let all = self.stop_trips.read().await;
        Ok(all
            .iter()
            .find(|(key, _)| *key == stop)
            .map(|(_, trips)| trips.iter().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    async fn trips_by_line(
        &self,
        line: LineKey,
        reference: DateTime<Tz>,
        window: TripWindow,
    ) -> Result<TripBatch> {
        self.record(MockCall::TripsByLine(line, window))?;
        let all = self.line_trips.read().await;
        let Some((_, day)) = all.iter().find(|(key, _)| *key == line) else {
            return Ok(TripBatch::default());
        };

        let indexed: Vec<(usize, TripRecord)> = match window {
            TripWindow::Nearest { limit } => {
                let ts = reference.timestamp();
                let mut by_distance: Vec<(u64, usize)> = day
                    .iter()
                    .enumerate()
                    .map(|(i, t)| {
                        let sort = t.server_sort_time().map_or(0, |s| s.timestamp());
                        (sort.abs_diff(ts), i)
                    })
                    .collect();
                by_distance.sort_unstable();

                let mut picked: Vec<usize> =
                    by_distance.into_iter().take(limit).map(|(_, i)| i).collect();
                picked.sort_unstable();
                picked.into_iter().map(|i| (i, day[i].clone())).collect()
            }
            TripWindow::IndexRange { from, to } => day
                .iter()
                .enumerate()
                .filter(|(i, _)| (from..=to).contains(i))
                .map(|(i, t)| (i, t.clone()))
                .collect(),
        };

        Ok(TripBatch {
            total: day.len(),
            trips: indexed,
        })
    }

    async fn trip_by_id(&self, trip_id: &str, _reference: DateTime<Tz>) -> Result<TripRecord> {
        self.record(MockCall::TripById(trip_id.to_string()))?;
        self.trips_by_id
            .read()
            .await
            .iter()
            .find(|t| t.trip_id == trip_id)
            .cloned()
            .ok_or_else(|| Error::Api {
                status: 404,
                message: format!("trip {trip_id} not found"),
            })
    }
}

/// A [`Clock`] that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        if let Ok(mut guard) = self.now.lock() {
            *guard = now;
        }
    }

    pub fn advance(&self, by: Duration) {
        if let Ok(mut guard) = self.now.lock() {
            *guard += by;
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.now
            .lock()
            .map(|guard| *guard)
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, TimeZone};
    use chrono_tz::Europe::Rome;
    use transit_types::{DELAY_UNKNOWN, Direction, StopTimeRecord, TransportType, VEHICLE_UNKNOWN};

    fn trip(id: usize, minute: u32) -> TripRecord {
        TripRecord {
            delay: DELAY_UNKNOWN,
            direction: Direction::Forward,
            last_event_at: None,
            line_id: 5,
            transport_type: TransportType::Urban,
            head_sign: "Povo".into(),
            trip_id: format!("t{id}"),
            completed_stops: 0,
            stop_times: vec![StopTimeRecord {
                arrival: Some(
                    FixedOffset::east_opt(3600)
                        .unwrap()
                        .with_ymd_and_hms(2024, 3, 1, 8, minute, 0)
                        .unwrap(),
                ),
                departure: None,
                stop_id: 1,
            }],
            vehicle_id: VEHICLE_UNKNOWN,
        }
    }

    #[tokio::test]
    async fn test_nearest_window_picks_closest_trips() {
        let client = MockTransitClient::new();
        let line = LineKey::new(5, TransportType::Urban);
        client
            .set_line_trips(line, (0..10).map(|i| trip(i, i as u32 * 5)).collect())
            .await;

        let reference = Rome.with_ymd_and_hms(2024, 3, 1, 8, 21, 0).unwrap();
        let batch = client
            .trips_by_line(line, reference, TripWindow::Nearest { limit: 2 })
            .await
            .unwrap();

        assert_eq!(batch.total, 10);
        let indices: Vec<usize> = batch.trips.iter().map(|(i, _)| *i).collect();
        assert_eq!(indices, vec![4, 5]);
    }

    #[tokio::test]
    async fn test_transient_failures() {
        let client = MockTransitClient::new();
        client.set_transient_failures(2);

        assert!(client.stops(None).await.is_err());
        assert!(client.stops(None).await.is_err());
        assert!(client.stops(None).await.is_ok());
        assert_eq!(client.count_calls(|c| *c == MockCall::Stops), 3);
    }

    #[test]
    fn test_manual_clock() {
        let clock = ManualClock::new(DateTime::<Utc>::UNIX_EPOCH);
        clock.advance(Duration::days(1));
        assert_eq!(clock.now().timestamp(), 86_400);
    }
}
