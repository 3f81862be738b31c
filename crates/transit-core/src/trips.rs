//! Sparse, lazily filled caches of live trips.
//!
//! A line can run hundreds of trips a day and every trip carries its full
//! stop sequence, so a day is never downloaded at once. [`LineTripsCache`]
//! keeps, per line and calendar day, a sparse map from the trip's index in
//! the day to the trip, and only fetches small windows around what is asked
//! for. [`StopTripsCache`] keeps the short list of upcoming trips at a stop.
//!
//! Both caches take `&mut self`: one cache has one writer. Share a cache
//! between tasks by wrapping it in a mutex.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate};
use chrono_tz::Tz;
use tracing::debug;

use transit_types::{Direction, LineKey, StopKey, TripBatch, TripRecord};

use crate::cache::{Merge, SessionCache};
use crate::client::{TransitClient, TripWindow};
use crate::error::{Error, Result};

/// How many line trips are fetched at once.
pub const LINE_TRIPS_BATCH_SIZE: usize = 8;

/// How many trips are fetched for a stop.
pub const STOP_TRIPS_LIMIT: usize = 12;

/// The known trips of one line on one day.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DayTripIndex {
    total: usize,
    trips: BTreeMap<usize, TripRecord>,
}

impl From<TripBatch> for DayTripIndex {
    fn from(batch: TripBatch) -> Self {
        let trips: BTreeMap<usize, TripRecord> = batch.trips.into_iter().collect();
        let past_last = trips.keys().next_back().map_or(0, |i| i + 1);
        Self {
            total: batch.total.max(past_last),
            trips,
        }
    }
}

impl Merge for DayTripIndex {
    /// An empty batch says nothing about the day, so it keeps the old total.
    fn merge(&mut self, newer: Self) {
        if !newer.trips.is_empty() {
            self.total = newer.total;
        }
        self.trips.extend(newer.trips);
    }
}

impl DayTripIndex {
    /// Number of trips in the day, as of the last fetch.
    pub fn total(&self) -> usize {
        self.total
    }

    pub fn get(&self, index: usize) -> Option<&TripRecord> {
        self.trips.get(&index)
    }

    pub fn contains(&self, index: usize) -> bool {
        self.trips.contains_key(&index)
    }

    /// Number of trips loaded so far.
    pub fn loaded(&self) -> usize {
        self.trips.len()
    }

    pub fn insert(&mut self, index: usize, trip: TripRecord) {
        self.trips.insert(index, trip);
    }

    /// Whether the trips around `reference` are provably loaded.
    ///
    /// Takes the two loaded trips whose server sort time is closest to
    /// `reference` (ties go to the lower index, trips without a sort time
    /// count as the epoch). The neighbourhood is loaded only if both exist,
    /// their indices are consecutive, and `reference` lies between their
    /// sort times. Otherwise an unfetched trip could be closer.
    pub fn is_closest_on_server_loaded(&self, reference: i64) -> bool {
        let mut by_distance: Vec<(u64, usize, i64)> = self
            .trips
            .iter()
            .map(|(index, trip)| {
                let sort_time = trip.server_sort_time().map_or(0, |t| t.timestamp());
                (sort_time.abs_diff(reference), *index, sort_time)
            })
            .collect();
        by_distance.sort_unstable();

        let (first, second) = match by_distance.as_slice() {
            [a, b, ..] if a.1 < b.1 => (a, b),
            [a, b, ..] => (b, a),
            _ => return false,
        };

        first.2 <= reference && reference <= second.2 && first.1 + 1 == second.1
    }

    /// The loaded trip whose representative time is closest to `reference`.
    ///
    /// Only trips passing `direction_filter` are considered; ties go to the
    /// lower index.
    pub fn nearest(&self, reference: i64, direction_filter: Direction) -> Option<(usize, &TripRecord)> {
        self.trips
            .iter()
            .filter(|(_, trip)| trip.direction.matches_filter(direction_filter))
            .min_by_key(|(index, trip)| {
                let time = trip.representative_time().map_or(0, |t| t.timestamp());
                (time.abs_diff(reference), **index)
            })
            .map(|(index, trip)| (*index, trip))
    }

    /// Inclusive index range to fetch so that `index` gets loaded.
    ///
    /// The range spans half a batch on each side of `index`, stops before
    /// the closest loaded trips on either side, and never goes past the
    /// day's total.
    pub fn fetch_range(day: Option<&Self>, index: usize) -> (usize, usize) {
        let half = LINE_TRIPS_BATCH_SIZE / 2;
        let after_prev = day
            .and_then(|d| d.trips.range(..index).next_back())
            .map_or(0, |(i, _)| i + 1);
        let before_next = day
            .and_then(|d| d.trips.range(index + 1..).next())
            .map_or(usize::MAX, |(i, _)| i - 1);
        let total = day.map_or(usize::MAX, |d| d.total);

        let from = index.saturating_sub(half).max(after_prev);
        let to = total.min(index.saturating_add(half)).min(before_next);
        (from, to)
    }
}

/// Result of [`LineTripsCache::trip_near`].
#[derive(Debug, Clone, PartialEq)]
pub struct TripNear {
    /// Trips in the day, as of the last fetch.
    pub total: usize,
    /// Index and trip closest to the reference time, if any matched.
    pub nearest: Option<(usize, TripRecord)>,
}

/// Result of [`LineTripsCache::trip_with_direction`].
#[derive(Debug, Clone, PartialEq)]
pub struct DirectedTrip {
    pub index: usize,
    pub trip: TripRecord,
    /// Whether the call had to go to the network.
    pub fetched: bool,
}

type DayKey = (LineKey, NaiveDate);

fn day_key(line: LineKey, reference: &DateTime<Tz>) -> DayKey {
    (line, reference.date_naive())
}

/// Per line and day sparse trip cache.
#[derive(Debug)]
pub struct LineTripsCache<C> {
    client: C,
    days: SessionCache<DayKey, DayTripIndex>,
}

impl<C: TransitClient> LineTripsCache<C> {
    pub fn new(client: C) -> Self {
        Self {
            client,
            days: SessionCache::new(),
        }
    }

    /// The cached day of `line` containing `reference`.
    pub fn day(&self, line: LineKey, reference: &DateTime<Tz>) -> Option<&DayTripIndex> {
        self.days.get(&day_key(line, reference))
    }

    /// The trip of `line` closest to `reference`.
    ///
    /// Fetches a batch around `reference` unless the neighbourhood is
    /// already provably loaded.
    pub async fn trip_near(
        &mut self,
        line: LineKey,
        reference: DateTime<Tz>,
        direction_filter: Direction,
    ) -> Result<TripNear> {
        let key = day_key(line, &reference);
        let ts = reference.timestamp();

        let loaded = self
            .days
            .get(&key)
            .is_some_and(|day| day.is_closest_on_server_loaded(ts));

        if !loaded {
            debug!("Fetching trips of line {} near {}", line, reference);
            let batch = self
                .client
                .trips_by_line(line, reference, TripWindow::Nearest {
                    limit: LINE_TRIPS_BATCH_SIZE,
                })
                .await?;
            self.days.merge(key, DayTripIndex::from(batch));
        }

        Ok(match self.days.get(&key) {
            Some(day) => TripNear {
                total: day.total(),
                nearest: day
                    .nearest(ts, direction_filter)
                    .map(|(index, trip)| (index, trip.clone())),
            },
            None => TripNear {
                total: 0,
                nearest: None,
            },
        })
    }

    /// The trip at `index` in the day of `reference`, and whether it had to
    /// be fetched.
    ///
    /// A trip already in the cache is returned without any network call.
    pub async fn trip_at_index(
        &mut self,
        line: LineKey,
        reference: DateTime<Tz>,
        index: usize,
    ) -> Result<(TripRecord, bool)> {
        let key = day_key(line, &reference);
        if let Some(trip) = self.days.get(&key).and_then(|day| day.get(index)) {
            return Ok((trip.clone(), false));
        }

        self.load_around(line, reference, index).await?;

        let day = self.days.get(&key);
        day.and_then(|d| d.get(index))
            .map(|trip| (trip.clone(), true))
            .ok_or(Error::IndexOutOfRange {
                index,
                total: day.map_or(0, DayTripIndex::total),
            })
    }

    /// The trip closest to `index` that travels in `direction`.
    ///
    /// Candidates are walked away from `index` in the direction the user was
    /// moving: downwards if `index < prev_index`, upwards if
    /// `index > prev_index`. When both are equal the walk alternates around
    /// `index`, starting upwards for [`Direction::Forward`] (5, 6, 4, 7, ...)
    /// and downwards for [`Direction::Backward`] (5, 4, 6, 3, ...), so that
    /// toggling the direction cycles between the same two trips.
    ///
    /// At most one fetch happens per call. `None` when the walk runs off the
    /// day or would need a second fetch.
    pub async fn trip_with_direction(
        &mut self,
        line: LineKey,
        reference: DateTime<Tz>,
        direction: Direction,
        index: usize,
        prev_index: usize,
    ) -> Result<Option<DirectedTrip>> {
        let key = day_key(line, &reference);
        let mut fetched = false;

        if !self.days.contains_key(&key) {
            self.load_around(line, reference, index).await?;
            fetched = true;
        }

        let total = self.days.get(&key).map_or(0, DayTripIndex::total);
        for candidate in nearby_indices(index, prev_index, total, direction) {
            let present = self.days.get(&key).is_some_and(|d| d.contains(candidate));
            if !present && !fetched {
                fetched = true;
                self.load_around(line, reference, candidate).await?;
            }

            let Some(trip) = self.days.get(&key).and_then(|d| d.get(candidate)) else {
                return Ok(None);
            };
            if trip.direction == direction {
                return Ok(Some(DirectedTrip {
                    index: candidate,
                    trip: trip.clone(),
                    fetched,
                }));
            }
        }

        Ok(None)
    }

    /// Refresh one trip by id.
    ///
    /// If the cached trip had live telemetry and the fresh copy has none, the
    /// cached trip is kept. Otherwise the fresh copy replaces it at `index`.
    pub async fn reload_trip(
        &mut self,
        line: LineKey,
        reference: DateTime<Tz>,
        index: usize,
        trip_id: &str,
    ) -> Result<TripRecord> {
        let fresh = self.client.trip_by_id(trip_id, reference).await?;
        let key = day_key(line, &reference);

        let Some(day) = self.days.get_mut(&key) else {
            return Ok(fresh);
        };

        if let Some(cached) = day.get(index)
            && cached.has_live_data()
            && !fresh.has_live_data()
        {
            debug!("Keeping cached trip {}: refreshed copy has no live data", trip_id);
            return Ok(cached.clone());
        }

        day.insert(index, fresh.clone());
        Ok(fresh)
    }

    async fn load_around(
        &mut self,
        line: LineKey,
        reference: DateTime<Tz>,
        index: usize,
    ) -> Result<()> {
        let key = day_key(line, &reference);
        let (from, to) = DayTripIndex::fetch_range(self.days.get(&key), index);
        if from > to {
            return Ok(());
        }

        debug!("Fetching trips {}..={} of line {}", from, to, line);
        let batch = self
            .client
            .trips_by_line(line, reference, TripWindow::IndexRange { from, to })
            .await?;
        self.days.merge(key, DayTripIndex::from(batch));
        Ok(())
    }
}

/// Order in which [`LineTripsCache::trip_with_direction`] tries indices.
fn nearby_indices(
    index: usize,
    prev_index: usize,
    total: usize,
    direction: Direction,
) -> Vec<usize> {
    match index.cmp(&prev_index) {
        Ordering::Less => (0..=index).rev().collect(),
        Ordering::Greater => (index..total).collect(),
        Ordering::Equal => {
            let up_first = direction == Direction::Forward;
            let (mut down, mut up) = if up_first {
                (Some(index), index + 1)
            } else {
                (index.checked_sub(1), index)
            };

            let mut out = Vec::new();
            loop {
                let next_down = down;
                let next_up = (up < total).then_some(up);
                if next_down.is_none() && next_up.is_none() {
                    break;
                }

                let pair = if up_first {
                    [next_down, next_up]
                } else {
                    [next_up, next_down]
                };
                out.extend(pair.into_iter().flatten());

                if next_down.is_some() {
                    down = down.and_then(|d| d.checked_sub(1));
                }
                if next_up.is_some() {
                    up += 1;
                }
            }
            out
        }
    }
}

/// The trips at one stop around one reference time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StopTripWindow {
    pub trips: Vec<TripRecord>,
}

impl Merge for StopTripWindow {
    /// Known trips take the newer live status; unknown ones are appended.
    fn merge(&mut self, newer: Self) {
        for fresh in newer.trips {
            match self.trips.iter_mut().find(|t| t.trip_id == fresh.trip_id) {
                Some(existing) => existing.apply_live_status(&fresh),
                None => self.trips.push(fresh),
            }
        }
    }
}

type WindowKey = (StopKey, i64);

/// Trips at a stop, fetched once per stop and reference time.
#[derive(Debug)]
pub struct StopTripsCache<C> {
    client: C,
    windows: SessionCache<WindowKey, StopTripWindow>,
}

impl<C: TransitClient> StopTripsCache<C> {
    pub fn new(client: C) -> Self {
        Self {
            client,
            windows: SessionCache::new(),
        }
    }

    /// Trips at `stop` around `reference`, in the order the service returned
    /// them.
    pub async fn trips(&mut self, stop: StopKey, reference: DateTime<Tz>) -> Result<Vec<TripRecord>> {
        let key = (stop, reference.timestamp());
        if !self.windows.contains_key(&key) {
            debug!("Fetching trips at stop {} around {}", stop, reference);
            let trips = self
                .client
                .trips_by_stop(stop, reference, STOP_TRIPS_LIMIT)
                .await?;
            self.windows.merge(key, StopTripWindow { trips });
        }

        Ok(self
            .windows
            .get(&key)
            .map(|w| w.trips.clone())
            .unwrap_or_default())
    }

    /// Refresh the live status of the trip at `index`.
    ///
    /// Only the volatile fields are replaced; the trip's identity and stop
    /// sequence stay as first fetched.
    pub async fn reload_one(
        &mut self,
        stop: StopKey,
        reference: DateTime<Tz>,
        index: usize,
        trip_id: &str,
    ) -> Result<TripRecord> {
        let key = (stop, reference.timestamp());
        let len = self.windows.get(&key).map_or(0, |w| w.trips.len());
        if index >= len {
            return Err(Error::IndexOutOfRange { index, total: len });
        }

        let fresh = self.client.trip_by_id(trip_id, reference).await?;

        let entry = self
            .windows
            .get_mut(&key)
            .and_then(|w| w.trips.get_mut(index))
            .ok_or(Error::IndexOutOfRange { index, total: len })?;
        entry.apply_live_status(&fresh);
        Ok(entry.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, TimeZone};
    use transit_types::{StopTimeRecord, TransportType, VEHICLE_UNKNOWN};

    fn at(h: u32, m: u32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(3600)
            .unwrap()
            .with_ymd_and_hms(2024, 3, 1, h, m, 0)
            .unwrap()
    }

    fn trip(id: &str, direction: Direction, start: (u32, u32), end: (u32, u32)) -> TripRecord {
        TripRecord {
            delay: 0,
            direction,
            last_event_at: None,
            line_id: 5,
            transport_type: TransportType::Urban,
            head_sign: "Povo".into(),
            trip_id: id.into(),
            completed_stops: 0,
            stop_times: vec![
                StopTimeRecord {
                    arrival: Some(at(start.0, start.1)),
                    departure: Some(at(start.0, start.1)),
                    stop_id: 1,
                },
                StopTimeRecord {
                    arrival: Some(at(end.0, end.1)),
                    departure: Some(at(end.0, end.1)),
                    stop_id: 2,
                },
            ],
            vehicle_id: VEHICLE_UNKNOWN,
        }
    }

    fn day(total: usize, trips: Vec<(usize, TripRecord)>) -> DayTripIndex {
        DayTripIndex::from(TripBatch { total, trips })
    }

    #[test]
    fn test_loadedness_rejects_gap() {
        let d = day(
            20,
            vec![
                (5, trip("t5", Direction::Forward, (8, 0), (8, 30))),
                (7, trip("t7", Direction::Forward, (8, 20), (8, 50))),
            ],
        );
        assert!(!d.is_closest_on_server_loaded(at(8, 10).timestamp()));
    }

    #[test]
    fn test_loadedness_accepts_consecutive_straddle() {
        let d = day(
            20,
            vec![
                (5, trip("t5", Direction::Forward, (8, 0), (8, 30))),
                (6, trip("t6", Direction::Forward, (8, 20), (8, 50))),
            ],
        );
        assert!(d.is_closest_on_server_loaded(at(8, 10).timestamp()));
        // bounds are inclusive
        assert!(d.is_closest_on_server_loaded(at(8, 0).timestamp()));
        assert!(d.is_closest_on_server_loaded(at(8, 20).timestamp()));
        // outside the two sort times
        assert!(!d.is_closest_on_server_loaded(at(8, 21).timestamp()));
    }

    #[test]
    fn test_loadedness_needs_two_trips() {
        let d = day(20, vec![(5, trip("t5", Direction::Forward, (8, 0), (8, 30)))]);
        assert!(!d.is_closest_on_server_loaded(at(8, 0).timestamp()));
        assert!(!DayTripIndex::default().is_closest_on_server_loaded(0));
    }

    #[test]
    fn test_nearest_uses_midpoint_and_filter() {
        let d = day(
            20,
            vec![
                // midpoint 8:15
                (1, trip("a", Direction::Forward, (8, 0), (8, 30))),
                // midpoint 9:15
                (2, trip("b", Direction::Backward, (9, 0), (9, 30))),
            ],
        );
        let ts = at(8, 50).timestamp();

        let (index, _) = d.nearest(ts, Direction::ForwardAndBackward).unwrap();
        assert_eq!(index, 2);
        let (index, _) = d.nearest(ts, Direction::Forward).unwrap();
        assert_eq!(index, 1);
    }

    #[test]
    fn test_nearest_tie_prefers_lower_index() {
        let d = day(
            20,
            vec![
                (4, trip("a", Direction::Forward, (8, 0), (8, 20))),
                (3, trip("b", Direction::Forward, (8, 20), (8, 40))),
            ],
        );
        let (index, _) = d.nearest(at(8, 20).timestamp(), Direction::Forward).unwrap();
        assert_eq!(index, 3);
    }

    #[test]
    fn test_fetch_range() {
        assert_eq!(DayTripIndex::fetch_range(None, 10), (6, 14));
        assert_eq!(DayTripIndex::fetch_range(None, 2), (0, 6));

        let d = day(
            12,
            vec![
                (8, trip("a", Direction::Forward, (8, 0), (8, 20))),
                (11, trip("b", Direction::Forward, (9, 0), (9, 20))),
            ],
        );
        assert_eq!(DayTripIndex::fetch_range(Some(&d), 10), (9, 10));
        assert_eq!(DayTripIndex::fetch_range(Some(&d), 5), (1, 7));
    }

    #[test]
    fn test_merge_keeps_total_on_empty_batch() {
        let mut d = day(30, vec![(0, trip("a", Direction::Forward, (8, 0), (8, 20)))]);
        d.merge(day(0, vec![]));
        assert_eq!(d.total(), 30);

        d.merge(day(31, vec![(1, trip("b", Direction::Forward, (9, 0), (9, 20)))]));
        assert_eq!(d.total(), 31);
        assert_eq!(d.loaded(), 2);
    }

    #[test]
    fn test_nearby_indices() {
        assert_eq!(
            nearby_indices(5, 5, 10, Direction::Forward)[..5],
            [5, 6, 4, 7, 3]
        );
        assert_eq!(
            nearby_indices(5, 5, 10, Direction::Backward)[..5],
            [5, 4, 6, 3, 7]
        );
        assert_eq!(nearby_indices(3, 4, 10, Direction::Forward), vec![3, 2, 1, 0]);
        assert_eq!(nearby_indices(7, 6, 10, Direction::Backward), vec![7, 8, 9]);
        assert_eq!(nearby_indices(0, 0, 2, Direction::Backward), vec![0, 1]);
        assert_eq!(nearby_indices(1, 1, 2, Direction::Forward), vec![1, 0]);
    }

    #[test]
    fn test_stop_window_merge() {
        let mut window = StopTripWindow {
            trips: vec![trip("a", Direction::Forward, (8, 0), (8, 20))],
        };
        let mut fresh = trip("a", Direction::Forward, (8, 0), (8, 20));
        fresh.delay = 7;
        window.merge(StopTripWindow {
            trips: vec![fresh, trip("b", Direction::Forward, (9, 0), (9, 20))],
        });

        assert_eq!(window.trips.len(), 2);
        assert_eq!(window.trips[0].delay, 7);
    }
}
