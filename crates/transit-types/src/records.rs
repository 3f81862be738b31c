//! Reference dataset records (lines, stops, news) and live trip records.

use chrono::{DateTime, Duration, FixedOffset};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::types::{Area, CardinalPoint, Direction, LineKey, StopKey, TransportType};

/// Delay value used when the service has no live information for a trip.
pub const DELAY_UNKNOWN: i32 = -1;

/// Vehicle id used when the service does not report which vehicle runs a trip.
pub const VEHICLE_UNKNOWN: i64 = -1;

/// A service notice attached to a line.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NewsItem {
    pub service_type: String,
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
    pub header: String,
    pub details: String,
    pub url: String,
    /// Ids of every line the notice mentions, as reported by the service.
    #[cfg_attr(feature = "serde", serde(default))]
    pub affected_line_ids: Vec<i64>,
}

/// A line of the reference dataset.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LineRecord {
    pub id: i64,
    pub transport_type: TransportType,
    pub area: Option<Area>,
    /// Display color as `0xRRGGBB`.
    pub color: Option<u32>,
    pub long_name: String,
    pub short_name: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub news_items: Vec<NewsItem>,
}

impl LineRecord {
    #[must_use]
    pub fn key(&self) -> LineKey {
        LineKey::new(self.id, self.transport_type)
    }
}

/// A stop of the reference dataset.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StopRecord {
    pub id: i64,
    pub transport_type: TransportType,
    pub latitude: f64,
    pub longitude: f64,
    pub name: String,
    pub street: String,
    pub town: String,
    pub wheelchair_accessible: bool,
    pub cardinal_point: Option<CardinalPoint>,
    /// Lines serving this stop.
    #[cfg_attr(feature = "serde", serde(default))]
    pub lines: Vec<LineKey>,
}

impl StopRecord {
    #[must_use]
    pub fn key(&self) -> StopKey {
        StopKey::new(self.id, self.transport_type)
    }

    /// `street - town`, skipping empty parts.
    #[must_use]
    pub fn address(&self) -> String {
        [self.street.as_str(), self.town.as_str()]
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" - ")
    }
}

/// Scheduled (and possibly live-adjusted) passage at one stop.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StopTimeRecord {
    pub arrival: Option<DateTime<FixedOffset>>,
    pub departure: Option<DateTime<FixedOffset>>,
    pub stop_id: i64,
}

/// One run of a vehicle along a line, as returned by the remote service.
///
/// Stops and the line are referenced by bare id; resolving them to reference
/// records happens when the trip is displayed.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TripRecord {
    /// Delay in minutes, [`DELAY_UNKNOWN`] when not known.
    pub delay: i32,
    pub direction: Direction,
    /// Last time the vehicle reported its position.
    pub last_event_at: Option<DateTime<FixedOffset>>,
    pub line_id: i64,
    pub transport_type: TransportType,
    pub head_sign: String,
    pub trip_id: String,
    /// Number of stops already served.
    pub completed_stops: u32,
    pub stop_times: Vec<StopTimeRecord>,
    /// Vehicle id, [`VEHICLE_UNKNOWN`] when not known.
    pub vehicle_id: i64,
}

impl TripRecord {
    #[must_use]
    pub fn line_key(&self) -> LineKey {
        LineKey::new(self.line_id, self.transport_type)
    }

    /// Whether the trip carries live telemetry.
    #[must_use]
    pub fn has_live_data(&self) -> bool {
        self.last_event_at.is_some()
    }

    /// The time the remote service orders trips by: the first non-null
    /// arrival time along the stop sequence.
    #[must_use]
    pub fn server_sort_time(&self) -> Option<DateTime<FixedOffset>> {
        self.stop_times.iter().find_map(|st| st.arrival)
    }

    /// Midpoint between the first known time and the last known time of the
    /// trip.
    ///
    /// The start is the first arrival (falling back to a departure) and the
    /// end is the last departure (falling back to an arrival). `None` when no
    /// stop time carries a time at all.
    #[must_use]
    pub fn representative_time(&self) -> Option<DateTime<FixedOffset>> {
        let start = self
            .stop_times
            .iter()
            .find_map(|st| st.arrival.or(st.departure))?;
        let end = self
            .stop_times
            .iter()
            .rev()
            .find_map(|st| st.departure.or(st.arrival))?;
        let half = (end - start).num_seconds() / 2;
        Some(start + Duration::seconds(half))
    }

    /// Copy the fields that change between refreshes of the same trip.
    ///
    /// Identity (trip id, line, stop sequence) is left untouched.
    pub fn apply_live_status(&mut self, fresh: &TripRecord) {
        self.delay = fresh.delay;
        self.direction = fresh.direction;
        self.last_event_at = fresh.last_event_at;
        self.head_sign = fresh.head_sign.clone();
        self.completed_stops = fresh.completed_stops;
        self.vehicle_id = fresh.vehicle_id;
    }
}

/// A batch of line trips, each tagged with its position in the day.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TripBatch {
    /// Number of trips the line runs on that day, as last reported.
    pub total: usize,
    pub trips: Vec<(usize, TripRecord)>,
}
