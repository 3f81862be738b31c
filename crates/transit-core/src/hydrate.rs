//! Resolution of trips into display-ready values.
//!
//! Trips reference their line and stops by bare id. They are resolved when
//! read, through the [`DatasetSynchronizer`], so a reference dataset reload
//! between fetching and showing a trip never requires fetching it again.

use chrono::{DateTime, FixedOffset};

use transit_types::{LineKey, LineRecord, StopKey, StopRecord, TripRecord};

use crate::client::TransitClient;
use crate::error::{Error, Result};
use crate::sync::DatasetSynchronizer;

/// One stop of a hydrated trip.
#[derive(Debug, Clone, PartialEq)]
pub struct HydratedStopTime {
    pub arrival: Option<DateTime<FixedOffset>>,
    pub departure: Option<DateTime<FixedOffset>>,
    pub stop: StopRecord,
}

/// A trip with its line and stops resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct HydratedTrip {
    pub trip: TripRecord,
    pub line: LineRecord,
    pub stop_times: Vec<HydratedStopTime>,
}

impl HydratedTrip {
    /// Index of the next stop to be served, `None` once the trip is over.
    pub fn next_stop_index(&self) -> Option<usize> {
        let done = self.trip.completed_stops as usize;
        (done < self.stop_times.len()).then_some(done)
    }
}

/// Resolves trips against the reference dataset.
pub struct Hydrator<'a, C> {
    sync: &'a DatasetSynchronizer<C>,
}

impl<'a, C: TransitClient> Hydrator<'a, C> {
    pub fn new(sync: &'a DatasetSynchronizer<C>) -> Self {
        Self { sync }
    }

    /// Resolve the line and every stop of `trip`.
    ///
    /// Stops share the trip's transport type. A line or stop missing from the
    /// reference dataset, even after the freshness policy had a chance to
    /// reload it, is [`Error::NotFound`].
    pub async fn hydrate(&self, trip: &TripRecord) -> Result<HydratedTrip> {
        let line_key = trip.line_key();
        let line = self
            .sync
            .line(line_key, false)
            .await?
            .ok_or_else(|| Error::line_not_found(line_key))?;

        let mut stop_times = Vec::with_capacity(trip.stop_times.len());
        for st in &trip.stop_times {
            let stop_key = StopKey::new(st.stop_id, trip.transport_type);
            let stop = self
                .sync
                .stop(stop_key, false)
                .await?
                .ok_or_else(|| Error::stop_not_found(stop_key))?;

            stop_times.push(HydratedStopTime {
                arrival: st.arrival,
                departure: st.departure,
                stop,
            });
        }

        Ok(HydratedTrip {
            trip: trip.clone(),
            line,
            stop_times,
        })
    }

    /// Resolve only the line of `key`, e.g. for a trip list header.
    pub async fn line(&self, key: LineKey) -> Result<LineRecord> {
        self.sync
            .line(key, false)
            .await?
            .ok_or_else(|| Error::line_not_found(key))
    }
}
