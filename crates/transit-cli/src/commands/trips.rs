//! Live trip commands.

use anyhow::{Result, anyhow};
use chrono::DateTime;
use chrono_tz::Tz;
use tracing::debug;

use transit_core::{Error, Hydrator, LineTripsCache, StopTripsCache, TransitClient};
use transit_types::{Direction, LineKey, LineRecord, StopKey, TripRecord};

use super::Session;
use crate::format::{StopTripView, TripView, format_stop_trips_text, format_trip_text};

/// Arguments of the line-trips command.
#[derive(Debug, Clone, Copy)]
pub struct LineTripsArgs {
    pub line: LineKey,
    pub reference: DateTime<Tz>,
    /// Position in the day; the trip closest to `reference` when absent.
    pub index: Option<usize>,
    pub direction: Direction,
    /// Refresh the trip's live status before showing it.
    pub refresh: bool,
}

/// Execute the line-trips command.
pub async fn cmd_line_trips<C: TransitClient + Clone>(
    session: &Session<C>,
    cache: &mut LineTripsCache<C>,
    args: LineTripsArgs,
) -> Result<String> {
    let LineTripsArgs {
        line,
        reference,
        index,
        direction,
        refresh,
    } = args;

    let (index, trip) = match index {
        Some(index) if direction == Direction::ForwardAndBackward => {
            let (trip, fetched) = cache.trip_at_index(line, reference, index).await?;
            debug!("Trip {} of line {} (fetched: {})", index, line, fetched);
            (index, trip)
        }
        Some(index) => {
            let found = cache
                .trip_with_direction(line, reference, direction, index, index)
                .await?
                .ok_or_else(|| anyhow!("No trip in that direction near position {}", index))?;
            (found.index, found.trip)
        }
        None => cache
            .trip_near(line, reference, direction)
            .await?
            .nearest
            .ok_or_else(|| anyhow!("No trips for line {} on {}", line, reference.date_naive()))?,
    };

    let trip = if refresh {
        cache.reload_trip(line, reference, index, &trip.trip_id).await?
    } else {
        trip
    };
    let total = cache.day(line, &reference).map(|day| day.total());

    let hydrated = Hydrator::new(&session.sync).hydrate(&trip).await?;
    let view = TripView::new(&hydrated, Some(index), total);
    session.render(&view, || format_trip_text(&view, &session.opts))
}

/// Execute the stop-trips command.
pub async fn cmd_stop_trips<C: TransitClient + Clone>(
    session: &Session<C>,
    cache: &mut StopTripsCache<C>,
    stop: StopKey,
    reference: DateTime<Tz>,
    refresh: Option<usize>,
) -> Result<String> {
    let stop_record = session
        .sync
        .stop(stop, session.force_reload)
        .await?
        .ok_or_else(|| anyhow!("Stop {} not found", stop))?;

    let mut trips = cache.trips(stop, reference).await?;
    if let Some(index) = refresh {
        let trip_id = trips.get(index).map(|t| t.trip_id.clone()).unwrap_or_default();
        cache.reload_one(stop, reference, index, &trip_id).await?;
        trips = cache.trips(stop, reference).await?;
    }

    let hydrator = Hydrator::new(&session.sync);
    let mut lines: Vec<Option<LineRecord>> = Vec::with_capacity(trips.len());
    for trip in &trips {
        lines.push(line_of(&hydrator, trip).await?);
    }

    let views: Vec<StopTripView<'_>> = trips
        .iter()
        .zip(&lines)
        .enumerate()
        .map(|(position, (trip, line))| StopTripView {
            position,
            trip,
            line: line.as_ref(),
            passage: trip
                .stop_times
                .iter()
                .find(|st| st.stop_id == stop.id)
                .and_then(|st| st.arrival.or(st.departure)),
        })
        .collect();

    session.render(&views, || {
        format_stop_trips_text(&stop_record, &views, &session.opts)
    })
}

/// The line of `trip`; a line missing from the dataset is shown by id only.
async fn line_of<C: TransitClient>(
    hydrator: &Hydrator<'_, C>,
    trip: &TripRecord,
) -> Result<Option<LineRecord>> {
    match hydrator.line(trip.line_key()).await {
        Ok(line) => Ok(Some(line)),
        Err(Error::NotFound { .. }) => Ok(None),
        Err(e) => Err(e.into()),
    }
}
