//! Wire format of the remote service and its conversion into records.
//!
//! Field names follow the service verbatim, including its misspellings
//! (`lastEventRecivedAt`) and Italian names (`matricolaBus`,
//! `indiceCorsaInLista`, `totaleCorseInLista`).

use chrono::DateTime;
use chrono_tz::Tz;
use serde::Deserialize;

use transit_types::{
    Area, CardinalPoint, DELAY_UNKNOWN, Direction, LineKey, LineRecord, NewsItem, StopRecord,
    StopTimeRecord, TransportType, TripBatch, TripRecord, VEHICLE_UNKNOWN,
};

use crate::datetime::{RomeTimeParser, parse_epoch_date, parse_iso_date};
use crate::error::{Error, Result};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireLineRef {
    route_id: i64,
    #[serde(rename = "type")]
    transport_type: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireStop {
    stop_id: i64,
    stop_lat: f64,
    stop_lon: f64,
    stop_name: String,
    #[serde(default)]
    street: Option<String>,
    #[serde(default)]
    town: Option<String>,
    #[serde(rename = "type")]
    transport_type: String,
    #[serde(default)]
    wheelchair_boarding: Option<i64>,
    #[serde(default)]
    cardinal_point: Option<String>,
    #[serde(default)]
    routes: Vec<WireLineRef>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireNews {
    service_type: String,
    start_date: String,
    end_date: String,
    header: String,
    details: String,
    url: String,
    #[serde(default)]
    route_ids: Vec<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireLine {
    route_id: i64,
    #[serde(default)]
    area_id: i64,
    #[serde(default)]
    route_color: Option<String>,
    route_long_name: String,
    route_short_name: String,
    #[serde(rename = "type")]
    transport_type: String,
    #[serde(default)]
    news: Option<Vec<WireNews>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireStopTime {
    #[serde(default)]
    arrival_time: Option<String>,
    #[serde(default)]
    departure_time: Option<String>,
    stop_id: i64,
    #[serde(default)]
    stop_sequence: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireTrip {
    #[serde(default)]
    delay: Option<f64>,
    direction_id: i64,
    #[serde(default, rename = "lastEventRecivedAt")]
    last_event_received_at: Option<String>,
    route_id: i64,
    trip_headsign: String,
    trip_id: String,
    #[serde(rename = "type")]
    transport_type: String,
    #[serde(default)]
    stop_last: u32,
    #[serde(default)]
    stop_times: Vec<WireStopTime>,
    #[serde(default)]
    matricola_bus: Option<i64>,
    #[serde(default)]
    indice_corsa_in_lista: Option<usize>,
    #[serde(default)]
    totale_corse_in_lista: Option<usize>,
}

fn parse_color(raw: Option<&str>) -> Result<Option<u32>> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(hex) => u32::from_str_radix(hex.trim_start_matches('#'), 16)
            .map(Some)
            .map_err(|e| Error::InvalidData(format!("Invalid color {hex:?}: {e}"))),
    }
}

impl WireStop {
    pub(crate) fn into_record(self) -> Result<StopRecord> {
        let transport_type: TransportType = self.transport_type.parse()?;
        let cardinal_point = match self.cardinal_point.as_deref() {
            None | Some("") => None,
            Some(raw) => Some(raw.parse::<CardinalPoint>()?),
        };
        let lines = self
            .routes
            .into_iter()
            .map(|r| Ok(LineKey::new(r.route_id, r.transport_type.parse()?)))
            .collect::<Result<Vec<_>>>()?;

        Ok(StopRecord {
            id: self.stop_id,
            transport_type,
            latitude: self.stop_lat,
            longitude: self.stop_lon,
            name: self.stop_name,
            street: self.street.unwrap_or_default(),
            town: self.town.unwrap_or_default(),
            wheelchair_accessible: self.wheelchair_boarding == Some(1),
            cardinal_point,
            lines,
        })
    }
}

impl WireNews {
    fn into_record(self) -> Result<NewsItem> {
        Ok(NewsItem {
            service_type: self.service_type,
            start: parse_epoch_date(&self.start_date)?,
            end: parse_epoch_date(&self.end_date)?,
            header: self.header,
            details: self.details,
            url: self.url,
            affected_line_ids: self.route_ids,
        })
    }
}

impl WireLine {
    pub(crate) fn into_record(self) -> Result<LineRecord> {
        let news_items = self
            .news
            .unwrap_or_default()
            .into_iter()
            .map(WireNews::into_record)
            .collect::<Result<Vec<_>>>()?;

        Ok(LineRecord {
            id: self.route_id,
            transport_type: self.transport_type.parse()?,
            area: Area::from_optional_code(self.area_id)?,
            color: parse_color(self.route_color.as_deref())?,
            long_name: self.route_long_name,
            short_name: self.route_short_name,
            news_items,
        })
    }
}

impl WireTrip {
    /// Convert to a record; stop times are resolved against `reference`.
    pub(crate) fn into_record(self, reference: &DateTime<Tz>) -> Result<TripRecord> {
        let mut stop_times = self.stop_times;
        stop_times.sort_by_key(|st| st.stop_sequence);

        let mut parser = RomeTimeParser::new(reference);
        let stop_times = stop_times
            .into_iter()
            .map(|st| {
                Ok(StopTimeRecord {
                    arrival: parser.parse(st.arrival_time.as_deref())?,
                    departure: parser.parse(st.departure_time.as_deref())?,
                    stop_id: st.stop_id,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(TripRecord {
            delay: self.delay.map_or(DELAY_UNKNOWN, |d| d.round() as i32),
            direction: Direction::try_from(self.direction_id)?,
            last_event_at: parse_iso_date(self.last_event_received_at.as_deref())?,
            line_id: self.route_id,
            transport_type: self.transport_type.parse()?,
            head_sign: self.trip_headsign,
            trip_id: self.trip_id,
            completed_stops: self.stop_last,
            stop_times,
            vehicle_id: self.matricola_bus.unwrap_or(VEHICLE_UNKNOWN),
        })
    }
}

/// Decode a `stops` response.
pub fn parse_stops(body: &str) -> Result<Vec<StopRecord>> {
    serde_json::from_str::<Vec<WireStop>>(body)?
        .into_iter()
        .map(WireStop::into_record)
        .collect()
}

/// Decode a `routes` response.
pub fn parse_lines(body: &str) -> Result<Vec<LineRecord>> {
    serde_json::from_str::<Vec<WireLine>>(body)?
        .into_iter()
        .map(WireLine::into_record)
        .collect()
}

/// Decode a list of trips without index information.
pub fn parse_trips(body: &str, reference: &DateTime<Tz>) -> Result<Vec<TripRecord>> {
    serde_json::from_str::<Vec<WireTrip>>(body)?
        .into_iter()
        .map(|t| t.into_record(reference))
        .collect()
}

/// Decode a list of trips tagged with their index in the day.
///
/// The day total is taken from the entries themselves; an empty response
/// yields a total of zero.
pub fn parse_trip_batch(body: &str, reference: &DateTime<Tz>) -> Result<TripBatch> {
    let wire = serde_json::from_str::<Vec<WireTrip>>(body)?;
    let total = wire
        .iter()
        .filter_map(|t| t.totale_corse_in_lista)
        .max()
        .unwrap_or(0);

    let trips = wire
        .into_iter()
        .map(|t| {
            let index = t.indice_corsa_in_lista.ok_or_else(|| {
                Error::InvalidData(format!("Trip {} has no index in the day", t.trip_id))
            })?;
            Ok((index, t.into_record(reference)?))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(TripBatch { total, trips })
}

/// Decode a single trip.
pub fn parse_trip(body: &str, reference: &DateTime<Tz>) -> Result<TripRecord> {
    serde_json::from_str::<WireTrip>(body)?.into_record(reference)
}
