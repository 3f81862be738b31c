//! Shared builders for the transit-core integration tests.

#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone};
use chrono_tz::Europe::Rome;
use chrono_tz::Tz;

use transit_types::{
    Area, DELAY_UNKNOWN, Direction, LineKey, LineRecord, StopKey, StopRecord, StopTimeRecord,
    TransportType, TripRecord, VEHICLE_UNKNOWN,
};

pub const URBAN: TransportType = TransportType::Urban;

pub fn rome(day: u32, h: u32, m: u32) -> DateTime<Tz> {
    Rome.with_ymd_and_hms(2024, 3, day, h, m, 0).unwrap()
}

pub fn line(id: i64) -> LineRecord {
    LineRecord {
        id,
        transport_type: URBAN,
        area: Some(Area::UrbanTrento),
        color: Some(0x0000ff),
        long_name: format!("Line {id}"),
        short_name: id.to_string(),
        news_items: vec![],
    }
}

pub fn stop(id: i64, lines: &[i64]) -> StopRecord {
    StopRecord {
        id,
        transport_type: URBAN,
        latitude: 46.0 + id as f64 / 1000.0,
        longitude: 11.0 + id as f64 / 1000.0,
        name: format!("Stop {id}"),
        street: "Via Roma".to_string(),
        town: "Trento".to_string(),
        wheelchair_accessible: id % 2 == 0,
        cardinal_point: None,
        lines: lines.iter().map(|l| LineKey::new(*l, URBAN)).collect(),
    }
}

/// A trip of line 5 leaving stop 10 at `start` and reaching stop 11 twenty
/// minutes later.
pub fn trip(id: &str, direction: Direction, start: DateTime<Tz>) -> TripRecord {
    let end = start + Duration::minutes(20);
    TripRecord {
        delay: DELAY_UNKNOWN,
        direction,
        last_event_at: None,
        line_id: 5,
        transport_type: URBAN,
        head_sign: "Povo".to_string(),
        trip_id: id.to_string(),
        completed_stops: 0,
        stop_times: vec![
            StopTimeRecord {
                arrival: Some(start.fixed_offset()),
                departure: Some(start.fixed_offset()),
                stop_id: 10,
            },
            StopTimeRecord {
                arrival: Some(end.fixed_offset()),
                departure: Some(end.fixed_offset()),
                stop_id: 11,
            },
        ],
        vehicle_id: VEHICLE_UNKNOWN,
    }
}

/// Twenty trips on 1 March, every ten minutes from 06:00. Even indices run
/// forward, odd ones backward, unless `direction` forces one.
pub fn day_of_trips(direction: Option<Direction>) -> Vec<TripRecord> {
    (0..20)
        .map(|i| {
            let dir = direction.unwrap_or(if i % 2 == 0 {
                Direction::Forward
            } else {
                Direction::Backward
            });
            trip(
                &format!("t{i}"),
                dir,
                rome(1, 6, 0) + Duration::minutes(10 * i as i64),
            )
        })
        .collect()
}

pub fn line5() -> LineKey {
    LineKey::new(5, URBAN)
}

pub fn stop10() -> StopKey {
    StopKey::new(10, URBAN)
}
