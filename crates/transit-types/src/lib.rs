//! Platform-agnostic domain types for the regional transit client.
//!
//! This crate provides the records shared by the persistent store
//! (`transit-store`) and the synchronization layer (`transit-core`).
//!
//! # Features
//!
//! - Reference dataset records: [`LineRecord`], [`StopRecord`], [`NewsItem`]
//! - Live trip records: [`TripRecord`], [`StopTimeRecord`], [`TripBatch`]
//! - Identity keys: [`LineKey`] and [`StopKey`] (id plus transport type)
//! - Error types for converting raw wire values
//!
//! # Example
//!
//! ```
//! use transit_types::{LineKey, TransportType};
//!
//! let key = LineKey::new(5, TransportType::Urban);
//! assert_eq!(key.to_string(), "U/5");
//! ```

pub mod error;
pub mod records;
pub mod types;

pub use error::{ParseError, ParseResult};
pub use records::{
    DELAY_UNKNOWN, LineRecord, NewsItem, StopRecord, StopTimeRecord, TripBatch, TripRecord,
    VEHICLE_UNKNOWN,
};
pub use types::{Area, CardinalPoint, Direction, LineKey, StopKey, TransportType};

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn area_code_round_trips(idx in 0usize..Area::ALL.len()) {
            let area = Area::ALL[idx];
            prop_assert_eq!(Area::try_from(i64::from(area.code())), Ok(area));
        }

        #[test]
        fn unknown_area_codes_are_rejected(code in 25i64..10_000) {
            prop_assert!(Area::try_from(code).is_err());
        }
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_line_record_serde_defaults_news() {
        let json = r#"{
            "id": 5,
            "transport_type": "Urban",
            "area": "UrbanTrento",
            "color": 16711680,
            "long_name": "Piazza Dante - Povo",
            "short_name": "5"
        }"#;
        let line: LineRecord = serde_json::from_str(json).unwrap();
        assert!(line.news_items.is_empty());
        assert_eq!(line.key(), LineKey::new(5, TransportType::Urban));
    }
}
