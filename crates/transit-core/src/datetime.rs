//! Date and time decoding for service payloads.
//!
//! The service mixes three encodings:
//!
//! - `/Date(1672444800)/` wrappers around Unix seconds (news validity)
//! - ISO-8601 timestamps that may also be empty or the literal `"null"`
//! - bare `HH:mm[:ss]` local clock times in Europe/Rome (stop times), which
//!   only make sense relative to a reference day and to the previous time in
//!   the same stop sequence

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Europe::Rome;
use chrono_tz::Tz;

use crate::error::{Error, Result};

/// Backwards jumps of at least this many whole hours mean the next day.
const ROLLOVER_HOURS: i64 = 2;

/// Current time in the service's zone.
pub fn rome_now() -> DateTime<Tz> {
    Utc::now().with_timezone(&Rome)
}

/// Convert any instant to the service's zone.
pub fn to_rome<Z: TimeZone>(dt: &DateTime<Z>) -> DateTime<Tz> {
    dt.with_timezone(&Rome)
}

/// Parse a `/Date(<unix seconds>)/` string.
///
/// ```
/// use transit_core::datetime::parse_epoch_date;
///
/// let date = parse_epoch_date("/Date(1672444800)/").unwrap();
/// assert_eq!(date.timestamp(), 1_672_444_800);
/// assert!(parse_epoch_date("/Date()/").is_err());
/// ```
pub fn parse_epoch_date(s: &str) -> Result<DateTime<FixedOffset>> {
    if s.len() <= 8 {
        return Err(Error::InvalidData(format!("Invalid epoch date: {s:?}")));
    }

    let seconds = s
        .get(6..s.len() - 2)
        .and_then(|inner| inner.parse::<i64>().ok())
        .ok_or_else(|| Error::InvalidData(format!("Invalid epoch date: {s:?}")))?;

    DateTime::from_timestamp(seconds, 0)
        .map(|dt| dt.fixed_offset())
        .ok_or_else(|| Error::InvalidData(format!("Epoch date out of range: {s:?}")))
}

/// Parse an optional ISO-8601 timestamp and express it in Europe/Rome.
///
/// Missing, empty and `"null"` values all mean "no value".
pub fn parse_iso_date(s: Option<&str>) -> Result<Option<DateTime<FixedOffset>>> {
    match s {
        None | Some("") | Some("null") => Ok(None),
        Some(s) => DateTime::parse_from_rfc3339(s)
            .map(|dt| Some(dt.with_timezone(&Rome).fixed_offset()))
            .map_err(|e| Error::InvalidData(format!("Invalid ISO date {s:?}: {e}"))),
    }
}

/// Turns the local clock times of one stop sequence into full date-times.
///
/// Times are resolved against the reference day. When a time is two or more
/// whole hours earlier than the previous one, the sequence has crossed
/// midnight and every following time belongs to the next day. Smaller
/// decreases are schedule noise and keep the current day.
#[derive(Debug, Clone)]
pub struct RomeTimeParser {
    day: NaiveDate,
    prev: NaiveTime,
}

impl RomeTimeParser {
    /// Start a new sequence on the day of `reference`.
    pub fn new(reference: &DateTime<Tz>) -> Self {
        Self {
            day: reference.date_naive(),
            prev: NaiveTime::MIN,
        }
    }

    /// Parse the next time of the sequence.
    pub fn parse(&mut self, s: Option<&str>) -> Result<Option<DateTime<FixedOffset>>> {
        let s = match s {
            None | Some("") | Some("null") => return Ok(None),
            Some(s) => s,
        };

        let normalized = match s.strip_prefix("24:") {
            Some(rest) => format!("00:{rest}"),
            None => s.to_string(),
        };

        let time = NaiveTime::parse_from_str(&normalized, "%H:%M:%S")
            .or_else(|_| NaiveTime::parse_from_str(&normalized, "%H:%M"))
            .map_err(|e| Error::InvalidData(format!("Invalid local time {s:?}: {e}")))?;

        if (time - self.prev).num_hours() <= -ROLLOVER_HOURS {
            self.day += Duration::days(1);
        }
        self.prev = time;

        let local = self.day.and_time(time);
        Rome.from_local_datetime(&local)
            .earliest()
            .map(|dt| Some(dt.fixed_offset()))
            .ok_or_else(|| Error::InvalidData(format!("Nonexistent local time {local} in Rome")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn reference() -> DateTime<Tz> {
        Rome.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn local(day: u32, h: u32, m: u32) -> DateTime<FixedOffset> {
        Rome.with_ymd_and_hms(2024, 3, day, h, m, 0)
            .unwrap()
            .fixed_offset()
    }

    #[test]
    fn test_epoch_date_rejects_short_strings() {
        assert!(parse_epoch_date("/Date(1)").is_err());
        assert!(parse_epoch_date("12345678").is_err());
        assert!(parse_epoch_date("/Date(abc)/").is_err());
    }

    #[test]
    fn test_iso_date_null_values() {
        assert_eq!(parse_iso_date(None).unwrap(), None);
        assert_eq!(parse_iso_date(Some("")).unwrap(), None);
        assert_eq!(parse_iso_date(Some("null")).unwrap(), None);
    }

    #[test]
    fn test_iso_date_converted_to_rome() {
        let parsed = parse_iso_date(Some("2024-03-01T10:00:00Z"))
            .unwrap()
            .unwrap();
        assert_eq!(parsed, local(1, 11, 0));
        assert_eq!(parsed.offset().local_minus_utc(), 3600);
    }

    #[test]
    fn test_hour_24_after_late_evening_is_next_day() {
        let mut parser = RomeTimeParser::new(&reference());
        assert_eq!(parser.parse(Some("23:50")).unwrap(), Some(local(1, 23, 50)));
        assert_eq!(parser.parse(Some("24:15")).unwrap(), Some(local(2, 0, 15)));
    }

    #[test]
    fn test_one_minute_decrease_is_not_a_rollover() {
        let mut parser = RomeTimeParser::new(&reference());
        assert_eq!(parser.parse(Some("18:02")).unwrap(), Some(local(1, 18, 2)));
        assert_eq!(parser.parse(Some("18:01")).unwrap(), Some(local(1, 18, 1)));
    }

    #[test]
    fn test_midnight_crossing_is_a_rollover() {
        let mut parser = RomeTimeParser::new(&reference());
        assert_eq!(parser.parse(Some("23:58")).unwrap(), Some(local(1, 23, 58)));
        assert_eq!(parser.parse(Some("00:01")).unwrap(), Some(local(2, 0, 1)));
        // stays on the new day
        assert_eq!(parser.parse(Some("00:09")).unwrap(), Some(local(2, 0, 9)));
    }

    #[test]
    fn test_missing_times_do_not_move_the_sequence() {
        let mut parser = RomeTimeParser::new(&reference());
        assert_eq!(parser.parse(Some("23:58")).unwrap(), Some(local(1, 23, 58)));
        assert_eq!(parser.parse(Some("null")).unwrap(), None);
        assert_eq!(parser.parse(None).unwrap(), None);
        assert_eq!(parser.parse(Some("23:59:30")).unwrap().map(|t| t.timestamp()),
            Some(local(1, 23, 59).timestamp() + 30));
    }

    #[test]
    fn test_invalid_time() {
        let mut parser = RomeTimeParser::new(&reference());
        assert!(parser.parse(Some("25:00")).is_err());
        assert!(parser.parse(Some("noon")).is_err());
    }

    proptest! {
        #[test]
        fn small_decreases_never_roll_over(start in 120u32..1440, back in 0u32..120) {
            let mut parser = RomeTimeParser::new(&reference());
            let first = format!("{:02}:{:02}", start / 60, start % 60);
            let later = start - back;
            let second = format!("{:02}:{:02}", later / 60, later % 60);

            let a = parser.parse(Some(&first)).unwrap().unwrap();
            let b = parser.parse(Some(&second)).unwrap().unwrap();
            prop_assert_eq!(a.date_naive(), b.date_naive());
        }

        #[test]
        fn decreases_of_two_hours_roll_over(start in 120u32..1440, back in 120u32..1440) {
            prop_assume!(back <= start);
            let mut parser = RomeTimeParser::new(&reference());
            let first = format!("{:02}:{:02}", start / 60, start % 60);
            let later = start - back;
            let second = format!("{:02}:{:02}", later / 60, later % 60);

            let a = parser.parse(Some(&first)).unwrap().unwrap();
            let b = parser.parse(Some(&second)).unwrap().unwrap();
            prop_assert_eq!(b.date_naive(), a.date_naive() + Duration::days(1));
        }
    }
}
