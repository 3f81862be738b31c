//! Output formatting utilities for text and JSON output.

use std::fmt::Write as _;

use anyhow::Result;
use chrono::{DateTime, FixedOffset};
use owo_colors::OwoColorize;
use serde::Serialize;

use transit_core::datetime::to_rome;
use transit_core::{HydratedTrip, Preferences};
use transit_store::DatasetSummary;
use transit_types::{DELAY_UNKNOWN, Direction, LineRecord, StopRecord, TripRecord, VEHICLE_UNKNOWN};

/// Formatting options for output.
#[derive(Debug, Clone, Copy, Default)]
pub struct FormatOptions {
    /// Disable colored output.
    pub no_color: bool,
    /// Use compact JSON output (no pretty-printing).
    pub compact: bool,
}

impl FormatOptions {
    pub fn new(no_color: bool) -> Self {
        Self {
            no_color,
            compact: false,
        }
    }

    /// Create with compact JSON option.
    pub fn with_compact(mut self, compact: bool) -> Self {
        self.compact = compact;
        self
    }

    /// Serialize value to JSON string, respecting compact option.
    pub fn as_json<T: Serialize>(&self, value: &T) -> Result<String> {
        let json = if self.compact {
            serde_json::to_string(value)?
        } else {
            serde_json::to_string_pretty(value)?
        };
        Ok(json + "\n")
    }
}

/// Delay as shown to the user.
#[must_use]
pub fn format_delay(delay: i32, no_color: bool) -> String {
    let label = match delay {
        DELAY_UNKNOWN => "scheduled".to_string(),
        0 => "on time".to_string(),
        d if d > 0 => format!("+{d} min"),
        d => format!("{} min early", -d),
    };

    if no_color {
        return label;
    }
    match delay {
        DELAY_UNKNOWN => label.dimmed().to_string(),
        d if d <= 0 => label.green().to_string(),
        d if d < 5 => label.yellow().to_string(),
        _ => label.red().to_string(),
    }
}

fn format_direction(direction: Direction) -> &'static str {
    match direction {
        Direction::Forward => "outbound",
        Direction::Backward => "return",
        Direction::ForwardAndBackward => "both",
    }
}

/// `HH:MM` in local service time, `--:--` when unknown.
fn format_clock(time: Option<DateTime<FixedOffset>>) -> String {
    time.map_or_else(
        || "--:--".to_string(),
        |t| to_rome(&t).format("%H:%M").to_string(),
    )
}

fn line_badge(line: &LineRecord, no_color: bool) -> String {
    match line.color {
        Some(rgb) if !no_color => {
            let (r, g, b) = ((rgb >> 16) as u8, (rgb >> 8) as u8, rgb as u8);
            format!("{}", format!(" {} ", line.short_name).on_truecolor(r, g, b).white().bold())
        }
        _ => format!("[{}]", line.short_name),
    }
}

// ============================================================================
// Lines and stops
// ============================================================================

#[must_use]
pub fn format_line_text(line: &LineRecord, opts: &FormatOptions) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} {}", line_badge(line, opts.no_color), line.long_name);
    let _ = writeln!(out, "  Network: {}", line.transport_type);
    if let Some(area) = line.area {
        let _ = writeln!(out, "  Area:    {} ({})", area, area.code());
    }

    if line.news_items.is_empty() {
        return out;
    }
    let _ = writeln!(out, "\nNews:");
    for news in &line.news_items {
        let header = if opts.no_color {
            news.header.clone()
        } else {
            news.header.bold().to_string()
        };
        let _ = writeln!(
            out,
            "  {} ({} - {})",
            header,
            news.start.format("%d/%m/%Y"),
            news.end.format("%d/%m/%Y")
        );
        if !news.details.is_empty() {
            let _ = writeln!(out, "    {}", news.details);
        }
        if !news.url.is_empty() {
            let _ = writeln!(out, "    {}", news.url);
        }
    }
    out
}

#[must_use]
pub fn format_lines_text(lines: &[LineRecord], opts: &FormatOptions) -> String {
    if lines.is_empty() {
        return "No lines found.\n".to_string();
    }

    let width = lines
        .iter()
        .map(|l| l.short_name.chars().count())
        .max()
        .unwrap_or(0);

    let mut out = String::new();
    for line in lines {
        let id = format!("{:>6}", line.key().to_string());
        let id = if opts.no_color { id } else { id.dimmed().to_string() };
        let _ = writeln!(
            out,
            "{} {:<width$}  {}",
            id,
            line.short_name,
            line.long_name,
            width = width
        );
    }
    out
}

#[must_use]
pub fn format_stop_text(stop: &StopRecord, lines: &[LineRecord], opts: &FormatOptions) -> String {
    let mut out = String::new();
    let name = if opts.no_color {
        stop.name.clone()
    } else {
        stop.name.bold().to_string()
    };
    let _ = writeln!(out, "{} ({})", name, stop.key());
    let _ = writeln!(out, "  Address:  {}", stop.address());
    let _ = writeln!(out, "  Location: {:.6}, {:.6}", stop.latitude, stop.longitude);
    if let Some(point) = stop.cardinal_point {
        let _ = writeln!(out, "  Facing:   {}", point);
    }
    if stop.wheelchair_accessible {
        let _ = writeln!(out, "  Wheelchair accessible");
    }

    if !lines.is_empty() {
        let badges: Vec<String> = lines.iter().map(|l| line_badge(l, opts.no_color)).collect();
        let _ = writeln!(out, "  Lines:    {}", badges.join(" "));
    }
    out
}

#[must_use]
pub fn format_stops_text(stops: &[StopRecord], opts: &FormatOptions) -> String {
    if stops.is_empty() {
        return "No stops found.\n".to_string();
    }

    let mut out = String::new();
    for stop in stops {
        let id = format!("{:>7}", stop.key().to_string());
        let id = if opts.no_color { id } else { id.dimmed().to_string() };
        let _ = writeln!(
            out,
            "{} {}  {}  ({} lines)",
            id,
            stop.name,
            stop.address(),
            stop.lines.len()
        );
    }
    out
}

// ============================================================================
// Trips
// ============================================================================

/// A hydrated trip with its position in the day.
#[derive(Debug, Serialize)]
pub struct TripView<'a> {
    pub index: Option<usize>,
    pub total: Option<usize>,
    pub trip: &'a TripRecord,
    pub line: &'a LineRecord,
    pub stops: Vec<StopTimeView<'a>>,
}

#[derive(Debug, Serialize)]
pub struct StopTimeView<'a> {
    pub stop_id: i64,
    pub name: &'a str,
    pub arrival: Option<DateTime<FixedOffset>>,
    pub departure: Option<DateTime<FixedOffset>>,
    pub served: bool,
}

impl<'a> TripView<'a> {
    pub fn new(hydrated: &'a HydratedTrip, index: Option<usize>, total: Option<usize>) -> Self {
        let served = hydrated.trip.completed_stops as usize;
        Self {
            index,
            total,
            trip: &hydrated.trip,
            line: &hydrated.line,
            stops: hydrated
                .stop_times
                .iter()
                .enumerate()
                .map(|(i, st)| StopTimeView {
                    stop_id: st.stop.id,
                    name: &st.stop.name,
                    arrival: st.arrival,
                    departure: st.departure,
                    served: i < served,
                })
                .collect(),
        }
    }
}

#[must_use]
pub fn format_trip_text(view: &TripView<'_>, opts: &FormatOptions) -> String {
    let mut out = String::new();
    let trip = view.trip;

    let _ = writeln!(
        out,
        "{} to {} ({})",
        line_badge(view.line, opts.no_color),
        trip.head_sign,
        format_direction(trip.direction)
    );
    if let (Some(index), Some(total)) = (view.index, view.total) {
        let _ = writeln!(out, "  Trip {} of {}", index + 1, total);
    }
    let _ = writeln!(out, "  Status:  {}", format_delay(trip.delay, opts.no_color));
    if trip.vehicle_id != VEHICLE_UNKNOWN {
        let _ = writeln!(out, "  Vehicle: {}", trip.vehicle_id);
    }
    if let Some(seen) = trip.last_event_at {
        let _ = writeln!(out, "  Last update: {}", to_rome(&seen).format("%H:%M:%S"));
    }
    let _ = writeln!(out);

    for stop in &view.stops {
        let time = format_clock(stop.arrival.or(stop.departure));
        let row = format!("  {}  {}", time, stop.name);
        let row = if stop.served && !opts.no_color {
            row.dimmed().to_string()
        } else {
            row
        };
        let _ = writeln!(out, "{}", row);
    }
    out
}

/// One trip passing at a stop.
#[derive(Debug, Serialize)]
pub struct StopTripView<'a> {
    pub position: usize,
    pub trip: &'a TripRecord,
    pub line: Option<&'a LineRecord>,
    /// Scheduled passage at the stop.
    pub passage: Option<DateTime<FixedOffset>>,
}

#[must_use]
pub fn format_stop_trips_text(
    stop: &StopRecord,
    trips: &[StopTripView<'_>],
    opts: &FormatOptions,
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Trips at {} ({})\n", stop.name, stop.key());

    if trips.is_empty() {
        out.push_str("No trips found.\n");
        return out;
    }

    for view in trips {
        let line = match view.line {
            Some(line) => line_badge(line, opts.no_color),
            None => format!("[{}]", view.trip.line_id),
        };
        let _ = writeln!(
            out,
            "{:>3}. {}  {} {}  {}",
            view.position,
            format_clock(view.passage),
            line,
            view.trip.head_sign,
            format_delay(view.trip.delay, opts.no_color)
        );
    }
    out
}

// ============================================================================
// Status
// ============================================================================

/// What `transit status` reports.
#[derive(Debug, Serialize)]
pub struct StatusView {
    pub summary: DatasetSummary,
    pub last_reload: Option<DateTime<FixedOffset>>,
    pub preferences: Preferences,
}

#[must_use]
pub fn format_status_text(status: &StatusView) -> String {
    let mut out = String::new();
    let summary = &status.summary;
    let _ = writeln!(out, "Lines:     {}", summary.lines);
    let _ = writeln!(out, "News:      {}", summary.news_items);
    let _ = writeln!(out, "Stops:     {}", summary.stops);
    let _ = writeln!(out, "Stop/line: {}", summary.associations);
    match status.last_reload {
        Some(at) => {
            let _ = writeln!(out, "Reloaded:  {}", at.format("%Y-%m-%d %H:%M"));
        }
        None => {
            let _ = writeln!(out, "Reloaded:  never");
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use transit_core::{HydratedStopTime, HydratedTrip};
    use transit_types::{Area, StopTimeRecord, TransportType};

    fn plain() -> FormatOptions {
        FormatOptions::new(true)
    }

    fn line() -> LineRecord {
        LineRecord {
            id: 5,
            transport_type: TransportType::Urban,
            area: Some(Area::UrbanTrento),
            color: Some(0x0000ff),
            long_name: "Piazza Dante - Povo".into(),
            short_name: "5".into(),
            news_items: vec![],
        }
    }

    fn stop(id: i64, name: &str) -> StopRecord {
        StopRecord {
            id,
            transport_type: TransportType::Urban,
            latitude: 46.07,
            longitude: 11.12,
            name: name.into(),
            street: "Via Sommarive".into(),
            town: "Trento".into(),
            wheelchair_accessible: true,
            cardinal_point: None,
            lines: vec![],
        }
    }

    fn at(h: u32, m: u32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(3600)
            .unwrap()
            .with_ymd_and_hms(2024, 3, 1, h, m, 0)
            .unwrap()
    }

    fn hydrated(delay: i32) -> HydratedTrip {
        HydratedTrip {
            trip: TripRecord {
                delay,
                direction: Direction::Forward,
                last_event_at: None,
                line_id: 5,
                transport_type: TransportType::Urban,
                head_sign: "Povo".into(),
                trip_id: "t1".into(),
                completed_stops: 1,
                stop_times: vec![
                    StopTimeRecord {
                        arrival: Some(at(8, 0)),
                        departure: Some(at(8, 0)),
                        stop_id: 10,
                    },
                    StopTimeRecord {
                        arrival: Some(at(8, 12)),
                        departure: None,
                        stop_id: 11,
                    },
                ],
                vehicle_id: VEHICLE_UNKNOWN,
            },
            line: line(),
            stop_times: vec![
                HydratedStopTime {
                    arrival: Some(at(8, 0)),
                    departure: Some(at(8, 0)),
                    stop: stop(10, "Piazza Dante"),
                },
                HydratedStopTime {
                    arrival: Some(at(8, 12)),
                    departure: None,
                    stop: stop(11, "Povo Polo Scientifico"),
                },
            ],
        }
    }

    #[test]
    fn test_format_delay_no_color() {
        assert_eq!(format_delay(DELAY_UNKNOWN, true), "scheduled");
        assert_eq!(format_delay(0, true), "on time");
        assert_eq!(format_delay(4, true), "+4 min");
        assert_eq!(format_delay(-2, true), "2 min early");
    }

    #[test]
    fn test_format_delay_with_color_contains_label() {
        assert!(format_delay(7, false).contains("+7 min"));
    }

    #[test]
    fn test_format_lines_text() {
        let text = format_lines_text(&[line()], &plain());
        assert!(text.contains("U/5"));
        assert!(text.contains("Piazza Dante - Povo"));
        assert_eq!(format_lines_text(&[], &plain()), "No lines found.\n");
    }

    #[test]
    fn test_format_stop_text_lists_lines() {
        let text = format_stop_text(&stop(10, "Piazza Dante"), &[line()], &plain());
        assert!(text.contains("Piazza Dante (U/10)"));
        assert!(text.contains("Via Sommarive - Trento"));
        assert!(text.contains("Lines:    [5]"));
        assert!(text.contains("Wheelchair accessible"));
    }

    #[test]
    fn test_format_trip_text() {
        let trip = hydrated(3);
        let view = TripView::new(&trip, Some(4), Some(20));
        let text = format_trip_text(&view, &plain());

        assert!(text.contains("[5] to Povo (outbound)"));
        assert!(text.contains("Trip 5 of 20"));
        assert!(text.contains("+3 min"));
        assert!(text.contains("08:00  Piazza Dante"));
        assert!(text.contains("08:12  Povo Polo Scientifico"));
    }

    #[test]
    fn test_trip_view_marks_served_stops() {
        let trip = hydrated(0);
        let view = TripView::new(&trip, None, None);
        assert!(view.stops[0].served);
        assert!(!view.stops[1].served);
    }

    #[test]
    fn test_trip_view_json() {
        let trip = hydrated(0);
        let json = FormatOptions::default()
            .with_compact(true)
            .as_json(&TripView::new(&trip, Some(0), Some(1)))
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["index"], 0);
        assert_eq!(value["trip"]["trip_id"], "t1");
        assert_eq!(value["stops"][1]["name"], "Povo Polo Scientifico");
        assert!(json.ends_with('\n'));
    }

    #[test]
    fn test_format_stop_trips_text() {
        let trip = hydrated(DELAY_UNKNOWN);
        let line = line();
        let views = vec![StopTripView {
            position: 0,
            trip: &trip.trip,
            line: Some(&line),
            passage: Some(at(8, 0)),
        }];

        let text = format_stop_trips_text(&stop(10, "Piazza Dante"), &views, &plain());
        assert!(text.contains("0. 08:00  [5] Povo  scheduled"));

        let empty = format_stop_trips_text(&stop(10, "Piazza Dante"), &[], &plain());
        assert!(empty.contains("No trips found."));
    }
}
