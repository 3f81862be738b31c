//! Main store implementation.

use std::collections::HashSet;
use std::path::Path;
use std::str::FromStr;

use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row};
use tracing::{debug, info};

use transit_types::{
    Area, CardinalPoint, LineKey, LineRecord, NewsItem, ParseError, StopKey, StopRecord,
};

use crate::error::{Error, Result};
use crate::models::DatasetSummary;
use crate::queries::StopQuery;
use crate::schema;

const LINE_COLUMNS: &str = "id, type, area, color, long_name, short_name";

/// SQLite-based store for the transit reference dataset.
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open or create a database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| Error::CreateDirectory {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        info!("Opening database at {}", path.display());
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "PRAGMA foreign_keys = ON;
             PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;",
        )?;

        schema::initialize(&conn)?;

        Ok(Self { conn })
    }

    /// Open the default database location.
    pub fn open_default() -> Result<Self> {
        Self::open(crate::default_db_path())
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        schema::initialize(&conn)?;
        Ok(Self { conn })
    }

    /// Replace the whole reference dataset in a single transaction.
    ///
    /// Existing associations, news, stops and lines are deleted (in that
    /// order), then lines, news, stops and associations are inserted. Readers
    /// observe either the previous dataset or the new one, never a mix. If any
    /// statement fails the transaction is rolled back and the previous dataset
    /// is left untouched.
    ///
    /// Associations that reference a line or stop missing from the new dataset
    /// are skipped, since the deferred line constraint would otherwise fail the
    /// whole commit.
    pub fn replace_dataset(
        &mut self,
        lines: &[LineRecord],
        stops: &[StopRecord],
    ) -> Result<DatasetSummary> {
        let tx = self.conn.transaction()?;
        let mut summary = DatasetSummary::default();

        tx.execute_batch(
            "DELETE FROM stop_lines;
             DELETE FROM news_items;
             DELETE FROM stops;
             DELETE FROM lines;",
        )?;

        {
            let mut insert_line = tx.prepare(
                "INSERT OR IGNORE INTO lines (id, type, area, color, long_name, short_name)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for line in lines {
                summary.lines += insert_line.execute(rusqlite::params![
                    line.id,
                    line.transport_type.code(),
                    line.area.map(|a| a.code()),
                    line.color,
                    line.long_name,
                    line.short_name,
                ])?;
            }
        }

        {
            let mut insert_news = tx.prepare(
                "INSERT OR IGNORE INTO news_items (service_type, start_date, end_date, header,
                 details, url, line_id, line_type, affected_line_ids)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )?;
            for line in lines {
                for news in &line.news_items {
                    summary.news_items += insert_news.execute(rusqlite::params![
                        news.service_type,
                        news.start,
                        news.end,
                        news.header,
                        news.details,
                        news.url,
                        line.id,
                        line.transport_type.code(),
                        serde_json::to_string(&news.affected_line_ids)?,
                    ])?;
                }
            }
        }

        {
            let mut insert_stop = tx.prepare(
                "INSERT OR IGNORE INTO stops (id, type, latitude, longitude, name, street, town,
                 wheelchair_accessible, cardinal_point)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )?;
            for stop in stops {
                summary.stops += insert_stop.execute(rusqlite::params![
                    stop.id,
                    stop.transport_type.code(),
                    stop.latitude,
                    stop.longitude,
                    stop.name,
                    stop.street,
                    stop.town,
                    stop.wheelchair_accessible,
                    stop.cardinal_point.map(|c| c.short_name()),
                ])?;
            }
        }

        {
            let known_lines: HashSet<LineKey> = lines.iter().map(LineRecord::key).collect();
            let mut insert_join = tx.prepare(
                "INSERT OR IGNORE INTO stop_lines (stop_id, stop_type, line_id, line_type)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for stop in stops {
                for line in &stop.lines {
                    if !known_lines.contains(line) {
                        summary.skipped_associations += 1;
                        continue;
                    }
                    summary.associations += insert_join.execute(rusqlite::params![
                        stop.id,
                        stop.transport_type.code(),
                        line.id,
                        line.transport_type.code(),
                    ])?;
                }
            }
        }

        tx.commit()?;

        if summary.skipped_associations > 0 {
            debug!(
                "Skipped {} stop-line associations referencing unknown lines",
                summary.skipped_associations
            );
        }
        info!(
            "Replaced reference dataset: {} lines, {} news items, {} stops, {} associations",
            summary.lines, summary.news_items, summary.stops, summary.associations
        );

        Ok(summary)
    }

    /// Count the rows currently stored in each reference table.
    pub fn dataset_summary(&self) -> Result<DatasetSummary> {
        let count = |table: &str| -> Result<usize> {
            let n: i64 =
                self.conn
                    .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
                        row.get(0)
                    })?;
            Ok(n as usize)
        };

        Ok(DatasetSummary {
            lines: count("lines")?,
            news_items: count("news_items")?,
            stops: count("stops")?,
            associations: count("stop_lines")?,
            skipped_associations: 0,
        })
    }
}

// Line operations
impl Store {
    /// Get a line (with its news items) by key.
    pub fn get_line(&self, key: LineKey) -> Result<Option<LineRecord>> {
        let line = self
            .conn
            .query_row(
                &format!("SELECT {LINE_COLUMNS} FROM lines WHERE id = ?1 AND type = ?2"),
                rusqlite::params![key.id, key.transport_type.code()],
                line_from_row,
            )
            .optional()?;

        match line {
            Some(mut line) => {
                line.news_items = self.news_for_line(key)?;
                Ok(Some(line))
            }
            None => Ok(None),
        }
    }

    /// List every line, ordered by type and short name.
    pub fn all_lines(&self) -> Result<Vec<LineRecord>> {
        self.query_lines(
            &format!("SELECT {LINE_COLUMNS} FROM lines ORDER BY type, short_name, id"),
            &[],
        )
    }

    /// List the lines belonging to an area.
    pub fn lines_by_area(&self, area: Area) -> Result<Vec<LineRecord>> {
        self.query_lines(
            &format!("SELECT {LINE_COLUMNS} FROM lines WHERE area = ?1 ORDER BY short_name, id"),
            &[&area.code()],
        )
    }

    /// List the lines serving a stop.
    pub fn lines_for_stop(&self, stop: StopKey) -> Result<Vec<LineRecord>> {
        self.query_lines(
            "SELECT l.id, l.type, l.area, l.color, l.long_name, l.short_name
             FROM stop_lines j INNER JOIN lines l
                ON j.line_id = l.id AND j.line_type = l.type
             WHERE j.stop_id = ?1 AND j.stop_type = ?2
             ORDER BY l.short_name, l.id",
            &[&stop.id, &stop.transport_type.code()],
        )
    }

    /// List the news items attached to a line.
    pub fn news_for_line(&self, key: LineKey) -> Result<Vec<NewsItem>> {
        let mut stmt = self.conn.prepare(
            "SELECT service_type, start_date, end_date, header, details, url, affected_line_ids
             FROM news_items WHERE line_id = ?1 AND line_type = ?2
             ORDER BY start_date, header",
        )?;

        let rows = stmt
            .query_map(
                rusqlite::params![key.id, key.transport_type.code()],
                |row| {
                    Ok((
                        NewsItem {
                            service_type: row.get(0)?,
                            start: row.get(1)?,
                            end: row.get(2)?,
                            header: row.get(3)?,
                            details: row.get(4)?,
                            url: row.get(5)?,
                            affected_line_ids: Vec::new(),
                        },
                        row.get::<_, String>(6)?,
                    ))
                },
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(mut news, affected)| {
                news.affected_line_ids = serde_json::from_str(&affected)?;
                Ok(news)
            })
            .collect()
    }

    /// Lines are returned without news; use [`Store::get_line`] for those.
    fn query_lines(&self, sql: &str, params: &[&dyn rusqlite::ToSql]) -> Result<Vec<LineRecord>> {
        let mut stmt = self.conn.prepare(sql)?;
        let lines = stmt
            .query_map(params, line_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(lines)
    }
}

// Stop operations
impl Store {
    /// Get a stop (with the keys of the lines serving it) by key.
    pub fn get_stop(&self, key: StopKey) -> Result<Option<StopRecord>> {
        let stop = self
            .conn
            .query_row(
                "SELECT id, type, latitude, longitude, name, street, town,
                 wheelchair_accessible, cardinal_point
                 FROM stops WHERE id = ?1 AND type = ?2",
                rusqlite::params![key.id, key.transport_type.code()],
                stop_from_row,
            )
            .optional()?;

        match stop {
            Some(mut stop) => {
                stop.lines = self.line_keys_for_stop(key)?;
                Ok(Some(stop))
            }
            None => Ok(None),
        }
    }

    /// Search stops by text with pagination; see [`StopQuery`].
    pub fn search_stops(&self, query: &StopQuery) -> Result<Vec<StopRecord>> {
        let (sql, params) = query.build_sql();
        debug!("Executing query: {}", sql);

        let params_ref: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let mut stmt = self.conn.prepare(&sql)?;
        let mut stops = stmt
            .query_map(params_ref.as_slice(), stop_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        for stop in &mut stops {
            stop.lines = self.line_keys_for_stop(stop.key())?;
        }

        Ok(stops)
    }

    fn line_keys_for_stop(&self, stop: StopKey) -> Result<Vec<LineKey>> {
        let mut stmt = self.conn.prepare(
            "SELECT line_id, line_type FROM stop_lines
             WHERE stop_id = ?1 AND stop_type = ?2
             ORDER BY line_type, line_id",
        )?;

        let keys = stmt
            .query_map(
                rusqlite::params![stop.id, stop.transport_type.code()],
                |row| Ok(LineKey::new(row.get(0)?, parse_column(row, 1)?)),
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(keys)
    }
}

fn line_from_row(row: &Row<'_>) -> rusqlite::Result<LineRecord> {
    let area = match row.get::<_, Option<i64>>(2)? {
        Some(code) => Some(
            Area::try_from(code).map_err(|e| conversion_failure(2, Type::Integer, e))?,
        ),
        None => None,
    };

    Ok(LineRecord {
        id: row.get(0)?,
        transport_type: parse_column(row, 1)?,
        area,
        color: row.get(3)?,
        long_name: row.get(4)?,
        short_name: row.get(5)?,
        news_items: Vec::new(),
    })
}

fn stop_from_row(row: &Row<'_>) -> rusqlite::Result<StopRecord> {
    let cardinal_point = match row.get::<_, Option<String>>(8)? {
        Some(raw) => Some(
            CardinalPoint::from_str(&raw).map_err(|e| conversion_failure(8, Type::Text, e))?,
        ),
        None => None,
    };

    Ok(StopRecord {
        id: row.get(0)?,
        transport_type: parse_column(row, 1)?,
        latitude: row.get(2)?,
        longitude: row.get(3)?,
        name: row.get(4)?,
        street: row.get(5)?,
        town: row.get(6)?,
        wheelchair_accessible: row.get(7)?,
        cardinal_point,
        lines: Vec::new(),
    })
}

fn parse_column<T: FromStr<Err = ParseError>>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    raw.parse()
        .map_err(|e| conversion_failure(idx, Type::Text, e))
}

fn conversion_failure(idx: usize, ty: Type, err: ParseError) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, ty, Box::new(err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use transit_types::TransportType;
    use chrono::{DateTime, FixedOffset, TimeZone};

    fn date(day: u32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(3600)
            .unwrap()
            .with_ymd_and_hms(2024, 1, day, 0, 0, 0)
            .unwrap()
    }

    fn line(id: i64, transport_type: TransportType, area: Option<Area>) -> LineRecord {
        LineRecord {
            id,
            transport_type,
            area,
            color: Some(0x00ff00),
            long_name: format!("Line {id} long"),
            short_name: id.to_string(),
            news_items: vec![],
        }
    }

    fn stop(id: i64, name: &str, lines: Vec<LineKey>) -> StopRecord {
        StopRecord {
            id,
            transport_type: TransportType::Urban,
            latitude: 46.07,
            longitude: 11.12,
            name: name.to_string(),
            street: "Via Roma".to_string(),
            town: "Trento".to_string(),
            wheelchair_accessible: false,
            cardinal_point: Some(CardinalPoint::North),
            lines,
        }
    }

    fn urban(id: i64) -> LineKey {
        LineKey::new(id, TransportType::Urban)
    }

    #[test]
    fn test_open_in_memory() {
        let store = Store::open_in_memory().unwrap();
        assert!(store.dataset_summary().unwrap().is_empty());
    }

    #[test]
    fn test_open_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("data.db");
        let store = Store::open(&path).unwrap();
        assert!(path.exists());
        assert!(store.dataset_summary().unwrap().is_empty());
    }

    #[test]
    fn test_replace_dataset_and_lookup() {
        let mut store = Store::open_in_memory().unwrap();
        let mut l1 = line(1, TransportType::Urban, Some(Area::UrbanTrento));
        l1.news_items.push(NewsItem {
            service_type: "deviation".into(),
            start: date(1),
            end: date(7),
            header: "Roadworks".into(),
            details: "Stop moved".into(),
            url: "https://example.org/n/1".into(),
            affected_line_ids: vec![1, 5],
        });

        let summary = store
            .replace_dataset(&[l1.clone()], &[stop(10, "Piazza Dante", vec![urban(1)])])
            .unwrap();
        assert_eq!(summary.lines, 1);
        assert_eq!(summary.news_items, 1);
        assert_eq!(summary.stops, 1);
        assert_eq!(summary.associations, 1);

        let stored = store.get_line(urban(1)).unwrap().unwrap();
        assert_eq!(stored, l1);

        let stored_stop = store
            .get_stop(StopKey::new(10, TransportType::Urban))
            .unwrap()
            .unwrap();
        assert_eq!(stored_stop.lines, vec![urban(1)]);
        assert_eq!(stored_stop.cardinal_point, Some(CardinalPoint::North));

        let served_by = store
            .lines_for_stop(StopKey::new(10, TransportType::Urban))
            .unwrap();
        assert_eq!(served_by.len(), 1);
        assert_eq!(served_by[0].id, 1);
    }

    #[test]
    fn test_lines_identified_by_id_and_type() {
        let mut store = Store::open_in_memory().unwrap();
        store
            .replace_dataset(
                &[
                    line(3, TransportType::Urban, Some(Area::UrbanTrento)),
                    line(3, TransportType::Suburban, Some(Area::Suburban1)),
                ],
                &[],
            )
            .unwrap();

        let urban = store.get_line(urban(3)).unwrap().unwrap();
        let suburban = store
            .get_line(LineKey::new(3, TransportType::Suburban))
            .unwrap()
            .unwrap();
        assert_eq!(urban.area, Some(Area::UrbanTrento));
        assert_eq!(suburban.area, Some(Area::Suburban1));
        assert!(store.get_line(urban_missing()).unwrap().is_none());
    }

    fn urban_missing() -> LineKey {
        urban(404)
    }

    #[test]
    fn test_replace_dataset_removes_previous_data() {
        let mut store = Store::open_in_memory().unwrap();
        store
            .replace_dataset(
                &[line(1, TransportType::Urban, None), line(2, TransportType::Urban, None)],
                &[stop(10, "A", vec![urban(1), urban(2)])],
            )
            .unwrap();

        store
            .replace_dataset(
                &[line(2, TransportType::Urban, None)],
                &[stop(11, "B", vec![urban(2)])],
            )
            .unwrap();

        assert!(store.get_line(urban(1)).unwrap().is_none());
        assert!(
            store
                .get_stop(StopKey::new(10, TransportType::Urban))
                .unwrap()
                .is_none()
        );
        let summary = store.dataset_summary().unwrap();
        assert_eq!(summary.lines, 1);
        assert_eq!(summary.stops, 1);
        assert_eq!(summary.associations, 1);
    }

    #[test]
    fn test_associations_survive_line_reinsertion() {
        let mut store = Store::open_in_memory().unwrap();
        let lines = [line(1, TransportType::Urban, None)];
        let stops = [stop(10, "A", vec![urban(1)])];

        store.replace_dataset(&lines, &stops).unwrap();
        store.replace_dataset(&lines, &stops).unwrap();

        let stop = store
            .get_stop(StopKey::new(10, TransportType::Urban))
            .unwrap()
            .unwrap();
        assert_eq!(stop.lines, vec![urban(1)]);
    }

    #[test]
    fn test_unknown_line_associations_are_skipped() {
        let mut store = Store::open_in_memory().unwrap();
        let summary = store
            .replace_dataset(
                &[line(1, TransportType::Urban, None)],
                &[stop(10, "A", vec![urban(1), urban(99)])],
            )
            .unwrap();

        assert_eq!(summary.associations, 1);
        assert_eq!(summary.skipped_associations, 1);
    }

    #[test]
    fn test_lines_by_area() {
        let mut store = Store::open_in_memory().unwrap();
        store
            .replace_dataset(
                &[
                    line(1, TransportType::Urban, Some(Area::UrbanTrento)),
                    line(2, TransportType::Urban, Some(Area::UrbanRovereto)),
                    line(3, TransportType::Urban, Some(Area::UrbanTrento)),
                ],
                &[],
            )
            .unwrap();

        let trento: Vec<i64> = store
            .lines_by_area(Area::UrbanTrento)
            .unwrap()
            .iter()
            .map(|l| l.id)
            .collect();
        assert_eq!(trento, vec![1, 3]);
        assert_eq!(store.all_lines().unwrap().len(), 3);
    }

    #[test]
    fn test_search_stops_ranks_name_matches_first() {
        let mut store = Store::open_in_memory().unwrap();
        let mut by_street = stop(1, "Stazione", vec![urban(1)]);
        by_street.street = "Via Dante".into();
        let by_name = stop(2, "Piazza Dante", vec![urban(1)]);
        let unrelated = stop(3, "Povo", vec![urban(1)]);

        store
            .replace_dataset(
                &[line(1, TransportType::Urban, None)],
                &[by_street, by_name, unrelated],
            )
            .unwrap();

        let found: Vec<i64> = store
            .search_stops(&StopQuery::new().text("dante"))
            .unwrap()
            .iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(found, vec![2, 1]);
    }

    #[test]
    fn test_search_stops_without_text_orders_by_line_count() {
        let mut store = Store::open_in_memory().unwrap();
        store
            .replace_dataset(
                &[
                    line(1, TransportType::Urban, None),
                    line(2, TransportType::Urban, None),
                ],
                &[
                    stop(1, "One line", vec![urban(1)]),
                    stop(2, "Two lines", vec![urban(1), urban(2)]),
                    stop(3, "No lines", vec![]),
                ],
            )
            .unwrap();

        let found: Vec<i64> = store
            .search_stops(&StopQuery::new())
            .unwrap()
            .iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(found, vec![2, 1]);

        let page: Vec<i64> = store
            .search_stops(&StopQuery::new().limit(1).offset(1))
            .unwrap()
            .iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(page, vec![1]);
    }
}
