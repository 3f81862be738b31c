//! Query builder for stop search.
//!
//! # Example
//!
//! ```
//! use transit_store::{Store, StopQuery};
//!
//! let store = Store::open_in_memory()?;
//!
//! // Stops whose name, street or town contains "dante", second page
//! let query = StopQuery::new().text("dante").limit(20).offset(20);
//! let stops = store.search_stops(&query)?;
//! assert!(stops.is_empty());
//! # Ok::<(), transit_store::Error>(())
//! ```

/// Fluent query builder for stops.
///
/// Use this to construct queries for
/// [`Store::search_stops`](crate::Store::search_stops).
///
/// - With an empty search text, stops are ordered by how many lines serve
///   them (busiest first); stops without any line are not returned.
/// - Otherwise a stop matches if its name, street or town contains the text
///   (case-insensitive); matches in the name rank above matches in the street
///   or town.
#[derive(Debug, Default, Clone)]
pub struct StopQuery {
    /// Text to look for in name, street and town.
    pub text: String,
    /// Maximum number of results.
    pub limit: Option<u32>,
    /// Offset for pagination.
    pub offset: Option<u32>,
}

impl StopQuery {
    /// Create a new query matching every served stop.
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter by search text (surrounding whitespace is ignored).
    pub fn text(mut self, text: &str) -> Self {
        self.text = text.trim().to_string();
        self
    }

    /// Limit the maximum number of results returned.
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Skip the first N results.
    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Build the full SQL query and its parameters.
    pub(crate) fn build_sql(&self) -> (String, Vec<Box<dyn rusqlite::ToSql>>) {
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        let mut sql = if self.text.is_empty() {
            "SELECT s.id, s.type, s.latitude, s.longitude, s.name, s.street, s.town, \
             s.wheelchair_accessible, s.cardinal_point \
             FROM stops s INNER JOIN stop_lines j \
             ON j.stop_id = s.id AND j.stop_type = s.type \
             GROUP BY s.id, s.type \
             ORDER BY COUNT(*) DESC, s.name ASC"
                .to_string()
        } else {
            params.push(Box::new(self.text.clone()));
            "SELECT id, type, latitude, longitude, name, street, town, \
             wheelchair_accessible, cardinal_point FROM ( \
                SELECT *, \
                    instr(lower(name), lower(?1)) > 0 AS in_name, \
                    instr(lower(street), lower(?1)) > 0 AS in_street, \
                    instr(lower(town), lower(?1)) > 0 AS in_town \
                FROM stops) \
             WHERE in_name OR in_street OR in_town \
             ORDER BY in_name * -2 + in_street * -1 + in_town * -1, name ASC"
                .to_string()
        };

        // SQLite requires a LIMIT whenever OFFSET is given
        match (self.limit, self.offset) {
            (Some(limit), Some(offset)) => sql.push_str(&format!(" LIMIT {limit} OFFSET {offset}")),
            (Some(limit), None) => sql.push_str(&format!(" LIMIT {limit}")),
            (None, Some(offset)) => sql.push_str(&format!(" LIMIT -1 OFFSET {offset}")),
            (None, None) => {}
        }

        (sql, params)
    }
}
