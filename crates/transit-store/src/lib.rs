//! Local persistence for the transit reference dataset.
//!
//! This crate provides SQLite-based storage for lines, stops, the
//! stop-line associations and the news items attached to lines, so that
//! reference data is available instantly and offline.
//!
//! # Features
//!
//! - Atomic replacement of the whole dataset ([`Store::replace_dataset`])
//! - Lookups by `(id, transport type)` for lines and stops
//! - Lines by area, lines serving a stop, news for a line
//! - Ranked stop search with pagination ([`StopQuery`])
//!
//! # Example
//!
//! ```no_run
//! use transit_store::{Store, StopQuery};
//!
//! let store = Store::open_default()?;
//!
//! let query = StopQuery::new().text("dante").limit(10);
//! let stops = store.search_stops(&query)?;
//! # Ok::<(), transit_store::Error>(())
//! ```

mod error;
mod models;
mod queries;
mod schema;
mod store;

pub use error::{Error, Result};
pub use models::DatasetSummary;
pub use queries::StopQuery;
pub use store::Store;

/// Default database path following platform conventions.
///
/// - Linux: `~/.local/share/transit/data.db`
/// - macOS: `~/Library/Application Support/transit/data.db`
/// - Windows: `C:\Users\<user>\AppData\Local\transit\data.db`
pub fn default_db_path() -> std::path::PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join("transit")
        .join("data.db")
}
