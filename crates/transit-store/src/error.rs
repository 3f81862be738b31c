//! Store errors.

use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

/// Failure while reading or replacing the persisted reference dataset.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("SQLite error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The parent directory of the database file could not be created.
    #[error("Cannot create {path} for the dataset database: {source}")]
    CreateDirectory {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The affected-lines list of a news item could not be encoded or decoded.
    #[error("Malformed affected line list: {0}")]
    AffectedLines(#[from] serde_json::Error),
}
