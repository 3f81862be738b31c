//! Error types for transit-core.
//!
//! # Error Recovery
//!
//! | Error Type | Handled by | Notes |
//! |------------|------------|-------|
//! | [`Error::Http`] | [`crate::with_retry`] | Every remote call is retried a fixed number of times |
//! | [`Error::Api`] | [`crate::with_retry`] | Non-success status codes are not classified further |
//! | [`Error::InvalidData`] / [`Error::Json`] | [`crate::with_retry`] | Malformed payloads are retried like any other failure |
//! | [`Error::Store`] | Nobody | Fatal for the current operation |
//! | [`Error::NotFound`] | Caller | Raised only after the freshness policy had a chance to reload |
//! | [`Error::IndexOutOfRange`] | Caller | Contract error, never retried |
//!
//! Stale reference data gets one extra reload-and-retry cycle inside
//! [`crate::DatasetSynchronizer::run_guarded`]; anything that survives that
//! cycle is propagated unchanged.

use thiserror::Error;

/// Errors that can occur while synchronizing or caching transit data.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The HTTP request could not be completed.
    #[error("HTTP request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The remote service answered with a non-success status.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// A payload could be decoded but contained values that make no sense.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// A payload could not be decoded.
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The persistent store failed.
    #[error(transparent)]
    Store(#[from] transit_store::Error),

    /// A line or stop is missing from the reference dataset.
    #[error("{kind} {key} not found")]
    NotFound { kind: &'static str, key: String },

    /// A trip index is still absent after a targeted fetch.
    #[error("Trip index {index} out of range ({total} trips on that day)")]
    IndexOutOfRange { index: usize, total: usize },

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The preference file could not be read or written.
    #[error("Preferences error: {0}")]
    Preferences(String),
}

impl Error {
    /// Create a not found error for a line.
    pub fn line_not_found(key: transit_types::LineKey) -> Self {
        Self::NotFound {
            kind: "Line",
            key: key.to_string(),
        }
    }

    /// Create a not found error for a stop.
    pub fn stop_not_found(key: transit_types::StopKey) -> Self {
        Self::NotFound {
            kind: "Stop",
            key: key.to_string(),
        }
    }

    /// Create a configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }
}

impl From<transit_types::ParseError> for Error {
    fn from(err: transit_types::ParseError) -> Self {
        Error::InvalidData(err.to_string())
    }
}

/// Result type alias using transit-core's Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use transit_types::{LineKey, ParseError, StopKey, TransportType};

    #[test]
    fn test_error_display() {
        let err = Error::line_not_found(LineKey::new(5, TransportType::Urban));
        assert_eq!(err.to_string(), "Line U/5 not found");

        let err = Error::stop_not_found(StopKey::new(10, TransportType::Suburban));
        assert_eq!(err.to_string(), "Stop E/10 not found");

        let err = Error::IndexOutOfRange {
            index: 40,
            total: 32,
        };
        assert!(err.to_string().contains("40"));
        assert!(err.to_string().contains("32 trips"));

        let err = Error::invalid_config("base URL is empty");
        assert_eq!(err.to_string(), "Invalid configuration: base URL is empty");
    }

    #[test]
    fn test_parse_error_conversion() {
        let err: Error = ParseError::UnknownArea(99).into();
        assert!(matches!(err, Error::InvalidData(_)));
    }
}
