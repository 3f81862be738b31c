//! Error types for data parsing in transit-types.

use thiserror::Error;

/// Errors that can occur when converting raw values into domain types.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ParseError {
    /// Generic malformed value.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Transport type code not recognized (expected "U" or "E").
    #[error("Unknown transport type: {0:?}")]
    UnknownTransportType(String),

    /// Area code not recognized.
    #[error("Unknown area code: {0}")]
    UnknownArea(i64),

    /// Direction code not recognized.
    #[error("Unknown direction code: {0}")]
    UnknownDirection(i64),

    /// Cardinal point label not recognized.
    #[error("Unknown cardinal point: {0:?}")]
    UnknownCardinalPoint(String),
}

/// Result type alias using transit-types' ParseError type.
pub type ParseResult<T> = std::result::Result<T, ParseError>;
