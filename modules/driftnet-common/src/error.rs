//! Errors raised while building or decoding records.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RecordError {
    /// Natural keys must be non-empty to derive an id from them.
    #[error("natural key is empty")]
    EmptyKey,

    #[error("invalid record id {id:?}: {reason}")]
    InvalidId { id: String, reason: String },

    #[error("invalid URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("unrecognized timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("invalid geopoint: {0}")]
    InvalidGeo(String),

    #[error("invalid {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("missing field: {0}")]
    MissingField(&'static str),
}

pub type RecordResult<T> = std::result::Result<T, RecordError>;
