use driftnet_common::RecordError;
use driftnet_store::StoreError;
use thiserror::Error;

pub type FetchResult<T> = std::result::Result<T, FetchError>;
pub type ExtractResult<T> = std::result::Result<T, ExtractError>;
pub type IngestResult<T> = std::result::Result<T, IngestError>;

/// Failure to obtain rendered markup for one URL.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("empty document returned for {url}")]
    EmptyDocument { url: String },

    #[error("render timed out after {secs}s for {url}")]
    Timeout { url: String, secs: u64 },

    #[error("render failed for {url}: {reason}")]
    Render { url: String, reason: String },

    /// The browser resource itself could not be acquired.
    #[error("renderer unavailable: {0}")]
    Unavailable(String),
}

/// Failure to derive fields from fetched markup. Nothing is stored when this happens.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error(transparent)]
    Record(#[from] RecordError),

    #[error("{strategy} failed: {source}")]
    Strategy {
        strategy: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

/// Batch-level failures. Anything here aborts the remaining keys.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Existence checks can no longer be trusted, so continuing risks duplicates.
    #[error("aborting batch at {key}: {source}")]
    StoreUnavailable {
        key: String,
        #[source]
        source: StoreError,
    },

    #[error("aborting batch, could not open renderer: {0}")]
    RendererUnavailable(#[source] FetchError),

    #[error("invalid index: {0}")]
    InvalidIndex(#[source] StoreError),
}
