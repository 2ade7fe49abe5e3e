use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend could not be read or written. Callers relying on existence
    /// checks for dedup must treat this as fatal.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("invalid index name: {0:?}")]
    InvalidIndex(String),

    #[error("corrupt record {id} in index {index}: {reason}")]
    Corrupt {
        index: String,
        id: String,
        reason: String,
    },

    #[error("invalid query: {0}")]
    Query(String),
}

impl StoreError {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Database(_))
    }
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;
