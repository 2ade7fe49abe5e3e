use thiserror::Error;

/// Problems building the registration table. Raised at startup, never per request.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("function {0:?} registered twice")]
    Duplicate(String),

    #[error("invalid function name {0:?}: use lowercase letters, digits, '.', '_' or '-'")]
    InvalidName(String),

    #[error("function {0:?} must allow at least one concurrent call")]
    ZeroConcurrency(String),
}

/// What a handler can fail with. The router maps each variant to a status code.
#[derive(Debug, Error)]
pub enum FunctionError {
    #[error("bad arguments: {0}")]
    BadArgs(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl FunctionError {
    pub fn bad_args(msg: impl Into<String>) -> Self {
        Self::BadArgs(msg.into())
    }
}

impl From<driftnet_store::StoreError> for FunctionError {
    fn from(err: driftnet_store::StoreError) -> Self {
        match err {
            driftnet_store::StoreError::InvalidIndex(_) | driftnet_store::StoreError::Query(_) => {
                Self::BadArgs(err.to_string())
            }
            other => Self::Internal(other.into()),
        }
    }
}

impl From<driftnet_common::RecordError> for FunctionError {
    fn from(err: driftnet_common::RecordError) -> Self {
        Self::BadArgs(err.to_string())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("unclosed placeholder starting with {0:?}")]
    Unclosed(String),

    #[error("unknown placeholder {{{{{0}}}}}")]
    Unknown(String),
}

pub type FunctionResult<T> = std::result::Result<T, FunctionError>;
