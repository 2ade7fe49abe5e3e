use thiserror::Error;

pub type Result<T> = std::result::Result<T, BrowserlessError>;

#[derive(Debug, Error)]
pub enum BrowserlessError {
    #[error("Failed to build HTTP client: {0}")]
    Build(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request to {url} timed out")]
    Timeout { url: String },

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },
}

impl From<reqwest::Error> for BrowserlessError {
    fn from(err: reqwest::Error) -> Self {
        // The endpoint carries the API token in its query string.
        if err.is_timeout() {
            let url = err
                .url()
                .map(|u| {
                    let mut u = u.clone();
                    u.set_query(None);
                    u.to_string()
                })
                .unwrap_or_default();
            return BrowserlessError::Timeout { url };
        }
        BrowserlessError::Network(err.without_url().to_string())
    }
}
