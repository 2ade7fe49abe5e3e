use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

use super::{check_url, PageRenderer, RenderSession};
use crate::error::{FetchError, FetchResult};

/// Plain GET for pages that render without script execution.
pub struct HttpRenderer {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpRenderer {
    pub fn new(timeout: Duration) -> FetchResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("driftnet/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FetchError::Unavailable(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, timeout })
    }
}

#[async_trait]
impl PageRenderer for HttpRenderer {
    async fn open(&self) -> FetchResult<Box<dyn RenderSession>> {
        Ok(Box::new(HttpSession {
            client: self.client.clone(),
            timeout: self.timeout,
        }))
    }

    fn name(&self) -> &str {
        "http"
    }
}

struct HttpSession {
    client: reqwest::Client,
    timeout: Duration,
}

#[async_trait]
impl RenderSession for HttpSession {
    async fn render(&mut self, url: &str) -> FetchResult<String> {
        let parsed = check_url(url)?;
        info!(url, renderer = "http", "Fetching page");

        let failed = |e: reqwest::Error| {
            if e.is_timeout() {
                FetchError::Timeout {
                    url: url.to_string(),
                    secs: self.timeout.as_secs(),
                }
            } else {
                FetchError::Render {
                    url: url.to_string(),
                    reason: e.to_string(),
                }
            }
        };

        let resp = self.client.get(parsed).send().await.map_err(failed)?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Render {
                url: url.to_string(),
                reason: format!("HTTP {status}"),
            });
        }

        let html = resp.text().await.map_err(failed)?;
        if html.trim().is_empty() {
            return Err(FetchError::EmptyDocument {
                url: url.to_string(),
            });
        }

        info!(url, renderer = "http", bytes = html.len(), "Fetched successfully");
        Ok(html)
    }

    async fn close(&mut self) -> FetchResult<()> {
        Ok(())
    }
}
