use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use browserless_client::{BrowserlessClient, BrowserlessError, ContentRequest, WaitUntil};
use driftnet_common::NavigationWait;
use tracing::info;

use super::{check_url, PageRenderer, RenderSession};
use crate::error::{FetchError, FetchResult};

/// Renders through a remote Browserless instance. The browser lives on the
/// other side of the wire, so a session is just a handle on the client.
pub struct BrowserlessRenderer {
    client: Arc<BrowserlessClient>,
    page_wait: PageWait,
    timeout: Duration,
}

/// What Browserless waits for before handing back the DOM.
#[derive(Debug, Clone)]
struct PageWait {
    until: NavigationWait,
    selector: Option<String>,
}

impl PageWait {
    fn request(&self, url: &str) -> ContentRequest {
        let until = match self.until {
            NavigationWait::Load => WaitUntil::Load,
            NavigationWait::DomContentLoaded => WaitUntil::DomContentLoaded,
            NavigationWait::NetworkIdle => WaitUntil::NetworkIdle,
        };
        let request = ContentRequest::new(url).wait_until(until);
        match &self.selector {
            Some(selector) => request.wait_for(selector),
            None => request,
        }
    }
}

impl BrowserlessRenderer {
    pub fn new(
        base_url: &str,
        token: Option<&str>,
        timeout: Duration,
        wait_until: NavigationWait,
        wait_for: Option<String>,
    ) -> FetchResult<Self> {
        let client = BrowserlessClient::with_timeout(base_url, token, timeout)
            .map_err(|e| FetchError::Unavailable(e.to_string()))?;
        info!(base_url, "BrowserlessRenderer initialized");
        Ok(Self {
            client: Arc::new(client),
            page_wait: PageWait {
                until: wait_until,
                selector: wait_for,
            },
            timeout,
        })
    }
}

#[async_trait]
impl PageRenderer for BrowserlessRenderer {
    async fn open(&self) -> FetchResult<Box<dyn RenderSession>> {
        Ok(Box::new(BrowserlessSession {
            client: Arc::clone(&self.client),
            page_wait: self.page_wait.clone(),
            timeout: self.timeout,
        }))
    }

    fn name(&self) -> &str {
        "browserless"
    }
}

struct BrowserlessSession {
    client: Arc<BrowserlessClient>,
    page_wait: PageWait,
    timeout: Duration,
}

#[async_trait]
impl RenderSession for BrowserlessSession {
    async fn render(&mut self, url: &str) -> FetchResult<String> {
        check_url(url)?;
        info!(url, renderer = "browserless", "Rendering page");

        let request = self.page_wait.request(url);

        let html = self
            .client
            .content_with(&request)
            .await
            .map_err(|e| match e {
                BrowserlessError::Timeout { .. } => FetchError::Timeout {
                    url: url.to_string(),
                    secs: self.timeout.as_secs(),
                },
                other => FetchError::Render {
                    url: url.to_string(),
                    reason: other.to_string(),
                },
            })?;

        if html.trim().is_empty() {
            return Err(FetchError::EmptyDocument {
                url: url.to_string(),
            });
        }

        info!(url, renderer = "browserless", bytes = html.len(), "Rendered successfully");
        Ok(html)
    }

    async fn close(&mut self) -> FetchResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configured_waits_reach_the_request() {
        let wait = PageWait {
            until: NavigationWait::NetworkIdle,
            selector: Some("article".to_string()),
        };
        let json = serde_json::to_value(wait.request("https://www.nytimes.com/a")).unwrap();
        assert_eq!(json["gotoOptions"]["waitUntil"], "networkidle0");
        assert_eq!(json["waitForSelector"]["selector"], "article");
    }

    #[test]
    fn default_wait_is_load_without_selector() {
        let wait = PageWait {
            until: NavigationWait::default(),
            selector: None,
        };
        let json = serde_json::to_value(wait.request("https://www.nytimes.com/a")).unwrap();
        assert_eq!(json["gotoOptions"]["waitUntil"], "load");
        assert!(json.get("waitForSelector").is_none());
    }
}
