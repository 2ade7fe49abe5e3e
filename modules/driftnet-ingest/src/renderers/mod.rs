//! Page rendering backends.
//!
//! A [`PageRenderer`] hands out one [`RenderSession`] per batch. The session
//! owns whatever heavy resource the backend needs (a browser profile, a
//! connection pool) and is reused for every key in the batch.

mod browserless;
mod chrome;
mod http;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use driftnet_common::{parse_web_url, AppConfig, RecordError, RenderBackend, RenderSection};
use url::Url;

use crate::error::{FetchError, FetchResult};

pub use browserless::BrowserlessRenderer;
pub use chrome::ChromeRenderer;
pub use http::HttpRenderer;

#[async_trait]
pub trait PageRenderer: Send + Sync {
    /// Acquire the rendering resource for a batch.
    async fn open(&self) -> FetchResult<Box<dyn RenderSession>>;

    fn name(&self) -> &str;
}

#[async_trait]
pub trait RenderSession: Send {
    /// Fully rendered markup for `url`.
    async fn render(&mut self, url: &str) -> FetchResult<String>;

    /// Release the resource. Called exactly once, after the last render.
    async fn close(&mut self) -> FetchResult<()>;
}

/// Only http(s) pages are rendered.
pub fn check_url(url: &str) -> FetchResult<Url> {
    parse_web_url(url).map_err(|e| match e {
        RecordError::InvalidUrl { url, reason } => FetchError::InvalidUrl { url, reason },
        other => FetchError::InvalidUrl {
            url: url.to_string(),
            reason: other.to_string(),
        },
    })
}

/// Build the renderer a batch config asks for.
pub fn build_renderer(render: &RenderSection, app: &AppConfig) -> FetchResult<Arc<dyn PageRenderer>> {
    let timeout = Duration::from_secs(render.timeout_secs);
    let renderer: Arc<dyn PageRenderer> = match render.backend {
        RenderBackend::Chrome => Arc::new(ChromeRenderer::new(&app.chrome_bin, timeout)),
        RenderBackend::Browserless => {
            let base_url = app.browserless_url.as_deref().ok_or_else(|| {
                FetchError::Unavailable("BROWSERLESS_URL is not set".to_string())
            })?;
            Arc::new(BrowserlessRenderer::new(
                base_url,
                app.browserless_token.as_deref(),
                timeout,
                render.wait_until,
                render.wait_for.clone(),
            )?)
        }
        RenderBackend::Http => Arc::new(HttpRenderer::new(timeout)?),
    };
    Ok(renderer)
}
