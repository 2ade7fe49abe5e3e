// Headless Chromium renderer using --dump-dom.
//
// A session owns the checked binary and one profile directory (cache, cookies)
// for the whole batch. `--dump-dom` exits after one page, so each render is a
// short-lived process on that shared profile. For a browser that stays up
// between pages, use the Browserless backend.

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use tempfile::TempDir;
use tracing::{debug, info, warn};

use super::{check_url, PageRenderer, RenderSession};
use crate::error::{FetchError, FetchResult};

/// Max attempts for transient Chrome failures.
const CHROME_MAX_ATTEMPTS: u32 = 3;
/// Base backoff for retries. Actual delay is base * 3^attempt + jitter.
const CHROME_RETRY_BASE: Duration = Duration::from_secs(3);
const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

pub struct ChromeRenderer {
    chrome_bin: String,
    timeout: Duration,
}

impl ChromeRenderer {
    pub fn new(chrome_bin: &str, timeout: Duration) -> Self {
        Self {
            chrome_bin: chrome_bin.to_string(),
            timeout,
        }
    }
}

#[async_trait]
impl PageRenderer for ChromeRenderer {
    async fn open(&self) -> FetchResult<Box<dyn RenderSession>> {
        // Fail the batch up front if the binary cannot even start.
        let probe = tokio::time::timeout(
            PROBE_TIMEOUT,
            tokio::process::Command::new(&self.chrome_bin)
                .arg("--version")
                .output(),
        )
        .await;
        match probe {
            Ok(Ok(output)) if output.status.success() => {
                let version = String::from_utf8_lossy(&output.stdout);
                info!(chrome_bin = %self.chrome_bin, version = %version.trim(), "Chrome available");
            }
            Ok(Ok(output)) => {
                return Err(FetchError::Unavailable(format!(
                    "{} --version exited with {}",
                    self.chrome_bin, output.status
                )))
            }
            Ok(Err(e)) => {
                return Err(FetchError::Unavailable(format!(
                    "failed to launch {}: {e}",
                    self.chrome_bin
                )))
            }
            Err(_) => {
                return Err(FetchError::Unavailable(format!(
                    "{} --version timed out",
                    self.chrome_bin
                )))
            }
        }

        let profile = tempfile::Builder::new()
            .prefix("driftnet-chrome-")
            .tempdir()
            .map_err(|e| FetchError::Unavailable(format!("failed to create profile dir: {e}")))?;
        debug!(profile = %profile.path().display(), "Chrome session opened");

        Ok(Box::new(ChromeSession {
            chrome_bin: self.chrome_bin.clone(),
            timeout: self.timeout,
            profile: Some(profile),
        }))
    }

    fn name(&self) -> &str {
        "chrome"
    }
}

struct ChromeSession {
    chrome_bin: String,
    timeout: Duration,
    /// Dropped (and deleted) on close.
    profile: Option<TempDir>,
}

impl ChromeSession {
    /// Launch Chrome --dump-dom and return raw stdout bytes.
    async fn run_chrome(&self, url: &str) -> FetchResult<Vec<u8>> {
        let profile = self
            .profile
            .as_ref()
            .ok_or_else(|| FetchError::Unavailable("session already closed".to_string()))?;
        let user_data_dir = format!("--user-data-dir={}", profile.path().display());

        for attempt in 0..CHROME_MAX_ATTEMPTS {
            let last = attempt + 1 == CHROME_MAX_ATTEMPTS;
            let result = tokio::time::timeout(
                self.timeout,
                tokio::process::Command::new(&self.chrome_bin)
                    .args([
                        "--headless",
                        "--no-sandbox",
                        "--disable-gpu",
                        "--disable-dev-shm-usage",
                        &user_data_dir,
                        "--dump-dom",
                        url,
                    ])
                    .kill_on_drop(true)
                    .output(),
            )
            .await;

            match result {
                Ok(Ok(output)) if output.status.success() => {
                    if output.stdout.is_empty() && !last {
                        warn!(url, attempt = attempt + 1, "Chrome returned empty DOM, retrying");
                        retry_with_backoff(attempt).await;
                        continue;
                    }
                    return Ok(output.stdout);
                }
                Ok(Ok(output)) => {
                    let stderr = String::from_utf8_lossy(&output.stderr);
                    if is_transient_error(&stderr) && !last {
                        warn!(url, attempt = attempt + 1, "Chrome hit a transient error, retrying");
                        retry_with_backoff(attempt).await;
                        continue;
                    }
                    return Err(FetchError::Render {
                        url: url.to_string(),
                        reason: format!("chrome exited with {}: {}", output.status, stderr.trim()),
                    });
                }
                Ok(Err(e)) => {
                    if is_transient_error(&e.to_string()) && !last {
                        warn!(url, attempt = attempt + 1, error = %e, "Chrome launch failed, retrying");
                        retry_with_backoff(attempt).await;
                        continue;
                    }
                    return Err(FetchError::Render {
                        url: url.to_string(),
                        reason: format!("failed to run chrome: {e}"),
                    });
                }
                Err(_) => {
                    if !last {
                        warn!(url, attempt = attempt + 1, "Chrome timed out, retrying");
                        retry_with_backoff(attempt).await;
                        continue;
                    }
                    return Err(FetchError::Timeout {
                        url: url.to_string(),
                        secs: self.timeout.as_secs(),
                    });
                }
            }
        }

        Ok(Vec::new())
    }
}

#[async_trait]
impl RenderSession for ChromeSession {
    async fn render(&mut self, url: &str) -> FetchResult<String> {
        check_url(url)?;
        info!(url, renderer = "chrome", "Rendering page");

        let html_bytes = self.run_chrome(url).await?;
        if html_bytes.is_empty() {
            return Err(FetchError::EmptyDocument {
                url: url.to_string(),
            });
        }

        let html = String::from_utf8_lossy(&html_bytes).into_owned();
        info!(url, renderer = "chrome", bytes = html.len(), "Rendered successfully");
        Ok(html)
    }

    async fn close(&mut self) -> FetchResult<()> {
        if let Some(profile) = self.profile.take() {
            let path = profile.path().display().to_string();
            profile.close().map_err(|e| {
                FetchError::Unavailable(format!("failed to remove profile dir {path}: {e}"))
            })?;
            debug!(profile = %path, "Chrome session closed");
        }
        Ok(())
    }
}

fn is_transient_error(msg: &str) -> bool {
    msg.contains("Cannot fork") || msg.contains("Resource temporarily unavailable")
}

async fn retry_with_backoff(attempt: u32) {
    let backoff = CHROME_RETRY_BASE * 3u32.pow(attempt);
    let jitter = Duration::from_millis(rand::rng().random_range(0..1000));
    tokio::time::sleep(backoff + jitter).await;
}
