//! Fixture renderer for integration tests.
//!
//! `ScriptedRenderer` serves canned markup per URL, fails on demand, and
//! counts opens, closes and renders so tests can assert on browser usage.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::{FetchError, FetchResult};
use crate::renderers::{PageRenderer, RenderSession};

#[derive(Default)]
struct Script {
    pages: HashMap<String, String>,
    failing: HashSet<String>,
    fail_open: bool,
    opens: AtomicUsize,
    closes: AtomicUsize,
    rendered: Mutex<Vec<String>>,
}

#[derive(Clone, Default)]
pub struct ScriptedRenderer {
    script: Arc<Script>,
}

impl ScriptedRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    fn script_mut(&mut self) -> &mut Script {
        Arc::get_mut(&mut self.script).expect("configure ScriptedRenderer before sharing it")
    }

    pub fn with_page(mut self, url: &str, html: &str) -> Self {
        self.script_mut()
            .pages
            .insert(url.to_string(), html.to_string());
        self
    }

    /// Serve `<p>{text}</p>` for `url`.
    pub fn with_article(self, url: &str, text: &str) -> Self {
        let html = format!("<html><head><title>{url}</title></head><body><p>{text}</p></body></html>");
        self.with_page(url, &html)
    }

    pub fn failing_on(mut self, url: &str) -> Self {
        self.script_mut().failing.insert(url.to_string());
        self
    }

    /// Make `open` fail, as if the browser could not be launched.
    pub fn failing_open(mut self) -> Self {
        self.script_mut().fail_open = true;
        self
    }

    pub fn opens(&self) -> usize {
        self.script.opens.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.script.closes.load(Ordering::SeqCst)
    }

    pub fn renders(&self) -> usize {
        self.rendered_urls().len()
    }

    pub fn rendered_urls(&self) -> Vec<String> {
        self.script
            .rendered
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl PageRenderer for ScriptedRenderer {
    async fn open(&self) -> FetchResult<Box<dyn RenderSession>> {
        if self.script.fail_open {
            return Err(FetchError::Unavailable("scripted launch failure".to_string()));
        }
        self.script.opens.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ScriptedSession {
            script: Arc::clone(&self.script),
        }))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

struct ScriptedSession {
    script: Arc<Script>,
}

#[async_trait]
impl RenderSession for ScriptedSession {
    async fn render(&mut self, url: &str) -> FetchResult<String> {
        if let Ok(mut rendered) = self.script.rendered.lock() {
            rendered.push(url.to_string());
        }
        if self.script.failing.contains(url) {
            return Err(FetchError::Render {
                url: url.to_string(),
                reason: "scripted failure".to_string(),
            });
        }
        self.script
            .pages
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::Render {
                url: url.to_string(),
                reason: "no scripted page".to_string(),
            })
    }

    async fn close(&mut self) -> FetchResult<()> {
        self.script.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
