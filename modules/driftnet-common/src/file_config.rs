use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::error::RecordResult;
use crate::geo::GeoPoint;

/// TOML batch definition: which pages go into which index, and how.
/// Secrets (DB URL, Browserless token) stay as env vars.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IngestConfig {
    pub index: String,
    pub pages: Vec<String>,
    #[serde(default)]
    pub timestamp: TimestampStrategy,
    #[serde(default)]
    pub store: StoreSection,
    #[serde(default)]
    pub render: RenderSection,
    /// label → keywords that trigger it.
    #[serde(default)]
    pub labels: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub geo: GeoSection,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimestampStrategy {
    /// Time the page was fetched.
    #[default]
    Fetch,
    /// Publication time from page metadata, falling back to fetch time.
    Published,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreSection {
    #[serde(default)]
    pub backend: StoreKind,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    #[default]
    File,
    Postgres,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RenderSection {
    #[serde(default)]
    pub backend: RenderBackend,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// CSS selector Browserless waits for before returning content.
    #[serde(default)]
    pub wait_for: Option<String>,
    /// Navigation event Browserless waits for.
    #[serde(default)]
    pub wait_until: NavigationWait,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NavigationWait {
    #[default]
    Load,
    DomContentLoaded,
    NetworkIdle,
}

impl Default for RenderSection {
    fn default() -> Self {
        Self {
            backend: RenderBackend::default(),
            timeout_secs: default_timeout_secs(),
            wait_for: None,
            wait_until: NavigationWait::default(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderBackend {
    #[default]
    Chrome,
    Browserless,
    Http,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GeoSection {
    /// Points attached to every page, in any string form `GeoPoint` parses.
    #[serde(default)]
    pub points: Vec<String>,
}

impl IngestConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).context("Failed to parse ingest config")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.index.is_empty()
            || !self
                .index
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            bail!("index must be non-empty and contain only [A-Za-z0-9_-]: {:?}", self.index);
        }
        if self.render.timeout_secs == 0 {
            bail!("render.timeout_secs must be positive");
        }
        self.fixed_locations()
            .context("geo.points contains an invalid point")?;
        Ok(())
    }

    pub fn fixed_locations(&self) -> RecordResult<Vec<GeoPoint>> {
        self.geo.points.iter().map(|p| p.parse()).collect()
    }
}

/// Load and parse a TOML ingest config file.
pub fn load_config(path: &Path) -> Result<IngestConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    IngestConfig::from_toml_str(&content)
        .with_context(|| format!("Invalid config file: {}", path.display()))
}
