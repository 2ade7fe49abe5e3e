//! Pluggable labeling, geotagging and timestamping.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use driftnet_common::{parse_timestamp, GeoPoint};
use regex::Regex;
use scraper::{Html, Selector};

use crate::extract::PageContent;

#[async_trait]
pub trait Labeler: Send + Sync {
    async fn labels(&self, page: &PageContent<'_>) -> Result<Vec<String>>;
}

#[async_trait]
pub trait Geotagger: Send + Sync {
    async fn locations(&self, page: &PageContent<'_>) -> Result<Vec<GeoPoint>>;
}

#[async_trait]
pub trait Timestamper: Send + Sync {
    async fn captured_at(&self, page: &PageContent<'_>) -> Result<DateTime<Utc>>;
}

// --- Labels ---

pub struct NoLabels;

#[async_trait]
impl Labeler for NoLabels {
    async fn labels(&self, _page: &PageContent<'_>) -> Result<Vec<String>> {
        Ok(Vec::new())
    }
}

/// Applies a label when any of its keywords appears in the body text, ignoring
/// case, with no word character directly before or after it. Keywords that
/// start or end in punctuation (`c++`, `.net`) match too. Output is sorted by label.
pub struct KeywordLabeler {
    rules: Vec<(String, Regex)>,
}

impl KeywordLabeler {
    pub fn new(labels: &BTreeMap<String, Vec<String>>) -> Result<Self> {
        let mut rules = Vec::with_capacity(labels.len());
        for (label, keywords) in labels {
            if keywords.iter().any(|k| k.trim().is_empty()) {
                bail!("label {label:?} has an empty keyword");
            }
            if keywords.is_empty() {
                continue;
            }
            let alternation = keywords
                .iter()
                .map(|k| regex::escape(k.trim()))
                .collect::<Vec<_>>()
                .join("|");
            let re = Regex::new(&format!(r"(?i)(?:^|\W)(?:{alternation})(?:\W|$)"))
                .with_context(|| format!("invalid keywords for label {label:?}"))?;
            rules.push((label.clone(), re));
        }
        Ok(Self { rules })
    }
}

#[async_trait]
impl Labeler for KeywordLabeler {
    async fn labels(&self, page: &PageContent<'_>) -> Result<Vec<String>> {
        Ok(self
            .rules
            .iter()
            .filter(|(_, re)| re.is_match(page.text))
            .map(|(label, _)| label.clone())
            .collect())
    }
}

// --- Locations ---

pub struct NoLocations;

#[async_trait]
impl Geotagger for NoLocations {
    async fn locations(&self, _page: &PageContent<'_>) -> Result<Vec<GeoPoint>> {
        Ok(Vec::new())
    }
}

/// Same points on every page, e.g. a batch scoped to one city.
pub struct FixedLocations {
    points: Vec<GeoPoint>,
}

impl FixedLocations {
    pub fn new(points: Vec<GeoPoint>) -> Self {
        Self { points }
    }
}

#[async_trait]
impl Geotagger for FixedLocations {
    async fn locations(&self, _page: &PageContent<'_>) -> Result<Vec<GeoPoint>> {
        Ok(self.points.clone())
    }
}

// --- Timestamps ---

pub struct FetchTime;

#[async_trait]
impl Timestamper for FetchTime {
    async fn captured_at(&self, page: &PageContent<'_>) -> Result<DateTime<Utc>> {
        Ok(page.fetched_at)
    }
}

/// Publication time from page metadata, or fetch time when the page has none.
pub struct PublishedTime;

static PUBLISHED_SELECTORS: LazyLock<Vec<(Selector, &'static str)>> = LazyLock::new(|| {
    [
        (r#"meta[property="article:published_time"]"#, "content"),
        (r#"meta[property="og:published_time"]"#, "content"),
        (r#"meta[name="article:published_time"]"#, "content"),
        ("time[datetime]", "datetime"),
    ]
    .into_iter()
    .map(|(css, attr)| (Selector::parse(css).expect("valid selector"), attr))
    .collect()
});

/// First parseable publication timestamp in the markup.
pub fn published_at(html: &str) -> Option<DateTime<Utc>> {
    let document = Html::parse_document(html);
    PUBLISHED_SELECTORS.iter().find_map(|(selector, attr)| {
        document
            .select(selector)
            .filter_map(|el| el.value().attr(attr))
            .find_map(|raw| parse_timestamp(raw).ok())
    })
}

#[async_trait]
impl Timestamper for PublishedTime {
    async fn captured_at(&self, page: &PageContent<'_>) -> Result<DateTime<Utc>> {
        Ok(published_at(page.html).unwrap_or(page.fetched_at))
    }
}
