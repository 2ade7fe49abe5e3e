//! Field extraction from rendered markup.
//!
//! Domain and body text are fixed rules. Labels, locations and the capture
//! timestamp come from caller-supplied strategies in [`crate::strategies`].

use std::sync::{Arc, LazyLock};

use chrono::{DateTime, Utc};
use driftnet_common::{derive_domain, normalize_labels, GeoPoint, IngestConfig, TimestampStrategy};
use scraper::{Html, Selector};

use crate::error::{ExtractError, ExtractResult};
use crate::strategies::{
    FetchTime, FixedLocations, Geotagger, KeywordLabeler, Labeler, NoLabels, NoLocations,
    PublishedTime, Timestamper,
};

static PARAGRAPH: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("p").expect("valid selector"));

/// The stripped text of every `<p>`, one non-empty run per line, in document order.
pub fn extract_body_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut lines = Vec::new();
    for p in document.select(&PARAGRAPH) {
        for run in p.text() {
            let run = run.trim();
            if !run.is_empty() {
                lines.push(run);
            }
        }
    }
    lines.join("\n")
}

/// What strategies get to look at.
#[derive(Debug, Clone, Copy)]
pub struct PageContent<'a> {
    pub url: &'a str,
    pub html: &'a str,
    pub text: &'a str,
    pub fetched_at: DateTime<Utc>,
}

/// Everything the upsert step needs besides the id.
#[derive(Debug, Clone, PartialEq)]
pub struct Extracted {
    pub domain: String,
    pub text: String,
    pub html: String,
    pub labels: Vec<String>,
    pub geo: Vec<GeoPoint>,
    pub captured_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct Extractor {
    labeler: Arc<dyn Labeler>,
    geotagger: Arc<dyn Geotagger>,
    timestamper: Arc<dyn Timestamper>,
}

impl Default for Extractor {
    fn default() -> Self {
        Self {
            labeler: Arc::new(NoLabels),
            geotagger: Arc::new(NoLocations),
            timestamper: Arc::new(FetchTime),
        }
    }
}

impl Extractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_labeler(mut self, labeler: impl Labeler + 'static) -> Self {
        self.labeler = Arc::new(labeler);
        self
    }

    pub fn with_geotagger(mut self, geotagger: impl Geotagger + 'static) -> Self {
        self.geotagger = Arc::new(geotagger);
        self
    }

    pub fn with_timestamper(mut self, timestamper: impl Timestamper + 'static) -> Self {
        self.timestamper = Arc::new(timestamper);
        self
    }

    /// Strategies described by a batch file.
    pub fn from_config(config: &IngestConfig) -> anyhow::Result<Self> {
        let mut extractor = Self::new();
        if !config.labels.is_empty() {
            extractor = extractor.with_labeler(KeywordLabeler::new(&config.labels)?);
        }
        let points = config.fixed_locations()?;
        if !points.is_empty() {
            extractor = extractor.with_geotagger(FixedLocations::new(points));
        }
        if config.timestamp == TimestampStrategy::Published {
            extractor = extractor.with_timestamper(PublishedTime);
        }
        Ok(extractor)
    }

    pub async fn extract(
        &self,
        natural_key: &str,
        html: String,
        fetched_at: DateTime<Utc>,
    ) -> ExtractResult<Extracted> {
        let domain = derive_domain(natural_key)?;
        let text = extract_body_text(&html);

        let content = PageContent {
            url: natural_key,
            html: &html,
            text: &text,
            fetched_at,
        };

        let labels = self
            .labeler
            .labels(&content)
            .await
            .map_err(|source| ExtractError::Strategy {
                strategy: "labeler",
                source,
            })?;
        let geo = self
            .geotagger
            .locations(&content)
            .await
            .map_err(|source| ExtractError::Strategy {
                strategy: "geotagger",
                source,
            })?;
        let captured_at = self
            .timestamper
            .captured_at(&content)
            .await
            .map_err(|source| ExtractError::Strategy {
                strategy: "timestamper",
                source,
            })?;

        Ok(Extracted {
            domain,
            labels: normalize_labels(labels),
            geo,
            captured_at,
            text,
            html,
        })
    }
}
