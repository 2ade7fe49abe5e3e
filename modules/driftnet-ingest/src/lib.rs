pub mod error;
pub mod extract;
#[cfg(any(test, feature = "test-support"))]
pub mod fixtures;
pub mod ingest;
pub mod renderers;
pub mod report;
pub mod strategies;

pub use error::{ExtractError, ExtractResult, FetchError, FetchResult, IngestError, IngestResult};
pub use extract::{extract_body_text, Extracted, Extractor, PageContent};
pub use ingest::Ingestor;
pub use renderers::{
    build_renderer, check_url, BrowserlessRenderer, ChromeRenderer, HttpRenderer, PageRenderer,
    RenderSession,
};
pub use report::{BatchReport, KeyOutcome, KeyReport, Stage};
pub use strategies::{
    published_at, FetchTime, FixedLocations, Geotagger, KeywordLabeler, Labeler, NoLabels,
    NoLocations, PublishedTime, Timestamper,
};
