//! The per-key ingestion loop: derive, check, fetch, extract, upsert.

use std::sync::Arc;

use chrono::Utc;
use driftnet_common::{RecordId, WebPage};
use driftnet_store::{validate_index, RecordStore};
use tracing::{info, info_span, warn, Instrument};

use crate::error::{IngestError, IngestResult};
use crate::extract::Extractor;
use crate::renderers::{PageRenderer, RenderSession};
use crate::report::{BatchReport, KeyOutcome, Stage};

pub struct Ingestor {
    store: Arc<dyn RecordStore>,
    renderer: Arc<dyn PageRenderer>,
    extractor: Extractor,
}

impl Ingestor {
    pub fn new(
        store: Arc<dyn RecordStore>,
        renderer: Arc<dyn PageRenderer>,
        extractor: Extractor,
    ) -> Self {
        Self {
            store,
            renderer,
            extractor,
        }
    }

    /// Ingest `keys` into `index`, in order. Keys already stored are skipped
    /// without being fetched, so re-running a batch is cheap and safe.
    ///
    /// Per-key fetch and extraction failures are recorded and the batch moves
    /// on. A bad index name is rejected before any work; a store failure
    /// aborts the batch. The render session, if one was
    /// opened, is closed before this returns either way.
    pub async fn run(&self, index: &str, keys: &[String]) -> IngestResult<BatchReport> {
        validate_index(index).map_err(IngestError::InvalidIndex)?;

        let span = info_span!(
            "ingest_batch",
            index,
            keys = keys.len(),
            store = self.store.name(),
            renderer = self.renderer.name()
        );

        async move {
            let mut session: Option<Box<dyn RenderSession>> = None;
            let mut report = BatchReport::default();

            let result = self.run_keys(index, keys, &mut session, &mut report).await;

            if let Some(mut session) = session {
                if let Err(e) = session.close().await {
                    warn!(error = %e, "Failed to close render session");
                }
            }

            match &result {
                Ok(()) => info!(
                    fetched = report.fetched,
                    stored = report.stored,
                    skipped = report.skipped,
                    failed = report.failed,
                    "Batch complete"
                ),
                Err(e) => warn!(
                    error = %e,
                    processed = report.keys.len(),
                    stored = report.stored,
                    "Batch aborted"
                ),
            }
            result.map(|()| report)
        }
        .instrument(span)
        .await
    }

    async fn run_keys(
        &self,
        index: &str,
        keys: &[String],
        session: &mut Option<Box<dyn RenderSession>>,
        report: &mut BatchReport,
    ) -> IngestResult<()> {
        for key in keys {
            let outcome = self.process_key(index, key, session, report).await?;
            report.record(key, outcome);
        }
        Ok(())
    }

    async fn process_key(
        &self,
        index: &str,
        key: &str,
        session: &mut Option<Box<dyn RenderSession>>,
        report: &mut BatchReport,
    ) -> IngestResult<KeyOutcome> {
        let id = match RecordId::derive(key) {
            Ok(id) => id,
            Err(e) => {
                warn!(key, error = %e, "Cannot derive id");
                return Ok(failed(Stage::Derive, e));
            }
        };

        let store_failed = |source| IngestError::StoreUnavailable {
            key: key.to_string(),
            source,
        };

        if self.store.exists(index, &id).await.map_err(store_failed)? {
            info!(url = key, id = %id, "Already stored, skipping");
            return Ok(KeyOutcome::Skipped { id });
        }

        let session = match session {
            Some(session) => session,
            None => {
                let opened = self
                    .renderer
                    .open()
                    .await
                    .map_err(IngestError::RendererUnavailable)?;
                session.insert(opened)
            }
        };

        report.fetched += 1;
        let fetched_at = Utc::now();
        let html = match session.render(key).await {
            Ok(html) => html,
            Err(e) => {
                warn!(url = key, error = %e, "Fetch failed");
                return Ok(failed(Stage::Fetch, e));
            }
        };

        let extracted = match self.extractor.extract(key, html, fetched_at).await {
            Ok(extracted) => extracted,
            Err(e) => {
                warn!(url = key, error = %e, "Extraction failed");
                return Ok(failed(Stage::Extract, e));
            }
        };

        let page = WebPage::builder()
            .id(id.clone())
            .url(key)
            .domain(extracted.domain)
            .text(extracted.text)
            .html(extracted.html)
            .labels(extracted.labels)
            .captured_at(extracted.captured_at)
            .geo(extracted.geo)
            .build();

        self.store.save(index, &page).await.map_err(store_failed)?;
        info!(url = key, id = %id, labels = page.labels.len(), "Stored page");
        Ok(KeyOutcome::Stored { id })
    }
}

fn failed(stage: Stage, err: impl std::fmt::Display) -> KeyOutcome {
    KeyOutcome::Failed {
        stage,
        reason: err.to_string(),
    }
}
