// Filesystem-backed record store: one directory per index, one JSON file per record.

use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use driftnet_common::{RecordId, WebPage};
use tracing::{debug, warn};

use crate::error::{StoreError, StoreResult};
use crate::store::{validate_index, RecordStore};

/// Ids longer than this are split across nested directories so no single
/// path component exceeds common filesystem name limits.
const MAX_SEGMENT: usize = 200;

const EXTENSION: &str = ".json";
const TEMP_PREFIX: &str = ".tmp-";

pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn index_dir(&self, index: &str) -> StoreResult<PathBuf> {
        validate_index(index)?;
        Ok(self.root.join(index))
    }

    fn record_path(&self, index: &str, id: &RecordId) -> StoreResult<PathBuf> {
        let mut path = self.index_dir(index)?;
        let id = id.as_str();
        let mut rest = id;
        // Base64 is ASCII, so byte offsets are char boundaries.
        while rest.len() > MAX_SEGMENT {
            let (head, tail) = rest.split_at(MAX_SEGMENT);
            path.push(head);
            rest = tail;
        }
        path.push(format!("{rest}{EXTENSION}"));
        Ok(path)
    }

    async fn walk(&self, dir: PathBuf) -> StoreResult<Vec<RecordId>> {
        let mut ids = Vec::new();
        let mut pending = vec![(dir, String::new())];

        while let Some((dir, prefix)) = pending.pop() {
            let mut entries = match tokio::fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };

            while let Some(entry) = entries.next_entry().await? {
                let name = entry.file_name().to_string_lossy().into_owned();
                if name.starts_with(TEMP_PREFIX) {
                    continue;
                }
                if entry.file_type().await?.is_dir() {
                    pending.push((entry.path(), format!("{prefix}{name}")));
                } else if let Some(stem) = name.strip_suffix(EXTENSION) {
                    match RecordId::parse(&format!("{prefix}{stem}")) {
                        Ok(id) => ids.push(id),
                        Err(e) => warn!(path = %entry.path().display(), error = %e, "Skipping unrecognized file"),
                    }
                }
            }
        }

        ids.sort();
        Ok(ids)
    }
}

#[async_trait]
impl RecordStore for FileStore {
    async fn exists(&self, index: &str, id: &RecordId) -> StoreResult<bool> {
        let path = self.record_path(index, id)?;
        Ok(tokio::fs::try_exists(&path).await?)
    }

    async fn save(&self, index: &str, page: &WebPage) -> StoreResult<()> {
        let path = self.record_path(index, &page.id)?;
        let body = serde_json::to_vec_pretty(page).map_err(|e| StoreError::Corrupt {
            index: index.to_string(),
            id: page.id.to_string(),
            reason: e.to_string(),
        })?;

        // Write to a sibling temp file and rename so readers never see a torn record.
        tokio::task::spawn_blocking(move || -> std::io::Result<()> {
            let dir = path.parent().unwrap_or_else(|| Path::new("."));
            std::fs::create_dir_all(dir)?;
            let mut tmp = tempfile::Builder::new()
                .prefix(TEMP_PREFIX)
                .suffix(EXTENSION)
                .tempfile_in(dir)?;
            tmp.write_all(&body)?;
            tmp.as_file().sync_all()?;
            tmp.persist(&path).map_err(|e| e.error)?;
            Ok(())
        })
        .await
        .map_err(|e| StoreError::Unavailable(format!("save task failed: {e}")))??;

        debug!(index, id = %page.id, "Saved record to disk");
        Ok(())
    }

    async fn get(&self, index: &str, id: &RecordId) -> StoreResult<Option<WebPage>> {
        let path = self.record_path(index, id)?;
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let page = serde_json::from_slice(&bytes).map_err(|e| StoreError::Corrupt {
            index: index.to_string(),
            id: id.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Some(page))
    }

    async fn delete(&self, index: &str, id: &RecordId) -> StoreResult<bool> {
        let path = self.record_path(index, id)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn list(&self, index: &str) -> StoreResult<Vec<RecordId>> {
        let dir = self.index_dir(index)?;
        self.walk(dir).await
    }

    fn name(&self) -> &str {
        "file"
    }
}
