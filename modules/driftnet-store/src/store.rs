use async_trait::async_trait;
use driftnet_common::{RecordId, WebPage};

use crate::error::{StoreError, StoreResult};
use crate::query::Query;

/// Document persistence for web pages, partitioned into named indexes.
///
/// Every backend offers the same contract; which one a process talks to is
/// decided once, at startup, by [`open_store`](crate::open_store).
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Side-effect free presence check.
    async fn exists(&self, index: &str, id: &RecordId) -> StoreResult<bool>;

    /// Persist a page under its id, replacing whatever was stored there.
    async fn save(&self, index: &str, page: &WebPage) -> StoreResult<()>;

    async fn get(&self, index: &str, id: &RecordId) -> StoreResult<Option<WebPage>>;

    /// Returns whether a record was removed.
    async fn delete(&self, index: &str, id: &RecordId) -> StoreResult<bool>;

    /// Ids in the index, sorted.
    async fn list(&self, index: &str) -> StoreResult<Vec<RecordId>>;

    async fn count(&self, index: &str) -> StoreResult<usize> {
        Ok(self.list(index).await?.len())
    }

    async fn get_all(&self, index: &str) -> StoreResult<Vec<WebPage>> {
        let mut pages = Vec::new();
        for id in self.list(index).await? {
            if let Some(page) = self.get(index, &id).await? {
                pages.push(page);
            }
        }
        Ok(pages)
    }

    /// Field-qualified search, e.g. `domain:nytimes.com text:covid`. All terms must match.
    async fn search_bar(&self, index: &str, query: &str) -> StoreResult<Vec<WebPage>> {
        let query = Query::parse(query)?;
        Ok(self
            .get_all(index)
            .await?
            .into_iter()
            .filter(|p| query.matches(p))
            .collect())
    }

    /// Pages where any term matches any searchable field.
    async fn search_any(&self, index: &str, text: &str) -> StoreResult<Vec<WebPage>> {
        let query = Query::parse_any(text)?;
        Ok(self
            .get_all(index)
            .await?
            .into_iter()
            .filter(|p| query.matches(p))
            .collect())
    }

    fn name(&self) -> &str;
}

/// Index names become directory names and SQL values; keep them boring.
pub fn validate_index(index: &str) -> StoreResult<()> {
    let ok = !index.is_empty()
        && index
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if ok {
        Ok(())
    } else {
        Err(StoreError::InvalidIndex(index.to_string()))
    }
}
