//! In-memory store for tests. Counts saves and can be switched into an
//! unavailable state to exercise fatal-error paths.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use driftnet_common::{RecordId, WebPage};
use tokio::sync::RwLock;

use crate::error::{StoreError, StoreResult};
use crate::store::{validate_index, RecordStore};

#[derive(Default)]
pub struct MemoryStore {
    indices: RwLock<HashMap<String, BTreeMap<RecordId, WebPage>>>,
    unavailable: AtomicBool,
    saves: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a record without counting it as a save.
    pub async fn seed(&self, index: &str, page: WebPage) {
        self.indices
            .write()
            .await
            .entry(index.to_string())
            .or_default()
            .insert(page.id.clone(), page);
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    fn check(&self, index: &str) -> StoreResult<()> {
        validate_index(index)?;
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store switched off".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn exists(&self, index: &str, id: &RecordId) -> StoreResult<bool> {
        self.check(index)?;
        Ok(self
            .indices
            .read()
            .await
            .get(index)
            .is_some_and(|records| records.contains_key(id)))
    }

    async fn save(&self, index: &str, page: &WebPage) -> StoreResult<()> {
        self.check(index)?;
        self.saves.fetch_add(1, Ordering::SeqCst);
        self.indices
            .write()
            .await
            .entry(index.to_string())
            .or_default()
            .insert(page.id.clone(), page.clone());
        Ok(())
    }

    async fn get(&self, index: &str, id: &RecordId) -> StoreResult<Option<WebPage>> {
        self.check(index)?;
        Ok(self
            .indices
            .read()
            .await
            .get(index)
            .and_then(|records| records.get(id).cloned()))
    }

    async fn delete(&self, index: &str, id: &RecordId) -> StoreResult<bool> {
        self.check(index)?;
        Ok(self
            .indices
            .write()
            .await
            .get_mut(index)
            .is_some_and(|records| records.remove(id).is_some()))
    }

    async fn list(&self, index: &str) -> StoreResult<Vec<RecordId>> {
        self.check(index)?;
        Ok(self
            .indices
            .read()
            .await
            .get(index)
            .map(|records| records.keys().cloned().collect())
            .unwrap_or_default())
    }

    fn name(&self) -> &str {
        "memory"
    }
}
