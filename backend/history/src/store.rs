use std::collections::HashMap;

use async_trait::async_trait;
use sanjeevani_core::{ScanError, ScanId, ScanRecord};
use serde::Serialize;
use tokio::sync::RwLock;

/// Most records returned by one history listing.
pub const HISTORY_PAGE_LIMIT: usize = 50;

/// Result of a delete. A second delete of the same id reports `NotFound`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteOutcome {
    Deleted,
    NotFound,
}

impl DeleteOutcome {
    pub fn from_rows(rows: usize) -> Self {
        if rows > 0 {
            Self::Deleted
        } else {
            Self::NotFound
        }
    }
}

/// Storage for completed scans, keyed by scan id.
///
/// Operations on distinct ids need no coordination from callers.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn create(&self, record: &ScanRecord) -> Result<(), ScanError>;

    /// Records owned by `owner_id`, newest first.
    async fn get_by_owner(&self, owner_id: &str, limit: usize) -> Result<Vec<ScanRecord>, ScanError>;

    async fn get_by_id(&self, id: ScanId) -> Result<Option<ScanRecord>, ScanError>;

    async fn delete_by_id(&self, id: ScanId) -> Result<DeleteOutcome, ScanError>;

    /// Delete `id` only if `owner_id` owns it.
    async fn delete_owned(&self, owner_id: &str, id: ScanId) -> Result<DeleteOutcome, ScanError>;

    /// Remove every record of an owner. Returns how many went.
    async fn delete_by_owner(&self, owner_id: &str) -> Result<usize, ScanError>;
}

/// Process-lifetime store, for tests and `:memory:` deployments.
#[derive(Default)]
pub struct InMemoryHistoryStore {
    records: RwLock<HashMap<ScanId, ScanRecord>>,
}

impl InMemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistoryStore {
    async fn create(&self, record: &ScanRecord) -> Result<(), ScanError> {
        self.records.write().await.insert(record.id, record.clone());
        Ok(())
    }

    async fn get_by_owner(&self, owner_id: &str, limit: usize) -> Result<Vec<ScanRecord>, ScanError> {
        let records = self.records.read().await;
        let mut owned: Vec<ScanRecord> = records
            .values()
            .filter(|r| r.owner_id.as_deref() == Some(owner_id))
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        owned.truncate(limit);
        Ok(owned)
    }

    async fn get_by_id(&self, id: ScanId) -> Result<Option<ScanRecord>, ScanError> {
        Ok(self.records.read().await.get(&id).cloned())
    }

    async fn delete_by_id(&self, id: ScanId) -> Result<DeleteOutcome, ScanError> {
        let removed = self.records.write().await.remove(&id);
        Ok(DeleteOutcome::from_rows(removed.is_some() as usize))
    }

    async fn delete_owned(&self, owner_id: &str, id: ScanId) -> Result<DeleteOutcome, ScanError> {
        let mut records = self.records.write().await;
        let owned = records
            .get(&id)
            .is_some_and(|r| r.owner_id.as_deref() == Some(owner_id));
        if owned {
            records.remove(&id);
        }
        Ok(DeleteOutcome::from_rows(owned as usize))
    }

    async fn delete_by_owner(&self, owner_id: &str) -> Result<usize, ScanError> {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|_, r| r.owner_id.as_deref() != Some(owner_id));
        Ok(before - records.len())
    }
}
