//! The mutation surface shared by the local store and the sync adapter.

use async_trait::async_trait;

use crate::error::AppError;
use crate::models::{NewPortRecord, PortId, PortRecord};
use crate::store::{RecordStore, Snapshot};
use crate::sync::ImportSummary;

/// Something that holds the canonical port collection and accepts
/// mutations.
///
/// Implemented by [`RecordStore`] for purely local sessions and by
/// [`crate::remote::RemoteSync`] when every mutation must first be accepted
/// by a backend. The workflow and the importer only see this trait.
#[async_trait]
pub trait PortRegistry: Send + Sync {
    /// The current collection.
    fn snapshot(&self) -> Snapshot;

    /// Looks up one record in the current collection.
    fn get(&self, id: PortId) -> Option<PortRecord> {
        self.snapshot().iter().find(|r| r.id == id).cloned()
    }

    async fn create(&self, record: NewPortRecord) -> Result<PortRecord, AppError>;

    async fn update(&self, record: PortRecord) -> Result<(), AppError>;

    async fn remove(&self, id: PortId) -> Result<(), AppError>;

    /// Merges unvalidated candidates and reports what happened.
    async fn import(&self, candidates: Vec<NewPortRecord>) -> Result<ImportSummary, AppError>;
}

#[async_trait]
impl PortRegistry for RecordStore {
    fn snapshot(&self) -> Snapshot {
        RecordStore::snapshot(self)
    }

    fn get(&self, id: PortId) -> Option<PortRecord> {
        RecordStore::get(self, id)
    }

    async fn create(&self, record: NewPortRecord) -> Result<PortRecord, AppError> {
        self.add(record)
    }

    async fn update(&self, record: PortRecord) -> Result<(), AppError> {
        RecordStore::update(self, record)
    }

    async fn remove(&self, id: PortId) -> Result<(), AppError> {
        RecordStore::remove(self, id).map(|_| ())
    }

    async fn import(&self, candidates: Vec<NewPortRecord>) -> Result<ImportSummary, AppError> {
        Ok(ImportSummary::local(self.merge(candidates)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_store_as_registry() {
        let store = RecordStore::new();
        let registry: &dyn PortRegistry = &store;

        let created = registry
            .create(NewPortRecord::new("8080", "Alpha", "Web", ""))
            .await
            .unwrap();
        assert_eq!(registry.get(created.id), Some(created.clone()));

        let summary = registry
            .import(vec![NewPortRecord::new("", "", "", "")])
            .await
            .unwrap();
        assert_eq!(summary.merged[0].id, 2);
        assert!(summary.forward.is_none());

        registry.remove(created.id).await.unwrap();
        assert!(matches!(
            registry.remove(created.id).await,
            Err(AppError::NotFound(1))
        ));
        assert_eq!(registry.snapshot().len(), 1);
    }
}
