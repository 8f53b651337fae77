//! Remote sync adapter.
//!
//! [`RemoteSync`] wraps a [`RecordStore`] and a [`PortBackend`] and only
//! lets a mutation reach the store after the backend has accepted it. A
//! rejected or failed request leaves the store exactly as it was; nothing
//! is retried automatically.
//!
//! Bulk imports are the exception: imported rows are merged locally first,
//! then forwarded concurrently. Forwarding failures are collected into the
//! import summary and never roll back the merge.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use tracing::{debug, error, info, warn};

use crate::config::SyncConfig;
use crate::error::AppError;
use crate::models::{NewPortRecord, PortId, PortRecord};
use crate::ports::{Notification, NotificationPort};
use crate::registry::PortRegistry;
use crate::store::{RecordStore, Snapshot};
use crate::sync::{ForwardFailure, ForwardOutcome, ImportSummary};
use crate::validation::validate;

/// Remote authoritative copy of the registry.
///
/// Implementations translate between the local schema and their wire
/// format and turn every kind of failure (transport, HTTP status, explicit
/// failure flag) into an `Err`.
#[async_trait]
pub trait PortBackend: Send + Sync {
    /// Fetches the complete remote collection.
    async fn fetch_all(&self) -> Result<Vec<PortRecord>, AppError>;

    /// Creates `record` remotely, keyed by its local id.
    ///
    /// Returns the record as stored by the backend when the response
    /// carries one; its id is authoritative.
    async fn create(&self, record: &PortRecord) -> Result<Option<PortRecord>, AppError>;

    /// Replaces the remote record with the same id.
    async fn update(&self, record: &PortRecord) -> Result<Option<PortRecord>, AppError>;

    async fn delete(&self, id: PortId) -> Result<(), AppError>;
}

#[async_trait]
impl<T: PortBackend + ?Sized> PortBackend for Arc<T> {
    async fn fetch_all(&self) -> Result<Vec<PortRecord>, AppError> {
        (**self).fetch_all().await
    }

    async fn create(&self, record: &PortRecord) -> Result<Option<PortRecord>, AppError> {
        (**self).create(record).await
    }

    async fn update(&self, record: &PortRecord) -> Result<Option<PortRecord>, AppError> {
        (**self).update(record).await
    }

    async fn delete(&self, id: PortId) -> Result<(), AppError> {
        (**self).delete(id).await
    }
}

/// Keeps a local store eventually consistent with a backend.
pub struct RemoteSync<B> {
    store: Arc<RecordStore>,
    backend: B,
    notifier: Arc<dyn NotificationPort>,
    concurrency: usize,
    initialized: AtomicBool,
    attached: AtomicBool,
}

impl<B: PortBackend> RemoteSync<B> {
    pub fn new(
        store: Arc<RecordStore>,
        backend: B,
        notifier: Arc<dyn NotificationPort>,
        config: &SyncConfig,
    ) -> Self {
        Self {
            store,
            backend,
            notifier,
            concurrency: config.forward_concurrency.max(1),
            initialized: AtomicBool::new(false),
            attached: AtomicBool::new(true),
        }
    }

    /// The local store mirrored by this adapter.
    pub fn store(&self) -> &Arc<RecordStore> {
        &self.store
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// Loads the remote collection and replaces the local one with it.
    ///
    /// One-shot: once a load has succeeded, further calls return the
    /// current size without contacting the backend. A failed load is
    /// reported and leaves the local collection untouched; calling again
    /// is an explicit user retry.
    pub async fn initialize(&self) -> Result<usize, AppError> {
        if self.is_initialized() {
            debug!("remote collection already loaded");
            return Ok(self.store.len());
        }

        info!("Loading port records from backend...");
        let records = match self.backend.fetch_all().await {
            Ok(records) => records,
            Err(e) => {
                error!("Initial load failed: {}", e);
                self.notifier
                    .notify(Notification::error("Could not load ports", e.user_message()));
                return Err(e);
            }
        };
        self.ensure_attached()?;

        let count = records.len();
        if let Err(e) = self.store.replace_all(records) {
            error!("Backend listing rejected: {}", e);
            self.notifier
                .notify(Notification::error("Could not load ports", e.user_message()));
            return Err(e);
        }
        self.initialized.store(true, Ordering::Release);
        info!("Loaded {} port records", count);
        Ok(count)
    }

    /// Stops applying responses to the store.
    ///
    /// Requests already in flight still complete, but their results are
    /// dropped.
    pub fn detach(&self) {
        self.attached.store(false, Ordering::Release);
    }

    pub fn is_attached(&self) -> bool {
        self.attached.load(Ordering::Acquire)
    }

    fn ensure_attached(&self) -> Result<(), AppError> {
        if self.is_attached() {
            Ok(())
        } else {
            debug!("dropping late backend response");
            Err(AppError::Detached)
        }
    }

    async fn forward(&self, summary: &mut ImportSummary) -> Result<(), AppError> {
        let backend = &self.backend;
        let results: Vec<_> = stream::iter(summary.merged.clone())
            .map(|record| async move {
                let result = backend.create(&record).await;
                (record, result)
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;
        self.ensure_attached()?;

        let mut adopted = Vec::new();
        for (record, result) in results {
            match result {
                Ok(Some(confirmed)) if confirmed.id != record.id => adopted.push((record, confirmed.id)),
                Ok(_) => summary.record(ForwardOutcome::Confirmed),
                Err(e) => {
                    warn!(id = record.id, "forwarding failed: {}", e);
                    summary.record_failure(ForwardFailure {
                        id: record.id,
                        port_number: record.port_number,
                        error: e.to_string(),
                    });
                }
            }
        }

        // Backend ids may overlap the local ones being replaced, so they move together
        let pairs: Vec<(PortId, PortId)> = adopted.iter().map(|(record, new)| (record.id, *new)).collect();
        let outcomes = self.store.rekey_all(&pairs);
        let mut moved = HashMap::new();
        for ((record, new), outcome) in adopted.into_iter().zip(outcomes) {
            match outcome {
                Ok(()) => {
                    moved.insert(record.id, new);
                    summary.record(ForwardOutcome::Rekeyed);
                }
                Err(e) => {
                    warn!(local = record.id, remote = new, "cannot adopt backend id: {}", e);
                    summary.record_failure(ForwardFailure {
                        id: record.id,
                        port_number: record.port_number,
                        error: format!("saved remotely as #{} but {}", new, e),
                    });
                }
            }
        }
        for entry in &mut summary.merged {
            if let Some(&new) = moved.get(&entry.id) {
                entry.id = new;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl<B: PortBackend> PortRegistry for RemoteSync<B> {
    fn snapshot(&self) -> Snapshot {
        self.store.snapshot()
    }

    fn get(&self, id: PortId) -> Option<PortRecord> {
        self.store.get(id)
    }

    async fn create(&self, record: NewPortRecord) -> Result<PortRecord, AppError> {
        validate(&record).map_err(AppError::Validation)?;
        let proposed = record.with_id(self.store.next_id());

        let confirmed = self.backend.create(&proposed).await?;
        self.ensure_attached()?;

        let stored = confirmed.unwrap_or(proposed);
        if let Err(e) = self.store.insert(stored.clone()) {
            warn!(id = stored.id, "backend confirmed an id already held locally: {}", e);
            return Err(e);
        }
        info!(id = stored.id, "created port {}", stored.port_number);
        Ok(stored)
    }

    async fn update(&self, record: PortRecord) -> Result<(), AppError> {
        validate(&record.to_new()).map_err(AppError::Validation)?;
        if !self.store.contains(record.id) {
            return Err(AppError::NotFound(record.id));
        }

        let confirmed = self.backend.update(&record).await?;
        self.ensure_attached()?;

        let stored = match confirmed {
            Some(c) if c.id == record.id => c,
            _ => record,
        };
        let id = stored.id;
        self.store.update(stored)?;
        info!(id, "updated port record");
        Ok(())
    }

    async fn remove(&self, id: PortId) -> Result<(), AppError> {
        if !self.store.contains(id) {
            return Err(AppError::NotFound(id));
        }

        self.backend.delete(id).await?;
        self.ensure_attached()?;

        match self.store.remove(id) {
            Ok(_) | Err(AppError::NotFound(_)) => {
                info!(id, "deleted port record");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn import(&self, candidates: Vec<NewPortRecord>) -> Result<ImportSummary, AppError> {
        let merged = self.store.merge(candidates);
        let mut summary = ImportSummary::forwarded(merged);
        if summary.merged.is_empty() {
            return Ok(summary);
        }

        info!(
            "Forwarding {} imported records (concurrency {})",
            summary.merged_count(),
            self.concurrency
        );
        self.forward(&mut summary).await?;
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{NotificationLevel, NotificationLog};
    use crate::reconcile::{import_rows, Row};
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    /// In-memory backend with switchable failures.
    #[derive(Default)]
    struct FakeBackend {
        rows: Mutex<Vec<PortRecord>>,
        fetches: AtomicUsize,
        fail_all: AtomicBool,
        /// Port numbers the backend refuses to create
        reject_ports: Mutex<Vec<String>>,
        /// Backend-assigned ids start here when set
        assign_from: Mutex<Option<PortId>>,
    }

    impl FakeBackend {
        fn with_rows(rows: Vec<PortRecord>) -> Self {
            Self {
                rows: Mutex::new(rows),
                ..Self::default()
            }
        }

        fn failing() -> Self {
            let backend = Self::default();
            backend.fail_all.store(true, Ordering::SeqCst);
            backend
        }

        fn check(&self) -> Result<(), AppError> {
            if self.fail_all.load(Ordering::SeqCst) {
                Err(AppError::Transport("success: false".to_string()))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl PortBackend for FakeBackend {
        async fn fetch_all(&self) -> Result<Vec<PortRecord>, AppError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            self.check()?;
            Ok(self.rows.lock().unwrap().clone())
        }

        async fn create(&self, record: &PortRecord) -> Result<Option<PortRecord>, AppError> {
            self.check()?;
            if self.reject_ports.lock().unwrap().contains(&record.port_number) {
                return Err(AppError::Transport(format!("port {} rejected", record.port_number)));
            }
            let mut stored = record.clone();
            if let Some(next) = self.assign_from.lock().unwrap().as_mut() {
                stored.id = *next;
                *next += 1;
            }
            self.rows.lock().unwrap().push(stored.clone());
            Ok(Some(stored))
        }

        async fn update(&self, _record: &PortRecord) -> Result<Option<PortRecord>, AppError> {
            self.check()?;
            Ok(None)
        }

        async fn delete(&self, id: PortId) -> Result<(), AppError> {
            self.check()?;
            self.rows.lock().unwrap().retain(|r| r.id != id);
            Ok(())
        }
    }

    fn adapter(backend: FakeBackend) -> (RemoteSync<Arc<FakeBackend>>, Arc<FakeBackend>, Arc<NotificationLog>) {
        let backend = Arc::new(backend);
        let log = Arc::new(NotificationLog::new());
        let sync = RemoteSync::new(
            Arc::new(RecordStore::new()),
            Arc::clone(&backend),
            log.clone(),
            &SyncConfig::default(),
        );
        (sync, backend, log)
    }

    fn record(id: PortId, port: &str) -> PortRecord {
        NewPortRecord::new(port, "Proj", "App", "").with_id(id)
    }

    #[tokio::test]
    async fn test_initialize_replaces_local_state_once() {
        let (sync, backend, _log) = adapter(FakeBackend::with_rows(vec![record(10, "80"), record(11, "443")]));
        sync.store().merge(vec![NewPortRecord::new("1", "Local", "Only", "")]);

        assert_eq!(sync.initialize().await.unwrap(), 2);
        let ids: Vec<PortId> = sync.snapshot().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![10, 11]);

        sync.initialize().await.unwrap();
        assert_eq!(backend.fetches.load(Ordering::SeqCst), 1);
        assert_eq!(sync.store().next_id(), 12);
    }

    #[tokio::test]
    async fn test_initialize_failure_notifies_and_keeps_state() {
        let (sync, _backend, log) = adapter(FakeBackend::failing());
        sync.store().merge(vec![NewPortRecord::new("1", "Local", "Only", "")]);

        assert!(sync.initialize().await.is_err());
        assert_eq!(sync.store().len(), 1);
        assert!(!sync.is_initialized());
        let notes = log.drain();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].level, NotificationLevel::Error);
    }

    #[tokio::test]
    async fn test_create_failure_leaves_no_local_record() {
        let (sync, _backend, _log) = adapter(FakeBackend::failing());
        let err = sync
            .create(NewPortRecord::new("8080", "Alpha", "Web", ""))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Transport(_)));
        assert!(sync.snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_create_invalid_never_reaches_backend() {
        let (sync, backend, _log) = adapter(FakeBackend::default());
        let err = sync.create(NewPortRecord::default()).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(backend.rows.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_adopts_backend_id() {
        let backend = FakeBackend::default();
        *backend.assign_from.lock().unwrap() = Some(500);
        let (sync, _backend, _log) = adapter(backend);

        let created = sync
            .create(NewPortRecord::new("8080", "Alpha", "Web", ""))
            .await
            .unwrap();
        assert_eq!(created.id, 500);
        assert_eq!(sync.store().get(500), Some(created));
    }

    #[tokio::test]
    async fn test_update_and_remove_failures_keep_state() {
        let (sync, backend, _log) = adapter(FakeBackend::with_rows(vec![record(1, "80")]));
        sync.initialize().await.unwrap();
        backend.fail_all.store(true, Ordering::SeqCst);

        let before = sync.snapshot();
        assert!(sync.update(record(1, "8080")).await.is_err());
        assert!(sync.remove(1).await.is_err());
        assert_eq!(*sync.snapshot(), *before);
    }

    #[tokio::test]
    async fn test_update_missing_id_is_not_found() {
        let (sync, _backend, _log) = adapter(FakeBackend::default());
        assert!(matches!(
            sync.update(record(42, "80")).await,
            Err(AppError::NotFound(42))
        ));
    }

    #[tokio::test]
    async fn test_remove_mirrors_backend() {
        let (sync, backend, _log) = adapter(FakeBackend::with_rows(vec![record(1, "80"), record(2, "81")]));
        sync.initialize().await.unwrap();

        sync.remove(1).await.unwrap();
        assert!(!sync.store().contains(1));
        assert_eq!(backend.rows.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_import_forwards_and_aggregates_failures() {
        let backend = FakeBackend::default();
        backend.reject_ports.lock().unwrap().push("7001".to_string());
        let (sync, backend, _log) = adapter(backend);

        let candidates = (0..5)
            .map(|i| NewPortRecord::new(format!("{}", 7000 + i), "Bulk", "Import", ""))
            .collect();
        let summary = sync.import(candidates).await.unwrap();

        assert_eq!(summary.merged_count(), 5);
        assert_eq!(summary.failed_count(), 1);
        assert_eq!(summary.failures[0].port_number, "7001");
        assert_eq!(sync.store().len(), 5);
        assert_eq!(backend.rows.lock().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_import_adopts_backend_ids() {
        let backend = FakeBackend::default();
        *backend.assign_from.lock().unwrap() = Some(100);
        let (sync, _backend, _log) = adapter(backend);

        let summary = sync
            .import(vec![NewPortRecord::new("1", "A", "B", ""), NewPortRecord::new("2", "A", "B", "")])
            .await
            .unwrap();
        assert_eq!(summary.forward.as_ref().unwrap().rekeyed, 2);
        let mut ids: Vec<PortId> = sync.snapshot().iter().map(|r| r.id).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![100, 101]);

        let mut reported: Vec<PortId> = summary.merged.iter().map(|r| r.id).collect();
        reported.sort_unstable();
        assert_eq!(reported, ids);
    }

    #[tokio::test]
    async fn test_import_adopts_ids_overlapping_local_ones() {
        // Backend numbering starts one past the first local id, so the
        // adopted ids collide with ids that are themselves moving
        let backend = FakeBackend::default();
        *backend.assign_from.lock().unwrap() = Some(2);
        let (sync, _backend, _log) = adapter(backend);

        let summary = sync
            .import(vec![NewPortRecord::new("1", "A", "B", ""), NewPortRecord::new("2", "A", "B", "")])
            .await
            .unwrap();
        assert_eq!(summary.failed_count(), 0);
        assert!(summary.is_clean());

        let mut ids: Vec<PortId> = sync.snapshot().iter().map(|r| r.id).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![2, 3]);

        let mut reported: Vec<PortId> = summary.merged.iter().map(|r| r.id).collect();
        reported.sort_unstable();
        assert_eq!(reported, ids);
    }

    #[tokio::test]
    async fn test_create_refuses_backend_id_held_locally() {
        let backend = FakeBackend::with_rows(vec![record(5, "80"), record(6, "81")]);
        *backend.assign_from.lock().unwrap() = Some(5);
        let (sync, _backend, _log) = adapter(backend);
        sync.initialize().await.unwrap();

        let err = sync
            .create(NewPortRecord::new("8080", "Alpha", "Web", ""))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DuplicateId(5)));
        assert_eq!(sync.store().len(), 2);
        assert_eq!(sync.store().get(5), Some(record(5, "80")));
    }

    #[tokio::test]
    async fn test_import_rows_reports_forwarding_failures_once() {
        let backend = FakeBackend::default();
        backend.reject_ports.lock().unwrap().push("7001".to_string());
        let (sync, _backend, log) = adapter(backend);

        let rows: Vec<Row> = ["7000", "7001", "7002"]
            .iter()
            .map(|port| {
                match serde_json::json!({"Port No": port, "Proje Adı": "Bulk", "Uygulama Adı": "Import"}) {
                    serde_json::Value::Object(row) => row,
                    _ => unreachable!(),
                }
            })
            .collect();
        let summary = import_rows(&sync, &rows, log.as_ref()).await.unwrap();
        assert_eq!(summary.failed_count(), 1);

        let notes = log.drain();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].level, NotificationLevel::Warn);
        assert_eq!(notes[0].summary, "Import partially saved");
        assert!(notes[0].detail.contains("port 7001"));
    }

    #[tokio::test]
    async fn test_detached_adapter_ignores_responses() {
        let (sync, _backend, _log) = adapter(FakeBackend::default());
        sync.detach();
        let err = sync
            .create(NewPortRecord::new("8080", "Alpha", "Web", ""))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Detached));
        assert!(sync.snapshot().is_empty());
    }
}
