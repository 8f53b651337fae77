//! In-memory record store.
//!
//! The store owns the session's collection of port records. Every mutation
//! builds a new collection and publishes it as an immutable [`Snapshot`]
//! through a `tokio::sync::watch` channel, so observers never see a
//! half-applied change. A failed mutation publishes nothing.
//!
//! Ids are allocated sequentially: a new id is one more than the largest id
//! the store has ever held. Ids freed by a delete are not handed out again
//! within the same store.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::watch;
use tracing::debug;

use crate::error::AppError;
use crate::models::{NewPortRecord, PortId, PortRecord};
use crate::validation::validate;

/// Immutable view of the full collection at one point in time.
pub type Snapshot = Arc<Vec<PortRecord>>;

/// Single-writer owner of the port record collection.
///
/// # Examples
///
/// ```
/// use portreg_core::models::NewPortRecord;
/// use portreg_core::store::RecordStore;
///
/// let store = RecordStore::new();
/// let web = store.add(NewPortRecord::new("8080", "Alpha", "Web", "")).unwrap();
/// let api = store.add(NewPortRecord::new("9090", "Beta", "API", "")).unwrap();
/// assert_eq!((web.id, api.id), (1, 2));
///
/// store.remove(web.id).unwrap();
/// assert_eq!(store.len(), 1);
/// ```
pub struct RecordStore {
    tx: watch::Sender<Snapshot>,
    high_water: AtomicU64,
}

impl Default for RecordStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Arc::new(Vec::new()));
        Self {
            tx,
            high_water: AtomicU64::new(0),
        }
    }

    /// Creates a store pre-populated with records that already carry ids.
    ///
    /// # Errors
    ///
    /// Returns `AppError::DuplicateId` if two records share an id.
    pub fn with_records(records: Vec<PortRecord>) -> Result<Self, AppError> {
        ensure_unique(&records)?;
        let store = Self::new();
        store.bump(max_id(&records));
        store.tx.send_replace(Arc::new(records));
        Ok(store)
    }

    /// Returns the current snapshot.
    pub fn snapshot(&self) -> Snapshot {
        self.tx.borrow().clone()
    }

    /// Subscribes to snapshot changes.
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.tx.subscribe()
    }

    pub fn get(&self, id: PortId) -> Option<PortRecord> {
        self.tx.borrow().iter().find(|r| r.id == id).cloned()
    }

    pub fn contains(&self, id: PortId) -> bool {
        self.tx.borrow().iter().any(|r| r.id == id)
    }

    pub fn len(&self) -> usize {
        self.tx.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tx.borrow().is_empty()
    }

    /// The id the next `add` would receive, given the current state.
    pub fn next_id(&self) -> PortId {
        self.first_free_id(&self.tx.borrow())
    }

    /// Validates and appends a manually entered record.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` if a required field is missing or the
    /// port number is not a digit token. The collection is left unchanged.
    pub fn add(&self, new: NewPortRecord) -> Result<PortRecord, AppError> {
        validate(&new).map_err(AppError::Validation)?;
        let record = self.mutate(|records| {
            let id = self.first_free_id(records);
            let record = new.with_id(id);
            records.push(record.clone());
            self.bump(id);
            Ok(record)
        })?;
        debug!(id = record.id, port = %record.port_number, "record added");
        Ok(record)
    }

    /// Replaces the record with the same id, keeping its position.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if no record has that id, and
    /// `AppError::Validation` if the replacement breaks a required-field
    /// rule.
    pub fn update(&self, record: PortRecord) -> Result<(), AppError> {
        validate(&record.to_new()).map_err(AppError::Validation)?;
        let id = record.id;
        self.mutate(|records| {
            let slot = records
                .iter_mut()
                .find(|r| r.id == record.id)
                .ok_or(AppError::NotFound(record.id))?;
            *slot = record;
            Ok(())
        })?;
        debug!(id, "record updated");
        Ok(())
    }

    /// Removes a record and returns it.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if no record has that id.
    pub fn remove(&self, id: PortId) -> Result<PortRecord, AppError> {
        let removed = self.mutate(|records| {
            let index = records
                .iter()
                .position(|r| r.id == id)
                .ok_or(AppError::NotFound(id))?;
            Ok(records.remove(index))
        })?;
        debug!(id, "record removed");
        Ok(removed)
    }

    /// Appends a batch of candidates, assigning consecutive fresh ids.
    ///
    /// Candidates are not validated. Their relative order is kept and every
    /// id is larger than any id the store has held before.
    pub fn merge(&self, candidates: Vec<NewPortRecord>) -> Vec<PortRecord> {
        if candidates.is_empty() {
            return Vec::new();
        }
        let merged = self.mutate(|records| {
            let first = self.first_free_id(records);
            let merged: Vec<PortRecord> = candidates
                .into_iter()
                .zip(first..)
                .map(|(candidate, id)| candidate.with_id(id))
                .collect();
            records.extend(merged.iter().cloned());
            self.bump(max_id(&merged));
            Ok(merged)
        });
        let merged = merged.unwrap_or_default();
        debug!(count = merged.len(), "records merged");
        merged
    }

    /// Replaces the whole collection.
    ///
    /// # Errors
    ///
    /// Returns `AppError::DuplicateId` if two incoming records share an id;
    /// the current collection is kept in that case.
    pub fn replace_all(&self, records: Vec<PortRecord>) -> Result<(), AppError> {
        ensure_unique(&records)?;
        let count = records.len();
        self.mutate(|current| {
            self.bump(max_id(&records));
            *current = records;
            Ok(())
        })?;
        debug!(count, "collection replaced");
        Ok(())
    }

    /// Inserts a record whose id was assigned elsewhere.
    ///
    /// # Errors
    ///
    /// Returns `AppError::DuplicateId` if a record with that id is already
    /// held. The collection is left unchanged.
    pub fn insert(&self, record: PortRecord) -> Result<(), AppError> {
        let id = record.id;
        self.mutate(|records| {
            if records.iter().any(|r| r.id == id) {
                return Err(AppError::DuplicateId(id));
            }
            records.push(record);
            self.bump(id);
            Ok(())
        })?;
        debug!(id, "record inserted");
        Ok(())
    }

    /// Moves records to new ids in one step.
    ///
    /// Every `(old, new)` pair gets its own outcome, in input order. Pairs are
    /// applied together, so ids may be swapped or shifted along a chain. A
    /// pair is refused when `old` is absent (`NotFound`) or when `new` would
    /// still be held after the move, by a record outside the batch or by
    /// another pair claiming the same id (`DuplicateId`). Refusing one pair
    /// can refuse the pairs that depended on it; the accepted rest is
    /// published as a single snapshot.
    pub fn rekey_all(&self, pairs: &[(PortId, PortId)]) -> Vec<Result<(), AppError>> {
        if pairs.is_empty() {
            return Vec::new();
        }
        let outcomes = self.mutate(|records| {
            let present: HashSet<PortId> = records.iter().map(|r| r.id).collect();
            let mut seen = HashSet::new();
            let mut outcomes: Vec<Result<(), AppError>> = pairs
                .iter()
                .map(|&(old, _)| {
                    if !present.contains(&old) {
                        Err(AppError::NotFound(old))
                    } else if !seen.insert(old) {
                        Err(AppError::DuplicateId(old))
                    } else {
                        Ok(())
                    }
                })
                .collect();

            // Refusals can cascade along chains, so repeat until stable
            loop {
                let accepted: Vec<(PortId, PortId)> = pairs
                    .iter()
                    .zip(&outcomes)
                    .filter(|(_, o)| o.is_ok())
                    .map(|(p, _)| *p)
                    .collect();
                let moving: HashSet<PortId> = accepted.iter().map(|(old, _)| *old).collect();
                let mut claims: HashMap<PortId, usize> = HashMap::new();
                for (_, new) in &accepted {
                    *claims.entry(*new).or_default() += 1;
                }

                let refused: Vec<usize> = pairs
                    .iter()
                    .enumerate()
                    .filter(|(i, (_, new))| {
                        outcomes[*i].is_ok()
                            && ((present.contains(new) && !moving.contains(new))
                                || claims.get(new).copied().unwrap_or(0) > 1)
                    })
                    .map(|(i, _)| i)
                    .collect();
                if refused.is_empty() {
                    break;
                }
                for i in refused {
                    outcomes[i] = Err(AppError::DuplicateId(pairs[i].1));
                }
            }

            let moves: HashMap<PortId, PortId> = pairs
                .iter()
                .zip(&outcomes)
                .filter(|(_, o)| o.is_ok())
                .map(|(p, _)| *p)
                .collect();
            for record in records.iter_mut() {
                if let Some(&new) = moves.get(&record.id) {
                    record.id = new;
                    self.bump(new);
                }
            }
            Ok(outcomes)
        });
        let outcomes = outcomes.unwrap_or_default();
        debug!(
            count = outcomes.iter().filter(|o| o.is_ok()).count(),
            refused = outcomes.iter().filter(|o| o.is_err()).count(),
            "records rekeyed"
        );
        outcomes
    }

    /// Applies `op` to a working copy and publishes it only on success.
    fn mutate<R>(
        &self,
        op: impl FnOnce(&mut Vec<PortRecord>) -> Result<R, AppError>,
    ) -> Result<R, AppError> {
        let mut outcome = None;
        self.tx.send_if_modified(|snapshot| {
            let mut working = Vec::clone(snapshot);
            let result = op(&mut working);
            let changed = result.is_ok();
            if changed {
                *snapshot = Arc::new(working);
            }
            outcome = Some(result);
            changed
        });
        outcome.unwrap_or_else(|| unreachable!("send_if_modified always runs its closure"))
    }

    fn first_free_id(&self, records: &[PortRecord]) -> PortId {
        max_id(records).max(self.high_water.load(Ordering::Relaxed)) + 1
    }

    fn bump(&self, id: PortId) {
        self.high_water.fetch_max(id, Ordering::Relaxed);
    }
}

fn max_id(records: &[PortRecord]) -> PortId {
    records.iter().map(|r| r.id).max().unwrap_or(0)
}

fn ensure_unique(records: &[PortRecord]) -> Result<(), AppError> {
    let mut seen = HashSet::with_capacity(records.len());
    for record in records {
        if !seen.insert(record.id) {
            return Err(AppError::DuplicateId(record.id));
        }
    }
    Ok(())
}
