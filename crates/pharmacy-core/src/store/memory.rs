//! In-process record store.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use super::{RecordStore, StoreError, StoreResult};
use crate::models::{Medicine, MedicinePatch, NewMedicine};

/// Record store held in memory.
///
/// Ids are random UUIDs, so an id is never reused after deletion. Flipping
/// [`MemoryStore::set_available`] to `false` makes every call fail the way an
/// unreachable remote store would.
#[derive(Debug)]
pub struct MemoryStore {
    records: Mutex<Vec<Medicine>>,
    available: AtomicBool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            available: AtomicBool::new(true),
        }
    }

    /// Simulate connectivity loss or recovery.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    fn records(&self) -> StoreResult<MutexGuard<'_, Vec<Medicine>>> {
        if !self.is_available() {
            return Err(StoreError::Unavailable("memory store is offline".into()));
        }
        self.records
            .lock()
            .map_err(|e| StoreError::Unavailable(format!("Lock poisoned: {}", e)))
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn list_all(&self) -> StoreResult<Vec<Medicine>> {
        let records = self.records()?;
        let mut all = records.clone();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(all)
    }

    async fn insert(&self, fields: &NewMedicine) -> StoreResult<Medicine> {
        let mut records = self.records()?;
        let medicine = Medicine::from_new(uuid::Uuid::new_v4().to_string(), fields.clone());
        records.push(medicine.clone());
        Ok(medicine)
    }

    async fn update(&self, id: &str, patch: &MedicinePatch) -> StoreResult<Medicine> {
        let mut records = self.records()?;
        let medicine = records
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        medicine.apply(patch);
        Ok(medicine.clone())
    }

    async fn delete(&self, id: &str) -> StoreResult<bool> {
        let mut records = self.records()?;
        let before = records.len();
        records.retain(|m| m.id != id);
        Ok(records.len() < before)
    }
}
