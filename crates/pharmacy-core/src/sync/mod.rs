//! Cache/sync manager.
//!
//! The remote store is the source of truth and the cache is a read fallback.
//! Reads try the store, then the cached snapshot, then an empty collection.
//! Writes go to the store first; only a successful store write touches the
//! cache, and the cache is always replaced as a whole collection.
//!
//! Store failures stop here: every operation returns a plain value or
//! `Option`/`bool` and logs the underlying error.

mod background;
mod resolve;

pub use background::*;
pub use resolve::*;

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use thiserror::Error;

use crate::cache::{CacheSnapshot, CacheStore};
use crate::clock::Clock;
use crate::models::{FieldError, Medicine, MedicinePatch, NewMedicine};
use crate::store::RecordStore;

/// Seconds after which a snapshot is considered stale.
pub const DEFAULT_SYNC_INTERVAL_SECS: i64 = 30;

/// Why a single-record write did not happen.
///
/// The underlying store error is logged, not carried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WriteError {
    #[error("{} invalid field(s)", .0.len())]
    Invalid(Vec<FieldError>),

    #[error("store rejected the write")]
    Store,
}

/// Result of a multi-record add.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Records the store accepted, in submission order
    pub added: Vec<Medicine>,
    /// Records the store rejected or could not be reached for
    pub failed: Vec<NewMedicine>,
}

/// Mediates every read and write between callers and the record store.
pub struct CatalogSync {
    store: Arc<dyn RecordStore>,
    cache: Arc<dyn CacheStore>,
    clock: Arc<dyn Clock>,
    interval: Duration,
}

impl CatalogSync {
    pub fn new(store: Arc<dyn RecordStore>, cache: Arc<dyn CacheStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            cache,
            clock,
            interval: Duration::seconds(DEFAULT_SYNC_INTERVAL_SECS),
        }
    }

    /// Override the staleness interval.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn cache_store(&self) -> Arc<dyn CacheStore> {
        Arc::clone(&self.cache)
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.clock)
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Fetch the whole collection.
    ///
    /// A successful store fetch replaces the snapshot and resets the
    /// staleness timer. On failure the cached snapshot (or nothing) is
    /// returned and the timer is left alone.
    pub async fn get_all(&self) -> Vec<Medicine> {
        self.resolve_catalog().await.medicines
    }

    /// Like [`CatalogSync::get_all`], also reporting where the data came from.
    pub async fn resolve_catalog(&self) -> Resolved {
        let sources = [
            Source::Store(self.store.as_ref()),
            Source::Cache(self.cache.as_ref()),
            Source::Empty,
        ];

        let mut resolved = match resolve(&sources).await {
            Ok(resolved) => resolved,
            Err(e) => {
                tracing::error!("{}", e);
                Resolved {
                    medicines: Vec::new(),
                    source: SourceKind::Empty,
                    synced_at: None,
                }
            }
        };

        if resolved.source == SourceKind::Store {
            let now = self.clock.now();
            self.write_snapshot(CacheSnapshot::new(resolved.medicines.clone(), now));
            resolved.synced_at = Some(now);
        }
        resolved
    }

    /// The cached collection, without touching the store.
    pub fn cached(&self) -> Vec<Medicine> {
        self.snapshot().map(|s| s.medicines).unwrap_or_default()
    }

    /// When the store was last read successfully.
    pub fn last_synced_at(&self) -> Option<DateTime<Utc>> {
        self.snapshot().map(|s| s.synced_at)
    }

    /// True when no sync has happened or the last one is older than the interval.
    pub fn should_sync(&self) -> bool {
        match self.last_synced_at() {
            Some(synced_at) => self.clock.now() - synced_at > self.interval,
            None => true,
        }
    }

    // ========================================================================
    // Writes
    // ========================================================================

    /// Create a record from trimmed fields.
    pub async fn add(&self, fields: NewMedicine) -> Result<Medicine, WriteError> {
        let fields = fields.normalized();
        let errors = fields.validate();
        if !errors.is_empty() {
            tracing::warn!("Refusing to add invalid medicine: {:?}", errors);
            return Err(WriteError::Invalid(errors));
        }

        match self.store.insert(&fields).await {
            Ok(medicine) => {
                tracing::info!("Added medicine {} ({})", medicine.name, medicine.id);
                let added = medicine.clone();
                self.after_write(move |list| list.push(added)).await;
                Ok(medicine)
            }
            Err(e) => {
                tracing::error!("Error adding medicine: {}", e);
                Err(WriteError::Store)
            }
        }
    }

    /// Apply a partial update.
    pub async fn update(&self, id: &str, patch: MedicinePatch) -> Result<Medicine, WriteError> {
        let errors = patch.validate();
        if !errors.is_empty() {
            tracing::warn!("Refusing invalid update for {}: {:?}", id, errors);
            return Err(WriteError::Invalid(errors));
        }

        match self.store.update(id, &patch).await {
            Ok(medicine) => {
                tracing::info!("Updated medicine {}", medicine.id);
                let updated = medicine.clone();
                self.after_write(move |list| {
                    if let Some(slot) = list.iter_mut().find(|m| m.id == updated.id) {
                        *slot = updated;
                    }
                })
                .await;
                Ok(medicine)
            }
            Err(e) => {
                tracing::error!("Error updating medicine {}: {}", id, e);
                Err(WriteError::Store)
            }
        }
    }

    /// Delete a record. True only when the store removed it.
    pub async fn delete(&self, id: &str) -> bool {
        match self.store.delete(id).await {
            Ok(true) => {
                tracing::info!("Deleted medicine {}", id);
                let id = id.to_string();
                self.after_write(move |list| list.retain(|m| m.id != id)).await;
                true
            }
            Ok(false) => {
                tracing::warn!("Delete matched no medicine with id {}", id);
                false
            }
            Err(e) => {
                tracing::error!("Error deleting medicine {}: {}", id, e);
                false
            }
        }
    }

    /// Create records one at a time and refresh the cache once.
    ///
    /// Not transactional: a failure part-way leaves earlier records stored.
    pub async fn add_many(&self, records: Vec<NewMedicine>) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();

        for fields in records {
            let fields = fields.normalized();
            if !fields.validate().is_empty() {
                outcome.failed.push(fields);
                continue;
            }
            match self.store.insert(&fields).await {
                Ok(medicine) => outcome.added.push(medicine),
                Err(e) => {
                    tracing::error!("Error adding medicine {}: {}", fields.name, e);
                    outcome.failed.push(fields);
                }
            }
        }

        if !outcome.added.is_empty() {
            tracing::info!(
                "Added {} medicine(s), {} failed",
                outcome.added.len(),
                outcome.failed.len()
            );
            let added = outcome.added.clone();
            self.after_write(move |list| list.extend(added)).await;
        }
        outcome
    }

    /// Insert `records` only if the store has no data yet.
    ///
    /// Returns true when the store already had data or seeding succeeded.
    pub async fn seed_if_empty(&self, records: Vec<NewMedicine>) -> bool {
        match self.store.is_empty().await {
            Ok(false) => {
                tracing::info!("Store already has data, skipping seed");
                return true;
            }
            Ok(true) => {}
            Err(e) => {
                tracing::error!("Error checking store before seeding: {}", e);
                return false;
            }
        }

        let records: Vec<NewMedicine> = records.into_iter().map(NewMedicine::normalized).collect();
        match self.store.insert_many(&records).await {
            Ok(added) => {
                tracing::info!("Seeded store with {} medicine(s)", added.len());
                self.after_write(move |list| list.extend(added)).await;
                true
            }
            Err(e) => {
                tracing::error!("Error seeding store: {}", e);
                false
            }
        }
    }

    // ========================================================================
    // Snapshot maintenance
    // ========================================================================

    /// Bring the snapshot in line after a successful store write.
    ///
    /// Prefers a full re-fetch. If that fails, the existing snapshot is
    /// patched locally and written back whole; with no snapshot there is
    /// nothing consistent to patch, so the cache is left empty.
    async fn after_write<F>(&self, patch: F)
    where
        F: FnOnce(&mut Vec<Medicine>),
    {
        let now = self.clock.now();
        match self.store.list_all().await {
            Ok(medicines) => self.write_snapshot(CacheSnapshot::new(medicines, now)),
            Err(e) => {
                tracing::warn!("Re-fetch after write failed, patching cache locally: {}", e);
                if let Some(mut snapshot) = self.snapshot() {
                    patch(&mut snapshot.medicines);
                    snapshot.medicines.sort_by(|a, b| a.name.cmp(&b.name));
                    snapshot.synced_at = now;
                    self.write_snapshot(snapshot);
                }
            }
        }
    }

    fn snapshot(&self) -> Option<CacheSnapshot> {
        match CacheSnapshot::load(self.cache.as_ref()) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!("Cache read failed: {}", e);
                None
            }
        }
    }

    fn write_snapshot(&self, snapshot: CacheSnapshot) {
        if let Err(e) = snapshot.save(self.cache.as_ref()) {
            tracing::warn!("Cache write failed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::clock::ManualClock;
    use crate::store::MemoryStore;

    struct Harness {
        store: Arc<MemoryStore>,
        cache: Arc<MemoryCache>,
        clock: Arc<ManualClock>,
        sync: CatalogSync,
    }

    fn harness() -> Harness {
        let store = Arc::new(MemoryStore::new());
        let cache = Arc::new(MemoryCache::new());
        let clock = Arc::new(ManualClock::default());
        let sync = CatalogSync::new(store.clone(), cache.clone(), clock.clone());
        Harness {
            store,
            cache,
            clock,
            sync,
        }
    }

    #[tokio::test]
    async fn test_get_all_writes_snapshot() {
        let h = harness();
        h.store.insert(&NewMedicine::new("Advil")).await.unwrap();

        assert!(h.sync.should_sync());
        let all = h.sync.get_all().await;

        assert_eq!(all.len(), 1);
        assert_eq!(h.sync.cached(), all);
        assert_eq!(h.sync.last_synced_at(), Some(h.clock.now()));
        assert!(!h.sync.should_sync());
    }

    #[tokio::test]
    async fn test_staleness_interval_is_strict() {
        let h = harness();
        h.sync.get_all().await;

        h.clock.advance(Duration::seconds(30));
        assert!(!h.sync.should_sync());

        h.clock.advance(Duration::seconds(1));
        assert!(h.sync.should_sync());
    }

    #[tokio::test]
    async fn test_offline_read_keeps_timer() {
        let h = harness();
        h.store.insert(&NewMedicine::new("Advil")).await.unwrap();
        let first = h.sync.get_all().await;
        let synced_at = h.sync.last_synced_at();

        h.store.set_available(false);
        h.clock.advance(Duration::minutes(5));

        assert_eq!(h.sync.get_all().await, first);
        assert_eq!(h.sync.last_synced_at(), synced_at);
        assert!(h.sync.should_sync());
    }

    #[tokio::test]
    async fn test_offline_write_leaves_cache_untouched() {
        let h = harness();
        h.sync.get_all().await;
        let before = h.cache.get(crate::cache::SNAPSHOT_KEY).unwrap();

        h.store.set_available(false);
        assert_eq!(h.sync.add(NewMedicine::new("Advil")).await, Err(WriteError::Store));
        assert!(!h.sync.delete("anything").await);

        assert_eq!(h.cache.get(crate::cache::SNAPSHOT_KEY).unwrap(), before);
    }

    #[tokio::test]
    async fn test_write_refreshes_snapshot() {
        let h = harness();
        let advil = h.sync.add(NewMedicine::new("  Advil ")).await.unwrap();
        assert_eq!(advil.name, "Advil");
        assert_eq!(h.sync.cached(), vec![advil.clone()]);

        let patch = MedicinePatch {
            stock: Some(5),
            ..Default::default()
        };
        let updated = h.sync.update(&advil.id, patch).await.unwrap();
        assert_eq!(h.sync.cached()[0].stock, 5);
        assert_eq!(updated.id, advil.id);

        assert!(h.sync.delete(&advil.id).await);
        assert!(h.sync.cached().is_empty());
        assert!(!h.sync.delete(&advil.id).await);
    }

    #[tokio::test]
    async fn test_invalid_writes_never_reach_store() {
        let h = harness();
        assert!(matches!(
            h.sync.add(NewMedicine::new(" ")).await,
            Err(WriteError::Invalid(errors)) if errors[0].field == "name"
        ));

        let blank_name = MedicinePatch {
            name: Some(String::new()),
            ..Default::default()
        };
        assert!(matches!(
            h.sync.update("x", blank_name).await,
            Err(WriteError::Invalid(_))
        ));
        assert!(h.store.is_empty().await.unwrap());
    }

    #[tokio::test]
    async fn test_add_many_reports_failures() {
        let h = harness();
        let outcome = h
            .sync
            .add_many(vec![NewMedicine::new("Advil"), NewMedicine::new(""), NewMedicine::new("Brufen")])
            .await;

        assert_eq!(outcome.added.len(), 2);
        assert_eq!(outcome.failed.len(), 1);
        assert_eq!(h.sync.cached().len(), 2);
    }

    #[tokio::test]
    async fn test_seed_only_when_empty() {
        let h = harness();
        assert!(h.sync.seed_if_empty(vec![NewMedicine::new("Advil")]).await);
        assert!(h.sync.seed_if_empty(vec![NewMedicine::new("Brufen")]).await);

        let names: Vec<_> = h.sync.get_all().await.into_iter().map(|m| m.name).collect();
        assert_eq!(names, vec!["Advil"]);

        h.store.set_available(false);
        assert!(!h.sync.seed_if_empty(vec![NewMedicine::new("Brufen")]).await);
    }
}
