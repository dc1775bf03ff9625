//! Whole-collection cache snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{CacheResult, CacheStore, SNAPSHOT_KEY};
use crate::models::Medicine;

/// The last known-good collection and when it was fetched from the store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheSnapshot {
    pub medicines: Vec<Medicine>,
    pub synced_at: DateTime<Utc>,
}

impl CacheSnapshot {
    pub fn new(medicines: Vec<Medicine>, synced_at: DateTime<Utc>) -> Self {
        Self {
            medicines,
            synced_at,
        }
    }

    /// Read the snapshot. A value that no longer parses is treated as absent.
    pub fn load(cache: &dyn CacheStore) -> CacheResult<Option<Self>> {
        let Some(raw) = cache.get(SNAPSHOT_KEY)? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(snapshot) => Ok(Some(snapshot)),
            Err(e) => {
                tracing::warn!("Discarding unreadable cache snapshot: {}", e);
                Ok(None)
            }
        }
    }

    /// Replace the stored snapshot.
    pub fn save(&self, cache: &dyn CacheStore) -> CacheResult<()> {
        let raw = serde_json::to_string(self)?;
        cache.set(SNAPSHOT_KEY, &raw)
    }
}
