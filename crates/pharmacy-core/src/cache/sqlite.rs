//! SQLite-backed cache store.

use std::path::Path;
use std::sync::Mutex;

use super::{CacheResult, CacheStore};
use crate::db::Database;

/// Persistent cache that survives restarts.
pub struct SqliteCache {
    db: Mutex<Database>,
}

impl SqliteCache {
    /// Open or create the cache database at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> CacheResult<Self> {
        let db = Database::open(path)?;
        Ok(Self { db: Mutex::new(db) })
    }

    /// In-memory SQLite cache (for testing).
    pub fn open_in_memory() -> CacheResult<Self> {
        let db = Database::open_in_memory()?;
        Ok(Self { db: Mutex::new(db) })
    }
}

impl CacheStore for SqliteCache {
    fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let db = self.db.lock()?;
        Ok(db.get_item(key)?)
    }

    fn set(&self, key: &str, value: &str) -> CacheResult<()> {
        let db = self.db.lock()?;
        db.set_item(key, value)?;
        Ok(())
    }

    fn clear(&self, key: &str) -> CacheResult<()> {
        let db = self.db.lock()?;
        db.remove_item(key)?;
        Ok(())
    }
}
