//! Local persistent cache.
//!
//! The cache is a plain string key/value store, injected into the sync
//! manager and the session manager. The medicine collection lives under a
//! single key as one JSON snapshot, so every write replaces it whole.

mod memory;
mod snapshot;
mod sqlite;

pub use memory::*;
pub use snapshot::*;
pub use sqlite::*;

use thiserror::Error;

use crate::db::DbError;

/// Key holding the medicine snapshot.
pub const SNAPSHOT_KEY: &str = "pharmacy_medicines";

/// Key holding the admin session.
pub const SESSION_KEY: &str = "pharmacy_admin_session";

/// Cache errors.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Lock poisoned: {0}")]
    Poisoned(String),
}

pub type CacheResult<T> = Result<T, CacheError>;

impl<T> From<std::sync::PoisonError<T>> for CacheError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        CacheError::Poisoned(e.to_string())
    }
}

/// String key/value storage backing the offline cache.
pub trait CacheStore: Send + Sync {
    /// Read a value. `Ok(None)` when the key was never set or was cleared.
    fn get(&self, key: &str) -> CacheResult<Option<String>>;

    /// Write a value, replacing any previous one.
    fn set(&self, key: &str, value: &str) -> CacheResult<()>;

    /// Remove a value. Clearing a missing key is not an error.
    fn clear(&self, key: &str) -> CacheResult<()>;
}
