//! Ordered fallback over catalog sources.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::cache::{CacheSnapshot, CacheStore};
use crate::models::Medicine;
use crate::store::RecordStore;

/// A place the collection can be read from.
pub enum Source<'a> {
    /// The remote record store.
    Store(&'a dyn RecordStore),
    /// The last cached snapshot.
    Cache(&'a dyn CacheStore),
    /// An empty collection. Never fails.
    Empty,
}

/// Which source produced a resolved collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Store,
    Cache,
    Empty,
}

/// The first successful read.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    pub medicines: Vec<Medicine>,
    pub source: SourceKind,
    /// When the data was last fetched from the store, if known
    pub synced_at: Option<DateTime<Utc>>,
}

/// Every source failed.
#[derive(Error, Debug)]
#[error("No source could provide the catalog: {}", .failures.join("; "))]
pub struct ResolveError {
    pub failures: Vec<String>,
}

/// Try each source in order and return the first success.
pub async fn resolve(sources: &[Source<'_>]) -> Result<Resolved, ResolveError> {
    let mut failures = Vec::new();

    for source in sources {
        match source {
            Source::Store(store) => match store.list_all().await {
                Ok(medicines) => {
                    return Ok(Resolved {
                        medicines,
                        source: SourceKind::Store,
                        synced_at: None,
                    })
                }
                Err(e) => {
                    tracing::error!("Store fetch failed: {}", e);
                    failures.push(format!("store: {}", e));
                }
            },
            Source::Cache(cache) => match CacheSnapshot::load(*cache) {
                Ok(Some(snapshot)) => {
                    tracing::debug!(
                        "Serving {} cached medicines from {}",
                        snapshot.medicines.len(),
                        snapshot.synced_at
                    );
                    return Ok(Resolved {
                        medicines: snapshot.medicines,
                        source: SourceKind::Cache,
                        synced_at: Some(snapshot.synced_at),
                    });
                }
                Ok(None) => failures.push("cache: no snapshot".to_string()),
                Err(e) => {
                    tracing::warn!("Cache read failed: {}", e);
                    failures.push(format!("cache: {}", e));
                }
            },
            Source::Empty => {
                return Ok(Resolved {
                    medicines: Vec::new(),
                    source: SourceKind::Empty,
                    synced_at: None,
                })
            }
        }
    }

    Err(ResolveError { failures })
}
