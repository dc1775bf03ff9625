//! Remote record store client.
//!
//! The store is the source of truth for the catalog. Every operation is
//! asynchronous and may fail with a connectivity or server error; callers
//! treat all failures the same way.

mod memory;
mod rest;

pub use memory::*;
pub use rest::*;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{Medicine, MedicinePatch, NewMedicine};

/// Record store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Store returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Unexpected response: {0}")]
    InvalidResponse(String),

    #[error("Config error: {0}")]
    Config(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// CRUD access to the remote medicine table.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Fetch the whole collection, ordered by name.
    async fn list_all(&self) -> StoreResult<Vec<Medicine>>;

    /// Create a record. The store assigns the id.
    async fn insert(&self, fields: &NewMedicine) -> StoreResult<Medicine>;

    /// Apply a partial update and return the stored result.
    async fn update(&self, id: &str, patch: &MedicinePatch) -> StoreResult<Medicine>;

    /// Delete a record. Returns whether a record was removed.
    async fn delete(&self, id: &str) -> StoreResult<bool>;

    /// Create several records. Not transactional.
    async fn insert_many(&self, records: &[NewMedicine]) -> StoreResult<Vec<Medicine>> {
        let mut inserted = Vec::with_capacity(records.len());
        for record in records {
            inserted.push(self.insert(record).await?);
        }
        Ok(inserted)
    }

    /// Whether the table holds no records.
    async fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.list_all().await?.is_empty())
    }
}
