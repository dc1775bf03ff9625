//! Catalog facade used by the CLI and the FFI surface.
//!
//! Wires a record store, a cache store and a clock into the sync and session
//! managers, and gates every mutation behind the admin session.

use std::sync::Arc;
use thiserror::Error;

use crate::cache::{CacheError, CacheStore, MemoryCache, SqliteCache};
use crate::clock::{Clock, SystemClock};
use crate::config::{ConfigError, PharmacyConfig};
use crate::export::{export_csv, export_file_name, ExportError};
use crate::import::{CsvParseResult, ImportError, ImportReport, Importer, UploadedFile};
use crate::models::{default_catalog, validate_batch, FieldError, Medicine, MedicinePatch, NewMedicine};
use crate::search::{related_by_formula, search, AttributeFilter, SearchBy};
use crate::session::SessionManager;
use crate::store::{MemoryStore, RecordStore, RestStore, StoreError};
use crate::sync::{
    spawn_background_sync, BackgroundSync, BatchOutcome, CatalogSync, Resolved, WriteError,
};

/// Catalog errors.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Admin login required")]
    Unauthorized,

    #[error("Invalid medicine: {}", field_messages(.0))]
    Invalid(Vec<FieldError>),

    #[error("Invalid rows: {}", row_messages(.0))]
    InvalidRows(Vec<(usize, FieldError)>),

    #[error("Medicine not found: {0}")]
    NotFound(String),

    #[error("Failed to {0}. Please try again.")]
    WriteFailed(&'static str),

    #[error("{0}")]
    Import(#[from] ImportError),

    #[error("Export error: {0}")]
    Export(#[from] ExportError),
}

pub type CatalogResult<T> = Result<T, CatalogError>;

fn field_messages(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn write_error(error: WriteError, action: &'static str) -> CatalogError {
    match error {
        WriteError::Invalid(errors) => CatalogError::Invalid(errors),
        WriteError::Store => CatalogError::WriteFailed(action),
    }
}

fn row_messages(errors: &[(usize, FieldError)]) -> String {
    errors
        .iter()
        .map(|(row, e)| format!("row {}: {}", row, e.message))
        .collect::<Vec<_>>()
        .join(", ")
}

/// A CSV export ready to be saved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvExport {
    pub file_name: String,
    pub content: String,
}

pub struct Catalog {
    sync: Arc<CatalogSync>,
    session: SessionManager,
    clock: Arc<dyn Clock>,
    config: PharmacyConfig,
}

impl Catalog {
    /// Connect to the configured remote store with an on-disk cache.
    pub fn from_config(config: PharmacyConfig) -> CatalogResult<Self> {
        config.validate()?;
        let store = RestStore::new(
            config.require_store_url()?,
            config.store_api_key.as_deref().unwrap_or_default(),
            &config.table,
            config.request_timeout(),
        )?;
        let cache = SqliteCache::open(&config.cache_path)?;
        tracing::info!("Opened catalog at {}", store.table_url());

        Ok(Self::with_parts(
            Arc::new(store),
            Arc::new(cache),
            Arc::new(SystemClock),
            config,
        ))
    }

    /// Catalog over an in-process store and cache.
    pub fn in_memory() -> Self {
        Self::with_parts(
            Arc::new(MemoryStore::new()),
            Arc::new(MemoryCache::new()),
            Arc::new(SystemClock),
            PharmacyConfig::default(),
        )
    }

    pub fn with_parts(
        store: Arc<dyn RecordStore>,
        cache: Arc<dyn CacheStore>,
        clock: Arc<dyn Clock>,
        config: PharmacyConfig,
    ) -> Self {
        let sync = CatalogSync::new(store, Arc::clone(&cache), Arc::clone(&clock))
            .with_interval(config.staleness_interval());
        let session = SessionManager::new(cache, Arc::clone(&clock), config.admin_password.clone())
            .with_ttl(config.session_ttl());
        Self {
            sync: Arc::new(sync),
            session,
            clock,
            config,
        }
    }

    pub fn sync(&self) -> &Arc<CatalogSync> {
        &self.sync
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    pub fn config(&self) -> &PharmacyConfig {
        &self.config
    }

    // ========================================================================
    // Browsing
    // ========================================================================

    pub async fn list(&self) -> Vec<Medicine> {
        self.sync.get_all().await
    }

    /// The collection plus where it came from.
    pub async fn refresh(&self) -> Resolved {
        self.sync.resolve_catalog().await
    }

    pub async fn search(&self, query: &str, by: SearchBy) -> Vec<Medicine> {
        let all = self.sync.get_all().await;
        search(&all, query, by).into_iter().cloned().collect()
    }

    pub async fn related(&self, formula: &str) -> Vec<Medicine> {
        let all = self.sync.get_all().await;
        related_by_formula(&all, formula).into_iter().cloned().collect()
    }

    /// Alternatives to the record `id` under an attribute filter.
    pub async fn alternatives(&self, id: &str, filter: AttributeFilter) -> CatalogResult<Vec<Medicine>> {
        let all = self.sync.get_all().await;
        let selected = all
            .iter()
            .find(|m| m.id == id)
            .ok_or_else(|| CatalogError::NotFound(id.to_string()))?;
        Ok(filter.apply(&all, selected).into_iter().cloned().collect())
    }

    // ========================================================================
    // Admin
    // ========================================================================

    pub fn login(&self, password: &str) -> bool {
        self.session.login(password)
    }

    pub fn logout(&self) {
        self.session.logout();
    }

    pub fn is_admin(&self) -> bool {
        self.session.is_admin()
    }

    fn require_admin(&self) -> CatalogResult<()> {
        if self.session.is_admin() {
            Ok(())
        } else {
            Err(CatalogError::Unauthorized)
        }
    }

    pub async fn add(&self, fields: NewMedicine) -> CatalogResult<Medicine> {
        self.require_admin()?;
        self.sync
            .add(fields)
            .await
            .map_err(|e| write_error(e, "add medicine"))
    }

    pub async fn update(&self, id: &str, patch: MedicinePatch) -> CatalogResult<Medicine> {
        self.require_admin()?;
        self.sync
            .update(id, patch)
            .await
            .map_err(|e| write_error(e, "update medicine"))
    }

    pub async fn delete(&self, id: &str) -> CatalogResult<()> {
        self.require_admin()?;
        if self.sync.delete(id).await {
            Ok(())
        } else {
            Err(CatalogError::WriteFailed("delete medicine"))
        }
    }

    /// Add several records. Every row must have a name.
    pub async fn bulk_add(&self, rows: Vec<NewMedicine>) -> CatalogResult<BatchOutcome> {
        self.require_admin()?;
        let rows = validate_batch(rows).map_err(CatalogError::InvalidRows)?;
        let outcome = self.sync.add_many(rows).await;
        if outcome.added.is_empty() && !outcome.failed.is_empty() {
            return Err(CatalogError::WriteFailed("add medicines"));
        }
        Ok(outcome)
    }

    /// Seed the sample catalog when the store is empty.
    pub async fn seed_defaults(&self) -> CatalogResult<()> {
        self.require_admin()?;
        if self.sync.seed_if_empty(default_catalog()).await {
            Ok(())
        } else {
            Err(CatalogError::WriteFailed("seed database"))
        }
    }

    // ========================================================================
    // CSV
    // ========================================================================

    pub fn importer(&self) -> Importer<'_> {
        Importer::new(&self.sync).with_max_upload_bytes(self.config.max_import_bytes)
    }

    /// Parse a file against the current collection. Writes nothing.
    pub async fn preview_csv(&self, text: &str) -> CsvParseResult {
        self.importer().preview(text).await
    }

    pub async fn preview_upload(&self, files: &[UploadedFile]) -> CsvParseResult {
        self.importer().preview_upload(files).await
    }

    pub async fn import_csv(&self, text: &str, skip_duplicates: bool) -> CatalogResult<ImportReport> {
        self.require_admin()?;
        let importer = self.importer();
        let importer = if skip_duplicates { importer } else { importer.keep_duplicates() };
        Ok(importer.import_text(text).await?)
    }

    pub async fn import_upload(&self, files: &[UploadedFile], skip_duplicates: bool) -> CatalogResult<ImportReport> {
        self.require_admin()?;
        let importer = self.importer();
        let importer = if skip_duplicates { importer } else { importer.keep_duplicates() };
        Ok(importer.import_upload(files).await?)
    }

    /// Export the current collection, named for today's UTC date.
    pub async fn export_csv(&self) -> CatalogResult<CsvExport> {
        let all = self.sync.get_all().await;
        Ok(CsvExport {
            file_name: export_file_name(self.clock.now().date_naive()),
            content: export_csv(&all)?,
        })
    }

    // ========================================================================
    // Sync
    // ========================================================================

    pub fn should_sync(&self) -> bool {
        self.sync.should_sync()
    }

    /// Start the periodic staleness check. Requires a tokio runtime.
    pub fn start_background_sync(&self) -> BackgroundSync {
        spawn_background_sync(Arc::clone(&self.sync), self.config.sync_interval())
    }
}
