//! Pharmacy Catalog Core Library
//!
//! Medicine catalog with CSV import/export and an offline read cache.
//!
//! # Architecture
//!
//! ```text
//! CSV text → Parser & Validator → Duplicate Detector → Merge Policy
//!                                        ▲                   │
//!                                        │ current records   │ final batch
//!                                        │                   ▼
//!                               ┌────────┴───────────────────────────┐
//!                               │          Cache/Sync Manager        │
//!                               │  store first, snapshot fallback    │
//!                               └────────┬──────────────────┬────────┘
//!                                        │                  │
//!                                        ▼                  ▼
//!                                 Record Store         Cache Store
//!                              (PostgREST table)   (SQLite key/value)
//! ```
//!
//! # Core Principle
//!
//! **The remote store is the source of truth.** The cache is only read when
//! the store is unreachable and is only written after the store accepted a
//! change.
//!
//! # Modules
//!
//! - [`models`]: Domain types (Medicine, CompositeKey, AdminSession)
//! - [`import`]: CSV parsing, validation, duplicate detection, merge policy
//! - [`export`]: CSV export and import template
//! - [`store`]: Record store contract, HTTP and in-memory implementations
//! - [`cache`]: Key/value cache and the collection snapshot
//! - [`db`]: SQLite database layer behind the persistent cache
//! - [`sync`]: Cache/sync manager and background refresh
//! - [`session`]: Admin session with time-to-live
//! - [`search`]: Search, related-by-formula, attribute filters
//! - [`config`]: TOML configuration with environment overrides
//! - [`catalog`]: Facade wiring everything together

pub mod cache;
pub mod catalog;
pub mod clock;
pub mod config;
pub mod db;
pub mod export;
pub mod import;
pub mod models;
pub mod search;
pub mod session;
pub mod store;
pub mod sync;

// Re-export commonly used types
pub use catalog::{Catalog, CatalogError, CatalogResult, CsvExport};
pub use config::{ConfigError, PharmacyConfig};
pub use db::Database;
pub use import::{
    filter_duplicates, find_duplicates, parse_csv, CsvError, CsvParseResult, DuplicateAction,
    DuplicateInfo, ImportError, ImportReport, Importer, ParsedRow, UploadedFile,
};
pub use models::{normalized_key, CompositeKey, Medicine, MedicinePatch, NewMedicine, StockStatus};
pub use search::{AttributeFilter, SearchBy};
pub use sync::{spawn_background_sync, BackgroundSync, CatalogSync};

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use std::sync::{Arc, Mutex};

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum PharmacyError {
    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("Store error: {0}")]
    StoreError(String),

    #[error("Cache error: {0}")]
    CacheError(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Import failed: {0}")]
    ImportFailed(String),

    #[error("Nothing to import: {0}")]
    NothingToImport(String),

    #[error("Runtime error: {0}")]
    RuntimeError(String),
}

impl From<CatalogError> for PharmacyError {
    fn from(e: CatalogError) -> Self {
        let message = e.to_string();
        match e {
            CatalogError::Config(_) => PharmacyError::ConfigError(message),
            CatalogError::Store(_) | CatalogError::WriteFailed(_) => PharmacyError::StoreError(message),
            CatalogError::Cache(_) => PharmacyError::CacheError(message),
            CatalogError::Unauthorized => PharmacyError::Unauthorized(message),
            CatalogError::NotFound(_) => PharmacyError::NotFound(message),
            CatalogError::Invalid(_) | CatalogError::InvalidRows(_) => {
                PharmacyError::InvalidInput(message)
            }
            CatalogError::Import(ImportError::NothingToImport { .. }) => {
                PharmacyError::NothingToImport(message)
            }
            CatalogError::Import(_) | CatalogError::Export(_) => PharmacyError::ImportFailed(message),
        }
    }
}

impl From<ConfigError> for PharmacyError {
    fn from(e: ConfigError) -> Self {
        PharmacyError::ConfigError(e.to_string())
    }
}

impl From<std::io::Error> for PharmacyError {
    fn from(e: std::io::Error) -> Self {
        PharmacyError::RuntimeError(e.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for PharmacyError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        PharmacyError::RuntimeError(format!("Lock poisoned: {}", e))
    }
}

// =========================================================================
// Factory Functions (exported to FFI)
// =========================================================================

/// Open the catalog described by a TOML config file (or defaults plus env).
#[uniffi::export]
pub fn open_catalog(config_path: Option<String>) -> Result<Arc<PharmacyCore>, PharmacyError> {
    let config = PharmacyConfig::load(config_path.as_deref().map(std::path::Path::new))?;
    let catalog = Catalog::from_config(config)?;
    PharmacyCore::new(catalog)
}

/// Open a catalog backed by in-memory stores (for testing).
#[uniffi::export]
pub fn open_catalog_in_memory() -> Result<Arc<PharmacyCore>, PharmacyError> {
    PharmacyCore::new(Catalog::in_memory())
}

/// Install a log subscriber. Returns false if one was already installed.
#[uniffi::export]
pub fn init_logging(filter: Option<String>) -> bool {
    let filter = filter
        .map(tracing_subscriber::EnvFilter::new)
        .unwrap_or_else(|| {
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
        });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .is_ok()
}

// =========================================================================
// Main API Object
// =========================================================================

/// Catalog handle for FFI. Async work runs on an owned tokio runtime.
// Field order is drop order: the background task goes before the runtime.
#[derive(uniffi::Object)]
pub struct PharmacyCore {
    background: Mutex<Option<BackgroundSync>>,
    catalog: Catalog,
    runtime: tokio::runtime::Runtime,
}

impl PharmacyCore {
    fn new(catalog: Catalog) -> Result<Arc<Self>, PharmacyError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?;
        Ok(Arc::new(Self {
            background: Mutex::new(None),
            catalog,
            runtime,
        }))
    }
}

#[uniffi::export]
impl PharmacyCore {
    // =========================================================================
    // Browsing
    // =========================================================================

    /// All medicines, from the store or the offline snapshot.
    pub fn list_medicines(&self) -> Vec<FfiMedicine> {
        let all = self.runtime.block_on(self.catalog.list());
        all.into_iter().map(|m| m.into()).collect()
    }

    pub fn search_medicines(&self, query: String, by: FfiSearchBy) -> Vec<FfiMedicine> {
        let found = self.runtime.block_on(self.catalog.search(&query, by.into()));
        found.into_iter().map(|m| m.into()).collect()
    }

    /// Medicines sharing a formula (case-insensitive).
    pub fn related_medicines(&self, formula: String) -> Vec<FfiMedicine> {
        let found = self.runtime.block_on(self.catalog.related(&formula));
        found.into_iter().map(|m| m.into()).collect()
    }

    /// Alternatives to a medicine under attribute toggles.
    pub fn alternatives(
        &self,
        id: String,
        filter: FfiAttributeFilter,
    ) -> Result<Vec<FfiMedicine>, PharmacyError> {
        let found = self
            .runtime
            .block_on(self.catalog.alternatives(&id, filter.into()))?;
        Ok(found.into_iter().map(|m| m.into()).collect())
    }

    /// Formulation labels offered by the entry form.
    pub fn known_formulations(&self) -> Vec<String> {
        models::KNOWN_FORMULATIONS.iter().map(|f| f.to_string()).collect()
    }

    // =========================================================================
    // Admin Session
    // =========================================================================

    pub fn login(&self, password: String) -> bool {
        self.catalog.login(&password)
    }

    pub fn logout(&self) {
        self.catalog.logout();
    }

    pub fn is_admin(&self) -> bool {
        self.catalog.is_admin()
    }

    // =========================================================================
    // Mutations (admin only)
    // =========================================================================

    pub fn add_medicine(&self, medicine: FfiNewMedicine) -> Result<FfiMedicine, PharmacyError> {
        let added = self.runtime.block_on(self.catalog.add(medicine.into()))?;
        Ok(added.into())
    }

    pub fn update_medicine(
        &self,
        id: String,
        patch: FfiMedicinePatch,
    ) -> Result<FfiMedicine, PharmacyError> {
        let updated = self
            .runtime
            .block_on(self.catalog.update(&id, patch.into()))?;
        Ok(updated.into())
    }

    pub fn delete_medicine(&self, id: String) -> Result<(), PharmacyError> {
        self.runtime.block_on(self.catalog.delete(&id))?;
        Ok(())
    }

    /// Add several medicines. Returns how many were stored.
    pub fn bulk_add(&self, medicines: Vec<FfiNewMedicine>) -> Result<u32, PharmacyError> {
        let rows = medicines.into_iter().map(|m| m.into()).collect();
        let outcome = self.runtime.block_on(self.catalog.bulk_add(rows))?;
        Ok(outcome.added.len() as u32)
    }

    /// Seed the sample catalog if the store is empty.
    pub fn seed_defaults(&self) -> Result<(), PharmacyError> {
        self.runtime.block_on(self.catalog.seed_defaults())?;
        Ok(())
    }

    // =========================================================================
    // CSV
    // =========================================================================

    /// Parse and validate a CSV file without importing it.
    pub fn preview_csv(&self, content: String) -> FfiCsvPreview {
        self.runtime.block_on(self.catalog.preview_csv(&content)).into()
    }

    /// Check an uploaded file, then preview it.
    pub fn preview_upload(&self, file: FfiUploadedFile) -> FfiCsvPreview {
        let files = [file.into()];
        self.runtime
            .block_on(self.catalog.preview_upload(&files))
            .into()
    }

    pub fn import_csv(
        &self,
        content: String,
        skip_duplicates: bool,
    ) -> Result<FfiImportReport, PharmacyError> {
        let report = self
            .runtime
            .block_on(self.catalog.import_csv(&content, skip_duplicates))?;
        Ok(report.into())
    }

    pub fn import_upload(
        &self,
        file: FfiUploadedFile,
        skip_duplicates: bool,
    ) -> Result<FfiImportReport, PharmacyError> {
        let files = [file.into()];
        let report = self
            .runtime
            .block_on(self.catalog.import_upload(&files, skip_duplicates))?;
        Ok(report.into())
    }

    pub fn export_csv(&self) -> Result<FfiCsvExport, PharmacyError> {
        let export = self.runtime.block_on(self.catalog.export_csv())?;
        Ok(FfiCsvExport {
            file_name: export.file_name,
            content: export.content,
        })
    }

    pub fn csv_template(&self) -> Result<String, PharmacyError> {
        export::csv_template().map_err(|e| PharmacyError::ImportFailed(e.to_string()))
    }

    // =========================================================================
    // Sync
    // =========================================================================

    pub fn should_sync(&self) -> bool {
        self.catalog.should_sync()
    }

    /// Fetch from the store now and report where the data came from.
    pub fn sync_now(&self) -> FfiSyncStatus {
        let resolved = self.runtime.block_on(self.catalog.refresh());
        FfiSyncStatus {
            source: format!("{:?}", resolved.source),
            last_synced_at: self
                .catalog
                .sync()
                .last_synced_at()
                .map(|t| t.to_rfc3339()),
            medicine_count: resolved.medicines.len() as u32,
        }
    }

    /// Start the periodic staleness check. No-op if already running.
    pub fn start_background_sync(&self) -> Result<(), PharmacyError> {
        let mut background = self.background.lock()?;
        if background.as_ref().is_some_and(|b| b.is_running()) {
            return Ok(());
        }
        let _guard = self.runtime.enter();
        *background = Some(self.catalog.start_background_sync());
        Ok(())
    }

    pub fn stop_background_sync(&self) -> Result<(), PharmacyError> {
        if let Some(background) = self.background.lock()?.take() {
            background.stop();
        }
        Ok(())
    }

    /// Latest collection published by the background task.
    pub fn background_snapshot(&self) -> Result<Vec<FfiMedicine>, PharmacyError> {
        let background = self.background.lock()?;
        Ok(background
            .as_ref()
            .map(|b| b.latest().into_iter().map(|m| m.into()).collect())
            .unwrap_or_default())
    }
}

// =========================================================================
// FFI Types
// =========================================================================

/// FFI-safe medicine.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiMedicine {
    pub id: String,
    pub name: String,
    pub formula: String,
    pub dosage: String,
    pub formulation: String,
    pub stock: u32,
    pub stock_status: String,
}

impl From<Medicine> for FfiMedicine {
    fn from(medicine: Medicine) -> Self {
        let stock_status = match medicine.stock_status() {
            StockStatus::OutOfStock => "out_of_stock",
            StockStatus::Low => "low",
            StockStatus::InStock => "in_stock",
        };
        Self {
            id: medicine.id,
            name: medicine.name,
            formula: medicine.formula,
            dosage: medicine.dosage,
            formulation: medicine.formulation,
            stock: medicine.stock,
            stock_status: stock_status.to_string(),
        }
    }
}

/// FFI-safe unsaved medicine.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiNewMedicine {
    pub name: String,
    pub formula: String,
    pub dosage: String,
    pub formulation: String,
    pub stock: u32,
}

impl From<FfiNewMedicine> for NewMedicine {
    fn from(m: FfiNewMedicine) -> Self {
        NewMedicine {
            name: m.name,
            formula: m.formula,
            dosage: m.dosage,
            formulation: m.formulation,
            stock: m.stock,
        }
    }
}

impl From<NewMedicine> for FfiNewMedicine {
    fn from(m: NewMedicine) -> Self {
        Self {
            name: m.name,
            formula: m.formula,
            dosage: m.dosage,
            formulation: m.formulation,
            stock: m.stock,
        }
    }
}

/// FFI-safe partial update.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiMedicinePatch {
    pub name: Option<String>,
    pub formula: Option<String>,
    pub dosage: Option<String>,
    pub formulation: Option<String>,
    pub stock: Option<u32>,
}

impl From<FfiMedicinePatch> for MedicinePatch {
    fn from(p: FfiMedicinePatch) -> Self {
        MedicinePatch {
            name: p.name,
            formula: p.formula,
            dosage: p.dosage,
            formulation: p.formulation,
            stock: p.stock,
        }
    }
}

#[derive(Debug, Clone, Copy, uniffi::Enum)]
pub enum FfiSearchBy {
    Name,
    Formula,
    Both,
    All,
}

impl From<FfiSearchBy> for SearchBy {
    fn from(by: FfiSearchBy) -> Self {
        match by {
            FfiSearchBy::Name => SearchBy::Name,
            FfiSearchBy::Formula => SearchBy::Formula,
            FfiSearchBy::Both => SearchBy::Both,
            FfiSearchBy::All => SearchBy::All,
        }
    }
}

#[derive(Debug, Clone, Copy, uniffi::Record)]
pub struct FfiAttributeFilter {
    pub formula: bool,
    pub dosage: bool,
    pub formulation: bool,
}

impl From<FfiAttributeFilter> for AttributeFilter {
    fn from(f: FfiAttributeFilter) -> Self {
        AttributeFilter {
            formula: f.formula,
            dosage: f.dosage,
            formulation: f.formulation,
        }
    }
}

/// FFI-safe uploaded file.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiUploadedFile {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl From<FfiUploadedFile> for UploadedFile {
    fn from(f: FfiUploadedFile) -> Self {
        UploadedFile::new(f.file_name, f.mime_type, f.bytes)
    }
}

/// FFI-safe CSV error.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiCsvError {
    pub row: u32,
    pub field: Option<String>,
    pub message: String,
}

impl From<CsvError> for FfiCsvError {
    fn from(e: CsvError) -> Self {
        Self {
            row: e.row as u32,
            field: e.field,
            message: e.message,
        }
    }
}

/// FFI-safe validated row.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiParsedRow {
    pub row: u32,
    pub medicine: FfiNewMedicine,
}

/// FFI-safe duplicate descriptor.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiDuplicate {
    pub row: u32,
    pub name: String,
    pub existing_id: String,
    pub action: String,
}

impl From<DuplicateInfo> for FfiDuplicate {
    fn from(d: DuplicateInfo) -> Self {
        let action = match d.action {
            DuplicateAction::Skip => "skip",
            DuplicateAction::Update => "update",
        };
        Self {
            row: d.row as u32,
            name: d.name,
            existing_id: d.existing_id,
            action: action.to_string(),
        }
    }
}

/// FFI-safe import preview.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiCsvPreview {
    pub valid_records: Vec<FfiParsedRow>,
    pub errors: Vec<FfiCsvError>,
    pub total_rows: u32,
    pub duplicates: Vec<FfiDuplicate>,
}

impl From<CsvParseResult> for FfiCsvPreview {
    fn from(result: CsvParseResult) -> Self {
        Self {
            valid_records: result
                .valid_records
                .into_iter()
                .map(|r| FfiParsedRow {
                    row: r.row as u32,
                    medicine: r.medicine.into(),
                })
                .collect(),
            errors: result.errors.into_iter().map(|e| e.into()).collect(),
            total_rows: result.total_rows as u32,
            duplicates: result.duplicates.into_iter().map(|d| d.into()).collect(),
        }
    }
}

/// FFI-safe import report.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiImportReport {
    pub imported: u32,
    pub skipped_duplicates: u32,
    pub failed: u32,
    pub summary: String,
}

impl From<ImportReport> for FfiImportReport {
    fn from(report: ImportReport) -> Self {
        Self {
            summary: report.summary(),
            imported: report.imported.len() as u32,
            skipped_duplicates: report.skipped_duplicates as u32,
            failed: report.failed.len() as u32,
        }
    }
}

/// FFI-safe CSV export.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiCsvExport {
    pub file_name: String,
    pub content: String,
}

/// FFI-safe sync status.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiSyncStatus {
    /// "Store", "Cache" or "Empty"
    pub source: String,
    pub last_synced_at: Option<String>,
    pub medicine_count: u32,
}
