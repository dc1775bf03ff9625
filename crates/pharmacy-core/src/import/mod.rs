//! CSV import pipeline.
//!
//! Text flows through four steps:
//! 1. [`parse_csv`] validates rows and flags duplicates of stored records
//! 2. [`filter_duplicates`] applies the merge policy
//! 3. surviving records are persisted through the [`CatalogSync`]
//! 4. an [`ImportReport`] (or [`ImportError`]) describes the outcome
//!
//! Validation problems are returned as data. Only the final outcome is an
//! error, and "nothing new to import" is kept apart from "store failed".

mod duplicates;
mod merge;
mod parser;
mod upload;

pub use duplicates::*;
pub use merge::*;
pub use parser::*;
pub use upload::*;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{Medicine, NewMedicine};
use crate::sync::CatalogSync;

/// Why an import persisted nothing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ImportError {
    #[error("{0}")]
    Rejected(#[from] UploadRejection),

    #[error("CSV contains no valid medicines ({} error(s))", .errors.len())]
    Invalid { errors: Vec<CsvError> },

    #[error("No medicines to import (all entries were duplicates).")]
    NothingToImport { duplicates: usize },

    #[error("Failed to import medicines. Please try again.")]
    StoreUnavailable { attempted: usize },
}

pub type ImportResult<T> = Result<T, ImportError>;

/// Outcome of an import that persisted at least one record.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImportReport {
    pub imported: Vec<Medicine>,
    pub skipped_duplicates: usize,
    /// Records that passed validation but the store did not accept
    pub failed: Vec<NewMedicine>,
    /// Row errors from the file; those rows were not imported
    pub row_errors: Vec<CsvError>,
}

impl ImportReport {
    /// User-facing summary line.
    pub fn summary(&self) -> String {
        let mut message = format!("Successfully imported {} medicine(s)!", self.imported.len());
        if self.skipped_duplicates > 0 {
            message.push_str(&format!(" {} duplicate(s) were skipped.", self.skipped_duplicates));
        }
        if !self.failed.is_empty() {
            message.push_str(&format!(" {} could not be saved.", self.failed.len()));
        }
        message
    }
}

/// Runs CSV imports against a catalog.
pub struct Importer<'a> {
    sync: &'a CatalogSync,
    skip_duplicates: bool,
    max_upload_bytes: usize,
}

impl<'a> Importer<'a> {
    pub fn new(sync: &'a CatalogSync) -> Self {
        Self {
            sync,
            skip_duplicates: true,
            max_upload_bytes: MAX_UPLOAD_BYTES,
        }
    }

    /// Persist rows even when they match a stored record.
    pub fn keep_duplicates(mut self) -> Self {
        self.skip_duplicates = false;
        self
    }

    pub fn with_max_upload_bytes(mut self, max_upload_bytes: usize) -> Self {
        self.max_upload_bytes = max_upload_bytes;
        self
    }

    /// Parse against the current collection without writing anything.
    pub async fn preview(&self, text: &str) -> CsvParseResult {
        let existing = self.sync.get_all().await;
        parse_csv(text, &existing)
    }

    /// Check an upload, then preview it. Rejections become a row-0 error.
    pub async fn preview_upload(&self, files: &[UploadedFile]) -> CsvParseResult {
        match check_upload(files, self.max_upload_bytes) {
            Ok(text) => self.preview(&text).await,
            Err(rejection) => CsvParseResult {
                errors: vec![CsvError::from(rejection)],
                ..Default::default()
            },
        }
    }

    /// Parse and persist in one step.
    pub async fn import_text(&self, text: &str) -> ImportResult<ImportReport> {
        let parsed = self.preview(text).await;
        self.commit(&parsed).await
    }

    pub async fn import_upload(&self, files: &[UploadedFile]) -> ImportResult<ImportReport> {
        let text = check_upload(files, self.max_upload_bytes)?;
        self.import_text(&text).await
    }

    /// Persist a previously parsed file.
    pub async fn commit(&self, parsed: &CsvParseResult) -> ImportResult<ImportReport> {
        if parsed.valid_records.is_empty() {
            return Err(ImportError::Invalid {
                errors: parsed.errors.clone(),
            });
        }

        let batch = filter_duplicates(&parsed.valid_records, &parsed.duplicates, self.skip_duplicates);
        if batch.is_empty() {
            tracing::info!("Import skipped: all {} row(s) were duplicates", parsed.duplicates.len());
            return Err(ImportError::NothingToImport {
                duplicates: parsed.duplicates.len(),
            });
        }

        let attempted = batch.len();
        let outcome = self.sync.add_many(batch).await;
        if outcome.added.is_empty() {
            return Err(ImportError::StoreUnavailable { attempted });
        }

        let report = ImportReport {
            imported: outcome.added,
            skipped_duplicates: if self.skip_duplicates { parsed.duplicates.len() } else { 0 },
            failed: outcome.failed,
            row_errors: parsed.errors.clone(),
        };
        tracing::info!("{}", report.summary());
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary() {
        let mut report = ImportReport {
            imported: vec![Medicine::from_new("1".into(), NewMedicine::new("Advil"))],
            ..Default::default()
        };
        assert_eq!(report.summary(), "Successfully imported 1 medicine(s)!");

        report.skipped_duplicates = 2;
        assert_eq!(
            report.summary(),
            "Successfully imported 1 medicine(s)! 2 duplicate(s) were skipped."
        );
    }

    #[test]
    fn test_error_messages() {
        let nothing = ImportError::NothingToImport { duplicates: 1 };
        assert_eq!(nothing.to_string(), "No medicines to import (all entries were duplicates).");

        let rejected = ImportError::from(UploadRejection::NoFile);
        assert_eq!(rejected.to_string(), "No file provided");
    }
}
