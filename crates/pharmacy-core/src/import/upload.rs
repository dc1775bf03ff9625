//! Upload guard applied before parsing.

use thiserror::Error;

use super::CsvError;

/// Default import size limit.
pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// MIME types accepted for a CSV upload.
pub const ACCEPTED_MIME_TYPES: [&str; 2] = ["text/csv", "application/vnd.ms-excel"];

/// A file handed to the importer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub file_name: String,
    /// Declared MIME type; empty when the caller could not tell
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(file_name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    /// Guess the MIME type from the extension.
    pub fn from_path_bytes(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let mime_type = if has_csv_extension(&file_name) { "text/csv" } else { "" };
        Self::new(file_name, mime_type, bytes)
    }
}

/// Why an upload was refused.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UploadRejection {
    #[error("No file provided")]
    NoFile,

    #[error("Too many files: only one file can be imported at a time")]
    TooManyFiles,

    #[error("File is larger than {limit} bytes")]
    TooLarge { size: usize, limit: usize },

    #[error("File type must be text/csv or application/vnd.ms-excel (got {0})")]
    UnsupportedType(String),

    #[error("File is not valid UTF-8 text")]
    NotUtf8,
}

impl From<UploadRejection> for CsvError {
    fn from(rejection: UploadRejection) -> Self {
        CsvError::file(format!("File rejected: {}", rejection))
    }
}

fn has_csv_extension(file_name: &str) -> bool {
    file_name.to_lowercase().ends_with(".csv")
}

/// Check an upload and decode it to text.
pub fn check_upload(files: &[UploadedFile], max_bytes: usize) -> Result<String, UploadRejection> {
    let file = match files {
        [] => return Err(UploadRejection::NoFile),
        [file] => file,
        _ => return Err(UploadRejection::TooManyFiles),
    };

    if file.bytes.len() > max_bytes {
        return Err(UploadRejection::TooLarge {
            size: file.bytes.len(),
            limit: max_bytes,
        });
    }

    let mime = file.mime_type.trim().to_lowercase();
    let mime = mime.split(';').next().unwrap_or("").trim();
    let accepted = if mime.is_empty() {
        has_csv_extension(&file.file_name)
    } else {
        ACCEPTED_MIME_TYPES.contains(&mime)
    };
    if !accepted {
        let shown = if mime.is_empty() { file.file_name.as_str() } else { mime };
        return Err(UploadRejection::UnsupportedType(shown.to_string()));
    }

    let text = std::str::from_utf8(&file.bytes).map_err(|_| UploadRejection::NotUtf8)?;
    Ok(text.strip_prefix('\u{feff}').unwrap_or(text).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn csv_file(bytes: &[u8]) -> UploadedFile {
        UploadedFile::new("medicines.csv", "text/csv", bytes.to_vec())
    }

    #[test]
    fn test_accepts_single_csv() {
        let text = check_upload(&[csv_file(b"\xEF\xBB\xBFname\n")], MAX_UPLOAD_BYTES).unwrap();
        assert_eq!(text, "name\n");
    }

    #[test]
    fn test_file_count() {
        assert_eq!(check_upload(&[], MAX_UPLOAD_BYTES), Err(UploadRejection::NoFile));
        assert_eq!(
            check_upload(&[csv_file(b"a"), csv_file(b"b")], MAX_UPLOAD_BYTES),
            Err(UploadRejection::TooManyFiles)
        );
    }

    #[test]
    fn test_size_limit() {
        let file = csv_file(&vec![b'a'; 11]);
        assert!(check_upload(&[file.clone()], 11).is_ok());
        assert_eq!(
            check_upload(&[file], 10),
            Err(UploadRejection::TooLarge { size: 11, limit: 10 })
        );
    }

    #[test]
    fn test_mime_types() {
        let excel = UploadedFile::new("export.csv", "application/vnd.ms-excel", b"x".to_vec());
        assert!(check_upload(&[excel], MAX_UPLOAD_BYTES).is_ok());

        let with_charset = UploadedFile::new("a.csv", "text/csv; charset=utf-8", b"x".to_vec());
        assert!(check_upload(&[with_charset], MAX_UPLOAD_BYTES).is_ok());

        let json = UploadedFile::new("a.json", "application/json", b"{}".to_vec());
        assert!(matches!(
            check_upload(&[json], MAX_UPLOAD_BYTES),
            Err(UploadRejection::UnsupportedType(_))
        ));

        let unknown = UploadedFile::from_path_bytes("notes.txt", b"x".to_vec());
        assert!(check_upload(&[unknown], MAX_UPLOAD_BYTES).is_err());
        let guessed = UploadedFile::from_path_bytes("STOCK.CSV", b"x".to_vec());
        assert!(check_upload(&[guessed], MAX_UPLOAD_BYTES).is_ok());
    }

    #[test]
    fn test_rejection_becomes_row_zero_error() {
        let error = CsvError::from(UploadRejection::NotUtf8);
        assert_eq!(error.row, 0);
        assert_eq!(error.message, "File rejected: File is not valid UTF-8 text");
        assert_eq!(check_upload(&[csv_file(&[0xff, 0xfe])], MAX_UPLOAD_BYTES), Err(UploadRejection::NotUtf8));
    }
}
