//! CSV parsing and per-row validation.

use serde::{Deserialize, Serialize};

use super::{find_duplicates, DuplicateInfo};
use crate::models::{Medicine, NewMedicine, CSV_COLUMNS};

/// A problem found while reading a CSV file.
///
/// Row 0 means the whole file is unusable; other rows are 1-based data rows
/// (the header is not counted).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CsvError {
    pub row: usize,
    pub field: Option<String>,
    pub message: String,
}

impl CsvError {
    /// Error that rejects the whole file.
    pub fn file(message: impl Into<String>) -> Self {
        Self {
            row: 0,
            field: None,
            message: message.into(),
        }
    }

    pub fn row(row: usize, message: impl Into<String>) -> Self {
        Self {
            row,
            field: None,
            message: message.into(),
        }
    }

    pub fn field(row: usize, field: &str, message: impl Into<String>) -> Self {
        Self {
            row,
            field: Some(field.to_string()),
            message: message.into(),
        }
    }

    pub fn is_structural(&self) -> bool {
        self.row == 0
    }
}

/// A validated row and the data row it came from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParsedRow {
    pub row: usize,
    pub medicine: NewMedicine,
}

/// Everything learned from one CSV file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CsvParseResult {
    pub valid_records: Vec<ParsedRow>,
    pub errors: Vec<CsvError>,
    /// Data rows seen, valid or not
    pub total_rows: usize,
    pub duplicates: Vec<DuplicateInfo>,
}

impl CsvParseResult {
    fn rejected(error: CsvError, total_rows: usize) -> Self {
        Self {
            errors: vec![error],
            total_rows,
            ..Default::default()
        }
    }

    /// The validated records in row order.
    pub fn medicines(&self) -> Vec<NewMedicine> {
        self.valid_records.iter().map(|r| r.medicine.clone()).collect()
    }

    /// True when a file-level error stopped row processing.
    pub fn is_rejected(&self) -> bool {
        self.errors.iter().any(CsvError::is_structural)
    }
}

pub const EMPTY_FILE_MESSAGE: &str = "CSV file is empty or contains no valid data";
pub const NAME_REQUIRED_MESSAGE: &str = "Name is required and cannot be empty";
pub const INVALID_STOCK_MESSAGE: &str = "Stock must be a non-negative number";
pub const STOCK_TOO_LARGE_MESSAGE: &str = "Stock is too large";

/// Parse CSV text into validated records plus errors.
///
/// Pure: the only input besides `text` is `existing`, used to flag rows that
/// duplicate a stored record.
pub fn parse_csv(text: &str, existing: &[Medicine]) -> CsvParseResult {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = match reader.headers() {
        Ok(headers) => headers.iter().map(|h| h.trim().to_lowercase()).collect(),
        Err(e) => {
            let error = CsvError::file(format!("Failed to parse CSV: {}", e));
            return CsvParseResult::rejected(error, 0);
        }
    };

    let records: Vec<Result<csv::StringRecord, csv::Error>> = reader.records().collect();
    if records.is_empty() {
        return CsvParseResult::rejected(CsvError::file(EMPTY_FILE_MESSAGE), 0);
    }

    let missing: Vec<&str> = CSV_COLUMNS
        .iter()
        .copied()
        .filter(|column| !headers.iter().any(|h| h == column))
        .collect();
    if !missing.is_empty() {
        return CsvParseResult::rejected(
            CsvError::file(format!(
                "Missing required headers: {}. Expected: {}",
                missing.join(", "),
                CSV_COLUMNS.join(", ")
            )),
            records.len(),
        );
    }

    let columns = ColumnIndex::new(&headers);
    let mut result = CsvParseResult {
        total_rows: records.len(),
        ..Default::default()
    };

    for (index, record) in records.into_iter().enumerate() {
        let row = index + 1;
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                result.errors.push(CsvError::row(row, format!("Parse error: {}", e)));
                continue;
            }
        };

        // Width mismatches are reported but the row is still validated
        if record.len() != headers.len() {
            let shape = if record.len() < headers.len() { "few" } else { "many" };
            result.errors.push(CsvError::row(
                row,
                format!(
                    "Parse error: Too {} fields: expected {} fields but parsed {}",
                    shape,
                    headers.len(),
                    record.len()
                ),
            ));
        }

        match validate_row(&columns, &record, row) {
            Ok(medicine) => result.valid_records.push(ParsedRow { row, medicine }),
            Err(error) => result.errors.push(error),
        }
    }

    if !result.valid_records.is_empty() && !existing.is_empty() {
        result.duplicates = find_duplicates(&result.valid_records, existing);
    }

    tracing::debug!(
        "Parsed {} rows: {} valid, {} errors, {} duplicates",
        result.total_rows,
        result.valid_records.len(),
        result.errors.len(),
        result.duplicates.len()
    );
    result
}

/// Positions of the known columns in the header row.
struct ColumnIndex {
    name: usize,
    formula: usize,
    dosage: usize,
    formulation: usize,
    stock: usize,
}

impl ColumnIndex {
    // Only called once every column is known to be present
    fn new(headers: &[String]) -> Self {
        let find = |column: &str| headers.iter().position(|h| h == column).unwrap_or(usize::MAX);
        Self {
            name: find("name"),
            formula: find("formula"),
            dosage: find("dosage"),
            formulation: find("formulation"),
            stock: find("stock"),
        }
    }
}

fn validate_row(
    columns: &ColumnIndex,
    record: &csv::StringRecord,
    row: usize,
) -> Result<NewMedicine, CsvError> {
    let text = |index: usize| record.get(index).map(str::trim).unwrap_or("");

    let name = text(columns.name);
    if name.is_empty() {
        return Err(CsvError::field(row, "name", NAME_REQUIRED_MESSAGE));
    }

    let stock = parse_stock(text(columns.stock))
        .map_err(|message| CsvError::field(row, "stock", message))?;

    Ok(NewMedicine {
        name: name.to_string(),
        formula: text(columns.formula).to_string(),
        dosage: text(columns.dosage).to_string(),
        formulation: text(columns.formulation).to_string(),
        stock,
    })
}

/// Empty means 0. Otherwise a finite, non-negative number, floored, that fits in a `u32`.
fn parse_stock(raw: &str) -> Result<u32, &'static str> {
    if raw.is_empty() {
        return Ok(0);
    }
    let value: f64 = raw.parse().map_err(|_| INVALID_STOCK_MESSAGE)?;
    if !value.is_finite() || value < 0.0 {
        return Err(INVALID_STOCK_MESSAGE);
    }
    if value.floor() > f64::from(u32::MAX) {
        return Err(STOCK_TOO_LARGE_MESSAGE);
    }
    Ok(value.floor() as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "name,formula,dosage,formulation,stock";

    #[test]
    fn test_single_valid_row() {
        let result = parse_csv(&format!("{}\nParacetamol,C8H9NO2,500mg,Tablet,100", HEADER), &[]);

        assert_eq!(result.total_rows, 1);
        assert!(result.errors.is_empty());
        assert!(result.duplicates.is_empty());
        assert_eq!(result.valid_records.len(), 1);

        let parsed = &result.valid_records[0];
        assert_eq!(parsed.row, 1);
        assert_eq!(parsed.medicine.name, "Paracetamol");
        assert_eq!(parsed.medicine.formula, "C8H9NO2");
        assert_eq!(parsed.medicine.stock, 100);
    }

    #[test]
    fn test_headers_are_case_and_space_insensitive() {
        let text = " Name , FORMULA,Dosage,formulation , Stock\nAdvil,Ibuprofen,400 mg,Tablet,5";
        let result = parse_csv(text, &[]);
        assert_eq!(result.valid_records.len(), 1);
        assert!(result.errors.is_empty());
    }

    #[test]
    fn test_column_order_and_extra_columns() {
        let text = "stock,notes,formulation,dosage,formula,name\n7,x,Syrup,5 ml,Cetirizine,Zyrtec";
        let result = parse_csv(text, &[]);

        let medicine = &result.valid_records[0].medicine;
        assert_eq!(medicine.name, "Zyrtec");
        assert_eq!(medicine.formulation, "Syrup");
        assert_eq!(medicine.stock, 7);
    }

    #[test]
    fn test_missing_header_rejects_file() {
        let result = parse_csv("name,formula,dosage,stock\nAdvil,Ibuprofen,400 mg,5\nBrufen,,,", &[]);

        assert!(result.valid_records.is_empty());
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].row, 0);
        assert_eq!(
            result.errors[0].message,
            "Missing required headers: formulation. Expected: name, formula, dosage, formulation, stock"
        );
        assert!(result.is_rejected());
    }

    #[test]
    fn test_empty_file() {
        for text in ["", HEADER, "\n\n", "\u{feff}name,formula,dosage,formulation,stock\n"] {
            let result = parse_csv(text, &[]);
            assert_eq!(result.errors, vec![CsvError::file(EMPTY_FILE_MESSAGE)], "input {:?}", text);
            assert_eq!(result.total_rows, 0);
        }
    }

    #[test]
    fn test_blank_name_row() {
        let result = parse_csv(&format!("{}\nAdvil,,,,\n,C8H9NO2,500mg,Tablet,100", HEADER), &[]);

        assert_eq!(result.valid_records.len(), 1);
        assert_eq!(result.errors, vec![CsvError::field(2, "name", NAME_REQUIRED_MESSAGE)]);
    }

    #[test]
    fn test_stock_rules() {
        let text = format!(
            "{}\nA,,,,\nB,,,,12.9\nC,,,,-1\nD,,,,lots\nE,,,, 4 \nF,,,,NaN\nG,,,,1e2",
            HEADER
        );
        let result = parse_csv(&text, &[]);

        let stocks: Vec<(String, u32)> = result
            .valid_records
            .iter()
            .map(|r| (r.medicine.name.clone(), r.medicine.stock))
            .collect();
        assert_eq!(
            stocks,
            vec![
                ("A".to_string(), 0),
                ("B".to_string(), 12),
                ("E".to_string(), 4),
                ("G".to_string(), 100)
            ]
        );

        let bad_rows: Vec<usize> = result.errors.iter().map(|e| e.row).collect();
        assert_eq!(bad_rows, vec![3, 4, 6]);
        assert!(result
            .errors
            .iter()
            .all(|e| e.field.as_deref() == Some("stock") && e.message == INVALID_STOCK_MESSAGE));
    }

    #[test]
    fn test_stock_beyond_range_has_its_own_message() {
        let text = format!(
            "{}\nA,,,,99999999999\nB,,,,4294967295\nC,,,,-3",
            HEADER
        );
        let result = parse_csv(&text, &[]);

        assert_eq!(result.valid_records.len(), 1);
        assert_eq!(result.valid_records[0].medicine.stock, u32::MAX);
        assert_eq!(
            result.errors,
            vec![
                CsvError::field(1, "stock", STOCK_TOO_LARGE_MESSAGE),
                CsvError::field(3, "stock", INVALID_STOCK_MESSAGE),
            ]
        );
    }

    #[test]
    fn test_fields_are_trimmed_and_quoted_commas_kept() {
        let text = format!("{}\n\"  Calpol \",Paracetamol,\"120 mg, 5ml\", Syrup ,15", HEADER);
        let result = parse_csv(&text, &[]);

        let medicine = &result.valid_records[0].medicine;
        assert_eq!(medicine.name, "Calpol");
        assert_eq!(medicine.dosage, "120 mg, 5ml");
        assert_eq!(medicine.formulation, "Syrup");
    }

    #[test]
    fn test_short_row_reports_parse_error_and_still_validates() {
        let result = parse_csv(&format!("{}\nAdvil,Ibuprofen", HEADER), &[]);

        assert_eq!(result.valid_records.len(), 1);
        assert_eq!(result.valid_records[0].medicine.stock, 0);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].row, 1);
        assert!(result.errors[0].message.starts_with("Parse error: Too few fields"));
    }

    #[test]
    fn test_blank_lines_skipped() {
        let result = parse_csv(&format!("{}\n\nAdvil,,,,1\n\nBrufen,,,,2\n", HEADER), &[]);
        assert_eq!(result.total_rows, 2);
        assert_eq!(result.valid_records[1].row, 2);
    }

    #[test]
    fn test_crlf_line_endings() {
        let result = parse_csv(&format!("{}\r\nAdvil,Ibuprofen,400 mg,Tablet,22\r\n", HEADER), &[]);
        assert_eq!(result.valid_records[0].medicine.stock, 22);
        assert!(result.errors.is_empty());
    }

    #[test]
    fn test_flags_duplicates_of_existing() {
        let existing = vec![Medicine::from_new(
            "m-1".into(),
            NewMedicine {
                name: "Paracetamol".into(),
                formula: "C8H9NO2".into(),
                dosage: "500mg".into(),
                formulation: "Tablet".into(),
                stock: 3,
            },
        )];
        let result = parse_csv(&format!("{}\nparacetamol,c8h9no2,500MG,tablet,100", HEADER), &existing);

        assert_eq!(result.duplicates.len(), 1);
        assert_eq!(result.duplicates[0].existing_id, "m-1");
        assert_eq!(result.valid_records.len(), 1);
    }
}
