//! Catalog CSV export and the import template.

use chrono::{NaiveDate, Utc};
use thiserror::Error;

use crate::models::{Medicine, CSV_COLUMNS};

/// Export errors.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("CSV buffer error: {0}")]
    Buffer(String),

    #[error("UTF-8 error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

pub type ExportResult<T> = Result<T, ExportError>;

const TEMPLATE_ROWS: [[&str; 5]; 3] = [
    ["Paracetamol", "C8H9NO2", "500mg", "Tablet", "100"],
    ["Aspirin", "C9H8O4", "325mg", "Tablet", "50"],
    ["Ibuprofen", "C13H18O2", "400mg", "Capsule", "75"],
];

/// Render records as CSV: header first, CRLF between rows, no trailing newline.
pub fn export_csv(records: &[Medicine]) -> ExportResult<String> {
    write_rows(records.iter().map(|m| {
        [
            m.name.clone(),
            m.formula.clone(),
            m.dosage.clone(),
            m.formulation.clone(),
            m.stock.to_string(),
        ]
    }))
}

/// The three-row sample file offered for download.
pub fn csv_template() -> ExportResult<String> {
    write_rows(TEMPLATE_ROWS.iter().map(|row| row.map(str::to_string)))
}

/// `pharmacy-medicines-YYYY-MM-DD.csv`
pub fn export_file_name(date: NaiveDate) -> String {
    format!("pharmacy-medicines-{}.csv", date.format("%Y-%m-%d"))
}

/// Export file name for the current UTC date.
pub fn export_file_name_today() -> String {
    export_file_name(Utc::now().date_naive())
}

fn write_rows<I>(rows: I) -> ExportResult<String>
where
    I: IntoIterator<Item = [String; 5]>,
{
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::CRLF)
        .from_writer(Vec::new());

    writer.write_record(CSV_COLUMNS)?;
    for row in rows {
        writer.write_record(&row)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| ExportError::Buffer(e.to_string()))?;
    let mut text = String::from_utf8(bytes)?;
    if text.ends_with("\r\n") {
        text.truncate(text.len() - 2);
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewMedicine;

    #[test]
    fn test_export_layout() {
        let records = vec![
            Medicine::from_new(
                "1".into(),
                NewMedicine {
                    name: "Calpol".into(),
                    formula: "Paracetamol".into(),
                    dosage: "120 mg, 5ml".into(),
                    formulation: "Syrup".into(),
                    stock: 15,
                },
            ),
            Medicine::from_new("2".into(), NewMedicine::new("Say \"Ah\"")),
        ];

        let csv = export_csv(&records).unwrap();
        assert_eq!(
            csv,
            "name,formula,dosage,formulation,stock\r\n\
             Calpol,Paracetamol,\"120 mg, 5ml\",Syrup,15\r\n\
             \"Say \"\"Ah\"\"\",,,,0"
        );
    }

    #[test]
    fn test_export_empty_collection_is_header_only() {
        assert_eq!(export_csv(&[]).unwrap(), "name,formula,dosage,formulation,stock");
    }

    #[test]
    fn test_template() {
        let template = csv_template().unwrap();
        let lines: Vec<&str> = template.split("\r\n").collect();

        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "name,formula,dosage,formulation,stock");
        assert_eq!(lines[1], "Paracetamol,C8H9NO2,500mg,Tablet,100");
        assert_eq!(lines[3], "Ibuprofen,C13H18O2,400mg,Capsule,75");
    }

    #[test]
    fn test_file_name() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        assert_eq!(export_file_name(date), "pharmacy-medicines-2024-03-07.csv");
        assert!(export_file_name_today().starts_with("pharmacy-medicines-"));
    }
}
