//! Property tests for parsing, duplicate detection and the merge policy.

use pharmacy_core::export::export_csv;
use pharmacy_core::import::{filter_duplicates, find_duplicates, parse_csv, ParsedRow};
use pharmacy_core::models::{Medicine, NewMedicine, CSV_COLUMNS};
use proptest::prelude::*;

// ============================================================================
// Strategies
// ============================================================================

fn arb_text() -> impl Strategy<Value = String> {
    "[A-Za-z0-9 ,\"/.-]{0,12}".prop_map(|s| s.trim().to_string())
}

fn arb_name() -> impl Strategy<Value = String> {
    "[A-Za-z][A-Za-z0-9 ,\"-]{0,14}[A-Za-z0-9]"
}

fn arb_medicine() -> impl Strategy<Value = NewMedicine> {
    (arb_name(), arb_text(), arb_text(), arb_text(), 0u32..100_000).prop_map(
        |(name, formula, dosage, formulation, stock)| NewMedicine {
            name,
            formula,
            dosage,
            formulation,
            stock,
        },
    )
}

fn arb_bad_stock() -> impl Strategy<Value = String> {
    prop_oneof![
        (-1_000_000i64..0).prop_map(|n| n.to_string()),
        (-1000.0f64..-0.001).prop_map(|f| format!("{:.3}", f)),
        "[a-z]{1,6}",
    ]
}

fn stored(records: &[NewMedicine]) -> Vec<Medicine> {
    records
        .iter()
        .enumerate()
        .map(|(i, m)| Medicine::from_new(format!("id-{}", i), m.clone()))
        .collect()
}

fn rows(records: &[NewMedicine]) -> Vec<ParsedRow> {
    records
        .iter()
        .enumerate()
        .map(|(i, m)| ParsedRow {
            row: i + 1,
            medicine: m.clone(),
        })
        .collect()
}

fn csv_line(fields: &[&str]) -> String {
    fields.join(",")
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn prop_missing_header_yields_single_row_zero_error(
        drop_mask in 1u8..32,
        data_rows in 0usize..6,
    ) {
        let headers: Vec<&str> = CSV_COLUMNS
            .iter()
            .enumerate()
            .filter(|(i, _)| drop_mask & (1 << i) == 0)
            .map(|(_, c)| *c)
            .collect();
        let mut text = csv_line(&headers);
        for i in 0..data_rows {
            let row: Vec<String> = headers.iter().map(|_| format!("v{}", i)).collect();
            text.push('\n');
            text.push_str(&row.join(","));
        }

        let result = parse_csv(&text, &[]);
        prop_assert!(result.valid_records.is_empty());
        prop_assert_eq!(result.errors.len(), 1);
        prop_assert_eq!(result.errors[0].row, 0);
    }

    #[test]
    fn prop_blank_name_excluded_with_one_name_error(
        blank in " {0,4}",
        position in 0usize..4,
        others in prop::collection::vec(arb_medicine(), 3),
    ) {
        let mut lines = vec![CSV_COLUMNS.join(",")];
        let blank_line = format!("{},Formula,5 mg,Tablet,3", blank);
        let mut data: Vec<String> = others
            .iter()
            .map(|m| {
                let export = export_csv(&stored(std::slice::from_ref(m))).unwrap();
                export.split("\r\n").nth(1).unwrap_or_default().to_string()
            })
            .collect();
        data.insert(position, blank_line);
        lines.extend(data);

        let result = parse_csv(&lines.join("\n"), &[]);
        prop_assert_eq!(result.valid_records.len(), 3);
        prop_assert_eq!(result.errors.len(), 1);
        prop_assert_eq!(result.errors[0].row, position + 1);
        prop_assert_eq!(result.errors[0].field.as_deref(), Some("name"));
    }

    #[test]
    fn prop_bad_stock_excluded_with_one_stock_error(stock in arb_bad_stock()) {
        let text = format!("name,formula,dosage,formulation,stock\nAdvil,Ibuprofen,400 mg,Tablet,{}", stock);
        let result = parse_csv(&text, &[]);

        prop_assert!(result.valid_records.is_empty());
        prop_assert_eq!(result.errors.len(), 1);
        prop_assert_eq!(result.errors[0].field.as_deref(), Some("stock"));
    }

    #[test]
    fn prop_export_import_round_trip(records in prop::collection::vec(arb_medicine(), 1..12)) {
        let exported = export_csv(&stored(&records)).unwrap();
        let parsed = parse_csv(&exported, &[]);

        prop_assert!(parsed.errors.is_empty(), "errors: {:?}", parsed.errors);
        prop_assert_eq!(parsed.medicines(), records.clone());

        let again = export_csv(&stored(&parsed.medicines())).unwrap();
        prop_assert_eq!(again, exported);
    }

    #[test]
    fn prop_duplicates_ignore_stock_and_case(
        record in arb_medicine(),
        other_stock in 0u32..1000,
    ) {
        let existing = stored(&[record.clone()]);
        let candidate = NewMedicine {
            name: record.name.to_uppercase(),
            formula: format!(" {} ", record.formula.to_lowercase()),
            stock: other_stock,
            ..record.clone()
        };

        let dups = find_duplicates(&rows(&[candidate]), &existing);
        prop_assert_eq!(dups.len(), 1);
        prop_assert_eq!(&dups[0].existing_id, "id-0");
    }

    #[test]
    fn prop_filter_is_idempotent_and_order_insensitive(
        candidates in prop::collection::vec(arb_medicine(), 0..10),
        existing in prop::collection::vec(arb_medicine(), 0..6),
        skip in any::<bool>(),
    ) {
        let mut pool = candidates.clone();
        pool.extend(existing.iter().take(3).cloned());
        let parsed = rows(&pool);
        let stored_records = stored(&existing);
        let dups = find_duplicates(&parsed, &stored_records);

        let once = filter_duplicates(&parsed, &dups, skip);
        let twice = filter_duplicates(&parsed, &dups, skip);
        prop_assert_eq!(&once, &twice);

        if skip {
            // Reversing candidates reverses survivors
            let mut reversed = parsed.clone();
            reversed.reverse();
            let mut survivors = filter_duplicates(&reversed, &dups, true);
            survivors.reverse();
            prop_assert_eq!(survivors, once);
        } else {
            prop_assert_eq!(once.len(), pool.len());
        }
    }
}
