//! Composite duplicate key.

use super::MedicineFields;

/// Normalized (name, dosage, formulation, formula) tuple.
///
/// Stock is deliberately not part of the key: two records that differ only
/// in stock describe the same product.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CompositeKey {
    pub name: String,
    pub dosage: String,
    pub formulation: String,
    pub formula: String,
}

/// Build the duplicate key for any medicine-like record.
pub fn normalized_key<R: MedicineFields + ?Sized>(record: &R) -> CompositeKey {
    CompositeKey {
        name: normalize(record.name()),
        dosage: normalize(record.dosage()),
        formulation: normalize(record.formulation()),
        formula: normalize(record.formula()),
    }
}

fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Medicine, NewMedicine};

    #[test]
    fn test_key_ignores_case_whitespace_and_stock() {
        let stored = Medicine::from_new(
            "abc".into(),
            NewMedicine {
                name: "Panadol".into(),
                formula: "Paracetamol".into(),
                dosage: "500 mg".into(),
                formulation: "Tablet".into(),
                stock: 4,
            },
        );
        let candidate = NewMedicine {
            name: "  PANADOL ".into(),
            formula: "paracetamol".into(),
            dosage: "500 MG".into(),
            formulation: "tablet ".into(),
            stock: 900,
        };

        assert_eq!(normalized_key(&stored), normalized_key(&candidate));
    }

    #[test]
    fn test_key_distinguishes_dosage() {
        let a = NewMedicine {
            name: "Advil".into(),
            dosage: "200 mg".into(),
            ..Default::default()
        };
        let b = NewMedicine {
            name: "Advil".into(),
            dosage: "400 mg".into(),
            ..Default::default()
        };
        assert_ne!(normalized_key(&a), normalized_key(&b));
    }
}
