//! Catalog search and cross-referencing.

use serde::{Deserialize, Serialize};

use crate::models::Medicine;

/// Fields a search query is matched against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchBy {
    Name,
    Formula,
    /// Name or formula
    Both,
    /// Name, formula, dosage or formulation
    #[default]
    All,
}

impl SearchBy {
    fn matches(self, medicine: &Medicine, needle: &str) -> bool {
        let hit = |value: &str| value.to_lowercase().contains(needle);
        match self {
            SearchBy::Name => hit(&medicine.name),
            SearchBy::Formula => hit(&medicine.formula),
            SearchBy::Both => hit(&medicine.name) || hit(&medicine.formula),
            SearchBy::All => {
                hit(&medicine.name)
                    || hit(&medicine.formula)
                    || hit(&medicine.dosage)
                    || hit(&medicine.formulation)
            }
        }
    }
}

impl std::str::FromStr for SearchBy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "name" => Ok(SearchBy::Name),
            "formula" => Ok(SearchBy::Formula),
            "both" => Ok(SearchBy::Both),
            "all" => Ok(SearchBy::All),
            other => Err(format!("unknown search field: {}", other)),
        }
    }
}

/// Case-insensitive substring search. A blank query matches everything.
pub fn search<'a>(records: &'a [Medicine], query: &str, by: SearchBy) -> Vec<&'a Medicine> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return records.iter().collect();
    }
    records.iter().filter(|m| by.matches(m, &needle)).collect()
}

/// Records sharing a formula, compared case-insensitively.
pub fn related_by_formula<'a>(records: &'a [Medicine], formula: &str) -> Vec<&'a Medicine> {
    let formula = formula.to_lowercase();
    records
        .iter()
        .filter(|m| m.formula.to_lowercase() == formula)
        .collect()
}

/// Attribute toggles for finding alternatives to a selected record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeFilter {
    pub formula: bool,
    pub dosage: bool,
    pub formulation: bool,
}

impl Default for AttributeFilter {
    fn default() -> Self {
        Self {
            formula: true,
            dosage: false,
            formulation: false,
        }
    }
}

impl AttributeFilter {
    pub fn is_active(&self) -> bool {
        self.formula || self.dosage || self.formulation
    }

    /// The selected record plus every record matching all active toggles exactly.
    ///
    /// With no active toggle only the selected record is returned.
    pub fn apply<'a>(&self, records: &'a [Medicine], selected: &Medicine) -> Vec<&'a Medicine> {
        records
            .iter()
            .filter(|m| {
                if m.id == selected.id {
                    return true;
                }
                self.is_active()
                    && (!self.formula || m.formula == selected.formula)
                    && (!self.dosage || m.dosage == selected.dosage)
                    && (!self.formulation || m.formulation == selected.formulation)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewMedicine;

    fn catalog() -> Vec<Medicine> {
        [
            ("1", "Panadol", "Paracetamol", "500 mg", "Tablet"),
            ("2", "Calpol", "Paracetamol", "120 mg/5ml", "Syrup"),
            ("3", "Tylenol", "paracetamol", "500 mg", "Tablet"),
            ("4", "Advil", "Ibuprofen", "400 mg", "Tablet"),
        ]
        .into_iter()
        .map(|(id, name, formula, dosage, formulation)| {
            Medicine::from_new(
                id.into(),
                NewMedicine {
                    name: name.into(),
                    formula: formula.into(),
                    dosage: dosage.into(),
                    formulation: formulation.into(),
                    stock: 1,
                },
            )
        })
        .collect()
    }

    fn ids(found: Vec<&Medicine>) -> Vec<&str> {
        found.into_iter().map(|m| m.id.as_str()).collect()
    }

    #[test]
    fn test_search_fields() {
        let records = catalog();

        assert_eq!(ids(search(&records, "  ", SearchBy::All)).len(), 4);
        assert_eq!(ids(search(&records, "PARA", SearchBy::Formula)), vec!["1", "2", "3"]);
        assert!(search(&records, "para", SearchBy::Name).is_empty());
        assert_eq!(ids(search(&records, "syrup", SearchBy::All)), vec!["2"]);
        assert!(search(&records, "syrup", SearchBy::Both).is_empty());
        assert_eq!(ids(search(&records, "adv", SearchBy::Both)), vec!["4"]);
    }

    #[test]
    fn test_search_by_parse() {
        assert_eq!("Both".parse::<SearchBy>(), Ok(SearchBy::Both));
        assert!("dosage".parse::<SearchBy>().is_err());
    }

    #[test]
    fn test_related_by_formula() {
        let records = catalog();
        assert_eq!(ids(related_by_formula(&records, "PARACETAMOL")), vec!["1", "2", "3"]);
        assert!(related_by_formula(&records, "Aspirin").is_empty());
    }

    #[test]
    fn test_attribute_filter() {
        let records = catalog();
        let selected = records[0].clone();

        // Formula match is exact, so "paracetamol" (id 3) is left out
        let default = AttributeFilter::default();
        assert_eq!(ids(default.apply(&records, &selected)), vec!["1", "2"]);

        let dosage_only = AttributeFilter {
            formula: false,
            dosage: true,
            formulation: false,
        };
        assert_eq!(ids(dosage_only.apply(&records, &selected)), vec!["1", "3"]);

        let none = AttributeFilter {
            formula: false,
            dosage: false,
            formulation: false,
        };
        assert_eq!(ids(none.apply(&records, &selected)), vec!["1"]);
    }
}
