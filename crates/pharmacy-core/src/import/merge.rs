//! Import merge policy.

use std::collections::HashSet;

use super::{DuplicateInfo, ParsedRow};
use crate::models::{normalized_key, CompositeKey, NewMedicine};

/// Decide which candidates to persist.
///
/// With `skip_duplicates` every candidate sharing a composite key with a
/// flagged row is dropped. Membership is by key, so reordering candidates
/// does not change the outcome. Survivors keep their relative order.
pub fn filter_duplicates(
    candidates: &[ParsedRow],
    duplicates: &[DuplicateInfo],
    skip_duplicates: bool,
) -> Vec<NewMedicine> {
    if !skip_duplicates {
        return candidates.iter().map(|c| c.medicine.clone()).collect();
    }

    let flagged: HashSet<CompositeKey> = duplicates
        .iter()
        .filter_map(|dup| candidates.iter().find(|c| c.row == dup.row))
        .map(|c| normalized_key(&c.medicine))
        .collect();

    candidates
        .iter()
        .filter(|c| !flagged.contains(&normalized_key(&c.medicine)))
        .map(|c| c.medicine.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::DuplicateAction;

    fn row(row: usize, name: &str) -> ParsedRow {
        ParsedRow {
            row,
            medicine: NewMedicine::new(name),
        }
    }

    fn dup(row: usize) -> DuplicateInfo {
        DuplicateInfo {
            row,
            name: String::new(),
            existing_id: "x".into(),
            action: DuplicateAction::Skip,
        }
    }

    #[test]
    fn test_keep_duplicates_returns_all() {
        let candidates = vec![row(1, "Advil"), row(2, "Brufen")];
        assert_eq!(filter_duplicates(&candidates, &[dup(1)], false).len(), 2);
    }

    #[test]
    fn test_skip_by_key_preserves_order() {
        let candidates = vec![row(1, "Advil"), row(2, "Brufen"), row(3, "advil "), row(4, "Calpol")];
        let kept: Vec<_> = filter_duplicates(&candidates, &[dup(1)], true)
            .into_iter()
            .map(|m| m.name)
            .collect();

        assert_eq!(kept, vec!["Brufen", "Calpol"]);
    }

    #[test]
    fn test_unknown_row_filters_nothing() {
        let candidates = vec![row(1, "Advil")];
        assert_eq!(filter_duplicates(&candidates, &[dup(9)], true).len(), 1);
    }

    #[test]
    fn test_everything_filtered() {
        let candidates = vec![row(1, "Advil")];
        assert!(filter_duplicates(&candidates, &[dup(1)], true).is_empty());
    }
}
