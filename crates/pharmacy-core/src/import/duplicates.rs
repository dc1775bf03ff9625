//! Duplicate detection against stored records.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::ParsedRow;
use crate::models::{normalized_key, CompositeKey, Medicine};

/// What to do with a row that matches a stored record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicateAction {
    #[default]
    Skip,
    Update,
}

/// A candidate row that matches an existing record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DuplicateInfo {
    /// 1-based data row of the candidate
    pub row: usize,
    pub name: String,
    /// Id of the matched stored record
    pub existing_id: String,
    pub action: DuplicateAction,
}

/// Flag every candidate whose composite key matches a stored record.
///
/// Each candidate yields at most one descriptor. When several stored records
/// share a key, the first in `existing` order is reported.
pub fn find_duplicates(candidates: &[ParsedRow], existing: &[Medicine]) -> Vec<DuplicateInfo> {
    if existing.is_empty() {
        return Vec::new();
    }

    let mut index: HashMap<CompositeKey, &str> = HashMap::with_capacity(existing.len());
    for medicine in existing {
        index.entry(normalized_key(medicine)).or_insert(medicine.id.as_str());
    }

    candidates
        .iter()
        .filter_map(|candidate| {
            index
                .get(&normalized_key(&candidate.medicine))
                .map(|id| DuplicateInfo {
                    row: candidate.row,
                    name: candidate.medicine.name.clone(),
                    existing_id: id.to_string(),
                    action: DuplicateAction::Skip,
                })
        })
        .collect()
}
