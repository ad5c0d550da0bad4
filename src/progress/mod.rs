//! Completion metrics and audit deltas over clinical documents.

use serde::{Deserialize, Serialize};

use crate::schema::{FormSchema, SectionSchema};
use crate::types::{CdeValue, ClinicalDocument, instance_field_key, split_field_key};

/// Fraction of required CDEs completed, per section, aggregated with
/// equal weight per section. Sections without required CDEs do not
/// contribute; a repeatable section with no instances counts as one
/// empty instance.
pub fn progress(schema: &FormSchema, document: &ClinicalDocument) -> f64 {
    let mut section_scores = Vec::new();

    for section in &schema.sections {
        let required: Vec<&str> = section
            .fields
            .iter()
            .filter(|f| f.is_required && !f.is_calculated())
            .map(|f| f.code.as_str())
            .collect();
        if required.is_empty() {
            continue;
        }

        let indices = if section.is_repeatable {
            let mut found = document_instances(document, &section.code);
            if found.is_empty() {
                found.push(0);
            }
            found
        } else {
            vec![0]
        };

        let mut instance_scores = Vec::with_capacity(indices.len());
        for index in indices {
            let filled = required
                .iter()
                .filter(|code| {
                    let key = field_key(section, index, code);
                    document
                        .get(&key)
                        .map(|v| !v.is_empty())
                        .unwrap_or(false)
                })
                .count();
            instance_scores.push(filled as f64 / required.len() as f64);
        }
        let score = instance_scores.iter().sum::<f64>() / instance_scores.len() as f64;
        section_scores.push(score);
    }

    if section_scores.is_empty() {
        return 1.0;
    }
    section_scores.iter().sum::<f64>() / section_scores.len() as f64
}

/// What happened to one field between two document snapshots.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ChangeKind {
    /// Key absent before, present now.
    Created,
    /// Value replaced with a different value.
    Updated,
    /// Value replaced with an explicit null.
    Cleared,
    /// Key present before, absent now.
    Removed,
}

/// One audit delta. Missing-key and explicit-null are distinct states:
/// `old: None` means the key did not exist, `old: Some(Null)` means it
/// held a cleared value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldChange {
    pub key: String,
    pub kind: ChangeKind,
    pub old: Option<CdeValue>,
    pub new: Option<CdeValue>,
}

/// Field-level differences between two snapshots, restricted to keys
/// that changed, ordered by field key.
pub fn diff(old: &ClinicalDocument, new: &ClinicalDocument) -> Vec<FieldChange> {
    let mut changes = Vec::new();

    let mut keys: Vec<&String> = old.fields.keys().chain(new.fields.keys()).collect();
    keys.sort();
    keys.dedup();

    for key in keys {
        let before = old.get(key);
        let after = new.get(key);
        let kind = match (before, after) {
            (None, Some(_)) => ChangeKind::Created,
            (Some(_), None) => ChangeKind::Removed,
            (Some(b), Some(a)) if b == a => continue,
            (Some(_), Some(CdeValue::Null)) => ChangeKind::Cleared,
            (Some(_), Some(_)) => ChangeKind::Updated,
            (None, None) => continue,
        };
        changes.push(FieldChange {
            key: key.clone(),
            kind,
            old: before.cloned(),
            new: after.cloned(),
        });
    }

    changes
}

fn field_key(section: &SectionSchema, index: usize, code: &str) -> String {
    if section.is_repeatable {
        instance_field_key(&section.code, index, code)
    } else {
        code.to_string()
    }
}

fn document_instances(document: &ClinicalDocument, section_code: &str) -> Vec<usize> {
    let mut indices: Vec<usize> = document
        .fields
        .keys()
        .filter_map(|k| split_field_key(k))
        .filter(|(section, _, _)| *section == section_code)
        .map(|(_, index, _)| index)
        .collect();
    indices.sort_unstable();
    indices.dedup();
    indices
}
