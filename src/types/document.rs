use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::value::{CdeValue, ValueMap};

/// Collections a patient's clinical data is partitioned into.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum Collection {
    /// Current data, mutated in place by field-level merge.
    Cdes,
    /// Append-only save snapshots.
    History,
    /// Derived completion metrics.
    Progress,
}

/// Identifies one patient and the registry they belong to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct PatientKey {
    pub registry_code: String,
    pub patient_id: String,
}

impl PatientKey {
    pub fn new(registry_code: impl Into<String>, patient_id: impl Into<String>) -> Self {
        Self {
            registry_code: registry_code.into(),
            patient_id: patient_id.into(),
        }
    }
}

/// Storage key of a clinical document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct DocumentKey {
    pub registry_code: String,
    pub patient_id: String,
    pub collection: Collection,
}

impl DocumentKey {
    pub fn new(patient: &PatientKey, collection: Collection) -> Self {
        Self {
            registry_code: patient.registry_code.clone(),
            patient_id: patient.patient_id.clone(),
            collection,
        }
    }

    pub fn cdes(patient: &PatientKey) -> Self {
        Self::new(patient, Collection::Cdes)
    }

    pub fn history(patient: &PatientKey) -> Self {
        Self::new(patient, Collection::History)
    }

    pub fn progress(patient: &PatientKey) -> Self {
        Self::new(patient, Collection::Progress)
    }
}

impl fmt::Display for DocumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let collection = match self.collection {
            Collection::Cdes => "cdes",
            Collection::History => "history",
            Collection::Progress => "progress",
        };
        write!(f, "{}/{}/{collection}", self.registry_code, self.patient_id)
    }
}

/// Field key for a value inside a repeatable section instance.
/// Non-repeatable sections use the bare CDE code.
pub fn instance_field_key(section_code: &str, instance: usize, cde_code: &str) -> String {
    format!("{section_code}/{instance}/{cde_code}")
}

/// Split an instance field key back into (section, instance, code).
/// Returns `None` for bare CDE codes.
pub fn split_field_key(key: &str) -> Option<(&str, usize, &str)> {
    let mut parts = key.splitn(3, '/');
    let section = parts.next()?;
    let instance = parts.next()?.parse().ok()?;
    let code = parts.next()?;
    Some((section, instance, code))
}

/// One persisted value-set for a patient. The field map goes from CDE
/// code (optionally namespaced by section/instance) to value.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ClinicalDocument {
    pub fields: ValueMap,

    /// Bumped on every save; backs the per-key write serialization
    /// check in the store.
    #[serde(default)]
    pub version: u64,
}

impl ClinicalDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fields(fields: ValueMap) -> Self {
        Self { fields, version: 0 }
    }

    pub fn get(&self, key: &str) -> Option<&CdeValue> {
        self.fields.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: CdeValue) {
        self.fields.insert(key.into(), value);
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Field-level merge: only the named keys are overwritten,
    /// everything else is preserved.
    pub fn merge(&mut self, named: &ValueMap) {
        for (key, value) in named {
            self.fields.insert(key.clone(), value.clone());
        }
    }
}

/// An immutable snapshot appended to the history collection on every
/// successful save.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistorySnapshot {
    pub id: Uuid,
    pub recorded_at: DateTime<Utc>,
    pub form_name: String,
    pub fields: ValueMap,
}

impl HistorySnapshot {
    pub fn new(form_name: impl Into<String>, fields: ValueMap) -> Self {
        Self {
            id: Uuid::new_v4(),
            recorded_at: Utc::now(),
            form_name: form_name.into(),
            fields,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_preserves_unnamed_fields() {
        let mut doc = ClinicalDocument::new();
        doc.set("AGE", CdeValue::Integer(40));
        doc.set("NOTES", CdeValue::Text("stable".into()));

        let mut named = ValueMap::new();
        named.insert("AGE".into(), CdeValue::Integer(41));
        doc.merge(&named);

        assert_eq!(doc.get("AGE"), Some(&CdeValue::Integer(41)));
        assert_eq!(doc.get("NOTES"), Some(&CdeValue::Text("stable".into())));
    }

    #[test]
    fn field_key_round_trip() {
        let key = instance_field_key("RELATIVES", 2, "REL_NAME");
        assert_eq!(key, "RELATIVES/2/REL_NAME");
        assert_eq!(split_field_key(&key), Some(("RELATIVES", 2, "REL_NAME")));
        assert_eq!(split_field_key("AGE"), None);
    }
}
