use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub type EntityId = u64;

/// Field name to value mapping for one entity. BTreeMap keeps field order
/// deterministic in diffs and wire payloads.
pub type FieldMap = BTreeMap<String, FieldValue>;

/// A single editable field value.
///
/// Form inputs deliver numbers as text, so change detection uses
/// [`FieldValue::equivalent`] rather than `==`: when either side is a
/// number, the other side is parsed and the two are compared numerically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Bool(bool),
    Text(String),
}

impl FieldValue {
    fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            FieldValue::Text(s) => s.trim().parse().ok(),
            FieldValue::Bool(_) => None,
        }
    }

    /// Type-aware equality used for change detection.
    pub fn equivalent(&self, other: &FieldValue) -> bool {
        match (self, other) {
            (FieldValue::Number(_), _) | (_, FieldValue::Number(_)) => {
                match (self.as_number(), other.as_number()) {
                    (Some(a), Some(b)) => a == b,
                    _ => false,
                }
            }
            (FieldValue::Bool(a), FieldValue::Bool(b)) => a == b,
            (FieldValue::Text(a), FieldValue::Text(b)) => a == b,
            _ => false,
        }
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Number(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Number(value as f64)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_owned())
    }
}

/// One entity's changed fields, as emitted by [`ChangeTracker::diff`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityDiff {
    pub entity_id: EntityId,
    pub changed_fields: FieldMap,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TrackerError {
    #[error("entity {entity_id} is not in the baseline snapshot")]
    UnknownEntity { entity_id: EntityId },
}

/// Records field-level edits against an immutable baseline snapshot.
///
/// The baseline is the server-known state captured when a bulk-edit session
/// opens. Pending values are kept separately and never mutate the baseline;
/// whether a field "changed" is always computed by comparing the two.
#[derive(Debug, Clone, Default)]
pub struct ChangeTracker {
    baseline: BTreeMap<EntityId, FieldMap>,
    pending: BTreeMap<EntityId, FieldMap>,
}

impl ChangeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the baseline wholesale. A fresh baseline invalidates prior
    /// diffs, so all pending changes are dropped.
    pub fn set_baseline(&mut self, entities: impl IntoIterator<Item = (EntityId, FieldMap)>) {
        self.baseline = entities.into_iter().collect();
        self.pending.clear();
    }

    /// Stores a locally edited value. The entity must exist in the baseline.
    pub fn record_change(
        &mut self,
        entity_id: EntityId,
        field: impl Into<String>,
        value: impl Into<FieldValue>,
    ) -> Result<(), TrackerError> {
        if !self.baseline.contains_key(&entity_id) {
            return Err(TrackerError::UnknownEntity { entity_id });
        }
        self.pending
            .entry(entity_id)
            .or_default()
            .insert(field.into(), value.into());
        Ok(())
    }

    /// Whether the pending value for this field differs from the baseline.
    /// Returns `false` when nothing is recorded for the field.
    pub fn is_field_changed(&self, entity_id: EntityId, field: &str) -> bool {
        let Some(pending) = self.pending.get(&entity_id).and_then(|f| f.get(field)) else {
            return false;
        };
        match self.baseline.get(&entity_id).and_then(|f| f.get(field)) {
            Some(baseline) => !pending.equivalent(baseline),
            // A field the baseline never had counts as changed once set.
            None => true,
        }
    }

    pub fn has_any_change(&self) -> bool {
        self.pending.iter().any(|(id, fields)| {
            fields.keys().any(|field| self.is_field_changed(*id, field))
        })
    }

    /// Minimal diff: for each entity with at least one changed field, only
    /// the fields that actually differ from the baseline. Entities are
    /// emitted in baseline iteration order (ascending id).
    pub fn diff(&self) -> Vec<EntityDiff> {
        self.baseline
            .keys()
            .filter_map(|&entity_id| {
                let pending = self.pending.get(&entity_id)?;
                let changed_fields: FieldMap = pending
                    .iter()
                    .filter(|(field, _)| self.is_field_changed(entity_id, field))
                    .map(|(field, value)| (field.clone(), value.clone()))
                    .collect();
                if changed_fields.is_empty() {
                    None
                } else {
                    Some(EntityDiff {
                        entity_id,
                        changed_fields,
                    })
                }
            })
            .collect()
    }

    /// Drops all pending edits. The baseline is untouched.
    pub fn clear(&mut self) {
        self.pending.clear();
    }

    pub fn baseline_len(&self) -> usize {
        self.baseline.len()
    }
}
