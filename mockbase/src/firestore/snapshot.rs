//! Query snapshots and change detection.
//!
//! A [`QuerySnapshot`] is built from the current records of a collection and,
//! optionally, the records of the previous snapshot. Its change list is
//! computed once, at construction:
//!
//! 1. Walk the current records in insertion order. A key the prior set lacks
//!    is `added`; a key whose value differs structurally is `modified`.
//! 2. Walk the prior records in insertion order. A key the current set lacks
//!    is `removed`, and its document carries the prior value.
//!
//! # Invariants
//!
//! - `size() == docs().len()` and `is_empty() == (size() == 0)`.
//! - Added and modified changes come before removed ones.
//! - Presence is decided by key, so a record whose value is `false` or `0`
//!   is still present.

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map, Value};

/// Ordered record key to record value.
pub type RecordSet = IndexMap<String, Value>;

/// Map empty structures and `null` to the canonical empty object.
#[must_use]
pub fn normalize(value: Value) -> Value {
    match value {
        Value::Null => Value::Object(Map::new()),
        Value::Array(items) if items.is_empty() => Value::Object(Map::new()),
        other => other,
    }
}

/// One record in a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentSnapshot {
    pub id: String,
    pub path: String,
    data: Option<Value>,
}

impl DocumentSnapshot {
    #[must_use]
    pub fn new(collection_path: &str, id: &str, data: Option<Value>) -> Self {
        Self {
            id: id.to_string(),
            path: format!("{collection_path}/{id}"),
            data: data.map(normalize),
        }
    }

    #[must_use]
    pub const fn exists(&self) -> bool {
        self.data.is_some()
    }

    #[must_use]
    pub const fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    /// Field lookup; dots descend into nested objects.
    #[must_use]
    pub fn get(&self, field_path: &str) -> Option<&Value> {
        field_path
            .split('.')
            .try_fold(self.data.as_ref()?, |value, segment| value.get(segment))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Added,
    Modified,
    Removed,
}

/// A difference between two consecutive snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentChange {
    #[serde(rename = "type")]
    pub kind: ChangeType,
    pub doc: DocumentSnapshot,
    /// Position in the prior snapshot; `None` for added records.
    pub old_index: Option<usize>,
    /// Position in this snapshot; `None` for removed records.
    pub new_index: Option<usize>,
}

/// The records of a collection at one point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuerySnapshot {
    docs: Vec<DocumentSnapshot>,
    changes: Vec<DocumentChange>,
}

impl QuerySnapshot {
    /// Snapshot `current`, with changes relative to `prior` (empty if absent).
    #[must_use]
    pub fn new(collection_path: &str, current: &RecordSet, prior: Option<&RecordSet>) -> Self {
        let empty = RecordSet::new();
        let prior = prior.unwrap_or(&empty);

        let docs: Vec<DocumentSnapshot> = current
            .iter()
            .map(|(id, value)| DocumentSnapshot::new(collection_path, id, Some(value.clone())))
            .collect();

        let mut changes = Vec::new();
        for (new_index, doc) in docs.iter().enumerate() {
            match prior.get_full(&doc.id) {
                None => changes.push(DocumentChange {
                    kind: ChangeType::Added,
                    doc: doc.clone(),
                    old_index: None,
                    new_index: Some(new_index),
                }),
                Some((old_index, _, old_value)) => {
                    if doc.data.as_ref() != Some(&normalize(old_value.clone())) {
                        changes.push(DocumentChange {
                            kind: ChangeType::Modified,
                            doc: doc.clone(),
                            old_index: Some(old_index),
                            new_index: Some(new_index),
                        });
                    }
                }
            }
        }
        for (old_index, (id, old_value)) in prior.iter().enumerate() {
            if !current.contains_key(id) {
                changes.push(DocumentChange {
                    kind: ChangeType::Removed,
                    doc: DocumentSnapshot::new(collection_path, id, Some(old_value.clone())),
                    old_index: Some(old_index),
                    new_index: None,
                });
            }
        }

        Self { docs, changes }
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.docs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    #[must_use]
    pub fn docs(&self) -> &[DocumentSnapshot] {
        &self.docs
    }

    pub fn for_each(&self, visit: impl FnMut(&DocumentSnapshot)) {
        self.docs.iter().for_each(visit);
    }

    #[must_use]
    pub fn doc_changes(&self) -> &[DocumentChange] {
        &self.changes
    }
}
