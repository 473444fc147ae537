//! Search document types: field values, field bags, and named collections.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use serde::{Deserialize, Serialize};

/// Free-form string attributes attached to a notebook (server, owner, times, signature).
pub type Attributes = BTreeMap<String, String>;

// ---------------------------------------------------------------------------
// FieldValue
// ---------------------------------------------------------------------------

/// A single indexed field value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Integer(i64),
    Text(String),
}

impl FieldValue {
    /// Borrow the value as text, if it is textual.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::Integer(_) => None,
        }
    }

    /// Get the value as an integer, if it is numeric.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(n) => Some(*n),
            Self::Text(_) => None,
        }
    }
}

impl std::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Integer(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

impl From<usize> for FieldValue {
    fn from(n: usize) -> Self {
        Self::Integer(n as i64)
    }
}

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

/// A flat field bag, serialized as a JSON object with keys in ascending order.
///
/// Field names are namespaced with `__` (e.g. `source__markdown__heading`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document(BTreeMap<String, FieldValue>);

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field, replacing any previous value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<FieldValue>) {
        self.0.insert(key.into(), value.into());
    }

    /// Merge-by-concatenation.
    ///
    /// Sets the field when it is absent or currently empty; otherwise appends
    /// `text` after a newline separator. Never overwrites existing content.
    pub fn append(&mut self, key: impl Into<String>, text: &str) {
        match self.0.entry(key.into()) {
            Entry::Vacant(e) => {
                e.insert(FieldValue::Text(text.to_string()));
            }
            Entry::Occupied(mut e) => {
                let current = e.get().to_string();
                let merged = if current.is_empty() {
                    text.to_string()
                } else {
                    format!("{current}\n{text}")
                };
                e.insert(FieldValue::Text(merged));
            }
        }
    }

    /// Copy every field of `other` into `self`, overwriting on collision.
    pub fn merge(&mut self, other: Document) {
        self.0.extend(other.0);
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.0.get(key)
    }

    /// Textual value of a field; `None` if absent or numeric.
    pub fn get_text(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(FieldValue::as_text)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<FieldValue> {
        self.0.remove(key)
    }

    /// Iterate fields in ascending key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, FieldValue)> for Document {
    fn from_iter<T: IntoIterator<Item = (String, FieldValue)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Document {
    type Item = (String, FieldValue);
    type IntoIter = std::collections::btree_map::IntoIter<String, FieldValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// The first `_`-delimited segment of a field name (`outputs__stdout` → `outputs`).
pub fn field_root(key: &str) -> &str {
    key.split('_').next().unwrap_or(key)
}

// ---------------------------------------------------------------------------
// IndexKind / DocumentSet
// ---------------------------------------------------------------------------

/// Logical target index for a document collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum IndexKind {
    #[serde(rename = "jupyter-cell")]
    Cell,
    #[serde(rename = "jupyter-notebook")]
    Notebook,
}

impl IndexKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cell => "jupyter-cell",
            Self::Notebook => "jupyter-notebook",
        }
    }
}

impl std::fmt::Display for IndexKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named document collections built from one notebook.
///
/// Iteration order is cells first, then the notebook document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentSet(BTreeMap<IndexKind, Vec<Document>>);

impl DocumentSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, kind: IndexKind, documents: Vec<Document>) {
        self.0.insert(kind, documents);
    }

    pub fn get(&self, kind: IndexKind) -> Option<&[Document]> {
        self.0.get(&kind).map(Vec::as_slice)
    }

    pub fn contains(&self, kind: IndexKind) -> bool {
        self.0.contains_key(&kind)
    }

    pub fn iter(&self) -> impl Iterator<Item = (IndexKind, &[Document])> {
        self.0.iter().map(|(k, v)| (*k, v.as_slice()))
    }

    /// Number of collections (not documents).
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
