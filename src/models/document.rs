use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single metadata value: a scalar or a list of strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    List(Vec<String>),
}

impl MetadataValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetadataValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetadataValue::Float(f) => Some(*f),
            MetadataValue::Integer(i) => Some(*i as f64),
            MetadataValue::Text(s) => s.trim().trim_start_matches('$').parse().ok(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            MetadataValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataValue::Bool(b) => write!(f, "{b}"),
            MetadataValue::Integer(i) => write!(f, "{i}"),
            MetadataValue::Float(v) => write!(f, "{v}"),
            MetadataValue::Text(s) => f.write_str(s),
            MetadataValue::List(items) => f.write_str(&items.join(", ")),
        }
    }
}

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        MetadataValue::Text(value.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(value: String) -> Self {
        MetadataValue::Text(value)
    }
}

impl From<bool> for MetadataValue {
    fn from(value: bool) -> Self {
        MetadataValue::Bool(value)
    }
}

impl From<i64> for MetadataValue {
    fn from(value: i64) -> Self {
        MetadataValue::Integer(value)
    }
}

impl From<usize> for MetadataValue {
    fn from(value: usize) -> Self {
        MetadataValue::Integer(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<f64> for MetadataValue {
    fn from(value: f64) -> Self {
        MetadataValue::Float(value)
    }
}

impl From<Vec<String>> for MetadataValue {
    fn from(value: Vec<String>) -> Self {
        MetadataValue::List(value)
    }
}

/// Insertion-ordered metadata map attached to documents and chunks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata(IndexMap<String, MetadataValue>);

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<MetadataValue>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&MetadataValue> {
        self.0.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut MetadataValue> {
        self.0.get_mut(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(MetadataValue::as_str)
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.0.get(key).and_then(MetadataValue::as_f64)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Remove a key, preserving the order of the remaining entries.
    pub fn remove(&mut self, key: &str) -> Option<MetadataValue> {
        self.0.shift_remove(key)
    }

    pub fn retain(&mut self, mut keep: impl FnMut(&str, &MetadataValue) -> bool) {
        self.0.retain(|k, v| keep(k, v));
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &MetadataValue)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Copy every entry of `other` into `self`, overwriting existing keys.
    pub fn merge(&mut self, other: &Metadata) {
        for (key, value) in other.iter() {
            self.0.insert(key.clone(), value.clone());
        }
    }

    /// Size in bytes of the JSON object the vector store receives.
    pub fn serialized_len(&self) -> usize {
        serde_json::to_vec(&self.0).map_or(0, |bytes| bytes.len())
    }
}

impl FromIterator<(String, MetadataValue)> for Metadata {
    fn from_iter<I: IntoIterator<Item = (String, MetadataValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Where a document came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    /// Source file type (`pdf`, `json`, `csv`, `markdown`, `text`).
    pub file_type: String,
    /// Storage subdirectory the file was read from.
    pub source_dir: String,
}

impl Provenance {
    pub fn new(file_type: impl Into<String>, source_dir: impl Into<String>) -> Self {
        Self {
            file_type: file_type.into(),
            source_dir: source_dir.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub text: String,
    pub metadata: Metadata,
    pub provenance: Provenance,
}

impl Document {
    /// Create a document, mirroring its provenance into `file_type`/`source_dir`.
    pub fn new(id: impl Into<String>, text: impl Into<String>, provenance: Provenance) -> Self {
        let mut metadata = Metadata::new();
        metadata.insert("file_type", provenance.file_type.as_str());
        metadata.insert("source_dir", provenance.source_dir.as_str());
        Self {
            id: id.into(),
            text: text.into(),
            metadata,
            provenance,
        }
    }

    #[must_use]
    pub fn with_metadata(mut self, key: &str, value: impl Into<MetadataValue>) -> Self {
        self.metadata.insert(key, value);
        self
    }
}

/// A retrieval-sized slice of a document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    pub document_id: String,
    pub chunk_index: u32,
    pub text: String,
    pub metadata: Metadata,
}

impl Chunk {
    pub fn generate_id(document_id: &str, chunk_index: u32) -> String {
        use uuid::Uuid;
        let name = format!("{document_id}:{chunk_index}");
        Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes()).to_string()
    }

    /// Build a chunk that carries the parent's full metadata plus `extra`
    /// and its lineage (`document_id`, `chunk_index`).
    pub fn from_document(
        document: &Document,
        text: String,
        chunk_index: u32,
        extra: Metadata,
    ) -> Self {
        let mut metadata = document.metadata.clone();
        metadata.merge(&extra);
        metadata.insert("document_id", document.id.as_str());
        metadata.insert("chunk_index", i64::from(chunk_index));
        Self {
            id: Self::generate_id(&document.id, chunk_index),
            document_id: document.id.clone(),
            chunk_index,
            text,
            metadata,
        }
    }
}
