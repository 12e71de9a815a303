//! Vector store abstraction layer.
//!
//! Backends are selected from configuration: Qdrant for real runs, an
//! in-process store for dry runs and tests.

mod memory;
mod qdrant;

pub use memory::InMemoryStore;
pub use qdrant::QdrantStore;

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::VectorStoreError;
use crate::models::{Chunk, Metadata, VectorDriver, VectorStoreConfig};

/// One point written to a collection.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorRecord {
    pub id: String,
    pub vector: Vec<f32>,
    /// Chunk metadata plus the chunk text under `text`. Everything but the
    /// text has already been through the chunk budget.
    pub payload: Metadata,
}

impl VectorRecord {
    pub fn from_chunk(chunk: &Chunk, vector: Vec<f32>) -> Self {
        let mut payload = chunk.metadata.clone();
        payload.insert("text", chunk.text.as_str());
        Self {
            id: chunk.id.clone(),
            vector,
            payload,
        }
    }
}

/// Named collections of vectors. Upserts are idempotent by record id.
#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn health_check(&self) -> Result<bool, VectorStoreError>;

    /// Create the collection unless it already exists.
    async fn ensure_collection(&self, name: &str, dimension: usize)
    -> Result<(), VectorStoreError>;

    async fn upsert(&self, name: &str, records: Vec<VectorRecord>)
    -> Result<(), VectorStoreError>;

    fn driver(&self) -> &'static str;
}

pub fn create_store(config: &VectorStoreConfig) -> Result<Arc<dyn VectorStore>, VectorStoreError> {
    match config.driver {
        VectorDriver::Qdrant => Ok(Arc::new(QdrantStore::new(config)?)),
        VectorDriver::Memory => Ok(Arc::new(InMemoryStore::new())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Document, Provenance};

    #[test]
    fn test_record_payload_carries_text_and_lineage() {
        let doc = Document::new("d1", "Steak $25", Provenance::new("pdf", "pdf"));
        let chunk = Chunk::from_document(&doc, "Steak $25".to_string(), 3, Metadata::new());
        let record = VectorRecord::from_chunk(&chunk, vec![0.5, 0.5]);

        assert_eq!(record.id, chunk.id);
        assert_eq!(record.payload.get_str("text"), Some("Steak $25"));
        assert_eq!(record.payload.get_str("document_id"), Some("d1"));
        assert_eq!(record.payload.get_str("file_type"), Some("pdf"));
    }

    #[test]
    fn test_payload_without_text_stays_within_budget() {
        use crate::services::budget::MetadataBudget;
        use crate::services::router::Categorizer;

        let budget = MetadataBudget::default();
        let doc = Document::new("doc_0007", "Peanut oil", Provenance::new("text", "doc"))
            .with_metadata("restaurant", "Luigi's")
            .with_metadata("notes", "");
        let mut chunk = Chunk::from_document(&doc, "Peanut oil".to_string(), 0, Metadata::new());
        let base = chunk.metadata.serialized_len();
        chunk
            .metadata
            .insert("notes", "n".repeat(budget.max_bytes() - 5 - base));
        assert!(budget.fits(&chunk.metadata));

        let categorized = Categorizer::default().categorize(vec![chunk]);
        let routed = &categorized.collections["allergen"][0];
        let mut payload = VectorRecord::from_chunk(routed, vec![0.0; 4]).payload;

        assert_eq!(payload.get_str("document_id"), Some("doc_0007"));
        assert!(payload.contains_key("chunk_index"));
        payload.remove("text");
        assert!(payload.serialized_len() <= budget.max_bytes());
    }

    #[test]
    fn test_memory_driver_from_config() {
        let config = VectorStoreConfig {
            driver: VectorDriver::Memory,
            ..Default::default()
        };
        let store = create_store(&config).unwrap();
        assert_eq!(store.driver(), "memory");
    }
}
