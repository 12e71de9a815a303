//! Qdrant vector store backend.

use async_trait::async_trait;
use qdrant_client::Qdrant;
use qdrant_client::qdrant::{
    CreateCollectionBuilder, Distance, PointStruct, UpsertPointsBuilder, Value,
    VectorParamsBuilder,
};
use std::collections::HashMap;

use super::{VectorRecord, VectorStore};
use crate::error::VectorStoreError;
use crate::models::{Metadata, MetadataValue, VectorStoreConfig};

pub struct QdrantStore {
    client: Qdrant,
}

impl QdrantStore {
    /// Connect using `config.url`; the API key, if any, comes from the
    /// environment variable named by `config.api_key_env`.
    pub fn new(config: &VectorStoreConfig) -> Result<Self, VectorStoreError> {
        let mut builder = Qdrant::from_url(&config.url);

        if let Ok(api_key) = std::env::var(&config.api_key_env)
            && !api_key.trim().is_empty()
        {
            builder = builder.api_key(api_key);
        }

        let client = builder
            .build()
            .map_err(|e| VectorStoreError::ConnectionError(e.to_string()))?;

        Ok(Self { client })
    }
}

fn to_value(value: &MetadataValue) -> Value {
    match value {
        MetadataValue::Bool(b) => (*b).into(),
        MetadataValue::Integer(i) => (*i).into(),
        MetadataValue::Float(f) => (*f).into(),
        MetadataValue::Text(s) => s.clone().into(),
        MetadataValue::List(items) => items
            .iter()
            .map(|s| Value::from(s.clone()))
            .collect::<Vec<Value>>()
            .into(),
    }
}

fn to_payload(metadata: &Metadata) -> HashMap<String, Value> {
    metadata
        .iter()
        .map(|(key, value)| (key.clone(), to_value(value)))
        .collect()
}

#[async_trait]
impl VectorStore for QdrantStore {
    async fn health_check(&self) -> Result<bool, VectorStoreError> {
        self.client
            .health_check()
            .await
            .map(|_| true)
            .map_err(|e| VectorStoreError::ConnectionError(e.to_string()))
    }

    async fn ensure_collection(
        &self,
        name: &str,
        dimension: usize,
    ) -> Result<(), VectorStoreError> {
        let exists = self
            .client
            .collection_exists(name)
            .await
            .map_err(|e| VectorStoreError::ConnectionError(e.to_string()))?;
        if exists {
            return Ok(());
        }

        let create = CreateCollectionBuilder::new(name)
            .vectors_config(VectorParamsBuilder::new(dimension as u64, Distance::Cosine));

        self.client
            .create_collection(create)
            .await
            .map_err(|e| VectorStoreError::CollectionError(e.to_string()))?;

        tracing::info!(collection = name, dimension, "created qdrant collection");
        Ok(())
    }

    async fn upsert(&self, name: &str, records: Vec<VectorRecord>) -> Result<(), VectorStoreError> {
        if records.is_empty() {
            return Ok(());
        }

        let points: Vec<PointStruct> = records
            .into_iter()
            .map(|record| PointStruct::new(record.id, record.vector, to_payload(&record.payload)))
            .collect();

        self.client
            .upsert_points(UpsertPointsBuilder::new(name, points).wait(true))
            .await
            .map_err(|e| VectorStoreError::UpsertError(e.to_string()))?;

        Ok(())
    }

    fn driver(&self) -> &'static str {
        "qdrant"
    }
}
