//! Embeds routed chunks and writes them to the vector store.
//!
//! Collections are written independently: one destination failing does not
//! stop its siblings, and the outcome of each is recorded in the
//! [`IndexReport`]. A store that cannot be reached at all, or a transient
//! failure in any collection, makes the attempt retryable as a whole; upserts
//! are idempotent by chunk id so re-running a partly successful attempt is
//! safe. A vector dimension that disagrees with the configuration aborts the
//! run.

use std::sync::Arc;
use thiserror::Error;

use super::embedding::EmbeddingProvider;
use super::router::Categorized;
use super::vector_store::{VectorRecord, VectorStore};
use crate::error::{PipelineError, VectorStoreError};
use crate::models::{Chunk, CollectionReport, Config, IndexMode, IndexReport};
use crate::utils::{RetryConfig, Retryable, with_retry};

#[derive(Debug, Clone)]
pub struct IndexerConfig {
    pub mode: IndexMode,
    pub dimension: usize,
    pub embed_batch_size: usize,
    pub retry: RetryConfig,
}

impl IndexerConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            mode: config.indexing.mode,
            dimension: config.embedding.dimension,
            embed_batch_size: config.embedding.batch_size,
            retry: config.indexing.retry.clone(),
        }
    }
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

#[derive(Debug, Error)]
enum AttemptError {
    #[error(transparent)]
    Fatal(PipelineError),

    #[error("{error}")]
    Transient {
        error: PipelineError,
        partial: Option<IndexReport>,
    },
}

impl Retryable for AttemptError {
    fn is_retryable(&self) -> bool {
        matches!(self, AttemptError::Transient { .. })
    }
}

impl From<PipelineError> for AttemptError {
    fn from(error: PipelineError) -> Self {
        if error.is_retryable() {
            AttemptError::Transient {
                error,
                partial: None,
            }
        } else {
            AttemptError::Fatal(error)
        }
    }
}

pub struct Indexer {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    config: IndexerConfig,
}

impl Indexer {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
        config: IndexerConfig,
    ) -> Self {
        Self {
            embedder,
            store,
            config,
        }
    }

    /// Index every destination in `categorized`.
    ///
    /// Only configuration errors (dimension mismatch) are returned as `Err`;
    /// write failures that outlast the retry budget become `failed` entries.
    pub async fn index(&self, categorized: &Categorized) -> Result<IndexReport, PipelineError> {
        let outcome = with_retry(&self.config.retry, || self.attempt(categorized)).await;
        let attempts = outcome.attempts();

        let mut report = match outcome.into_result() {
            Ok(report) => report,
            Err(AttemptError::Fatal(error)) => return Err(error),
            Err(AttemptError::Transient { error, partial }) => {
                tracing::error!(attempts, error = %error, "indexing did not complete");
                partial.unwrap_or_else(|| self.all_failed(categorized, &error.to_string()))
            }
        };

        report.attempts = attempts;
        Ok(report)
    }

    async fn attempt(&self, categorized: &Categorized) -> Result<IndexReport, AttemptError> {
        if self.embedder.dimension() != self.config.dimension {
            return Err(AttemptError::Fatal(PipelineError::DimensionMismatch {
                expected: self.config.dimension,
                actual: self.embedder.dimension(),
            }));
        }

        match self.store.health_check().await {
            Ok(true) => {}
            Ok(false) => {
                return Err(PipelineError::StoreUnavailable(VectorStoreError::ConnectionError(
                    format!("{} store reported unhealthy", self.store.driver()),
                ))
                .into());
            }
            Err(e) => return Err(PipelineError::StoreUnavailable(e).into()),
        }

        let mut report = IndexReport::new(categorized.mode);
        let mut transient: Option<PipelineError> = None;

        for (name, chunks) in &categorized.collections {
            if chunks.is_empty() {
                tracing::info!(collection = %name, "no chunks, skipping");
                report.record(name, CollectionReport::skipped());
                continue;
            }

            match self.index_collection(name, chunks).await {
                Ok(written) => {
                    tracing::info!(collection = %name, written, "collection indexed");
                    report.record(name, CollectionReport::success(written));
                }
                Err(error @ PipelineError::DimensionMismatch { .. }) => {
                    return Err(AttemptError::Fatal(error));
                }
                Err(error) => {
                    tracing::warn!(collection = %name, error = %error, "collection failed");
                    report.record(name, CollectionReport::failed(chunks.len(), error.to_string()));
                    if error.is_retryable() && transient.is_none() {
                        transient = Some(error);
                    }
                }
            }
        }

        match transient {
            Some(error) => Err(AttemptError::Transient {
                error,
                partial: Some(report),
            }),
            None => Ok(report),
        }
    }

    async fn index_collection(&self, name: &str, chunks: &[Chunk]) -> Result<usize, PipelineError> {
        self.store.ensure_collection(name, self.config.dimension).await?;

        let mut written = 0;
        for batch in chunks.chunks(self.config.embed_batch_size.max(1)) {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let vectors = self.embedder.embed_batch(&texts).await?;

            if vectors.len() != batch.len() {
                return Err(PipelineError::EmbeddingUnavailable(
                    crate::error::EmbeddingError::InvalidResponse(format!(
                        "expected {} embeddings, got {}",
                        batch.len(),
                        vectors.len()
                    )),
                ));
            }

            let mut records = Vec::with_capacity(batch.len());
            for (chunk, vector) in batch.iter().zip(vectors) {
                if vector.len() != self.config.dimension {
                    return Err(PipelineError::DimensionMismatch {
                        expected: self.config.dimension,
                        actual: vector.len(),
                    });
                }
                records.push(VectorRecord::from_chunk(chunk, vector));
            }

            self.store.upsert(name, records).await?;
            written += batch.len();
            tracing::debug!(collection = name, written, total = chunks.len(), "batch upserted");
        }

        Ok(written)
    }

    fn all_failed(&self, categorized: &Categorized, error: &str) -> IndexReport {
        let mut report = IndexReport::new(categorized.mode);
        for (name, chunks) in &categorized.collections {
            if chunks.is_empty() {
                report.record(name, CollectionReport::skipped());
            } else {
                report.record(name, CollectionReport::failed(chunks.len(), error));
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EmbeddingError;
    use crate::models::{CollectionStatus, Document, Metadata, Provenance};
    use crate::services::embedding::HashEmbedder;
    use crate::services::vector_store::InMemoryStore;
    use async_trait::async_trait;
    use indexmap::IndexMap;
    use std::sync::Mutex;
    use std::time::Duration;

    const DIM: usize = 8;

    fn chunks(doc_id: &str, count: usize) -> Vec<Chunk> {
        let doc = Document::new(doc_id, "text", Provenance::new("pdf", "pdf"));
        (0..count)
            .map(|i| Chunk::from_document(&doc, format!("Dish {i} $1{i}"), i as u32, Metadata::new()))
            .collect()
    }

    fn categorized(entries: Vec<(&str, Vec<Chunk>)>) -> Categorized {
        let collections: IndexMap<String, Vec<Chunk>> =
            entries.into_iter().map(|(n, c)| (n.to_string(), c)).collect();
        Categorized {
            mode: IndexMode::Multi,
            collections,
            unrouted: 0,
        }
    }

    fn config() -> IndexerConfig {
        IndexerConfig {
            mode: IndexMode::Multi,
            dimension: DIM,
            embed_batch_size: 20,
            retry: RetryConfig::new(3).with_initial_delay(Duration::from_millis(1)),
        }
    }

    struct RecordingEmbedder {
        inner: HashEmbedder,
        batches: Mutex<Vec<usize>>,
    }

    #[async_trait]
    impl EmbeddingProvider for RecordingEmbedder {
        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            if let Ok(mut batches) = self.batches.lock() {
                batches.push(texts.len());
            }
            self.inner.embed_batch(texts).await
        }

        fn dimension(&self) -> usize {
            self.inner.dimension()
        }

        fn model(&self) -> &str {
            "recording"
        }
    }

    #[tokio::test]
    async fn test_failing_collection_does_not_stop_siblings() {
        let store = Arc::new(InMemoryStore::new().failing_on("coupon"));
        let indexer = Indexer::new(Arc::new(HashEmbedder::new(DIM)), store.clone(), config());

        let report = indexer
            .index(&categorized(vec![
                ("menu", chunks("doc_0001", 2)),
                ("coupon", chunks("doc_0002", 1)),
                ("allergen", Vec::new()),
            ]))
            .await
            .unwrap();

        assert_eq!(report.collections["menu"].status, CollectionStatus::Success);
        assert_eq!(report.collections["menu"].document_count, 2);
        assert_eq!(report.collections["coupon"].status, CollectionStatus::Failed);
        assert!(report.collections["coupon"].error.is_some());
        assert_eq!(report.collections["allergen"].status, CollectionStatus::Skipped);
        assert_eq!(report.collections["allergen"].reason.as_deref(), Some("no documents"));
        assert_eq!(report.total_documents, 2);
        assert_eq!(report.attempts, 1);
        assert_eq!(store.point_count("menu"), 2);
    }

    #[tokio::test]
    async fn test_unreachable_store_is_retried() {
        let store = Arc::new(InMemoryStore::new().unreachable_for(1));
        let indexer = Indexer::new(Arc::new(HashEmbedder::new(DIM)), store.clone(), config());

        let report = indexer
            .index(&categorized(vec![("menu", chunks("doc_0001", 3))]))
            .await
            .unwrap();

        assert_eq!(report.attempts, 2);
        assert_eq!(report.collections["menu"].status, CollectionStatus::Success);
        assert_eq!(store.point_count("menu"), 3);
    }

    #[tokio::test]
    async fn test_exhausted_retries_mark_collections_failed() {
        let store = Arc::new(InMemoryStore::new().unreachable_for(100));
        let indexer = Indexer::new(Arc::new(HashEmbedder::new(DIM)), store, config());

        let report = indexer
            .index(&categorized(vec![
                ("menu", chunks("doc_0001", 1)),
                ("coupon", Vec::new()),
            ]))
            .await
            .unwrap();

        assert_eq!(report.attempts, 3);
        assert_eq!(report.collections["menu"].status, CollectionStatus::Failed);
        assert_eq!(report.collections["coupon"].status, CollectionStatus::Skipped);
        assert_eq!(report.total_documents, 0);
    }

    #[tokio::test]
    async fn test_dimension_mismatch_is_fatal() {
        let store = Arc::new(InMemoryStore::new());
        let indexer = Indexer::new(Arc::new(HashEmbedder::new(DIM * 2)), store.clone(), config());

        let err = indexer
            .index(&categorized(vec![("menu", chunks("doc_0001", 1))]))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            PipelineError::DimensionMismatch {
                expected: DIM,
                actual: 16
            }
        ));
        assert_eq!(store.point_count("menu"), 0);
    }

    #[tokio::test]
    async fn test_embeds_in_sub_batches() {
        let embedder = Arc::new(RecordingEmbedder {
            inner: HashEmbedder::new(DIM),
            batches: Mutex::new(Vec::new()),
        });
        let store = Arc::new(InMemoryStore::new());
        let indexer = Indexer::new(embedder.clone(), store.clone(), config());

        indexer
            .index(&categorized(vec![("menu", chunks("doc_0001", 45))]))
            .await
            .unwrap();

        assert_eq!(*embedder.batches.lock().unwrap(), vec![20, 20, 5]);
        assert_eq!(store.point_count("menu"), 45);
    }

    #[tokio::test]
    async fn test_reindexing_is_idempotent() {
        let store = Arc::new(InMemoryStore::new());
        let indexer = Indexer::new(Arc::new(HashEmbedder::new(DIM)), store.clone(), config());
        let input = categorized(vec![("menu", chunks("doc_0001", 4))]);

        indexer.index(&input).await.unwrap();
        indexer.index(&input).await.unwrap();

        assert_eq!(store.point_count("menu"), 4);
    }
}
