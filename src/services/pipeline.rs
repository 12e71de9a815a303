//! End-to-end run: normalize, enrich, validate, chunk, route and index.

use std::sync::Arc;

use super::budget::MetadataBudget;
use super::chunker::{Chunker, chunking_stats};
use super::embedding::EmbeddingProvider;
use super::enricher::MetadataEnricher;
use super::indexer::{Indexer, IndexerConfig};
use super::normalizer::TextNormalizer;
use super::router::{Categorized, Categorizer};
use super::validator::{DocumentValidator, check_chunk_quality};
use super::vector_store::VectorStore;
use crate::error::PipelineError;
use crate::models::{
    BatchValidation, Chunk, ChunkQualityReport, ChunkingStats, Config, Document, IngestSummary,
    RunConfiguration, RunReport, TransformationStats,
};

/// Everything computed before indexing.
#[derive(Debug)]
pub struct Prepared {
    pub documents: Vec<Document>,
    pub transformation: TransformationStats,
    pub validation: BatchValidation,
    pub chunking: ChunkingStats,
    pub chunk_quality: ChunkQualityReport,
    pub categorized: Categorized,
}

/// The stages that run before indexing. Needs no external services.
pub struct Preprocessor {
    normalizer: TextNormalizer,
    enricher: MetadataEnricher,
    validator: DocumentValidator,
    chunker: Chunker,
    categorizer: Categorizer,
}

impl Preprocessor {
    pub fn from_config(config: &Config) -> Self {
        Self {
            normalizer: TextNormalizer::default(),
            enricher: MetadataEnricher::new(MetadataBudget::from_config(&config.metadata)),
            validator: DocumentValidator::default(),
            chunker: Chunker::from_config(&config.chunking),
            categorizer: Categorizer::from_config(config),
        }
    }

    /// Normalize then enrich every document in place.
    pub fn transform(&self, documents: &mut [Document]) -> TransformationStats {
        let mut stats = TransformationStats::default();
        for doc in documents.iter_mut() {
            self.normalizer.normalize(doc);
            let outcome = self.enricher.enrich(doc);
            if outcome.was_reduced() {
                tracing::debug!(
                    doc_id = %doc.id,
                    original = outcome.original_bytes,
                    reduced = outcome.final_bytes,
                    "document metadata reduced to budget"
                );
                stats.budget_reduced += 1;
            }
            stats.processed_documents += 1;
        }
        tracing::info!(
            documents = stats.processed_documents,
            budget_reduced = stats.budget_reduced,
            "transformation complete"
        );
        stats
    }

    pub fn validator(&self) -> &DocumentValidator {
        &self.validator
    }

    pub fn chunker(&self) -> &Chunker {
        &self.chunker
    }

    /// Run every stage up to, but not including, indexing.
    pub fn prepare(&self, mut documents: Vec<Document>) -> Prepared {
        let transformation = self.transform(&mut documents);

        let validation = self.validator.validate_batch(&documents);
        if validation.invalid_documents > 0 {
            tracing::warn!(
                invalid = validation.invalid_documents,
                quality_score = validation.quality_score,
                "some documents are missing required metadata"
            );
        }

        let chunks: Vec<Chunk> = self.chunker.chunk_all(&documents);
        let chunking = chunking_stats(documents.len(), &chunks);
        let chunk_quality = check_chunk_quality(&chunks);
        tracing::info!(
            documents = documents.len(),
            chunks = chunking.total_chunks,
            "chunking complete"
        );

        let categorized = self.categorizer.categorize(chunks);
        tracing::info!(
            mode = %categorized.mode,
            routed = categorized.total_chunks(),
            unrouted = categorized.unrouted,
            "categorization complete"
        );

        Prepared {
            documents,
            transformation,
            validation,
            chunking,
            chunk_quality,
            categorized,
        }
    }
}

pub struct Pipeline {
    preprocessor: Preprocessor,
    indexer: Indexer,
    configuration: RunConfiguration,
}

impl Pipeline {
    pub fn new(
        config: &Config,
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
    ) -> Self {
        let configuration = RunConfiguration {
            mode: config.indexing.mode,
            embedding_model: embedder.model().to_string(),
            chunk_size: config.chunking.chunk_size,
            chunk_overlap: config.chunking.chunk_overlap,
            max_metadata_bytes: config.metadata.max_metadata_bytes,
            storage_dir: config.ingest.storage_dir.clone(),
            output_dir: config.report.output_dir.clone(),
        };

        Self {
            preprocessor: Preprocessor::from_config(config),
            indexer: Indexer::new(embedder, store, IndexerConfig::from_config(config)),
            configuration,
        }
    }

    pub fn preprocessor(&self) -> &Preprocessor {
        &self.preprocessor
    }

    pub async fn run(
        &self,
        documents: Vec<Document>,
        ingestion: IngestSummary,
    ) -> Result<RunReport, PipelineError> {
        let prepared = self.preprocessor.prepare(documents);
        let indexing = self.indexer.index(&prepared.categorized).await?;

        tracing::info!(
            indexed = indexing.total_documents,
            collections = indexing.collections.len(),
            "indexing complete"
        );

        Ok(RunReport {
            mode: prepared.categorized.mode,
            execution_time: chrono::Local::now().to_rfc3339(),
            ingestion,
            transformation: prepared.transformation,
            validation: prepared.validation,
            chunking: prepared.chunking,
            chunk_quality: prepared.chunk_quality,
            unrouted_chunks: prepared.categorized.unrouted,
            indexing,
            configuration: self.configuration.clone(),
        })
    }
}
