mod collection;
mod config;
mod document;
mod report;
mod tag;

pub use collection::{CollectionDescriptor, Optimization, default_collections};
pub use config::{
    ChunkingConfig, Config, DEFAULT_EMBEDDING_DIMENSION, DEFAULT_EMBEDDING_MODEL,
    DEFAULT_QDRANT_URL, DEFAULT_SINGLE_COLLECTION, EmbeddingConfig, EmbeddingProviderKind,
    IndexMode, IndexingConfig, IngestConfig, MetadataConfig, ReportConfig, VectorDriver,
    VectorStoreConfig,
};
pub use document::{Chunk, Document, Metadata, MetadataValue, Provenance};
pub use report::{
    BatchValidation, ChunkQualityReport, ChunkingStats, CollectionReport, CollectionStatus,
    CoverageReport, FieldCoverage, IndexReport, IngestSummary, OutputFormat, RunConfiguration,
    RunReport, TransformationStats, ValidationResult,
};
pub use tag::Tag;
