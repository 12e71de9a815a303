//! Pipeline stages and their external collaborators.

pub mod budget;
pub mod chunker;
pub mod embedding;
pub mod enricher;
pub mod indexer;
pub mod ingest;
pub mod items;
pub mod normalizer;
pub mod pipeline;
pub mod router;
pub mod validator;
pub mod vector_store;

pub use budget::{BudgetOutcome, MetadataBudget};
pub use chunker::{Chunker, chunking_stats};
pub use embedding::{EmbeddingProvider, HashEmbedder, HttpEmbeddingClient, create_provider};
pub use enricher::MetadataEnricher;
pub use indexer::{Indexer, IndexerConfig};
pub use ingest::LocalIngestor;
pub use items::{ItemExtractor, MenuItem, PriceLineExtractor};
pub use normalizer::{SectionTable, TextNormalizer};
pub use pipeline::{Pipeline, Prepared, Preprocessor};
pub use router::{Categorized, Categorizer};
pub use validator::{DocumentValidator, check_chunk_quality};
pub use vector_store::{InMemoryStore, QdrantStore, VectorRecord, VectorStore, create_store};
