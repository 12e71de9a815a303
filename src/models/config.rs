use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use super::collection::{CollectionDescriptor, default_collections};
use crate::error::ConfigError;
use crate::utils::RetryConfig;

pub const DEFAULT_EMBEDDING_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
pub const DEFAULT_EMBEDDING_DIMENSION: usize = 1536;
pub const DEFAULT_QDRANT_URL: &str = "http://localhost:6334";
pub const DEFAULT_SINGLE_COLLECTION: &str = "restaurant";
pub const DEFAULT_API_KEY_ENV: &str = "OPENAI_API_KEY";
pub const DEFAULT_QDRANT_API_KEY_ENV: &str = "QDRANT_API_KEY";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub vector_store: VectorStoreConfig,

    #[serde(default)]
    pub chunking: ChunkingConfig,

    #[serde(default)]
    pub metadata: MetadataConfig,

    #[serde(default)]
    pub indexing: IndexingConfig,

    #[serde(default)]
    pub ingest: IngestConfig,

    #[serde(default)]
    pub report: ReportConfig,

    /// Routing table, checked in order.
    #[serde(default = "default_collections")]
    pub collections: Vec<CollectionDescriptor>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            embedding: EmbeddingConfig::default(),
            vector_store: VectorStoreConfig::default(),
            chunking: ChunkingConfig::default(),
            metadata: MetadataConfig::default(),
            indexing: IndexingConfig::default(),
            ingest: IngestConfig::default(),
            report: ReportConfig::default(),
            collections: default_collections(),
        }
    }
}

impl Config {
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("menuprep").join("config.toml"))
    }

    /// Load from `path`, or from the user config file, or fall back to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(p) => Some(p.to_path_buf()),
            None => Self::config_path().filter(|p| p.exists()),
        };

        match path {
            Some(path) => {
                let content = std::fs::read_to_string(&path)?;
                Ok(toml::from_str(&content)?)
            }
            None => Ok(Self::default()),
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject settings that would make a run meaningless before any work starts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunking.chunk_size == 0 {
            return Err(ConfigError::ValidationError(
                "chunking.chunk_size must be greater than 0".to_string(),
            ));
        }
        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            return Err(ConfigError::ValidationError(format!(
                "chunking.chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunking.chunk_overlap, self.chunking.chunk_size
            )));
        }
        if self.chunking.items_per_chunk == 0 {
            return Err(ConfigError::ValidationError(
                "chunking.items_per_chunk must be greater than 0".to_string(),
            ));
        }
        if self.embedding.dimension == 0 {
            return Err(ConfigError::ValidationError(
                "embedding.dimension must be greater than 0".to_string(),
            ));
        }
        if self.embedding.batch_size == 0 {
            return Err(ConfigError::ValidationError(
                "embedding.batch_size must be greater than 0".to_string(),
            ));
        }
        if self.metadata.max_metadata_bytes == 0 {
            return Err(ConfigError::ValidationError(
                "metadata.max_metadata_bytes must be greater than 0".to_string(),
            ));
        }
        if self.indexing.mode == IndexMode::Multi && self.collections.is_empty() {
            return Err(ConfigError::ValidationError(
                "multi-collection mode needs at least one collection".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for collection in &self.collections {
            if !seen.insert(collection.name.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "duplicate collection name: {}",
                    collection.name
                )));
            }
        }

        Ok(())
    }
}

/// Which embedding backend to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProviderKind {
    /// OpenAI-compatible HTTP endpoint
    #[default]
    Http,
    /// Deterministic local hashing, no network
    Hash,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default)]
    pub provider: EmbeddingProviderKind,

    #[serde(default = "default_embedding_url")]
    pub url: String,

    #[serde(default = "default_embedding_model")]
    pub model: String,

    #[serde(default = "default_dimension")]
    pub dimension: usize,

    /// Texts per embedding request.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Environment variable holding the provider API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

fn default_embedding_url() -> String {
    DEFAULT_EMBEDDING_URL.to_string()
}

fn default_embedding_model() -> String {
    DEFAULT_EMBEDDING_MODEL.to_string()
}

fn default_dimension() -> usize {
    DEFAULT_EMBEDDING_DIMENSION
}

fn default_batch_size() -> usize {
    20
}

fn default_timeout() -> u64 {
    60
}

fn default_api_key_env() -> String {
    DEFAULT_API_KEY_ENV.to_string()
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProviderKind::default(),
            url: default_embedding_url(),
            model: default_embedding_model(),
            dimension: default_dimension(),
            batch_size: default_batch_size(),
            timeout_secs: default_timeout(),
            api_key_env: default_api_key_env(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VectorDriver {
    #[default]
    Qdrant,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorStoreConfig {
    #[serde(default)]
    pub driver: VectorDriver,

    #[serde(default = "default_qdrant_url")]
    pub url: String,

    /// Environment variable holding the store API key, if any.
    #[serde(default = "default_qdrant_api_key_env")]
    pub api_key_env: String,

    /// Destination used in single-collection mode.
    #[serde(default = "default_single_collection")]
    pub single_collection: String,
}

fn default_qdrant_url() -> String {
    DEFAULT_QDRANT_URL.to_string()
}

fn default_qdrant_api_key_env() -> String {
    DEFAULT_QDRANT_API_KEY_ENV.to_string()
}

fn default_single_collection() -> String {
    DEFAULT_SINGLE_COLLECTION.to_string()
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            driver: VectorDriver::default(),
            url: default_qdrant_url(),
            api_key_env: default_qdrant_api_key_env(),
            single_collection: default_single_collection(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Maximum tokens per generic chunk.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Tokens shared between consecutive generic chunks.
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    /// Menu items grouped into one item-oriented chunk.
    #[serde(default = "default_items_per_chunk")]
    pub items_per_chunk: usize,
}

fn default_chunk_size() -> usize {
    350
}

fn default_chunk_overlap() -> usize {
    50
}

fn default_items_per_chunk() -> usize {
    2
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            items_per_chunk: default_items_per_chunk(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataConfig {
    /// Per-record metadata ceiling of the vector store, in bytes.
    #[serde(default = "default_max_metadata_bytes")]
    pub max_metadata_bytes: usize,

    /// Prefix length kept when long string fields are truncated.
    #[serde(default = "default_truncate_to")]
    pub truncate_to: usize,
}

fn default_max_metadata_bytes() -> usize {
    800
}

fn default_truncate_to() -> usize {
    100
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            max_metadata_bytes: default_max_metadata_bytes(),
            truncate_to: default_truncate_to(),
        }
    }
}

/// Whether chunks are split across collections or all land in one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexMode {
    #[default]
    Multi,
    Single,
}

impl FromStr for IndexMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "multi" => Ok(IndexMode::Multi),
            "single" => Ok(IndexMode::Single),
            _ => Err(format!("unknown index mode: {s} (expected single or multi)")),
        }
    }
}

impl std::fmt::Display for IndexMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IndexMode::Multi => write!(f, "multi"),
            IndexMode::Single => write!(f, "single"),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexingConfig {
    #[serde(default)]
    pub mode: IndexMode,

    #[serde(default)]
    pub retry: RetryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    #[serde(default = "default_storage_dir")]
    pub storage_dir: PathBuf,

    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,

    /// Characters kept from a rendered JSON record.
    #[serde(default = "default_json_text_limit")]
    pub json_text_limit: usize,

    #[serde(default)]
    pub exclude_patterns: Vec<String>,
}

fn default_storage_dir() -> PathBuf {
    PathBuf::from("storage")
}

fn default_max_file_size() -> u64 {
    20 * 1024 * 1024
}

fn default_json_text_limit() -> usize {
    1500
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            storage_dir: default_storage_dir(),
            max_file_size: default_max_file_size(),
            json_text_limit: default_json_text_limit(),
            exclude_patterns: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
        }
    }
}
