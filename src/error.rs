//! Error types for the preprocessing pipeline.

use thiserror::Error;

use crate::utils::retry::Retryable;

/// Errors related to search tag construction.
#[derive(Debug, Error)]
pub enum TagError {
    #[error("invalid tag key: {0}")]
    InvalidKey(String),

    #[error("invalid tag value: {0}")]
    InvalidValue(String),

    #[error("tag parse error: {0}")]
    ParseError(String),
}

/// Errors related to embedding operations.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("failed to connect to embedding provider: {0}")]
    ConnectionError(String),

    #[error("embedding provider error: {0}")]
    ServerError(String),

    #[error("embedding request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("invalid embedding response: {0}")]
    InvalidResponse(String),

    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("embedding timeout")]
    Timeout,
}

impl Retryable for EmbeddingError {
    fn is_retryable(&self) -> bool {
        match self {
            EmbeddingError::ConnectionError(_) | EmbeddingError::Timeout => true,
            // 5xx gateway errors and rate limiting are transient
            EmbeddingError::ServerError(msg) => {
                msg.contains("503")
                    || msg.contains("502")
                    || msg.contains("504")
                    || msg.contains("429")
                    || msg.to_lowercase().contains("unavailable")
                    || msg.to_lowercase().contains("too many requests")
            }
            EmbeddingError::RequestError(e) => e.is_timeout() || e.is_connect(),
            EmbeddingError::InvalidResponse(_) | EmbeddingError::DimensionMismatch { .. } => false,
        }
    }
}

/// Errors related to vector store operations.
#[derive(Debug, Error)]
pub enum VectorStoreError {
    #[error("failed to connect to vector store: {0}")]
    ConnectionError(String),

    #[error("collection error: {0}")]
    CollectionError(String),

    #[error("upsert error: {0}")]
    UpsertError(String),

    #[error("vector store client error: {0}")]
    ClientError(String),
}

impl Retryable for VectorStoreError {
    fn is_retryable(&self) -> bool {
        match self {
            VectorStoreError::ConnectionError(_) => true,
            VectorStoreError::CollectionError(msg)
            | VectorStoreError::UpsertError(msg)
            | VectorStoreError::ClientError(msg) => {
                let msg_lower = msg.to_lowercase();
                msg_lower.contains("timeout")
                    || msg_lower.contains("connection")
                    || msg_lower.contains("unavailable")
                    || msg_lower.contains("too many")
            }
        }
    }
}

/// Errors raised while reading documents from the storage tree.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON parse error in {file}: {source}")]
    JsonParseError {
        file: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("CSV parse error in {file}: {source}")]
    CsvParseError {
        file: String,
        #[source]
        source: csv::Error,
    },

    #[error("PDF extraction error in {file}: {message}")]
    PdfError { file: String, message: String },

    #[error("directory walk error: {0}")]
    WalkError(String),

    #[error("storage directory not found: {0}")]
    StorageNotFound(String),
}

/// Errors that abort a pipeline run.
///
/// Per-document and per-collection problems never surface here: they are
/// handled by fallbacks or recorded in the run report.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("vector store unavailable: {0}")]
    StoreUnavailable(#[from] VectorStoreError),

    #[error("embedding provider unavailable: {0}")]
    EmbeddingUnavailable(EmbeddingError),

    #[error("failed to write run report: {0}")]
    ReportError(#[from] std::io::Error),

    #[error("failed to serialize run report: {0}")]
    SerializeError(#[from] serde_json::Error),

    #[error("interrupted")]
    Interrupted,
}

impl From<EmbeddingError> for PipelineError {
    fn from(error: EmbeddingError) -> Self {
        match error {
            EmbeddingError::DimensionMismatch { expected, actual } => {
                PipelineError::DimensionMismatch { expected, actual }
            }
            other => PipelineError::EmbeddingUnavailable(other),
        }
    }
}

impl Retryable for PipelineError {
    fn is_retryable(&self) -> bool {
        match self {
            PipelineError::StoreUnavailable(e) => e.is_retryable(),
            PipelineError::EmbeddingUnavailable(e) => e.is_retryable(),
            _ => false,
        }
    }
}

/// Errors related to configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParseError(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerializeError(#[from] toml::ser::Error),

    #[error("path error: {0}")]
    PathError(String),

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("missing credential: {0}")]
    MissingCredential(String),
}
