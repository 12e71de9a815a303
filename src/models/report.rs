//! Structured results produced by the pipeline stages.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::config::IndexMode;
use crate::error::PipelineError;

/// Output format for command results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable text format
    #[default]
    Text,
    /// Machine-parseable JSON format
    Json,
    /// Documentation-friendly Markdown format
    Markdown,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            _ => Err(format!("unknown output format: {s}")),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Markdown => write!(f, "markdown"),
        }
    }
}

/// Counts of what the ingestor produced.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngestSummary {
    pub total_documents: usize,
    pub by_type: BTreeMap<String, usize>,
    pub by_source_dir: BTreeMap<String, usize>,
    /// Files that could not be read, with the reason.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped_files: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransformationStats {
    pub processed_documents: usize,
    /// Documents whose metadata needed the budget pass.
    pub budget_reduced: usize,
}

/// Outcome of validating one document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub missing_required: Vec<String>,
    pub missing_recommended: Vec<String>,
    pub warnings: Vec<String>,
}

/// Aggregate validation over a batch of documents.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchValidation {
    pub total_documents: usize,
    pub valid_documents: usize,
    pub invalid_documents: usize,
    /// valid / total * 100, zero for an empty batch.
    pub quality_score: f64,
    pub common_issues: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FieldCoverage {
    pub count: usize,
    pub percentage: f64,
}

/// How well a batch covers the fields retrieval relies on.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoverageReport {
    pub total_documents: usize,
    pub metadata_coverage: IndexMap<String, FieldCoverage>,
    /// Critical fields present in fewer than 80% of documents.
    pub missing_critical: Vec<String>,
    pub quality_score: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChunkingStats {
    pub original_documents: usize,
    pub total_chunks: usize,
    pub avg_chunks_per_doc: f64,
    /// Chunk count per `chunk_type` value.
    pub by_chunk_type: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChunkQualityReport {
    pub total_chunks: usize,
    pub avg_chunk_size: f64,
    pub min_chunk_size: usize,
    pub max_chunk_size: usize,
    pub empty_chunks: usize,
    pub quality_issues: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionStatus {
    /// Every assigned chunk was written.
    Success,
    /// Chunks were assigned but writing them failed.
    Failed,
    /// No chunks were assigned to the collection.
    Skipped,
}

impl std::fmt::Display for CollectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CollectionStatus::Success => write!(f, "success"),
            CollectionStatus::Failed => write!(f, "failed"),
            CollectionStatus::Skipped => write!(f, "skipped"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionReport {
    pub status: CollectionStatus,
    pub document_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl CollectionReport {
    pub fn success(document_count: usize) -> Self {
        Self {
            status: CollectionStatus::Success,
            document_count,
            error: None,
            reason: None,
        }
    }

    pub fn failed(document_count: usize, error: impl Into<String>) -> Self {
        Self {
            status: CollectionStatus::Failed,
            document_count,
            error: Some(error.into()),
            reason: None,
        }
    }

    pub fn skipped() -> Self {
        Self {
            status: CollectionStatus::Skipped,
            document_count: 0,
            error: None,
            reason: Some("no documents".to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexReport {
    pub mode: IndexMode,
    pub collections: IndexMap<String, CollectionReport>,
    /// Chunks written successfully across all collections.
    pub total_documents: usize,
    pub attempts: u32,
}

impl IndexReport {
    pub fn new(mode: IndexMode) -> Self {
        Self {
            mode,
            collections: IndexMap::new(),
            total_documents: 0,
            attempts: 0,
        }
    }

    pub fn record(&mut self, collection: &str, report: CollectionReport) {
        self.collections.insert(collection.to_string(), report);
        self.total_documents = self
            .collections
            .values()
            .filter(|r| r.status == CollectionStatus::Success)
            .map(|r| r.document_count)
            .sum();
    }

    pub fn count_with_status(&self, status: CollectionStatus) -> usize {
        self.collections
            .values()
            .filter(|r| r.status == status)
            .count()
    }
}

/// Settings echoed into the run report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfiguration {
    pub mode: IndexMode,
    pub embedding_model: String,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub max_metadata_bytes: usize,
    pub storage_dir: PathBuf,
    pub output_dir: PathBuf,
}

/// Summary of one full pipeline run, persisted as a timestamped artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub mode: IndexMode,
    pub execution_time: String,
    pub ingestion: IngestSummary,
    pub transformation: TransformationStats,
    pub validation: BatchValidation,
    pub chunking: ChunkingStats,
    pub chunk_quality: ChunkQualityReport,
    /// Chunks whose provenance matched no collection.
    pub unrouted_chunks: usize,
    pub indexing: IndexReport,
    pub configuration: RunConfiguration,
}

impl RunReport {
    /// Write `preprocessing_results_<timestamp>.json` under `output_dir`.
    pub fn save(&self, output_dir: &Path) -> Result<PathBuf, PipelineError> {
        std::fs::create_dir_all(output_dir)?;
        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let path = output_dir.join(format!("preprocessing_results_{timestamp}.json"));
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, json)?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_report_counts_only_successes() {
        let mut report = IndexReport::new(IndexMode::Multi);
        report.record("menu", CollectionReport::success(4));
        report.record("coupon", CollectionReport::failed(3, "store unavailable"));
        report.record("allergen", CollectionReport::skipped());

        assert_eq!(report.total_documents, 4);
        assert_eq!(report.count_with_status(CollectionStatus::Success), 1);
        assert_eq!(report.count_with_status(CollectionStatus::Failed), 1);
        assert_eq!(report.count_with_status(CollectionStatus::Skipped), 1);
    }

    #[test]
    fn test_collection_report_serialization_distinguishes_statuses() {
        let json = serde_json::to_value(CollectionReport::skipped()).unwrap();
        assert_eq!(json["status"], "skipped");
        assert_eq!(json["reason"], "no documents");
        assert!(json.get("error").is_none());

        let json = serde_json::to_value(CollectionReport::failed(2, "boom")).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["error"], "boom");
        assert_eq!(json["document_count"], 2);
    }

    #[test]
    fn test_output_format_from_str() {
        assert_eq!("md".parse::<OutputFormat>().unwrap(), OutputFormat::Markdown);
        assert!("yaml".parse::<OutputFormat>().is_err());
    }
}
