use indexmap::IndexMap;
use std::collections::BTreeMap;

use crate::models::{
    BatchValidation, Chunk, ChunkQualityReport, CoverageReport, Document, FieldCoverage,
    ValidationResult,
};
use crate::utils::{MIN_TEXT_LENGTH, has_meaningful_content};

pub const REQUIRED_FIELDS: &[&str] = &["doc_id", "ingestion_timestamp", "file_type"];
pub const RECOMMENDED_FIELDS: &[&str] = &["restaurant", "cuisine", "section", "price_category"];
const OPTIONAL_FIELDS: &[&str] = &["dietary_options", "dishes", "search_tags"];

const CRITICAL_COVERAGE_PERCENT: f64 = 80.0;
const MAX_CHUNK_CHARS: usize = 2000;
const MIN_AVG_CHUNK_CHARS: f64 = 100.0;

pub const WARN_PRICE_INVERTED: &str = "price_min > price_max";
pub const WARN_TEXT_TOO_SHORT: &str = "document_text_too_short";

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Advisory checks over documents and chunks. Nothing here blocks a run.
#[derive(Debug, Clone)]
pub struct DocumentValidator {
    required: Vec<String>,
    recommended: Vec<String>,
}

impl Default for DocumentValidator {
    fn default() -> Self {
        Self {
            required: REQUIRED_FIELDS.iter().map(ToString::to_string).collect(),
            recommended: RECOMMENDED_FIELDS.iter().map(ToString::to_string).collect(),
        }
    }
}

impl DocumentValidator {
    pub fn validate(&self, document: &Document) -> ValidationResult {
        let meta = &document.metadata;

        let missing_required: Vec<String> = self
            .required
            .iter()
            .filter(|f| !meta.contains_key(f))
            .cloned()
            .collect();
        let missing_recommended: Vec<String> = self
            .recommended
            .iter()
            .filter(|f| !meta.contains_key(f))
            .cloned()
            .collect();

        let mut warnings = Vec::new();
        if let (Some(min), Some(max)) = (meta.get_f64("min_price"), meta.get_f64("max_price"))
            && min > max
        {
            warnings.push(WARN_PRICE_INVERTED.to_string());
        }
        if !has_meaningful_content(&document.text) {
            warnings.push(WARN_TEXT_TOO_SHORT.to_string());
        }

        ValidationResult {
            is_valid: missing_required.is_empty(),
            missing_required,
            missing_recommended,
            warnings,
        }
    }

    pub fn validate_batch(&self, documents: &[Document]) -> BatchValidation {
        let mut report = BatchValidation {
            total_documents: documents.len(),
            ..Default::default()
        };
        let mut issues: BTreeMap<String, usize> = BTreeMap::new();

        for document in documents {
            let result = self.validate(document);
            if result.is_valid {
                report.valid_documents += 1;
            } else {
                report.invalid_documents += 1;
            }

            for issue in result
                .missing_required
                .into_iter()
                .chain(result.missing_recommended)
                .chain(result.warnings)
            {
                *issues.entry(issue).or_default() += 1;
            }
        }

        if report.total_documents > 0 {
            report.quality_score =
                round2(report.valid_documents as f64 / report.total_documents as f64 * 100.0);
        }
        report.common_issues = issues;
        report
    }

    /// Share of documents carrying each retrieval field. Recommended fields
    /// below 80% coverage are listed as missing.
    pub fn metadata_coverage(&self, documents: &[Document]) -> CoverageReport {
        let mut report = CoverageReport {
            total_documents: documents.len(),
            ..Default::default()
        };
        if documents.is_empty() {
            return report;
        }

        let fields = self
            .recommended
            .iter()
            .map(String::as_str)
            .chain(OPTIONAL_FIELDS.iter().copied());

        let mut coverage = IndexMap::new();
        for field in fields {
            let count = documents
                .iter()
                .filter(|d| d.metadata.contains_key(field))
                .count();
            let percentage = round2(count as f64 / documents.len() as f64 * 100.0);
            coverage.insert(field.to_string(), FieldCoverage { count, percentage });
        }

        report.missing_critical = self
            .recommended
            .iter()
            .filter(|f| coverage.get(*f).is_some_and(|c| c.percentage < CRITICAL_COVERAGE_PERCENT))
            .cloned()
            .collect();

        let critical_total: f64 = self
            .recommended
            .iter()
            .filter_map(|f| coverage.get(f))
            .map(|c| c.percentage)
            .sum();
        if !self.recommended.is_empty() {
            report.quality_score = round2(critical_total / self.recommended.len() as f64);
        }

        report.metadata_coverage = coverage;
        report
    }
}

/// Size distribution of chunk texts plus human-readable issues.
pub fn check_chunk_quality(chunks: &[Chunk]) -> ChunkQualityReport {
    let mut report = ChunkQualityReport {
        total_chunks: chunks.len(),
        ..Default::default()
    };
    if chunks.is_empty() {
        return report;
    }

    let sizes: Vec<usize> = chunks.iter().map(|c| c.text.chars().count()).collect();
    report.avg_chunk_size = round2(sizes.iter().sum::<usize>() as f64 / sizes.len() as f64);
    report.min_chunk_size = sizes.iter().copied().min().unwrap_or(0);
    report.max_chunk_size = sizes.iter().copied().max().unwrap_or(0);
    report.empty_chunks = sizes.iter().filter(|&&s| s < MIN_TEXT_LENGTH).count();

    if report.empty_chunks > 0 {
        report
            .quality_issues
            .push(format!("{} empty chunks found", report.empty_chunks));
    }
    if report.max_chunk_size > MAX_CHUNK_CHARS {
        report
            .quality_issues
            .push(format!("Some chunks exceed {MAX_CHUNK_CHARS} characters"));
    }
    if report.avg_chunk_size < MIN_AVG_CHUNK_CHARS {
        report
            .quality_issues
            .push("Average chunk size too small".to_string());
    }

    report
}
