use serde::Serialize;
use std::fmt::Write as FmtWrite;

use crate::models::{
    BatchValidation, Chunk, ChunkingStats, CollectionStatus, CoverageReport, OutputFormat,
    RunReport,
};
use crate::utils::truncate_with_ellipsis;

const PREVIEW_CHARS: usize = 200;

pub trait Formatter {
    fn format_run_report(&self, report: &RunReport) -> String;
    fn format_validation(&self, summary: &ValidationSummary) -> String;
    fn format_chunks(&self, preview: &ChunkPreview) -> String;
    fn format_message(&self, message: &str) -> String;
    fn format_error(&self, error: &str) -> String;
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationSummary {
    pub batch: BatchValidation,
    pub coverage: CoverageReport,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChunkPreview {
    pub file: String,
    pub stats: ChunkingStats,
    pub chunks: Vec<Chunk>,
}

fn status_marker(status: CollectionStatus) -> &'static str {
    match status {
        CollectionStatus::Success => "✓",
        CollectionStatus::Failed => "✗",
        CollectionStatus::Skipped => "-",
    }
}

pub struct TextFormatter;

impl Formatter for TextFormatter {
    fn format_run_report(&self, report: &RunReport) -> String {
        let mut output = String::new();
        writeln!(output, "Preprocessing Complete ({} mode)", report.mode).unwrap();
        writeln!(output, "--------------------------------").unwrap();
        writeln!(output, "Documents ingested: {}", report.ingestion.total_documents).unwrap();
        for (file_type, count) in &report.ingestion.by_type {
            writeln!(output, "  {file_type}: {count}").unwrap();
        }
        if !report.ingestion.skipped_files.is_empty() {
            writeln!(output, "Files skipped: {}", report.ingestion.skipped_files.len()).unwrap();
        }
        writeln!(
            output,
            "Metadata reduced to budget: {}",
            report.transformation.budget_reduced
        )
        .unwrap();
        writeln!(
            output,
            "Validation: {}/{} valid ({:.1}%)",
            report.validation.valid_documents,
            report.validation.total_documents,
            report.validation.quality_score
        )
        .unwrap();
        writeln!(
            output,
            "Chunks created: {} ({:.1} per document)",
            report.chunking.total_chunks, report.chunking.avg_chunks_per_doc
        )
        .unwrap();
        if report.unrouted_chunks > 0 {
            writeln!(output, "Unrouted chunks: {}", report.unrouted_chunks).unwrap();
        }
        writeln!(output).unwrap();

        writeln!(
            output,
            "Indexed {} chunks across {} collection(s):",
            report.indexing.total_documents,
            report.indexing.collections.len()
        )
        .unwrap();
        for (name, collection) in &report.indexing.collections {
            write!(
                output,
                "  {} {}: {} ({})",
                status_marker(collection.status),
                name,
                collection.document_count,
                collection.status
            )
            .unwrap();
            if let Some(ref error) = collection.error {
                write!(output, " - {error}").unwrap();
            }
            writeln!(output).unwrap();
        }
        output
    }

    fn format_validation(&self, summary: &ValidationSummary) -> String {
        let batch = &summary.batch;
        let mut output = String::new();
        writeln!(output, "Validation").unwrap();
        writeln!(output, "----------").unwrap();
        writeln!(output, "Documents: {}", batch.total_documents).unwrap();
        writeln!(output, "Valid:     {}", batch.valid_documents).unwrap();
        writeln!(output, "Invalid:   {}", batch.invalid_documents).unwrap();
        writeln!(output, "Quality:   {:.1}%", batch.quality_score).unwrap();

        if !batch.common_issues.is_empty() {
            writeln!(output, "\nCommon issues:").unwrap();
            for (issue, count) in &batch.common_issues {
                writeln!(output, "  {issue}: {count}").unwrap();
            }
        }

        writeln!(output, "\nMetadata coverage:").unwrap();
        for (field, coverage) in &summary.coverage.metadata_coverage {
            writeln!(
                output,
                "  {:<16} {:>5.1}% ({})",
                field, coverage.percentage, coverage.count
            )
            .unwrap();
        }
        if !summary.coverage.missing_critical.is_empty() {
            writeln!(
                output,
                "Below 80%: {}",
                summary.coverage.missing_critical.join(", ")
            )
            .unwrap();
        }
        output
    }

    fn format_chunks(&self, preview: &ChunkPreview) -> String {
        let mut output = String::new();
        writeln!(
            output,
            "{}: {} chunk(s)\n",
            preview.file, preview.stats.total_chunks
        )
        .unwrap();

        for chunk in &preview.chunks {
            let chunk_type = chunk.metadata.get_str("chunk_type").unwrap_or("unknown");
            write!(output, "#{} [{}]", chunk.chunk_index, chunk_type).unwrap();
            if let Some(section) = chunk.metadata.get_str("section") {
                write!(output, " {section}").unwrap();
            }
            writeln!(output).unwrap();
            for line in truncate_with_ellipsis(&chunk.text, PREVIEW_CHARS).lines() {
                writeln!(output, "   {line}").unwrap();
            }
            writeln!(output).unwrap();
        }
        output
    }

    fn format_message(&self, message: &str) -> String {
        format!("{}\n", message)
    }

    fn format_error(&self, error: &str) -> String {
        format!("Error: {}\n", error)
    }
}

pub struct JsonFormatter {
    pub pretty: bool,
}

impl JsonFormatter {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    fn render<T: Serialize>(&self, value: &T) -> String {
        let rendered = if self.pretty {
            serde_json::to_string_pretty(value)
        } else {
            serde_json::to_string(value)
        };
        rendered.unwrap_or_else(|e| serde_json::json!({"error": e.to_string()}).to_string())
    }
}

impl Formatter for JsonFormatter {
    fn format_run_report(&self, report: &RunReport) -> String {
        self.render(report)
    }

    fn format_validation(&self, summary: &ValidationSummary) -> String {
        self.render(summary)
    }

    fn format_chunks(&self, preview: &ChunkPreview) -> String {
        self.render(preview)
    }

    fn format_message(&self, message: &str) -> String {
        serde_json::json!({"message": message}).to_string()
    }

    fn format_error(&self, error: &str) -> String {
        serde_json::json!({"error": error}).to_string()
    }
}

pub struct MarkdownFormatter;

impl Formatter for MarkdownFormatter {
    fn format_run_report(&self, report: &RunReport) -> String {
        let mut output = String::new();
        writeln!(output, "## Preprocessing Complete\n").unwrap();
        writeln!(output, "**Mode:** {}\n", report.mode).unwrap();
        writeln!(output, "| Metric | Value |").unwrap();
        writeln!(output, "|--------|-------|").unwrap();
        writeln!(
            output,
            "| Documents ingested | {} |",
            report.ingestion.total_documents
        )
        .unwrap();
        writeln!(
            output,
            "| Valid documents | {} / {} |",
            report.validation.valid_documents, report.validation.total_documents
        )
        .unwrap();
        writeln!(output, "| Chunks created | {} |", report.chunking.total_chunks).unwrap();
        writeln!(output, "| Unrouted chunks | {} |", report.unrouted_chunks).unwrap();
        writeln!(
            output,
            "| Chunks indexed | {} |",
            report.indexing.total_documents
        )
        .unwrap();

        writeln!(output, "\n### Collections\n").unwrap();
        writeln!(output, "| Collection | Status | Chunks | Note |").unwrap();
        writeln!(output, "|------------|--------|--------|------|").unwrap();
        for (name, collection) in &report.indexing.collections {
            let note = collection
                .error
                .as_deref()
                .or(collection.reason.as_deref())
                .unwrap_or("");
            writeln!(
                output,
                "| `{}` | {} | {} | {} |",
                name, collection.status, collection.document_count, note
            )
            .unwrap();
        }
        output
    }

    fn format_validation(&self, summary: &ValidationSummary) -> String {
        let batch = &summary.batch;
        let mut output = String::new();
        writeln!(output, "## Validation\n").unwrap();
        writeln!(
            output,
            "- **Valid:** {} / {} ({:.1}%)",
            batch.valid_documents, batch.total_documents, batch.quality_score
        )
        .unwrap();
        for (issue, count) in &batch.common_issues {
            writeln!(output, "- `{issue}`: {count}").unwrap();
        }

        writeln!(output, "\n### Metadata Coverage\n").unwrap();
        writeln!(output, "| Field | Coverage | Count |").unwrap();
        writeln!(output, "|-------|----------|-------|").unwrap();
        for (field, coverage) in &summary.coverage.metadata_coverage {
            writeln!(
                output,
                "| `{}` | {:.1}% | {} |",
                field, coverage.percentage, coverage.count
            )
            .unwrap();
        }
        output
    }

    fn format_chunks(&self, preview: &ChunkPreview) -> String {
        let mut output = String::new();
        writeln!(output, "## Chunks: `{}`\n", preview.file).unwrap();
        for chunk in &preview.chunks {
            let chunk_type = chunk.metadata.get_str("chunk_type").unwrap_or("unknown");
            writeln!(output, "### #{} `{}`\n", chunk.chunk_index, chunk_type).unwrap();
            writeln!(output, "```").unwrap();
            writeln!(output, "{}", chunk.text).unwrap();
            writeln!(output, "```\n").unwrap();
        }
        output
    }

    fn format_message(&self, message: &str) -> String {
        format!("> {}\n", message)
    }

    fn format_error(&self, error: &str) -> String {
        format!("> ⚠️ **Error:** {}\n", error)
    }
}

pub fn get_formatter(format: OutputFormat) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Text => Box::new(TextFormatter),
        OutputFormat::Json => Box::new(JsonFormatter::new(true)),
        OutputFormat::Markdown => Box::new(MarkdownFormatter),
    }
}
