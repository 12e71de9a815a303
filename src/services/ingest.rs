//! Reads the storage tree into documents.
//!
//! Layout: `pdf/*.pdf`, `json/*.json`, `csv/*.csv`, plus `**/*.md` and
//! `**/*.txt` anywhere below the root. A file that cannot be read is logged
//! and listed in the summary; it never stops the rest of the ingest.

use chrono::Utc;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::IngestError;
use crate::models::{Document, IngestConfig, IngestSummary, MetadataValue, Provenance};
use crate::utils::{FileKind, prefix_chars, read_file_content, relative_dir, title_from_stem};

pub const TRUNCATION_MARKER: &str = "... [truncated]";

/// Fields lifted from JSON records, as `(source key, metadata key)`.
const JSON_FIELDS: &[(&str, &str)] = &[
    ("restaurant", "restaurant"),
    ("cuisine", "cuisine"),
    ("dish", "dish_name"),
    ("price", "price"),
    ("name", "name"),
    ("cuisine_type", "cuisine_type"),
    ("neighborhood", "neighborhood"),
    ("rating", "rating"),
];

/// Columns lifted from CSV rows.
const CSV_FIELDS: &[&str] = &[
    "restaurant",
    "cuisine",
    "dish",
    "price",
    "discount",
    "valid_until",
    "description",
    "type",
    "category",
    "Descrição",
    "Tipo",
    "Categoria",
    "Valor",
];

#[derive(Debug)]
pub struct LocalIngestor {
    storage_dir: PathBuf,
    max_file_size: u64,
    json_text_limit: usize,
    exclude_patterns: Vec<glob::Pattern>,
}

impl LocalIngestor {
    pub fn new(storage_dir: impl Into<PathBuf>, config: &IngestConfig) -> Self {
        let exclude_patterns = config
            .exclude_patterns
            .iter()
            .filter_map(|p| match glob::Pattern::new(p) {
                Ok(pattern) => Some(pattern),
                Err(e) => {
                    tracing::warn!(pattern = %p, error = %e, "ignoring invalid exclude pattern");
                    None
                }
            })
            .collect();

        Self {
            storage_dir: storage_dir.into(),
            max_file_size: config.max_file_size,
            json_text_limit: config.json_text_limit,
            exclude_patterns,
        }
    }

    pub fn from_config(config: &IngestConfig) -> Self {
        Self::new(config.storage_dir.clone(), config)
    }

    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    /// Load every supported file and stamp `doc_id` / `ingestion_timestamp`.
    pub fn ingest_all(&self) -> Result<(Vec<Document>, IngestSummary), IngestError> {
        if !self.storage_dir.is_dir() {
            return Err(IngestError::StorageNotFound(
                self.storage_dir.display().to_string(),
            ));
        }

        let mut files = self.list(Some("pdf"), FileKind::Pdf)?;
        files.extend(self.list(Some("json"), FileKind::Json)?);
        files.extend(self.list(Some("csv"), FileKind::Csv)?);
        files.extend(self.list(None, FileKind::Markdown)?);
        files.extend(self.list(None, FileKind::Text)?);

        let mut documents = Vec::new();
        let mut skipped_files = Vec::new();

        for (path, kind) in files {
            match self.read_file_as(&path, kind) {
                Ok(docs) => {
                    tracing::debug!(path = %path.display(), documents = docs.len(), "read file");
                    documents.extend(docs);
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping unreadable file");
                    skipped_files.push(format!("{}: {e}", path.display()));
                }
            }
        }

        stamp(&mut documents);
        let mut summary = summarize(&documents);
        summary.skipped_files = skipped_files;

        tracing::info!(
            documents = summary.total_documents,
            skipped = summary.skipped_files.len(),
            "ingestion complete"
        );
        Ok((documents, summary))
    }

    /// Read a single file, wherever it lives, and stamp its documents.
    pub fn read_file(&self, path: &Path) -> Result<Vec<Document>, IngestError> {
        let kind = FileKind::from_path(path).ok_or_else(|| {
            IngestError::IoError(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("unsupported file type: {}", path.display()),
            ))
        })?;
        let mut documents = self.read_file_as(path, kind)?;
        stamp(&mut documents);
        Ok(documents)
    }

    /// Files of `kind` directly under `subdir`, or anywhere when `subdir` is
    /// `None`, in file-name order.
    fn list(&self, subdir: Option<&str>, kind: FileKind) -> Result<Vec<(PathBuf, FileKind)>, IngestError> {
        let (root, depth) = match subdir {
            Some(dir) => (self.storage_dir.join(dir), 1),
            None => (self.storage_dir.clone(), usize::MAX),
        };
        if !root.is_dir() {
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(&root)
            .max_depth(depth)
            .follow_links(false)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| IngestError::WalkError(e.to_string()))?;
            let path = entry.path();
            if !entry.file_type().is_file() || FileKind::from_path(path) != Some(kind) {
                continue;
            }
            if self.is_excluded(path) {
                tracing::debug!(path = %path.display(), "excluded");
                continue;
            }
            files.push((path.to_path_buf(), kind));
        }
        Ok(files)
    }

    fn is_excluded(&self, path: &Path) -> bool {
        let path_str = path.to_string_lossy();
        self.exclude_patterns.iter().any(|p| p.matches(&path_str))
    }

    fn read_file_as(&self, path: &Path, kind: FileKind) -> Result<Vec<Document>, IngestError> {
        match kind {
            FileKind::Pdf => self.read_pdf(path).map(|d| vec![d]),
            FileKind::Json => self.read_json(path),
            FileKind::Csv => self.read_csv(path),
            FileKind::Markdown | FileKind::Text => self.read_plain(path, kind).map(|d| vec![d]),
        }
    }

    fn read_pdf(&self, path: &Path) -> Result<Document, IngestError> {
        let size = std::fs::metadata(path)?.len();
        if size > self.max_file_size {
            return Err(too_large(size, self.max_file_size));
        }

        let text = pdf_extract::extract_text(path).map_err(|e| IngestError::PdfError {
            file: path.display().to_string(),
            message: e.to_string(),
        })?;

        let mut doc = Document::new(String::new(), text, Provenance::new("pdf", "pdf"));
        insert_file_name(&mut doc, path);
        if let Some(restaurant) = title_from_stem(path) {
            doc.metadata.insert("restaurant", restaurant);
        }
        Ok(doc)
    }

    fn read_json(&self, path: &Path) -> Result<Vec<Document>, IngestError> {
        let content = read_file_content(path, self.max_file_size)?;
        let data: Value =
            serde_json::from_str(&content).map_err(|source| IngestError::JsonParseError {
                file: path.display().to_string(),
                source,
            })?;

        let records = match data {
            Value::Array(items) => items,
            other => vec![other],
        };

        let mut documents = Vec::with_capacity(records.len());
        for record in &records {
            let rendered = serde_json::to_string_pretty(record).map_err(|source| {
                IngestError::JsonParseError {
                    file: path.display().to_string(),
                    source,
                }
            })?;
            let text = self.truncate_record(&rendered);

            let mut doc = Document::new(String::new(), text, Provenance::new("json", "json"));
            insert_file_name(&mut doc, path);
            if let Value::Object(fields) = record {
                for (source_key, meta_key) in JSON_FIELDS {
                    if let Some(value) = fields.get(*source_key).and_then(to_metadata_value) {
                        doc.metadata.insert(*meta_key, value);
                    }
                }
            }
            documents.push(doc);
        }
        Ok(documents)
    }

    fn truncate_record(&self, rendered: &str) -> String {
        if rendered.chars().count() > self.json_text_limit {
            format!("{}{TRUNCATION_MARKER}", prefix_chars(rendered, self.json_text_limit))
        } else {
            rendered.to_string()
        }
    }

    fn read_csv(&self, path: &Path) -> Result<Vec<Document>, IngestError> {
        let content = read_file_content(path, self.max_file_size)?;
        let csv_error = |source| IngestError::CsvParseError {
            file: path.display().to_string(),
            source,
        };

        let mut reader = csv::Reader::from_reader(content.as_bytes());
        let headers = reader.headers().map_err(csv_error)?.clone();

        let mut documents = Vec::new();
        for row in reader.records() {
            let row = row.map_err(csv_error)?;

            let record: serde_json::Map<String, Value> = headers
                .iter()
                .zip(row.iter())
                .map(|(header, cell)| (header.to_string(), infer_cell(cell)))
                .collect();
            let text = serde_json::to_string_pretty(&record).map_err(|source| {
                IngestError::JsonParseError {
                    file: path.display().to_string(),
                    source,
                }
            })?;

            let mut doc = Document::new(String::new(), text, Provenance::new("csv", "csv"));
            insert_file_name(&mut doc, path);
            for column in CSV_FIELDS {
                if let Some(value) = record.get(*column).and_then(to_metadata_value) {
                    doc.metadata.insert(*column, value);
                }
            }
            documents.push(doc);
        }
        Ok(documents)
    }

    fn read_plain(&self, path: &Path, kind: FileKind) -> Result<Document, IngestError> {
        let text = read_file_content(path, self.max_file_size)?;
        let source_dir = relative_dir(&self.storage_dir, path);
        let mut doc = Document::new(String::new(), text, Provenance::new(kind.as_str(), source_dir));
        insert_file_name(&mut doc, path);
        Ok(doc)
    }
}

fn too_large(size: u64, limit: u64) -> IngestError {
    IngestError::IoError(std::io::Error::new(
        std::io::ErrorKind::InvalidData,
        format!("file exceeds maximum size: {size} > {limit}"),
    ))
}

fn insert_file_name(doc: &mut Document, path: &Path) {
    if let Some(name) = path.file_name() {
        doc.metadata.insert("file_name", name.to_string_lossy().to_string());
    }
}

/// Numeric-looking cells become numbers; empty cells become null.
fn infer_cell(cell: &str) -> Value {
    let cell = cell.trim();
    if cell.is_empty() {
        return Value::Null;
    }
    if let Ok(i) = cell.parse::<i64>() {
        return Value::from(i);
    }
    if let Ok(f) = cell.parse::<f64>()
        && f.is_finite()
    {
        return Value::from(f);
    }
    Value::from(cell)
}

fn to_metadata_value(value: &Value) -> Option<MetadataValue> {
    match value {
        Value::Null => None,
        Value::Bool(b) => Some(MetadataValue::Bool(*b)),
        Value::Number(n) => n
            .as_i64()
            .map(MetadataValue::Integer)
            .or_else(|| n.as_f64().map(MetadataValue::Float)),
        Value::String(s) => Some(MetadataValue::Text(s.clone())),
        Value::Array(items) => Some(MetadataValue::List(
            items
                .iter()
                .map(|v| match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect(),
        )),
        Value::Object(_) => Some(MetadataValue::Text(value.to_string())),
    }
}

/// Assign `doc_0000`-style ids in order and a shared ingestion timestamp.
fn stamp(documents: &mut [Document]) {
    let timestamp = Utc::now().to_rfc3339();
    for (idx, doc) in documents.iter_mut().enumerate() {
        let doc_id = format!("doc_{idx:04}");
        doc.id = doc_id.clone();
        doc.metadata.insert("doc_id", doc_id);
        doc.metadata.insert("ingestion_timestamp", timestamp.as_str());
    }
}

pub fn summarize(documents: &[Document]) -> IngestSummary {
    let mut by_type = BTreeMap::new();
    let mut by_source_dir = BTreeMap::new();
    for doc in documents {
        *by_type.entry(doc.provenance.file_type.clone()).or_insert(0) += 1;
        *by_source_dir.entry(doc.provenance.source_dir.clone()).or_insert(0) += 1;
    }
    IngestSummary {
        total_documents: documents.len(),
        by_type,
        by_source_dir,
        skipped_files: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn storage() -> TempDir {
        let dir = TempDir::new().unwrap();
        for sub in ["json", "csv", "doc", "notes"] {
            fs::create_dir_all(dir.path().join(sub)).unwrap();
        }
        dir
    }

    fn ingestor(dir: &TempDir) -> LocalIngestor {
        LocalIngestor::new(dir.path(), &IngestConfig::default())
    }

    #[test]
    fn test_missing_storage_dir() {
        let ingestor = LocalIngestor::new("/definitely/not/here", &IngestConfig::default());
        assert!(matches!(
            ingestor.ingest_all(),
            Err(IngestError::StorageNotFound(_))
        ));
    }

    #[test]
    fn test_json_array_yields_one_document_per_item() {
        let dir = storage();
        fs::write(
            dir.path().join("json/restaurants.json"),
            r#"[{"name": "Luigi's", "cuisine_type": "Italian", "rating": 4.5},
                {"restaurant": "Sakura", "dish": "Ramen", "price": 14}]"#,
        )
        .unwrap();

        let (docs, summary) = ingestor(&dir).ingest_all().unwrap();

        assert_eq!(docs.len(), 2);
        assert_eq!(summary.by_type["json"], 2);
        assert_eq!(docs[0].metadata.get_str("name"), Some("Luigi's"));
        assert_eq!(docs[0].metadata.get_f64("rating"), Some(4.5));
        assert_eq!(docs[1].metadata.get_str("dish_name"), Some("Ramen"));
        assert_eq!(docs[1].metadata.get("price"), Some(&MetadataValue::Integer(14)));
        assert_eq!(docs[0].id, "doc_0000");
        assert_eq!(docs[1].metadata.get_str("doc_id"), Some("doc_0001"));
        assert!(docs[0].metadata.contains_key("ingestion_timestamp"));
    }

    #[test]
    fn test_long_json_records_are_truncated() {
        let dir = storage();
        let long = "x".repeat(3000);
        fs::write(dir.path().join("json/big.json"), format!(r#"{{"notes": "{long}"}}"#)).unwrap();

        let (docs, _) = ingestor(&dir).ingest_all().unwrap();

        assert_eq!(docs.len(), 1);
        assert!(docs[0].text.ends_with(TRUNCATION_MARKER));
        assert_eq!(docs[0].text.chars().count(), 1500 + TRUNCATION_MARKER.len());
    }

    #[test]
    fn test_csv_rows_become_documents() {
        let dir = storage();
        fs::write(
            dir.path().join("csv/coupons.csv"),
            "restaurant,Descrição,Valor,valid_until\nLuigi's,Pizza em dobro,50%,\nSakura,Free tea,2.5,2026-12-31\n",
        )
        .unwrap();

        let (docs, summary) = ingestor(&dir).ingest_all().unwrap();

        assert_eq!(docs.len(), 2);
        assert_eq!(summary.by_source_dir["csv"], 2);
        assert_eq!(docs[0].metadata.get_str("Descrição"), Some("Pizza em dobro"));
        assert!(!docs[0].metadata.contains_key("valid_until"));
        assert_eq!(docs[1].metadata.get_f64("Valor"), Some(2.5));
        assert!(docs[0].text.contains("\"restaurant\": \"Luigi's\""));
    }

    #[test]
    fn test_text_and_markdown_take_their_directory() {
        let dir = storage();
        fs::write(dir.path().join("doc/allergens.txt"), "Contains peanuts and sesame.").unwrap();
        fs::write(dir.path().join("notes/specials.md"), "# Specials\nSoup of the day").unwrap();

        let (docs, summary) = ingestor(&dir).ingest_all().unwrap();

        assert_eq!(docs.len(), 2);
        assert_eq!(summary.by_type["markdown"], 1);
        assert_eq!(summary.by_type["text"], 1);
        let policy = docs.iter().find(|d| d.provenance.file_type == "text").unwrap();
        assert_eq!(policy.provenance.source_dir, "doc");
        assert_eq!(policy.metadata.get_str("source_dir"), Some("doc"));
    }

    #[test]
    fn test_bad_file_is_skipped_not_fatal() {
        let dir = storage();
        fs::write(dir.path().join("json/broken.json"), "{ not json").unwrap();
        fs::write(dir.path().join("doc/policy.txt"), "Nut free kitchen.").unwrap();

        let (docs, summary) = ingestor(&dir).ingest_all().unwrap();

        assert_eq!(docs.len(), 1);
        assert_eq!(summary.skipped_files.len(), 1);
        assert!(summary.skipped_files[0].contains("broken.json"));
    }

    #[test]
    fn test_exclude_patterns() {
        let dir = storage();
        fs::write(dir.path().join("notes/draft.md"), "draft").unwrap();
        fs::write(dir.path().join("notes/final.md"), "final").unwrap();
        let config = IngestConfig {
            exclude_patterns: vec!["**/draft.md".to_string()],
            ..Default::default()
        };

        let (docs, _) = LocalIngestor::new(dir.path(), &config).ingest_all().unwrap();

        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].text, "final");
    }

    #[test]
    fn test_infer_cell() {
        assert_eq!(infer_cell(""), Value::Null);
        assert_eq!(infer_cell("12"), Value::from(12));
        assert_eq!(infer_cell("12.5"), Value::from(12.5));
        assert_eq!(infer_cell("50%"), Value::from("50%"));
    }
}
