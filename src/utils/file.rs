//! File utilities for ingestion.

use std::fs;
use std::path::Path;

/// Kinds of files the ingestor knows how to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Pdf,
    Json,
    Csv,
    Markdown,
    Text,
}

impl FileKind {
    /// Classify a path by its extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_string_lossy().to_lowercase();
        match ext.as_str() {
            "pdf" => Some(FileKind::Pdf),
            "json" => Some(FileKind::Json),
            "csv" => Some(FileKind::Csv),
            "md" | "markdown" => Some(FileKind::Markdown),
            "txt" => Some(FileKind::Text),
            _ => None,
        }
    }

    /// Value stored in the `file_type` metadata field.
    pub fn as_str(self) -> &'static str {
        match self {
            FileKind::Pdf => "pdf",
            FileKind::Json => "json",
            FileKind::Csv => "csv",
            FileKind::Markdown => "markdown",
            FileKind::Text => "text",
        }
    }
}

/// Read file content with size limit.
pub fn read_file_content(path: &Path, max_size: u64) -> std::io::Result<String> {
    let metadata = fs::metadata(path)?;

    if metadata.len() > max_size {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!(
                "file exceeds maximum size: {} > {}",
                metadata.len(),
                max_size
            ),
        ));
    }

    fs::read_to_string(path)
}

/// Parent directory of `path` relative to `base`, `"."` for files at the root.
pub fn relative_dir(base: &Path, path: &Path) -> String {
    path.parent()
        .and_then(|p| p.strip_prefix(base).ok())
        .map(|p| p.to_string_lossy().replace('\\', "/"))
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| ".".to_string())
}

/// Turn a file stem like `joes_pizza_house` into `Joes Pizza House`.
pub fn title_from_stem(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_string_lossy();
    let title = stem
        .split(['_', '-', ' '])
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ");
    (!title.is_empty()).then_some(title)
}
