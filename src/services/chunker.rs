//! Content-aware document chunking.
//!
//! Three strategies are tried in order: item-oriented for priced menus,
//! section-oriented for documents with recognizable headings, and a generic
//! token window with overlap. A strategy that produces nothing falls through
//! to the generic splitter, so every document yields at least one chunk.

use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;

use super::items::{ItemExtractor, PriceLineExtractor};
use super::normalizer::SectionTable;
use crate::models::{Chunk, ChunkingConfig, ChunkingStats, Document, Metadata};

static RE_TOKEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\S+").unwrap());

pub const CHUNK_MENU_ITEMS: &str = "menu_items";
pub const CHUNK_SECTION: &str = "section";
pub const CHUNK_SECTION_PART: &str = "section_part";
pub const CHUNK_SECTION_COMPLETE: &str = "section_complete";
pub const CHUNK_GENERIC: &str = "generic";

/// Approximate characters per token, used to bound section chunks.
const CHARS_PER_TOKEN: usize = 4;

/// Chunk text plus the chunk-specific metadata merged over the parent's.
#[derive(Debug, Clone)]
struct Piece {
    text: String,
    extra: Metadata,
}

impl Piece {
    fn new(text: String, chunk_type: &str, section: Option<&str>) -> Self {
        let mut extra = Metadata::new();
        if let Some(section) = section {
            extra.insert("section", section);
        }
        extra.insert("chunk_type", chunk_type);
        Self { text, extra }
    }

    #[must_use]
    fn with_item_count(mut self, count: usize) -> Self {
        self.extra.insert("item_count", count);
        self
    }
}

pub struct Chunker {
    chunk_size: usize,
    chunk_overlap: usize,
    items_per_chunk: usize,
    sections: SectionTable,
    extractor: Box<dyn ItemExtractor>,
}

impl Chunker {
    pub fn new(
        config: &ChunkingConfig,
        sections: SectionTable,
        extractor: Box<dyn ItemExtractor>,
    ) -> Self {
        Self {
            chunk_size: config.chunk_size.max(1),
            chunk_overlap: config.chunk_overlap,
            items_per_chunk: config.items_per_chunk.max(1),
            sections,
            extractor,
        }
    }

    pub fn from_config(config: &ChunkingConfig) -> Self {
        Self::new(config, SectionTable::default(), Box::new(PriceLineExtractor))
    }

    /// Split a document into chunks that carry its metadata. Never empty.
    pub fn chunk(&self, document: &Document) -> Vec<Chunk> {
        let text = document.text.as_str();

        let pieces = if self.is_item_bearing(document) {
            self.by_items(text)
        } else if self.sections.has_headers(text) {
            self.by_sections(text)
        } else {
            Vec::new()
        };

        let pieces = if pieces.is_empty() {
            self.generic(text)
        } else {
            pieces
        };

        pieces
            .into_iter()
            .enumerate()
            .map(|(idx, piece)| {
                let idx = u32::try_from(idx).unwrap_or(u32::MAX);
                Chunk::from_document(document, piece.text, idx, piece.extra)
            })
            .collect()
    }

    pub fn chunk_all(&self, documents: &[Document]) -> Vec<Chunk> {
        documents.iter().flat_map(|doc| self.chunk(doc)).collect()
    }

    fn is_item_bearing(&self, document: &Document) -> bool {
        document.metadata.contains_key("menu_items") || document.text.contains('$')
    }

    fn max_section_chars(&self) -> usize {
        self.chunk_size * CHARS_PER_TOKEN
    }

    fn by_items(&self, text: &str) -> Vec<Piece> {
        let mut pieces = Vec::new();

        for (name, lines) in self.sections.split(text) {
            let items = self.items_in(&lines);

            if items.is_empty() {
                let body = lines.join("\n");
                let body = body.trim();
                if body.chars().count() > self.max_section_chars() {
                    for part in self.split_tokens(body) {
                        pieces.push(Piece::new(part, CHUNK_SECTION_PART, Some(name.as_str())));
                    }
                } else if !body.is_empty() {
                    pieces.push(Piece::new(
                        body.to_string(),
                        CHUNK_SECTION,
                        Some(name.as_str()),
                    ));
                }
                continue;
            }

            for group in items.chunks(self.items_per_chunk) {
                pieces.push(
                    Piece::new(group.join("\n"), CHUNK_MENU_ITEMS, Some(name.as_str()))
                        .with_item_count(group.len()),
                );
            }
        }

        pieces
    }

    /// Priced lines, each prefixed with the unpriced description lines
    /// directly above it. Unpriced lines after the last item are appended to
    /// that item.
    fn items_in(&self, lines: &[&str]) -> Vec<String> {
        let mut items = Vec::new();
        let mut pending: Vec<&str> = Vec::new();

        for line in lines {
            let line = line.trim();
            if line.is_empty() || self.sections.header_label(line).is_some() {
                continue;
            }
            if self.extractor.is_item_line(line) {
                pending.push(line);
                items.push(pending.join(" "));
                pending.clear();
            } else {
                pending.push(line);
            }
        }

        if !pending.is_empty()
            && let Some(last) = items.last_mut()
        {
            last.push(' ');
            last.push_str(&pending.join(" "));
        }

        items
    }

    fn by_sections(&self, text: &str) -> Vec<Piece> {
        let mut pieces = Vec::new();

        for (name, lines) in self.sections.split(text) {
            let body = lines.join("\n");
            let body = body.trim();
            if body.chars().count() > self.max_section_chars() {
                for part in self.split_tokens(body) {
                    pieces.push(Piece::new(part, CHUNK_SECTION_PART, Some(name.as_str())));
                }
            } else if !body.is_empty() {
                pieces.push(Piece::new(
                    body.to_string(),
                    CHUNK_SECTION_COMPLETE,
                    Some(name.as_str()),
                ));
            }
        }

        pieces
    }

    fn generic(&self, text: &str) -> Vec<Piece> {
        let parts = self.split_tokens(text);
        if parts.is_empty() {
            return vec![Piece::new(text.to_string(), CHUNK_GENERIC, None)];
        }
        parts
            .into_iter()
            .map(|part| Piece::new(part, CHUNK_GENERIC, None))
            .collect()
    }

    /// Windows of at most `chunk_size` whitespace tokens, consecutive windows
    /// sharing `chunk_overlap` tokens. Text between tokens is kept verbatim.
    pub fn split_tokens(&self, text: &str) -> Vec<String> {
        let tokens: Vec<(usize, usize)> = RE_TOKEN
            .find_iter(text)
            .map(|m| (m.start(), m.end()))
            .collect();
        if tokens.is_empty() {
            return Vec::new();
        }

        let mut parts = Vec::new();
        let mut start = 0;
        loop {
            let hard_end = (start + self.chunk_size).min(tokens.len());
            let end = if hard_end < tokens.len() {
                self.break_point(text, &tokens, start, hard_end)
            } else {
                hard_end
            };

            parts.push(text[tokens[start].0..tokens[end - 1].1].to_string());

            if end >= tokens.len() {
                break;
            }
            start = end.saturating_sub(self.chunk_overlap).max(start + 1);
        }

        parts
    }

    /// End (exclusive token index) for the window `start..hard_end`.
    ///
    /// Cuts after the last sentence end or line break in the window when it
    /// lies past the window midpoint, otherwise at `hard_end`.
    fn break_point(
        &self,
        text: &str,
        tokens: &[(usize, usize)],
        start: usize,
        hard_end: usize,
    ) -> usize {
        let clean_end = |i: usize| {
            let (s, e) = tokens[i];
            let sentence = text[s..e].ends_with(['.', '!', '?']);
            let line_break = tokens
                .get(i + 1)
                .is_some_and(|&(next, _)| text[e..next].contains('\n'));
            sentence || line_break
        };

        if clean_end(hard_end - 1) {
            return hard_end;
        }

        let midpoint = start + (hard_end - start) / 2;
        (midpoint..hard_end - 1)
            .rev()
            .find(|&i| clean_end(i))
            .map_or(hard_end, |i| i + 1)
    }
}

pub fn chunking_stats(documents: usize, chunks: &[Chunk]) -> ChunkingStats {
    let mut by_chunk_type: BTreeMap<String, usize> = BTreeMap::new();
    for chunk in chunks {
        let kind = chunk
            .metadata
            .get_str("chunk_type")
            .unwrap_or(CHUNK_GENERIC)
            .to_string();
        *by_chunk_type.entry(kind).or_default() += 1;
    }

    let avg = if documents == 0 {
        0.0
    } else {
        ((chunks.len() as f64 / documents as f64) * 100.0).round() / 100.0
    };

    ChunkingStats {
        original_documents: documents,
        total_chunks: chunks.len(),
        avg_chunks_per_doc: avg,
        by_chunk_type,
    }
}
