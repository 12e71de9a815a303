//! Text cleanup, currency standardization and section detection.

use regex::Regex;
use std::sync::LazyLock;

use crate::models::Document;

static RE_HORIZONTAL_WS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\S\n]+").unwrap());
static RE_DISALLOWED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s\-$€£.,:;!?()\[\]/'&%]").unwrap());
static RE_BLANK_LINES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n(?:[ ]*\n)+").unwrap());

static RE_DOLLAR_SPACED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\s+(\d+(?:\.\d{1,2})?)").unwrap());
static RE_DOLLAR_WORDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$?(\d+(?:\.\d{1,2})?)\s*(?:USD|usd|[Dd]ollars?)\b").unwrap()
});
static RE_PRICE_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:price|cost):\s*\$?(\d+(?:\.\d{1,2})?)").unwrap());
static RE_AMOUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$(\d+(?:\.\d{1,2})?)").unwrap());

/// Longest line still treated as a section heading.
const MAX_HEADER_CHARS: usize = 40;

/// Canonical menu sections and the patterns that announce them, in priority order.
pub const DEFAULT_SECTIONS: &[(&str, &str)] = &[
    (r"(?i)\bappetizers?\b|\bstarters?\b", "APPETIZERS"),
    (r"(?i)\bmain\s+courses?\b|\bentr[eé]es?\b|\bmains?\b", "MAIN COURSES"),
    (r"(?i)\bdesserts?\b|\bsweets\b", "DESSERTS"),
    (r"(?i)\bbeverages?\b|\bdrinks?\b", "BEVERAGES"),
    (r"(?i)\bside\s+dish(?:es)?\b|\bsides\b", "SIDES"),
    (r"(?i)\bsoups?\b", "SOUPS"),
    (r"(?i)\bsalads?\b", "SALADS"),
    (r"(?i)\bchef'?s?\s+specials?\b|\bspecials?\b", "SPECIALS"),
];

#[derive(Debug, Clone)]
struct SectionPattern {
    pattern: Regex,
    label: String,
}

/// Ordered `(pattern, label)` lookup table for menu sections.
#[derive(Debug, Clone)]
pub struct SectionTable {
    entries: Vec<SectionPattern>,
}

impl SectionTable {
    /// Build a table from `(regex, canonical label)` pairs.
    pub fn new(entries: &[(&str, &str)]) -> Result<Self, regex::Error> {
        let entries = entries
            .iter()
            .map(|(pattern, label)| {
                Ok(SectionPattern {
                    pattern: Regex::new(pattern)?,
                    label: (*label).to_string(),
                })
            })
            .collect::<Result<Vec<_>, regex::Error>>()?;
        Ok(Self { entries })
    }

    /// Canonical label of the first entry whose pattern occurs anywhere in `text`.
    pub fn detect(&self, text: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.pattern.is_match(text))
            .map(|e| e.label.as_str())
    }

    /// Canonical label if `line` is a section heading: a short, price-free line
    /// that is either all caps or consists of the section name alone.
    pub fn header_label(&self, line: &str) -> Option<&str> {
        let line = line.trim().trim_end_matches(':').trim_end();
        if line.is_empty()
            || line.chars().any(|c| c == '$' || c.is_ascii_digit())
            || line.chars().count() > MAX_HEADER_CHARS
        {
            return None;
        }

        let shouting = line.chars().any(char::is_alphabetic)
            && !line.chars().any(char::is_lowercase);

        self.entries
            .iter()
            .find(|e| match e.pattern.find(line) {
                Some(m) => shouting || (m.start() == 0 && m.end() == line.len()),
                None => false,
            })
            .map(|e| e.label.as_str())
    }

    /// True when any line of `text` is a section heading.
    pub fn has_headers(&self, text: &str) -> bool {
        text.lines().any(|line| self.header_label(line).is_some())
    }

    /// Split `text` at section headings. Text before the first heading is
    /// filed under `GENERAL`; each section keeps its heading line.
    pub fn split<'a>(&self, text: &'a str) -> Vec<(String, Vec<&'a str>)> {
        let mut sections: Vec<(String, Vec<&'a str>)> = Vec::new();
        let mut current_name = "GENERAL".to_string();
        let mut current_lines: Vec<&'a str> = Vec::new();

        for line in text.lines() {
            if let Some(label) = self.header_label(line) {
                if current_lines.iter().any(|l| !l.trim().is_empty()) {
                    sections.push((current_name, std::mem::take(&mut current_lines)));
                }
                current_lines.clear();
                current_name = label.to_string();
            }
            current_lines.push(line);
        }

        if current_lines.iter().any(|l| !l.trim().is_empty()) {
            sections.push((current_name, current_lines));
        }

        sections
    }
}

impl Default for SectionTable {
    fn default() -> Self {
        Self::new(DEFAULT_SECTIONS).expect("built-in section patterns are valid")
    }
}

/// Price statistics computed from every `$amount` in a text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceStats {
    pub min: f64,
    pub max: f64,
    pub avg: f64,
}

impl PriceStats {
    pub fn from_prices(prices: &[f64]) -> Option<Self> {
        if prices.is_empty() {
            return None;
        }
        let min = prices.iter().copied().fold(f64::INFINITY, f64::min);
        let max = prices.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let avg = prices.iter().sum::<f64>() / prices.len() as f64;
        Some(Self {
            min,
            max,
            avg: (avg * 100.0).round() / 100.0,
        })
    }
}

/// Collapse whitespace, strip stray symbols and blank lines.
///
/// Line structure is preserved: the chunker relies on it to find sections
/// and priced items.
pub fn clean_text(raw: &str) -> String {
    let text = raw.replace("\r\n", "\n").replace('\r', "\n");
    let text = RE_DISALLOWED.replace_all(&text, "");
    let text = RE_HORIZONTAL_WS.replace_all(&text, " ");
    let text = text
        .lines()
        .map(str::trim)
        .collect::<Vec<&str>>()
        .join("\n");
    let text = RE_BLANK_LINES.replace_all(&text, "\n");
    text.trim().to_string()
}

/// Rewrite `$ 12`, `12 USD` / `12 dollars` and `price: 12` as `$12`, then
/// collect statistics over every dollar amount.
pub fn standardize_currency(text: &str) -> (String, Option<PriceStats>) {
    let text = RE_DOLLAR_SPACED.replace_all(text, "$$${1}");
    let text = RE_DOLLAR_WORDS.replace_all(&text, "$$${1}");
    let text = RE_PRICE_LABEL
        .replace_all(&text, "Price: $$${1}")
        .into_owned();

    let prices: Vec<f64> = RE_AMOUNT
        .captures_iter(&text)
        .filter_map(|c| c.get(1)?.as_str().parse().ok())
        .collect();

    let stats = PriceStats::from_prices(&prices);
    (text, stats)
}

/// First stage of the pipeline: rewrites document text in place.
#[derive(Debug, Clone, Default)]
pub struct TextNormalizer {
    sections: SectionTable,
}

impl TextNormalizer {
    pub fn new(sections: SectionTable) -> Self {
        Self { sections }
    }

    pub fn sections(&self) -> &SectionTable {
        &self.sections
    }

    /// Replace section headings with their canonical label. Lines that are
    /// not headings are left alone so dish names keep their wording.
    pub fn canonicalize_sections(&self, text: &str) -> String {
        text.lines()
            .map(|line| match self.sections.header_label(line) {
                Some(label) => label.to_string(),
                None => line.to_string(),
            })
            .collect::<Vec<String>>()
            .join("\n")
    }

    /// Clean text, record the first detected section and price statistics.
    pub fn normalize(&self, document: &mut Document) {
        let cleaned = clean_text(&document.text);

        if !document.metadata.contains_key("section")
            && let Some(section) = self.sections.detect(&cleaned)
        {
            document.metadata.insert("section", section);
        }

        let canonical = self.canonicalize_sections(&cleaned);
        let (standardized, stats) = standardize_currency(&canonical);

        if let Some(stats) = stats {
            document.metadata.insert("min_price", stats.min);
            document.metadata.insert("max_price", stats.max);
            document.metadata.insert("avg_price", stats.avg);
        }

        document.text = standardized;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Provenance;

    fn doc(text: &str) -> Document {
        Document::new("d1", text, Provenance::new("pdf", "pdf"))
    }

    #[test]
    fn test_clean_text_collapses_whitespace_and_symbols() {
        let cleaned = clean_text("  Garlic\t\tBread *** $6  \n\n\n  Soup ~ of the day  ");
        assert_eq!(cleaned, "Garlic Bread $6\nSoup of the day");
    }

    #[test]
    fn test_clean_text_keeps_punctuation_and_brackets() {
        let cleaned = clean_text("Joe's [GF] (2 pcs): 20% off / €5, £4; yes!");
        assert_eq!(cleaned, "Joe's [GF] (2 pcs): 20% off / €5, £4; yes!");
    }

    #[test]
    fn test_standardize_currency_variants() {
        let (text, stats) = standardize_currency("Soup $ 7\nPasta 14 USD\nPie 5 dollars\nprice: 20");
        assert_eq!(text, "Soup $7\nPasta $14\nPie $5\nPrice: $20");
        let stats = stats.unwrap();
        assert_eq!(stats.min, 5.0);
        assert_eq!(stats.max, 20.0);
        assert_eq!(stats.avg, 11.5);
    }

    #[test]
    fn test_standardize_currency_is_stable() {
        let (once, _) = standardize_currency("Steak $25.50 USD\nPrice: $9");
        let (twice, _) = standardize_currency(&once);
        assert_eq!(once, twice);
        assert_eq!(once, "Steak $25.50\nPrice: $9");
    }

    #[test]
    fn test_no_prices_leaves_fields_absent() {
        let normalizer = TextNormalizer::default();
        let mut d = doc("Our kitchen handles peanuts and tree nuts.");
        normalizer.normalize(&mut d);
        assert!(!d.metadata.contains_key("min_price"));
        assert!(!d.metadata.contains_key("max_price"));
        assert!(!d.metadata.contains_key("avg_price"));
    }

    #[test]
    fn test_detects_first_section_in_table_order() {
        let normalizer = TextNormalizer::default();
        let mut d = doc("APPETIZERS\nGarlic Bread $6\nMain Courses\nSteak $25");
        normalizer.normalize(&mut d);
        assert_eq!(d.metadata.get_str("section"), Some("APPETIZERS"));
        assert_eq!(d.text, "APPETIZERS\nGarlic Bread $6\nMAIN COURSES\nSteak $25");
        assert_eq!(d.metadata.get_f64("min_price"), Some(6.0));
        assert_eq!(d.metadata.get_f64("max_price"), Some(25.0));
        assert_eq!(d.metadata.get_f64("avg_price"), Some(15.5));
    }

    #[test]
    fn test_existing_section_is_kept() {
        let normalizer = TextNormalizer::default();
        let mut d = doc("Desserts\nTiramisu $8").with_metadata("section", "SPECIALS");
        normalizer.normalize(&mut d);
        assert_eq!(d.metadata.get_str("section"), Some("SPECIALS"));
    }

    #[test]
    fn test_header_label_ignores_priced_and_long_lines() {
        let table = SectionTable::default();
        assert_eq!(table.header_label("Main Courses"), Some("MAIN COURSES"));
        assert_eq!(table.header_label("  desserts:  "), Some("DESSERTS"));
        assert_eq!(table.header_label("OUR FAMOUS SOUPS"), Some("SOUPS"));
        assert_eq!(table.header_label("Caesar Salad"), None);
        assert_eq!(table.header_label("Caesar Salad $9"), None);
        assert_eq!(
            table.header_label("Every salad is tossed to order with seasonal greens from the farm"),
            None
        );
    }

    #[test]
    fn test_split_sections() {
        let table = SectionTable::default();
        let sections = table.split("Welcome\nAPPETIZERS\nGarlic Bread $6\nDESSERTS\nPie $5");
        let names: Vec<&str> = sections.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["GENERAL", "APPETIZERS", "DESSERTS"]);
        assert_eq!(sections[1].1, vec!["APPETIZERS", "Garlic Bread $6"]);
    }

    #[test]
    fn test_custom_table_can_be_injected() {
        let table = SectionTable::new(&[(r"(?i)\bbrunch\b", "BRUNCH")]).unwrap();
        let normalizer = TextNormalizer::new(table);
        let mut d = doc("Brunch\nEggs Benedict $14");
        normalizer.normalize(&mut d);
        assert_eq!(d.metadata.get_str("section"), Some("BRUNCH"));
    }
}
