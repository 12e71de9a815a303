//! Heuristic metadata enrichment for normalized documents.
//!
//! Every classifier here is a plain function over an injectable lookup
//! table; [`MetadataEnricher`] composes them in a fixed order and finishes
//! with the metadata budget pass.

use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

use super::budget::{BudgetOutcome, MetadataBudget};
use super::items::{ItemExtractor, MenuItem, PriceLineExtractor};
use crate::models::{Document, Metadata, MetadataValue, Tag};

pub const DEFAULT_DIETARY_PATTERNS: &[(&str, &str)] = &[
    ("vegetarian", r"(?i)\b(?:vegetarian|veggie)\b"),
    ("vegan", r"(?i)\bvegan\b"),
    ("gluten_free", r"(?i)\b(?:gluten[- ]free|gf)\b"),
    ("dairy_free", r"(?i)\b(?:dairy[- ]free|df)\b"),
    ("nut_free", r"(?i)\b(?:nut[- ]free|no nuts)\b"),
    ("halal", r"(?i)\bhalal\b"),
    ("kosher", r"(?i)\bkosher\b"),
    ("spicy", r"(?i)\b(?:spicy|hot|chili|jalapeño)\b"),
    ("organic", r"(?i)\borganic\b"),
];

pub const DEFAULT_CUISINE_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "italian",
        &["pasta", "pizza", "risotto", "tiramisu", "marinara", "alfredo", "carbonara", "parmigiano"],
    ),
    (
        "chinese",
        &["wok", "dim sum", "szechuan", "kung pao", "sweet and sour", "fried rice", "chow mein"],
    ),
    (
        "japanese",
        &["sushi", "sashimi", "tempura", "ramen", "teriyaki", "miso", "yakitori", "udon"],
    ),
    (
        "mexican",
        &["taco", "burrito", "enchilada", "quesadilla", "salsa", "guacamole", "fajita", "nacho"],
    ),
    (
        "indian",
        &["curry", "tandoori", "naan", "tikka", "masala", "biryani", "dal", "paneer"],
    ),
    (
        "thai",
        &["pad thai", "tom yum", "green curry", "massaman", "som tam", "thai basil", "coconut"],
    ),
    (
        "french",
        &["croissant", "baguette", "coq au vin", "ratatouille", "crème brûlée", "bouillabaisse"],
    ),
    (
        "american",
        &["burger", "bbq", "ribs", "wings", "mac and cheese", "apple pie", "meatloaf"],
    ),
];

pub const DEFAULT_DIETARY_OPTIONS: &[(&str, &[&str])] = &[
    ("vegetarian", &["vegetarian", "veggie", "meatless"]),
    ("vegan", &["vegan", "plant-based"]),
    ("gluten_free", &["gluten-free", "gluten free", "gf", "celiac"]),
    ("dairy_free", &["dairy-free", "dairy free", "lactose-free"]),
    ("nut_free", &["nut-free", "nut free", "no nuts", "allergy friendly"]),
    ("halal", &["halal"]),
    ("kosher", &["kosher"]),
    ("organic", &["organic", "farm-to-table", "locally sourced"]),
    ("healthy", &["healthy", "low-calorie", "light", "fresh"]),
    ("spicy", &["spicy", "hot", "chili", "jalapeño", "habanero"]),
];

const SPICY_WORDS: &[&str] = &["spicy", "hot", "chili"];
const SPECIAL_WORDS: &[&str] = &["special", "chef", "signature"];
const PREMIUM_WORDS: &[&str] = &["organic", "farm", "fresh"];

static RESTAURANT_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)(?:Restaurant|Bistro|Cafe|Kitchen|Grill|House):[ \t]*([A-Za-z '&]+)",
        r"(?i)Welcome to ([A-Za-z '&]+)",
        r"(?i)([A-Za-z '&]+)'s Menu",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// Ordered `(label, regex)` table; a label applies when its pattern occurs.
#[derive(Debug, Clone)]
pub struct PatternTable {
    entries: Vec<(String, Regex)>,
}

impl PatternTable {
    pub fn new(entries: &[(&str, &str)]) -> Result<Self, regex::Error> {
        let entries = entries
            .iter()
            .map(|(label, pattern)| Ok(((*label).to_string(), Regex::new(pattern)?)))
            .collect::<Result<Vec<_>, regex::Error>>()?;
        Ok(Self { entries })
    }

    /// Every label whose pattern matches, in table order.
    pub fn labels_in(&self, text: &str) -> Vec<String> {
        self.entries
            .iter()
            .filter(|(_, re)| re.is_match(text))
            .map(|(label, _)| label.clone())
            .collect()
    }
}

impl Default for PatternTable {
    fn default() -> Self {
        Self::new(DEFAULT_DIETARY_PATTERNS).expect("built-in dietary patterns are valid")
    }
}

/// Ordered `(label, keywords)` table matched by lowercase substring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordTable {
    entries: Vec<(String, Vec<String>)>,
}

impl KeywordTable {
    pub fn new(entries: &[(&str, &[&str])]) -> Self {
        Self {
            entries: entries
                .iter()
                .map(|(label, keywords)| {
                    (
                        (*label).to_string(),
                        keywords.iter().map(|k| k.to_lowercase()).collect(),
                    )
                })
                .collect(),
        }
    }

    pub fn cuisines() -> Self {
        Self::new(DEFAULT_CUISINE_KEYWORDS)
    }

    pub fn dietary_options() -> Self {
        Self::new(DEFAULT_DIETARY_OPTIONS)
    }

    /// `(label, hits, table size)` for every entry, in table order.
    fn scores<'a>(&'a self, text_lower: &'a str) -> impl Iterator<Item = (&'a str, usize, usize)> {
        self.entries.iter().map(move |(label, keywords)| {
            let hits = keywords
                .iter()
                .filter(|k| text_lower.contains(k.as_str()))
                .count();
            (label.as_str(), hits, keywords.len())
        })
    }

    /// Labels with at least one keyword present, in table order.
    pub fn labels_in(&self, text: &str) -> Vec<String> {
        let lower = text.to_lowercase();
        self.scores(&lower)
            .filter(|(_, hits, _)| *hits > 0)
            .map(|(label, _, _)| label.to_string())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CuisineMatch {
    pub cuisine: String,
    pub hits: usize,
    /// hits / keyword count of the winning cuisine
    pub confidence: f64,
}

/// Pick the cuisine with the most keyword hits.
///
/// Equal scores resolve to the cuisine listed first in the table. Returns
/// `None` when no keyword occurs at all.
pub fn classify_cuisine(text: &str, table: &KeywordTable) -> Option<CuisineMatch> {
    let lower = text.to_lowercase();
    let mut best: Option<(&str, usize, usize)> = None;

    for (label, hits, size) in table.scores(&lower) {
        if hits == 0 {
            continue;
        }
        if best.is_none_or(|(_, best_hits, _)| hits > best_hits) {
            best = Some((label, hits, size));
        }
    }

    best.map(|(cuisine, hits, size)| CuisineMatch {
        cuisine: cuisine.to_string(),
        hits,
        confidence: hits as f64 / size as f64,
    })
}

/// Price tier for an average item price.
pub fn price_tier(avg_price: f64) -> &'static str {
    if avg_price < 15.0 {
        "budget"
    } else if avg_price < 30.0 {
        "moderate"
    } else if avg_price < 50.0 {
        "upscale"
    } else {
        "luxury"
    }
}

/// Restaurant name announced in the text, if any.
pub fn restaurant_from_text(text: &str) -> Option<String> {
    RESTAURANT_PATTERNS.iter().find_map(|re| {
        let name = re.captures(text)?.get(1)?.as_str().trim();
        (!name.is_empty()).then(|| name.to_string())
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dish {
    pub name: String,
    pub price: f64,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub spicy: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub special: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub premium: bool,
}

impl From<&MenuItem> for Dish {
    fn from(item: &MenuItem) -> Self {
        let lower = item.name.to_lowercase();
        let has_any = |words: &[&str]| words.iter().any(|w| lower.contains(w));
        Self {
            name: item.name.clone(),
            price: item.price,
            spicy: has_any(SPICY_WORDS),
            special: has_any(SPECIAL_WORDS),
            premium: has_any(PREMIUM_WORDS),
        }
    }
}

/// `key:value` filter tags assembled from already-derived fields.
pub fn search_tags(metadata: &Metadata) -> Vec<String> {
    let mut tags = Vec::new();
    let mut push = |key: &str, value: &str| {
        if let Ok(tag) = Tag::sanitized(key, value) {
            tags.push(tag.to_string());
        }
    };

    if let Some(section) = metadata.get_str("section") {
        push("section", section);
    }
    if let Some(cuisine) = metadata.get_str("cuisine") {
        push("cuisine", cuisine);
    }
    if let Some(tier) = metadata.get_str("price_category") {
        push("price", tier);
    }
    if let Some(MetadataValue::List(options)) = metadata.get("dietary_options") {
        for option in options {
            push("diet", option);
        }
    }
    if let Some(restaurant) = metadata.get_str("restaurant_normalized") {
        push("restaurant", restaurant);
    }

    tags
}

/// Composes the enrichment heuristics over one document.
pub struct MetadataEnricher {
    dietary: PatternTable,
    cuisines: KeywordTable,
    dietary_options: KeywordTable,
    extractor: Box<dyn ItemExtractor>,
    budget: MetadataBudget,
}

impl MetadataEnricher {
    pub fn new(budget: MetadataBudget) -> Self {
        Self {
            dietary: PatternTable::default(),
            cuisines: KeywordTable::cuisines(),
            dietary_options: KeywordTable::dietary_options(),
            extractor: Box::new(PriceLineExtractor),
            budget,
        }
    }

    #[must_use]
    pub fn with_cuisines(mut self, cuisines: KeywordTable) -> Self {
        self.cuisines = cuisines;
        self
    }

    #[must_use]
    pub fn with_dietary_patterns(mut self, dietary: PatternTable) -> Self {
        self.dietary = dietary;
        self
    }

    #[must_use]
    pub fn with_extractor(mut self, extractor: Box<dyn ItemExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn enrich(&self, document: &mut Document) -> BudgetOutcome {
        let text = document.text.as_str();
        let meta = &mut document.metadata;

        let labels = self.dietary.labels_in(text);
        if !labels.is_empty() {
            meta.insert("dietary_labels", labels);
        }

        let items = self.extractor.extract_items(text);
        if !items.is_empty() {
            if let Ok(json) = serde_json::to_string(&items) {
                meta.insert("menu_items", json);
            }
            meta.insert("item_count", items.len());
        }

        if !meta.contains_key("restaurant")
            && let Some(name) = restaurant_from_text(text)
        {
            meta.insert("restaurant", name);
        }
        if let Some(name) = meta.get("restaurant").map(ToString::to_string) {
            meta.insert("restaurant_normalized", name.to_lowercase().replace(' ', "_"));
        }

        if !meta.contains_key("cuisine")
            && let Some(found) = classify_cuisine(text, &self.cuisines)
        {
            meta.insert("cuisine", found.cuisine);
            meta.insert("cuisine_confidence", found.confidence);
        }

        if !items.is_empty() {
            let dishes: Vec<Dish> = items.iter().map(Dish::from).collect();
            if let Ok(json) = serde_json::to_string(&dishes) {
                meta.insert("dishes", json);
            }
            if let [only] = dishes.as_slice() {
                meta.insert("primary_dish", only.name.as_str());
                meta.insert("primary_price", only.price);
            }
        }

        if meta.contains_key("min_price")
            && meta.contains_key("max_price")
            && let Some(avg) = meta.get_f64("avg_price")
        {
            meta.insert("price_category", price_tier(avg));
        }

        let options = self.dietary_options.labels_in(text);
        meta.insert("dietary_friendly", !options.is_empty());
        if !options.is_empty() {
            meta.insert("dietary_options", options);
        }

        let tags = search_tags(meta);
        meta.insert("search_tags", tags);

        let outcome = self.budget.enforce(meta);
        if outcome.was_reduced() {
            tracing::debug!(
                doc = %document.id,
                from = outcome.original_bytes,
                to = outcome.final_bytes,
                "metadata reduced to fit budget"
            );
        }
        outcome
    }
}

impl Default for MetadataEnricher {
    fn default() -> Self {
        Self::new(MetadataBudget::default())
    }
}
