//! Indexing destinations and the signals that route chunks to them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Collection-specific rewrite applied to a chunk before indexing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Optimization {
    /// Menu content: restaurant, cuisine and section lead the text.
    #[serde(alias = "semantic_food_focused")]
    MenuSearch,
    /// Restaurant records: name, cuisine, location and rating lead the text.
    #[serde(alias = "structured_metadata")]
    RestaurantInfo,
    /// Promotions: offer, type, category and discount lead the text.
    #[serde(alias = "promotional_content")]
    Promotions,
    /// Allergen and dietary policy: safety banner plus `safety_critical` flag.
    SafetyCritical,
    /// Everything in one collection: restaurant, cuisine and section lead the text.
    General,
}

impl Optimization {
    /// Value written to the `optimized_for` metadata field.
    pub fn label(self) -> &'static str {
        match self {
            Optimization::MenuSearch => "menu_search",
            Optimization::RestaurantInfo => "restaurant_info",
            Optimization::Promotions => "coupon_search",
            Optimization::SafetyCritical => "allergen_safety",
            Optimization::General => "general_search",
        }
    }
}

impl fmt::Display for Optimization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One indexing destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionDescriptor {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub file_types: Vec<String>,
    #[serde(default)]
    pub source_dirs: Vec<String>,
    pub optimization: Optimization,
}

impl CollectionDescriptor {
    pub fn new(name: &str, optimization: Optimization) -> Self {
        Self {
            name: name.to_string(),
            description: String::new(),
            file_types: Vec::new(),
            source_dirs: Vec::new(),
            optimization,
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    #[must_use]
    pub fn with_file_types(mut self, file_types: &[&str]) -> Self {
        self.file_types = file_types.iter().map(ToString::to_string).collect();
        self
    }

    #[must_use]
    pub fn with_source_dirs(mut self, source_dirs: &[&str]) -> Self {
        self.source_dirs = source_dirs.iter().map(ToString::to_string).collect();
        self
    }

    /// True when either provenance signal names this collection.
    pub fn matches(&self, file_type: &str, source_dir: &str) -> bool {
        self.file_types.iter().any(|t| t == file_type)
            || self.source_dirs.iter().any(|d| d == source_dir)
    }
}

/// The four default destinations, in routing priority order.
pub fn default_collections() -> Vec<CollectionDescriptor> {
    vec![
        CollectionDescriptor::new("menu", Optimization::MenuSearch)
            .with_description("PDF menu content with dishes and prices")
            .with_file_types(&["pdf"])
            .with_source_dirs(&["pdf"]),
        CollectionDescriptor::new("restaurants", Optimization::RestaurantInfo)
            .with_description("Restaurant details, location, hours, contact info")
            .with_file_types(&["json"])
            .with_source_dirs(&["json"]),
        CollectionDescriptor::new("coupon", Optimization::Promotions)
            .with_description("Discounts, promotions, and offers")
            .with_file_types(&["csv"])
            .with_source_dirs(&["csv"]),
        CollectionDescriptor::new("allergen", Optimization::SafetyCritical)
            .with_description("Critical allergy and dietary restriction info")
            .with_file_types(&["docx"])
            .with_source_dirs(&["doc"]),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_matches_either_signal() {
        let menu = &default_collections()[0];
        assert!(menu.matches("pdf", "elsewhere"));
        assert!(menu.matches("markdown", "pdf"));
        assert!(!menu.matches("markdown", "notes"));
    }

    #[test]
    fn test_optimization_accepts_legacy_names() {
        let opt: Optimization = serde_json::from_str("\"semantic_food_focused\"").unwrap();
        assert_eq!(opt, Optimization::MenuSearch);
        let opt: Optimization = serde_json::from_str("\"safety_critical\"").unwrap();
        assert_eq!(opt, Optimization::SafetyCritical);
    }
}
