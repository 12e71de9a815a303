//! Hard ceiling on the serialized size of a record's metadata.
//!
//! The vector store rejects records whose metadata exceeds its per-record
//! limit, so every document and chunk passes through [`MetadataBudget::enforce`]
//! before it is indexed. Reduction is greedy and deterministic:
//!
//! 1. drop derived, non-critical fields in a fixed order, re-measuring after
//!    each drop;
//! 2. truncate long string values to a fixed prefix plus `...`; long lists
//!    are joined with `, ` and truncated the same way;
//! 3. keep only the critical allowlist.
//!
//! Each step stops as soon as the metadata fits, and metadata that already
//! fits is never touched, so enforcing twice is the same as enforcing once.

use serde::Serialize;

use crate::models::{Metadata, MetadataConfig, MetadataValue};
use crate::utils::truncate_with_ellipsis;

/// Derived fields that may be dropped, highest priority first.
pub const NON_CRITICAL_KEYS: &[&str] = &[
    "menu_items",
    "dishes",
    "normalized_text",
    "standardized_text",
    "cleaned_text",
    "optimized_text",
    "search_tags",
    "dietary_labels",
    "dietary_options",
];

/// Fields that survive even the last-resort reduction.
pub const CRITICAL_KEYS: &[&str] = &[
    "doc_id",
    "ingestion_timestamp",
    "file_type",
    "source_dir",
    "restaurant",
    "cuisine",
];

/// Extra fields a categorized chunk must always keep: its routing tags and
/// the lineage the store payload is keyed by.
pub const ROUTING_KEYS: &[&str] = &[
    "collection_type",
    "safety_critical",
    "document_id",
    "chunk_index",
];

/// Which reduction steps ran.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BudgetOutcome {
    pub original_bytes: usize,
    pub final_bytes: usize,
    pub dropped_fields: usize,
    pub truncated_fields: usize,
    pub reduced_to_critical: bool,
}

impl BudgetOutcome {
    pub fn was_reduced(&self) -> bool {
        self.dropped_fields > 0 || self.truncated_fields > 0 || self.reduced_to_critical
    }
}

#[derive(Debug, Clone)]
pub struct MetadataBudget {
    max_bytes: usize,
    truncate_to: usize,
    non_critical: Vec<String>,
    critical: Vec<String>,
}

impl MetadataBudget {
    pub fn new(max_bytes: usize, truncate_to: usize) -> Self {
        Self {
            max_bytes,
            truncate_to,
            non_critical: NON_CRITICAL_KEYS.iter().map(ToString::to_string).collect(),
            critical: CRITICAL_KEYS.iter().map(ToString::to_string).collect(),
        }
    }

    pub fn from_config(config: &MetadataConfig) -> Self {
        Self::new(config.max_metadata_bytes, config.truncate_to)
    }

    /// Budget for categorized chunks: routing tags join the allowlist.
    #[must_use]
    pub fn for_chunks(mut self) -> Self {
        for key in ROUTING_KEYS {
            if !self.critical.iter().any(|k| k == key) {
                self.critical.push((*key).to_string());
            }
        }
        self
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    pub fn fits(&self, metadata: &Metadata) -> bool {
        metadata.serialized_len() <= self.max_bytes
    }

    pub fn enforce(&self, metadata: &mut Metadata) -> BudgetOutcome {
        let mut outcome = BudgetOutcome {
            original_bytes: metadata.serialized_len(),
            ..Default::default()
        };

        if outcome.original_bytes <= self.max_bytes {
            outcome.final_bytes = outcome.original_bytes;
            return outcome;
        }

        for key in &self.non_critical {
            if metadata.remove(key).is_some() {
                outcome.dropped_fields += 1;
                if self.fits(metadata) {
                    outcome.final_bytes = metadata.serialized_len();
                    return outcome;
                }
            }
        }

        let long_keys: Vec<String> = metadata
            .iter()
            .filter(|(_, value)| {
                flattened(value).is_some_and(|s| s.chars().count() > self.truncate_to)
            })
            .map(|(key, _)| key.clone())
            .collect();

        for key in long_keys {
            if let Some(value) = metadata.get_mut(&key)
                && let Some(text) = flattened(value)
            {
                *value = MetadataValue::Text(truncate_with_ellipsis(&text, self.truncate_to));
                outcome.truncated_fields += 1;
            }
            if self.fits(metadata) {
                outcome.final_bytes = metadata.serialized_len();
                return outcome;
            }
        }

        let critical = &self.critical;
        metadata.retain(|key, _| critical.iter().any(|k| k == key));
        outcome.reduced_to_critical = true;
        outcome.final_bytes = metadata.serialized_len();

        if outcome.final_bytes > self.max_bytes {
            tracing::warn!(
                bytes = outcome.final_bytes,
                limit = self.max_bytes,
                "metadata still over budget after reduction to critical fields"
            );
        }

        outcome
    }
}

/// String form of a truncatable value: text as is, lists joined with `, `.
fn flattened(value: &MetadataValue) -> Option<String> {
    match value {
        MetadataValue::Text(s) => Some(s.clone()),
        MetadataValue::List(items) => Some(items.join(", ")),
        _ => None,
    }
}

impl Default for MetadataBudget {
    fn default() -> Self {
        Self::from_config(&MetadataConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn critical_fields() -> Metadata {
        let mut meta = Metadata::new();
        meta.insert("doc_id", "doc_0001");
        meta.insert("ingestion_timestamp", "2026-01-01T12:00:00+00:00");
        meta.insert("file_type", "pdf");
        meta.insert("source_dir", "pdf");
        meta.insert("restaurant", "Luigi's Trattoria");
        meta
    }

    #[test]
    fn test_within_budget_is_untouched() {
        let budget = MetadataBudget::new(800, 100);
        let mut meta = critical_fields();
        meta.insert("menu_items", "short");
        let before = meta.clone();
        let outcome = budget.enforce(&mut meta);
        assert_eq!(meta, before);
        assert!(!outcome.was_reduced());
    }

    #[test]
    fn test_drops_non_critical_in_order_and_stops() {
        let mut meta = critical_fields();
        meta.insert("menu_items", "x".repeat(500));
        meta.insert("search_tags", vec!["section:desserts".to_string()]);
        let budget = MetadataBudget::new(400, 100);

        let outcome = budget.enforce(&mut meta);

        assert_eq!(outcome.dropped_fields, 1);
        assert!(!meta.contains_key("menu_items"));
        assert!(meta.contains_key("search_tags"));
        assert!(budget.fits(&meta));
    }

    #[test]
    fn test_truncates_long_strings_when_drops_are_not_enough() {
        let mut meta = critical_fields();
        meta.insert("description", "d".repeat(600));
        let budget = MetadataBudget::new(400, 100);

        let outcome = budget.enforce(&mut meta);

        assert_eq!(outcome.truncated_fields, 1);
        assert!(!outcome.reduced_to_critical);
        let description = meta.get_str("description").unwrap();
        assert_eq!(description.chars().count(), 103);
        assert!(description.ends_with("..."));
    }

    #[test]
    fn test_two_thousand_bytes_against_eight_hundred() {
        let mut meta = critical_fields();
        meta.insert("menu_items", "m".repeat(400));
        meta.insert("dishes", "d".repeat(400));
        meta.insert("search_tags", vec!["cuisine:italian".to_string(); 10]);
        for i in 0..6 {
            meta.insert(format!("note_{i}"), "n".repeat(90));
        }
        meta.insert("summary", "s".repeat(300));
        assert!(meta.serialized_len() >= 2000);

        let budget = MetadataBudget::new(800, 100);
        budget.enforce(&mut meta);

        assert!(meta.serialized_len() <= 800);
        for key in ["doc_id", "ingestion_timestamp", "file_type", "source_dir"] {
            assert!(meta.contains_key(key), "missing critical field {key}");
        }
    }

    #[test]
    fn test_long_critical_lists_are_truncated() {
        let mut meta = critical_fields();
        meta.insert("restaurant", vec!["Trattoria Da Luigi e Figli".to_string(); 20]);
        meta.insert("cuisine", vec!["italian".to_string(); 60]);
        let budget = MetadataBudget::new(400, 100);

        let outcome = budget.enforce(&mut meta);

        assert!(budget.fits(&meta));
        assert_eq!(outcome.truncated_fields, 2);
        let restaurant = meta.get_str("restaurant").unwrap();
        assert!(restaurant.starts_with("Trattoria Da Luigi e Figli, "));
        assert!(restaurant.ends_with("..."));
        assert!(meta.get_str("cuisine").is_some());
    }

    #[test]
    fn test_last_resort_keeps_allowlist_only() {
        let mut meta = critical_fields();
        for i in 0..40 {
            meta.insert(format!("field_{i}"), "v".repeat(40));
        }
        let budget = MetadataBudget::new(300, 100);

        let outcome = budget.enforce(&mut meta);

        assert!(outcome.reduced_to_critical);
        assert_eq!(meta.len(), 5);
        assert!(budget.fits(&meta));
    }

    #[test]
    fn test_chunk_budget_keeps_routing_tags() {
        let mut meta = critical_fields();
        meta.insert("collection_type", "allergen");
        meta.insert("safety_critical", true);
        for i in 0..40 {
            meta.insert(format!("field_{i}"), "v".repeat(40));
        }
        let budget = MetadataBudget::new(400, 100).for_chunks();

        budget.enforce(&mut meta);

        assert_eq!(meta.get_str("collection_type"), Some("allergen"));
        assert_eq!(meta.get("safety_critical"), Some(&MetadataValue::Bool(true)));
    }

    fn arb_metadata() -> impl Strategy<Value = Metadata> {
        let keys = prop::sample::select(vec![
            "doc_id",
            "file_type",
            "source_dir",
            "restaurant",
            "menu_items",
            "dishes",
            "search_tags",
            "dietary_labels",
            "description",
            "notes",
            "hours",
            "address",
        ]);
        prop::collection::vec((keys, "[a-z ]{0,300}"), 0..12).prop_map(|entries| {
            entries
                .into_iter()
                .map(|(k, v)| (k.to_string(), MetadataValue::Text(v)))
                .collect()
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn prop_enforce_is_idempotent(meta in arb_metadata()) {
            let budget = MetadataBudget::new(800, 100);
            let mut once = meta;
            budget.enforce(&mut once);
            let mut twice = once.clone();
            budget.enforce(&mut twice);
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn prop_critical_values_fit_after_enforce(meta in arb_metadata()) {
            let budget = MetadataBudget::new(800, 100);
            let mut meta = meta;
            budget.enforce(&mut meta);
            // at most six allowlisted strings of 103 chars each
            prop_assert!(meta.serialized_len() <= 800);
        }
    }
}
