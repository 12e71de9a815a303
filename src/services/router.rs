//! Routes chunks to their indexing destinations and rewrites their text for
//! the kind of search each destination serves.

use indexmap::IndexMap;

use super::budget::MetadataBudget;
use crate::models::{
    Chunk, CollectionDescriptor, Config, IndexMode, Metadata, Optimization,
    DEFAULT_SINGLE_COLLECTION, default_collections,
};

pub const SAFETY_BANNER: &str = "ALLERGEN SAFETY INFORMATION";

/// Promotion fields, each with its English and Portuguese column name.
const PROMOTION_FIELDS: &[(&str, &[&str])] = &[
    ("Offer", &["description", "Descrição"]),
    ("Type", &["type", "Tipo"]),
    ("Category", &["category", "Categoria"]),
    ("Discount", &["discount", "Valor"]),
];

/// Chunks grouped by destination collection.
#[derive(Debug, Clone)]
pub struct Categorized {
    pub mode: IndexMode,
    /// Every configured destination, in routing order, possibly empty.
    pub collections: IndexMap<String, Vec<Chunk>>,
    /// Chunks whose provenance matched no destination.
    pub unrouted: usize,
}

impl Categorized {
    pub fn total_chunks(&self) -> usize {
        self.collections.values().map(Vec::len).sum()
    }

    pub fn counts(&self) -> IndexMap<String, usize> {
        self.collections
            .iter()
            .map(|(name, chunks)| (name.clone(), chunks.len()))
            .collect()
    }
}

pub struct Categorizer {
    mode: IndexMode,
    collections: Vec<CollectionDescriptor>,
    single_collection: String,
    budget: MetadataBudget,
}

impl Categorizer {
    pub fn new(
        mode: IndexMode,
        collections: Vec<CollectionDescriptor>,
        single_collection: impl Into<String>,
    ) -> Self {
        Self {
            mode,
            collections,
            single_collection: single_collection.into(),
            budget: MetadataBudget::default().for_chunks(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.indexing.mode,
            config.collections.clone(),
            config.vector_store.single_collection.clone(),
        )
        .with_budget(MetadataBudget::from_config(&config.metadata))
    }

    /// Replace the budget; routing keys are always added to its allowlist.
    #[must_use]
    pub fn with_budget(mut self, budget: MetadataBudget) -> Self {
        self.budget = budget.for_chunks();
        self
    }

    #[must_use]
    pub fn with_mode(mut self, mode: IndexMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn mode(&self) -> IndexMode {
        self.mode
    }

    /// Names the indexer will write to, in order.
    pub fn destinations(&self) -> Vec<String> {
        match self.mode {
            IndexMode::Single => vec![self.single_collection.clone()],
            IndexMode::Multi => self.collections.iter().map(|c| c.name.clone()).collect(),
        }
    }

    pub fn categorize(&self, chunks: Vec<Chunk>) -> Categorized {
        match self.mode {
            IndexMode::Single => self.categorize_single(chunks),
            IndexMode::Multi => self.categorize_multi(chunks),
        }
    }

    fn categorize_single(&self, chunks: Vec<Chunk>) -> Categorized {
        let routed = chunks
            .into_iter()
            .map(|mut chunk| {
                self.claim(&mut chunk, &self.single_collection, Optimization::General);
                chunk
            })
            .collect();

        let mut collections = IndexMap::new();
        collections.insert(self.single_collection.clone(), routed);

        Categorized {
            mode: IndexMode::Single,
            collections,
            unrouted: 0,
        }
    }

    fn categorize_multi(&self, chunks: Vec<Chunk>) -> Categorized {
        let mut collections: IndexMap<String, Vec<Chunk>> = self
            .collections
            .iter()
            .map(|c| (c.name.clone(), Vec::new()))
            .collect();
        let mut unrouted = 0;

        for mut chunk in chunks {
            let file_type = chunk.metadata.get_str("file_type").unwrap_or("unknown");
            let source_dir = chunk.metadata.get_str("source_dir").unwrap_or("unknown");

            let Some(descriptor) = self
                .collections
                .iter()
                .find(|c| c.matches(file_type, source_dir))
            else {
                tracing::warn!(
                    chunk_id = %chunk.id,
                    file_type,
                    source_dir,
                    "chunk matches no collection, excluding from indexing"
                );
                unrouted += 1;
                continue;
            };

            self.claim(&mut chunk, &descriptor.name, descriptor.optimization);
            if let Some(bucket) = collections.get_mut(&descriptor.name) {
                bucket.push(chunk);
            }
        }

        if unrouted > 0 {
            tracing::warn!(unrouted, "some chunks were not routed");
        }

        Categorized {
            mode: IndexMode::Multi,
            collections,
            unrouted,
        }
    }

    fn claim(&self, chunk: &mut Chunk, collection: &str, optimization: Optimization) {
        chunk.metadata.insert("collection_type", collection);
        optimize(chunk, optimization);
        let outcome = self.budget.enforce(&mut chunk.metadata);
        if outcome.was_reduced() {
            tracing::debug!(
                chunk_id = %chunk.id,
                original = outcome.original_bytes,
                reduced = outcome.final_bytes,
                "chunk metadata reduced to budget"
            );
        }
    }
}

impl Default for Categorizer {
    fn default() -> Self {
        Self::new(IndexMode::Multi, default_collections(), DEFAULT_SINGLE_COLLECTION)
    }
}

fn labeled(metadata: &Metadata, label: &str, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|key| metadata.get(key))
        .map(|value| format!("{label}: {value}"))
}

/// Rewrite a chunk's text for its destination and tag it with `optimized_for`.
pub fn optimize(chunk: &mut Chunk, optimization: Optimization) {
    let meta = &chunk.metadata;
    let (before, after): (Vec<Option<String>>, Vec<Option<String>>) = match optimization {
        Optimization::MenuSearch => (
            vec![
                labeled(meta, "Restaurant", &["restaurant"]),
                labeled(meta, "Cuisine", &["cuisine"]),
                labeled(meta, "Menu Section", &["section"]),
            ],
            vec![
                labeled(meta, "Featured Dish", &["primary_dish"]),
                labeled(meta, "Price Range", &["price_category"]),
            ],
        ),
        Optimization::RestaurantInfo => (
            vec![
                labeled(meta, "Restaurant", &["name", "restaurant"]),
                labeled(meta, "Cuisine", &["cuisine_type", "cuisine"]),
                labeled(meta, "Location", &["neighborhood"]),
                labeled(meta, "Rating", &["rating"]),
            ],
            Vec::new(),
        ),
        Optimization::Promotions => (
            PROMOTION_FIELDS
                .iter()
                .map(|(label, keys)| labeled(meta, label, keys))
                .collect(),
            Vec::new(),
        ),
        Optimization::SafetyCritical => (vec![Some(SAFETY_BANNER.to_string())], Vec::new()),
        Optimization::General => (
            vec![
                labeled(meta, "Restaurant", &["restaurant"]),
                labeled(meta, "Cuisine", &["cuisine"]),
                labeled(meta, "Section", &["section"]),
            ],
            vec![
                labeled(meta, "Featured", &["primary_dish"]),
                labeled(meta, "Dietary", &["dietary_options"]),
            ],
        ),
    };

    let mut parts: Vec<String> = before.into_iter().flatten().collect();
    parts.push(std::mem::take(&mut chunk.text));
    parts.extend(after.into_iter().flatten());
    chunk.text = parts.join("\n");

    chunk.metadata.insert("optimized_for", optimization.label());
    if optimization == Optimization::SafetyCritical {
        chunk.metadata.insert("safety_critical", true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Document, Provenance};

    fn chunk(file_type: &str, source_dir: &str, text: &str) -> Chunk {
        let doc = Document::new("doc_0001", text, Provenance::new(file_type, source_dir));
        Chunk::from_document(&doc, text.to_string(), 0, Metadata::new())
    }

    #[test]
    fn test_routes_by_first_matching_descriptor() {
        let categorizer = Categorizer::default();
        let categorized = categorizer.categorize(vec![
            chunk("pdf", "pdf", "Steak $25"),
            chunk("csv", "csv", "10% off"),
            chunk("text", "doc", "Contains nuts"),
        ]);

        assert_eq!(categorized.collections.len(), 4);
        assert_eq!(categorized.collections["menu"].len(), 1);
        assert_eq!(categorized.collections["coupon"].len(), 1);
        assert_eq!(categorized.collections["allergen"].len(), 1);
        assert!(categorized.collections["restaurants"].is_empty());
        assert_eq!(categorized.unrouted, 0);

        let coupon = &categorized.collections["coupon"][0];
        assert_eq!(coupon.metadata.get_str("collection_type"), Some("coupon"));
        assert_eq!(coupon.metadata.get_str("optimized_for"), Some("coupon_search"));
    }

    #[test]
    fn test_chunk_matching_two_collections_goes_to_first() {
        // pdf matches "menu" by file type, csv matches "coupon" by directory
        let categorized = Categorizer::default().categorize(vec![chunk("pdf", "csv", "Pizza $10")]);

        assert_eq!(categorized.collections["menu"].len(), 1);
        assert!(categorized.collections["coupon"].is_empty());
        assert_eq!(categorized.total_chunks(), 1);
        assert_eq!(categorized.unrouted, 0);
        assert_eq!(
            categorized.collections["menu"][0].metadata.get_str("collection_type"),
            Some("menu")
        );
    }

    #[test]
    fn test_unmatched_chunks_are_counted_not_routed() {
        let categorized = Categorizer::default().categorize(vec![chunk("markdown", "notes", "hi")]);
        assert_eq!(categorized.unrouted, 1);
        assert_eq!(categorized.total_chunks(), 0);
    }

    #[test]
    fn test_allergen_chunk_gets_banner_and_flag() {
        let categorized =
            Categorizer::default().categorize(vec![chunk("text", "doc", "Peanut oil used.")]);
        let routed = &categorized.collections["allergen"][0];

        assert!(routed.text.starts_with(SAFETY_BANNER));
        assert!(routed.text.ends_with("Peanut oil used."));
        assert_eq!(routed.metadata.get("safety_critical").and_then(|v| v.as_bool()), Some(true));
        assert_eq!(routed.metadata.get_str("optimized_for"), Some("allergen_safety"));
    }

    #[test]
    fn test_menu_optimization_wraps_text() {
        let mut c = chunk("pdf", "pdf", "Ribeye $25");
        c.metadata.insert("restaurant", "Luigi's");
        c.metadata.insert("section", "MAIN COURSES");
        c.metadata.insert("price_category", "moderate");

        optimize(&mut c, Optimization::MenuSearch);

        assert_eq!(
            c.text,
            "Restaurant: Luigi's\nMenu Section: MAIN COURSES\nRibeye $25\nPrice Range: moderate"
        );
    }

    #[test]
    fn test_promotion_fields_accept_portuguese_columns() {
        let mut c = chunk("csv", "csv", "row");
        c.metadata.insert("Descrição", "Pizza em dobro");
        c.metadata.insert("Valor", "50%");

        optimize(&mut c, Optimization::Promotions);

        assert_eq!(c.text, "Offer: Pizza em dobro\nDiscount: 50%\nrow");
    }

    #[test]
    fn test_single_mode_uses_one_collection() {
        let categorizer = Categorizer::default().with_mode(IndexMode::Single);
        let mut menu = chunk("pdf", "pdf", "Pasta $12");
        menu.metadata.insert("dietary_options", vec!["vegetarian".to_string()]);
        let categorized = categorizer.categorize(vec![menu, chunk("markdown", "notes", "x")]);

        assert_eq!(categorized.collections.len(), 1);
        let routed = &categorized.collections[DEFAULT_SINGLE_COLLECTION];
        assert_eq!(routed.len(), 2);
        assert_eq!(categorized.unrouted, 0);
        assert!(routed[0].text.ends_with("Dietary: vegetarian"));
        assert_eq!(routed[0].metadata.get_str("optimized_for"), Some("general_search"));
    }

    #[test]
    fn test_routing_keys_survive_budget() {
        let categorizer = Categorizer::default().with_budget(MetadataBudget::new(120, 10));
        let mut c = chunk("text", "doc", "Sesame");
        c.metadata.insert("long_note", "x".repeat(400));
        let categorized = categorizer.categorize(vec![c]);
        let routed = &categorized.collections["allergen"][0];

        assert_eq!(routed.metadata.get_str("collection_type"), Some("allergen"));
        assert!(routed.metadata.contains_key("safety_critical"));
        assert!(!routed.metadata.contains_key("long_note"));
    }
}
