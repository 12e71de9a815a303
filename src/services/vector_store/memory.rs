use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;
use std::sync::atomic::{AtomicU32, Ordering};

use super::{VectorRecord, VectorStore};
use crate::error::VectorStoreError;

struct InMemoryCollection {
    dimension: usize,
    points: HashMap<String, VectorRecord>,
}

/// Process-local store used for dry runs and tests.
///
/// Failures can be injected per collection, or as a number of leading
/// connection errors, to exercise the indexer's isolation and retry paths.
pub struct InMemoryStore {
    collections: RwLock<HashMap<String, InMemoryCollection>>,
    failing: RwLock<HashSet<String>>,
    transient_failures: AtomicU32,
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
            failing: RwLock::new(HashSet::new()),
            transient_failures: AtomicU32::new(0),
        }
    }

    /// Every upsert into `collection` fails with a non-retryable error.
    #[must_use]
    pub fn failing_on(self, collection: &str) -> Self {
        if let Ok(mut failing) = self.failing.write() {
            failing.insert(collection.to_string());
        }
        self
    }

    /// The next `count` calls to `health_check` or `ensure_collection` fail
    /// as if the store were unreachable.
    #[must_use]
    pub fn unreachable_for(self, count: u32) -> Self {
        self.transient_failures.store(count, Ordering::SeqCst);
        self
    }

    fn take_transient_failure(&self) -> Result<(), VectorStoreError> {
        let remaining = self.transient_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.transient_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(VectorStoreError::ConnectionError(
                "in-memory store unreachable".to_string(),
            ));
        }
        Ok(())
    }

    pub fn point_count(&self, collection: &str) -> usize {
        self.collections
            .read()
            .ok()
            .and_then(|cols| cols.get(collection).map(|c| c.points.len()))
            .unwrap_or(0)
    }

    pub fn collection_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .collections
            .read()
            .map(|cols| cols.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryStore").finish_non_exhaustive()
    }
}

#[async_trait]
impl VectorStore for InMemoryStore {
    async fn health_check(&self) -> Result<bool, VectorStoreError> {
        self.take_transient_failure()?;
        Ok(true)
    }

    async fn ensure_collection(
        &self,
        name: &str,
        dimension: usize,
    ) -> Result<(), VectorStoreError> {
        self.take_transient_failure()?;

        let mut cols = self
            .collections
            .write()
            .map_err(|e| VectorStoreError::CollectionError(e.to_string()))?;
        cols.entry(name.to_string())
            .or_insert_with(|| InMemoryCollection {
                dimension,
                points: HashMap::new(),
            });
        Ok(())
    }

    async fn upsert(&self, name: &str, records: Vec<VectorRecord>) -> Result<(), VectorStoreError> {
        let is_failing = self
            .failing
            .read()
            .map(|f| f.contains(name))
            .unwrap_or(false);
        if is_failing {
            return Err(VectorStoreError::UpsertError(format!(
                "write rejected for collection {name}"
            )));
        }

        let mut cols = self
            .collections
            .write()
            .map_err(|e| VectorStoreError::UpsertError(e.to_string()))?;
        let col = cols
            .get_mut(name)
            .ok_or_else(|| VectorStoreError::UpsertError(format!("collection {name} not found")))?;

        for record in records {
            if record.vector.len() != col.dimension {
                return Err(VectorStoreError::UpsertError(format!(
                    "vector of length {} does not fit collection {name} ({})",
                    record.vector.len(),
                    col.dimension
                )));
            }
            col.points.insert(record.id.clone(), record);
        }
        Ok(())
    }

    fn driver(&self) -> &'static str {
        "memory"
    }
}
