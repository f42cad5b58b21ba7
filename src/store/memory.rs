//! In-process document store backed by a JSON seed file
//!
//! The seed is a single JSON object mapping collection names to arrays of documents:
//!
//! ```json
//! {
//!   "Chemicals": [{"_id": "c1", "Quantity": 12.5, "MinQuantity": 1.0}],
//!   "Equipment": [{"_id": "e1", "Type": "Pump", "IsActive": true}],
//!   "Users":     [{"_id": "u1", "Type": "Customer"}]
//! }
//! ```
//!
//! Documents are immutable once loaded, so the store can be shared by every publisher
//! without locking.

use super::{DocumentStore, Filter, StoreError};
use rand::seq::SliceRandom;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

/// Immutable in-memory document collections
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    collections: HashMap<String, Vec<Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load collections from a JSON seed file
    pub fn load_from_file(path: &Path) -> Result<Self, StoreError> {
        let content = std::fs::read_to_string(path)?;
        let seed: Value = serde_json::from_str(&content)
            .map_err(|e| StoreError::InvalidSeed(format!("{}: {e}", path.display())))?;
        let store = Self::from_value(seed)?;

        info!(
            path = %path.display(),
            collections = store.collections.len(),
            "Loaded document store"
        );
        Ok(store)
    }

    /// Build a store from an already parsed seed object
    pub fn from_value(seed: Value) -> Result<Self, StoreError> {
        let Value::Object(map) = seed else {
            return Err(StoreError::InvalidSeed(
                "top level must be an object of collections".to_string(),
            ));
        };

        let mut collections = HashMap::with_capacity(map.len());
        for (name, documents) in map {
            match documents {
                Value::Array(documents) => {
                    collections.insert(name, documents);
                }
                _ => {
                    return Err(StoreError::InvalidSeed(format!(
                        "collection '{name}' must be an array of documents"
                    )))
                }
            }
        }

        Ok(Self { collections })
    }

    /// Builder-style insertion, mainly for tests and previews
    pub fn with_collection(mut self, name: &str, documents: Vec<Value>) -> Self {
        self.collections.insert(name.to_string(), documents);
        self
    }

    /// Number of documents in a collection (0 when the collection is unknown)
    pub fn count(&self, collection: &str) -> usize {
        self.collections.get(collection).map_or(0, Vec::len)
    }

    /// Pick one matching document (pure apart from the thread-local RNG)
    fn pick(&self, collection: &str, filter: &Filter) -> Result<Option<Value>, StoreError> {
        let documents = self
            .collections
            .get(collection)
            .ok_or_else(|| StoreError::UnknownCollection(collection.to_string()))?;

        let matching: Vec<&Value> = documents.iter().filter(|d| filter.matches(d)).collect();
        debug!(
            collection,
            total = documents.len(),
            matching = matching.len(),
            "Sampling document"
        );

        Ok(matching.choose(&mut rand::thread_rng()).map(|d| (*d).clone()))
    }
}

#[async_trait::async_trait]
impl DocumentStore for MemoryStore {
    async fn sample_one(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Option<Value>, StoreError> {
        self.pick(collection, filter)
    }
}
