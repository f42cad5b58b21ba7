//! Document store access
//!
//! The simulator only ever reads from the store, and only through one query shape:
//! "pick one document matching this filter, uniformly at random". [`DocumentStore`] is the
//! seam for that query; [`EntitySampler`] layers typed entity decoding on top of it.

pub mod entities;
pub mod filter;
pub mod memory;

pub use entities::{Chemical, Equipment, User};
pub use filter::{Condition, Filter};
pub use memory::MemoryStore;

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

/// Document store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to read store file: {0}")]
    FileRead(#[from] std::io::Error),
    #[error("Invalid store document set: {0}")]
    InvalidSeed(String),
    #[error("Unknown collection: {0}")]
    UnknownCollection(String),
    #[error("Failed to decode document from {collection}: {source}")]
    Decode {
        collection: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Read-only document store queried by the publishers
#[async_trait::async_trait]
pub trait DocumentStore: Send + Sync {
    /// Select one document of `collection` matching `filter` uniformly at random.
    ///
    /// Returns `Ok(None)` when nothing matches; that is not an error.
    async fn sample_one(&self, collection: &str, filter: &Filter)
        -> Result<Option<Value>, StoreError>;
}

/// Typed sampling over a shared [`DocumentStore`]
#[derive(Clone)]
pub struct EntitySampler {
    store: Arc<dyn DocumentStore>,
}

impl EntitySampler {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Sample one matching document and decode it as `T`
    pub async fn sample<T: DeserializeOwned>(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Option<T>, StoreError> {
        match self.store.sample_one(collection, filter).await? {
            Some(document) => serde_json::from_value(document)
                .map(Some)
                .map_err(|source| StoreError::Decode {
                    collection: collection.to_string(),
                    source,
                }),
            None => Ok(None),
        }
    }
}

impl std::fmt::Debug for EntitySampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntitySampler").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sampler() -> EntitySampler {
        let store = MemoryStore::from_value(json!({
            "Users": [
                {"_id": "u1", "Type": "Customer"},
                {"_id": "u2", "Type": "Admin"}
            ],
            "Broken": [
                {"Type": "Customer"}
            ]
        }))
        .unwrap();
        EntitySampler::new(Arc::new(store))
    }

    #[tokio::test]
    async fn test_sample_decodes_entity() {
        let filter = Filter::all().eq("Type", "Customer");
        let user: Option<User> = sampler().sample("Users", &filter).await.unwrap();
        assert_eq!(user.unwrap().id, "u1");
    }

    #[tokio::test]
    async fn test_sample_returns_none_without_match() {
        let filter = Filter::all().eq("Type", "Operator");
        let user: Option<User> = sampler().sample("Users", &filter).await.unwrap();
        assert!(user.is_none());
    }

    #[tokio::test]
    async fn test_sample_reports_decode_failure() {
        let result: Result<Option<User>, _> = sampler().sample("Broken", &Filter::all()).await;
        assert!(matches!(result, Err(StoreError::Decode { .. })));
    }
}
