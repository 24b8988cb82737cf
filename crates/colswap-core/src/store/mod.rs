//! Document store capability set.
//!
//! The swap protocol only needs to create and delete collections, enumerate a
//! collection and upsert documents. [`DocumentStore`] captures that surface;
//! [`MemoryStore`] and [`SledStore`] implement it.

mod config;
mod document;
mod memory;
mod sled_store;
mod spec;

use async_trait::async_trait;

pub use config::StoreConfig;
pub use document::{Document, ID_PROPERTY};
pub use memory::{Fault, FaultPoint, MemoryStore};
pub use sled_store::SledStore;
pub use spec::{
    CollectionHandle, CollectionSpec, DataType, IndexingPolicy, PartitionKeyDefinition,
    RangeIndex, TimeToLive, UniqueKey, UniqueKeyPolicy, MAX_THROUGHPUT, MIN_THROUGHPUT,
    THROUGHPUT_INCREMENT,
};

use crate::error::StoreError;

/// Operations the swap protocol consumes from a document store.
///
/// Calls are issued sequentially by a single run; implementations must not
/// assume any other ordering guarantee.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Create a collection. Fails if it already exists or the definition is rejected.
    async fn create_collection(
        &self,
        database: &str,
        spec: &CollectionSpec,
    ) -> Result<CollectionHandle, StoreError>;

    /// Delete a collection and every document in it.
    async fn delete_collection(&self, database: &str, collection: &str) -> Result<(), StoreError>;

    /// Read every document of a collection, in the store's native order.
    async fn query_all_documents(
        &self,
        database: &str,
        collection: &str,
    ) -> Result<Vec<Document>, StoreError>;

    /// Insert or replace a document by id.
    async fn upsert_document(
        &self,
        database: &str,
        collection: &str,
        document: &Document,
    ) -> Result<(), StoreError>;

    /// Look up a collection definition.
    async fn read_collection(
        &self,
        database: &str,
        collection: &str,
    ) -> Result<Option<CollectionSpec>, StoreError>;

    /// List the collections of a database.
    async fn list_collections(&self, database: &str) -> Result<Vec<CollectionSpec>, StoreError>;
}

fn not_found(database: &str, collection: &str) -> StoreError {
    StoreError::CollectionNotFound {
        database: database.to_string(),
        collection: collection.to_string(),
    }
}

fn already_exists(database: &str, collection: &str) -> StoreError {
    StoreError::CollectionExists {
        database: database.to_string(),
        collection: collection.to_string(),
    }
}

fn duplicate_key(document: &Document, key: &UniqueKey) -> StoreError {
    StoreError::DuplicateKey {
        id: document.id().to_string(),
        paths: key.paths.clone(),
    }
}
