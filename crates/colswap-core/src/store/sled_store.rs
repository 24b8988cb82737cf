//! Persistent local document store backed by sled.
//!
//! Layout:
//! - `catalog` tree: `database\0collection` -> JSON [`CollectionSpec`]
//! - one tree per collection named `docs\0database\0collection`:
//!   document id -> JSON document

use async_trait::async_trait;
use sled::{Db, Tree};

use super::{
    already_exists, duplicate_key, not_found, CollectionHandle, CollectionSpec, Document,
    DocumentStore, StoreConfig,
};
use crate::error::StoreError;

/// Tree name for collection definitions.
const CATALOG_TREE: &str = "catalog";

/// Prefix of per-collection document trees.
const DOCUMENTS_PREFIX: &[u8] = b"docs\0";

/// Document store persisted in a sled database.
pub struct SledStore {
    db: Db,
    catalog: Tree,
}

impl SledStore {
    /// Open or create a store with the given configuration.
    pub fn open(config: StoreConfig) -> Result<Self, StoreError> {
        let db = config.to_sled_config().open()?;
        let catalog = db.open_tree(CATALOG_TREE)?;
        Ok(Self { db, catalog })
    }

    /// Flush pending writes to disk.
    pub fn flush(&self) -> Result<(), StoreError> {
        self.db.flush()?;
        Ok(())
    }

    fn catalog_key(database: &str, collection: &str) -> Vec<u8> {
        let mut key = Vec::with_capacity(database.len() + collection.len() + 1);
        key.extend_from_slice(database.as_bytes());
        key.push(0);
        key.extend_from_slice(collection.as_bytes());
        key
    }

    fn documents_tree_name(database: &str, collection: &str) -> Vec<u8> {
        let mut name = DOCUMENTS_PREFIX.to_vec();
        name.extend_from_slice(&Self::catalog_key(database, collection));
        name
    }

    fn load_spec(&self, database: &str, collection: &str) -> Result<Option<CollectionSpec>, StoreError> {
        match self.catalog.get(Self::catalog_key(database, collection))? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Open the document tree of an existing collection.
    fn documents(&self, database: &str, collection: &str) -> Result<(CollectionSpec, Tree), StoreError> {
        let spec = self
            .load_spec(database, collection)?
            .ok_or_else(|| not_found(database, collection))?;
        let tree = self.db.open_tree(Self::documents_tree_name(database, collection))?;
        Ok((spec, tree))
    }
}

#[async_trait]
impl DocumentStore for SledStore {
    async fn create_collection(
        &self,
        database: &str,
        spec: &CollectionSpec,
    ) -> Result<CollectionHandle, StoreError> {
        spec.validate()?;

        let key = Self::catalog_key(database, &spec.id);
        let value = serde_json::to_vec(spec)?;
        if self
            .catalog
            .compare_and_swap(key, None as Option<&[u8]>, Some(value))?
            .is_err()
        {
            return Err(already_exists(database, &spec.id));
        }

        // Documents left behind by an interrupted delete must not reappear.
        let tree_name = Self::documents_tree_name(database, &spec.id);
        self.db.drop_tree(&tree_name)?;
        self.db.open_tree(&tree_name)?;

        tracing::debug!(database, collection = %spec.id, "collection created");
        Ok(CollectionHandle::new(database, &spec.id))
    }

    async fn delete_collection(&self, database: &str, collection: &str) -> Result<(), StoreError> {
        if self
            .catalog
            .remove(Self::catalog_key(database, collection))?
            .is_none()
        {
            return Err(not_found(database, collection));
        }
        self.db
            .drop_tree(Self::documents_tree_name(database, collection))?;

        tracing::debug!(database, collection, "collection deleted");
        Ok(())
    }

    async fn query_all_documents(
        &self,
        database: &str,
        collection: &str,
    ) -> Result<Vec<Document>, StoreError> {
        let (_, tree) = self.documents(database, collection)?;
        tree.iter()
            .values()
            .map(|value| Document::from_slice(&value?))
            .collect()
    }

    async fn upsert_document(
        &self,
        database: &str,
        collection: &str,
        document: &Document,
    ) -> Result<(), StoreError> {
        let (spec, tree) = self.documents(database, collection)?;

        if !spec.unique_key_policy.unique_keys.is_empty() {
            for value in tree.iter().values() {
                let existing = Document::from_slice(&value?)?;
                if let Some(key) = spec.unique_conflict(&existing, document) {
                    return Err(duplicate_key(document, key));
                }
            }
        }

        tree.insert(document.id().as_bytes(), document.to_vec()?)?;
        Ok(())
    }

    async fn read_collection(
        &self,
        database: &str,
        collection: &str,
    ) -> Result<Option<CollectionSpec>, StoreError> {
        self.load_spec(database, collection)
    }

    async fn list_collections(&self, database: &str) -> Result<Vec<CollectionSpec>, StoreError> {
        let mut prefix = database.as_bytes().to_vec();
        prefix.push(0);

        self.catalog
            .scan_prefix(prefix)
            .values()
            .map(|value| Ok(serde_json::from_slice(&value?)?))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{PartitionKeyDefinition, UniqueKey};
    use serde_json::json;

    fn doc(id: &str, sku: &str) -> Document {
        Document::new(json!({"id": id, "sku": sku})).unwrap()
    }

    #[tokio::test]
    async fn test_collection_lifecycle() {
        let store = SledStore::open(StoreConfig::temporary()).unwrap();
        let spec = CollectionSpec::new("orders");

        store.create_collection("shop", &spec).await.unwrap();
        assert_eq!(store.read_collection("shop", "orders").await.unwrap(), Some(spec.clone()));
        assert!(matches!(
            store.create_collection("shop", &spec).await,
            Err(StoreError::CollectionExists { .. })
        ));

        store.upsert_document("shop", "orders", &doc("a", "1")).await.unwrap();
        store.delete_collection("shop", "orders").await.unwrap();
        assert!(store.read_collection("shop", "orders").await.unwrap().is_none());
        assert!(matches!(
            store.query_all_documents("shop", "orders").await,
            Err(StoreError::CollectionNotFound { .. })
        ));

        // recreated collection starts empty
        store.create_collection("shop", &spec).await.unwrap();
        assert!(store.query_all_documents("shop", "orders").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upsert_and_enumerate() {
        let store = SledStore::open(StoreConfig::temporary()).unwrap();
        store
            .create_collection("shop", &CollectionSpec::new("orders"))
            .await
            .unwrap();

        for (id, sku) in [("c", "1"), ("a", "2"), ("b", "3"), ("a", "4")] {
            store.upsert_document("shop", "orders", &doc(id, sku)).await.unwrap();
        }

        let docs = store.query_all_documents("shop", "orders").await.unwrap();
        let ids: Vec<&str> = docs.iter().map(Document::id).collect();
        assert_eq!(ids, ["a", "b", "c"]);
        assert_eq!(docs[0].get("/sku"), Some(&json!("4")));
    }

    #[tokio::test]
    async fn test_unique_key_per_partition() {
        let store = SledStore::open(StoreConfig::temporary()).unwrap();
        let mut spec = CollectionSpec::new("orders");
        spec.partition_key = Some(PartitionKeyDefinition {
            paths: vec!["/customerId".to_string()],
        });
        spec.unique_key_policy.unique_keys.push(UniqueKey {
            paths: vec!["/sku".to_string()],
        });
        store.create_collection("shop", &spec).await.unwrap();

        let a = Document::new(json!({"id": "a", "customerId": "c1", "sku": "X"})).unwrap();
        let b = Document::new(json!({"id": "b", "customerId": "c2", "sku": "X"})).unwrap();
        let c = Document::new(json!({"id": "c", "customerId": "c1", "sku": "X"})).unwrap();

        store.upsert_document("shop", "orders", &a).await.unwrap();
        store.upsert_document("shop", "orders", &b).await.unwrap();
        let err = store.upsert_document("shop", "orders", &c).await.unwrap_err();
        assert!(err.is_duplicate_key());
    }

    #[tokio::test]
    async fn test_invalid_spec_rejected() {
        let store = SledStore::open(StoreConfig::temporary()).unwrap();
        let mut spec = CollectionSpec::new("orders");
        spec.throughput = 50;
        assert!(matches!(
            store.create_collection("shop", &spec).await,
            Err(StoreError::InvalidSchema(_))
        ));
        assert!(store.list_collections("shop").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reopen_persists() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = SledStore::open(StoreConfig::new(dir.path())).unwrap();
            store
                .create_collection("shop", &CollectionSpec::new("orders"))
                .await
                .unwrap();
            store.upsert_document("shop", "orders", &doc("a", "1")).await.unwrap();
            store.flush().unwrap();
        }

        let store = SledStore::open(StoreConfig::new(dir.path())).unwrap();
        let listed = store.list_collections("shop").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(store.query_all_documents("shop", "orders").await.unwrap().len(), 1);
    }
}
