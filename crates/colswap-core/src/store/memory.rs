//! In-memory document store with fault injection.

use std::collections::BTreeMap;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{
    already_exists, duplicate_key, not_found, CollectionHandle, CollectionSpec, Document,
    DocumentStore,
};
use crate::error::StoreError;

/// Failure to inject at a [`FaultPoint`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Fail with [`StoreError::Transient`].
    Transient,
    /// Fail with [`StoreError::DuplicateKey`].
    DuplicateKey,
    /// Report success without applying the operation.
    Drop,
}

/// Where a fault fires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FaultPoint {
    /// Creating the collection.
    Create,
    /// Deleting the collection.
    Delete,
    /// Upserting the document with this id.
    Upsert(String),
}

#[derive(Debug)]
struct InjectedFault {
    database: String,
    collection: String,
    point: FaultPoint,
    fault: Fault,
}

#[derive(Debug)]
struct MemoryCollection {
    spec: CollectionSpec,
    documents: Vec<Document>,
}

#[derive(Debug, Default)]
struct MemoryState {
    collections: BTreeMap<(String, String), MemoryCollection>,
    faults: Vec<InjectedFault>,
}

impl MemoryState {
    fn fault(&self, database: &str, collection: &str, point: &FaultPoint) -> Option<Fault> {
        self.faults
            .iter()
            .find(|f| f.database == database && f.collection == collection && &f.point == point)
            .map(|f| f.fault)
    }
}

/// Document store held in process memory.
///
/// Documents are enumerated in insertion order. Faults are keyed by database,
/// collection name and operation, so they survive the collection being
/// deleted and recreated; they stay armed until [`MemoryStore::clear_faults`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm a fault for an operation on a collection.
    pub fn inject(&self, database: &str, collection: &str, point: FaultPoint, fault: Fault) {
        self.state.lock().faults.push(InjectedFault {
            database: database.to_string(),
            collection: collection.to_string(),
            point,
            fault,
        });
    }

    /// Disarm every fault.
    pub fn clear_faults(&self) {
        self.state.lock().faults.clear();
    }

    /// Whether a collection exists.
    pub fn contains(&self, database: &str, collection: &str) -> bool {
        self.state
            .lock()
            .collections
            .contains_key(&(database.to_string(), collection.to_string()))
    }
}

fn fault_error(fault: Fault, id: Option<&str>) -> Option<StoreError> {
    match fault {
        Fault::Transient => Some(StoreError::Transient("injected fault".to_string())),
        Fault::DuplicateKey => Some(StoreError::DuplicateKey {
            id: id.unwrap_or_default().to_string(),
            paths: Vec::new(),
        }),
        Fault::Drop => None,
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn create_collection(
        &self,
        database: &str,
        spec: &CollectionSpec,
    ) -> Result<CollectionHandle, StoreError> {
        spec.validate()?;
        let mut state = self.state.lock();

        if let Some(fault) = state.fault(database, &spec.id, &FaultPoint::Create) {
            return match fault_error(fault, None) {
                Some(err) => Err(err),
                None => Ok(CollectionHandle::new(database, &spec.id)),
            };
        }

        let key = (database.to_string(), spec.id.clone());
        if state.collections.contains_key(&key) {
            return Err(already_exists(database, &spec.id));
        }
        state.collections.insert(
            key,
            MemoryCollection {
                spec: spec.clone(),
                documents: Vec::new(),
            },
        );

        Ok(CollectionHandle::new(database, &spec.id))
    }

    async fn delete_collection(&self, database: &str, collection: &str) -> Result<(), StoreError> {
        let mut state = self.state.lock();

        if let Some(fault) = state.fault(database, collection, &FaultPoint::Delete) {
            return match fault_error(fault, None) {
                Some(err) => Err(err),
                None => Ok(()),
            };
        }

        state
            .collections
            .remove(&(database.to_string(), collection.to_string()))
            .map(|_| ())
            .ok_or_else(|| not_found(database, collection))
    }

    async fn query_all_documents(
        &self,
        database: &str,
        collection: &str,
    ) -> Result<Vec<Document>, StoreError> {
        let state = self.state.lock();
        state
            .collections
            .get(&(database.to_string(), collection.to_string()))
            .map(|c| c.documents.clone())
            .ok_or_else(|| not_found(database, collection))
    }

    async fn upsert_document(
        &self,
        database: &str,
        collection: &str,
        document: &Document,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock();

        let point = FaultPoint::Upsert(document.id().to_string());
        if let Some(fault) = state.fault(database, collection, &point) {
            return match fault_error(fault, Some(document.id())) {
                Some(err) => Err(err),
                None => Ok(()),
            };
        }

        let target = state
            .collections
            .get_mut(&(database.to_string(), collection.to_string()))
            .ok_or_else(|| not_found(database, collection))?;

        for existing in &target.documents {
            if let Some(key) = target.spec.unique_conflict(existing, document) {
                return Err(duplicate_key(document, key));
            }
        }

        match target
            .documents
            .iter_mut()
            .find(|existing| existing.id() == document.id())
        {
            Some(existing) => *existing = document.clone(),
            None => target.documents.push(document.clone()),
        }

        Ok(())
    }

    async fn read_collection(
        &self,
        database: &str,
        collection: &str,
    ) -> Result<Option<CollectionSpec>, StoreError> {
        Ok(self
            .state
            .lock()
            .collections
            .get(&(database.to_string(), collection.to_string()))
            .map(|c| c.spec.clone()))
    }

    async fn list_collections(&self, database: &str) -> Result<Vec<CollectionSpec>, StoreError> {
        Ok(self
            .state
            .lock()
            .collections
            .iter()
            .filter(|((db, _), _)| db == database)
            .map(|(_, c)| c.spec.clone())
            .collect())
    }
}
