//! Collection provisioning.
//!
//! Turns a [`CollectionDescriptor`] into the store's collection definition
//! and issues create/delete requests.

use tracing::info;

use crate::descriptor::CollectionDescriptor;
use crate::error::ProvisionError;
use crate::store::{
    CollectionHandle, CollectionSpec, DocumentStore, IndexingPolicy, PartitionKeyDefinition,
    TimeToLive, UniqueKey, UniqueKeyPolicy,
};

/// Build the collection definition for a descriptor.
///
/// Documents never expire by default and every string and number is range
/// indexed at maximum precision. Partition key, excluded path and the
/// composite unique key are only set when the descriptor carries them.
pub fn collection_spec(descriptor: &CollectionDescriptor) -> CollectionSpec {
    let mut indexing_policy = IndexingPolicy::range_all();
    if let Some(path) = descriptor.excluded_index_path() {
        indexing_policy.excluded_paths.push(path.to_string());
    }

    let partition_key = if descriptor.partition_key_paths().is_empty() {
        None
    } else {
        Some(PartitionKeyDefinition {
            paths: descriptor.partition_key_paths().to_vec(),
        })
    };

    let mut unique_key_policy = UniqueKeyPolicy::default();
    if !descriptor.unique_key_paths().is_empty() {
        unique_key_policy.unique_keys.push(UniqueKey {
            paths: descriptor.unique_key_paths().to_vec(),
        });
    }

    CollectionSpec {
        id: descriptor.collection_name().to_string(),
        default_ttl: TimeToLive::NoDefaultExpiry,
        indexing_policy,
        partition_key,
        unique_key_policy,
        throughput: descriptor.offer_throughput(),
    }
}

/// Creates and deletes collections described by descriptors.
pub struct CollectionProvisioner<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S: DocumentStore + ?Sized> CollectionProvisioner<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Create the collection described by `descriptor`.
    pub async fn create(
        &self,
        descriptor: &CollectionDescriptor,
    ) -> Result<CollectionHandle, ProvisionError> {
        descriptor.validate()?;
        let spec = collection_spec(descriptor);

        let handle = self
            .store
            .create_collection(descriptor.database_name(), &spec)
            .await
            .map_err(|source| ProvisionError::Create {
                database: descriptor.database_name().to_string(),
                collection: descriptor.collection_name().to_string(),
                source,
            })?;

        info!(
            collection = %descriptor.qualified_name(),
            throughput = spec.throughput,
            partition_keys = ?descriptor.partition_key_paths(),
            unique_keys = ?descriptor.unique_key_paths(),
            "collection created"
        );
        Ok(handle)
    }

    /// Delete the collection named by `descriptor`, with all its documents.
    pub async fn delete(&self, descriptor: &CollectionDescriptor) -> Result<(), ProvisionError> {
        descriptor.validate()?;

        self.store
            .delete_collection(descriptor.database_name(), descriptor.collection_name())
            .await
            .map_err(|source| ProvisionError::Delete {
                database: descriptor.database_name().to_string(),
                collection: descriptor.collection_name().to_string(),
                source,
            })?;

        info!(collection = %descriptor.qualified_name(), "collection deleted");
        Ok(())
    }
}
