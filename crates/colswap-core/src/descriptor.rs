//! Collection descriptors.

use serde::{Deserialize, Serialize};

use crate::error::ProvisionError;

/// Throughput requested when none is configured.
pub const DEFAULT_OFFER_THROUGHPUT: u32 = 400;

/// Name and schema policy of a collection.
///
/// A descriptor is a value: builders consume and return it, and the
/// temp-collection descriptor is derived as a copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionDescriptor {
    database_name: String,
    collection_name: String,
    partition_key_paths: Vec<String>,
    excluded_index_path: Option<String>,
    unique_key_paths: Vec<String>,
    offer_throughput: u32,
}

impl CollectionDescriptor {
    /// Create a descriptor with no partition key, exclusion or unique key.
    pub fn new(database_name: impl Into<String>, collection_name: impl Into<String>) -> Self {
        Self {
            database_name: database_name.into(),
            collection_name: collection_name.into(),
            partition_key_paths: Vec::new(),
            excluded_index_path: None,
            unique_key_paths: Vec::new(),
            offer_throughput: DEFAULT_OFFER_THROUGHPUT,
        }
    }

    /// Add a partition key path.
    pub fn with_partition_key(mut self, path: impl Into<String>) -> Self {
        self.partition_key_paths.push(path.into());
        self
    }

    /// Add several partition key paths.
    pub fn with_partition_keys(mut self, paths: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.partition_key_paths.extend(paths.into_iter().map(Into::into));
        self
    }

    /// Exclude a path from automatic indexing. An empty path means no exclusion.
    pub fn with_excluded_index_path(mut self, path: impl Into<String>) -> Self {
        let path = path.into();
        self.excluded_index_path = if path.trim().is_empty() { None } else { Some(path) };
        self
    }

    /// Add a path to the composite unique key.
    pub fn with_unique_key(mut self, path: impl Into<String>) -> Self {
        self.unique_key_paths.push(path.into());
        self
    }

    /// Add several paths to the composite unique key.
    pub fn with_unique_keys(mut self, paths: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.unique_key_paths.extend(paths.into_iter().map(Into::into));
        self
    }

    /// Set the provisioned throughput.
    pub fn with_offer_throughput(mut self, throughput: u32) -> Self {
        self.offer_throughput = throughput;
        self
    }

    pub fn database_name(&self) -> &str {
        &self.database_name
    }

    pub fn collection_name(&self) -> &str {
        &self.collection_name
    }

    pub fn partition_key_paths(&self) -> &[String] {
        &self.partition_key_paths
    }

    pub fn excluded_index_path(&self) -> Option<&str> {
        self.excluded_index_path.as_deref()
    }

    pub fn unique_key_paths(&self) -> &[String] {
        &self.unique_key_paths
    }

    pub fn offer_throughput(&self) -> u32 {
        self.offer_throughput
    }

    /// `database/collection`, used in logs and error messages.
    pub fn qualified_name(&self) -> String {
        format!("{}/{}", self.database_name, self.collection_name)
    }

    /// Check the descriptor can be handed to the provisioner.
    ///
    /// Range checks on throughput are left to the store.
    pub fn validate(&self) -> Result<(), ProvisionError> {
        if self.database_name.trim().is_empty() {
            return Err(ProvisionError::InvalidDescriptor(
                "database name is empty".to_string(),
            ));
        }
        if self.collection_name.trim().is_empty() {
            return Err(ProvisionError::InvalidDescriptor(
                "collection name is empty".to_string(),
            ));
        }
        if self.offer_throughput == 0 {
            return Err(ProvisionError::InvalidDescriptor(format!(
                "offer throughput for {} must be positive",
                self.qualified_name()
            )));
        }

        let paths = self
            .partition_key_paths
            .iter()
            .chain(self.unique_key_paths.iter())
            .chain(self.excluded_index_path.iter());
        for path in paths {
            if !path.starts_with('/') {
                return Err(ProvisionError::InvalidDescriptor(format!(
                    "path {path:?} must start with '/'"
                )));
            }
        }

        Ok(())
    }

    /// Derive the temp-collection descriptor by appending `suffix` to the name.
    ///
    /// Every other field is copied unchanged.
    pub fn temp_descriptor(&self, suffix: &str) -> Result<Self, ProvisionError> {
        if suffix.is_empty() {
            return Err(ProvisionError::InvalidDescriptor(
                "temp collection suffix is empty, temp would alias the source".to_string(),
            ));
        }

        Ok(Self {
            collection_name: format!("{}{}", self.collection_name, suffix),
            ..self.clone()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn orders() -> CollectionDescriptor {
        CollectionDescriptor::new("shop", "orders")
            .with_partition_key("/customerId")
            .with_excluded_index_path("/payload/*")
            .with_unique_keys(["/sku", "/region"])
            .with_offer_throughput(1000)
    }

    #[test]
    fn test_builder() {
        let descriptor = orders();
        assert_eq!(descriptor.database_name(), "shop");
        assert_eq!(descriptor.collection_name(), "orders");
        assert_eq!(descriptor.partition_key_paths(), ["/customerId"]);
        assert_eq!(descriptor.excluded_index_path(), Some("/payload/*"));
        assert_eq!(descriptor.unique_key_paths(), ["/sku", "/region"]);
        assert_eq!(descriptor.offer_throughput(), 1000);
        assert_eq!(descriptor.qualified_name(), "shop/orders");
    }

    #[test]
    fn test_empty_excluded_path_means_none() {
        let descriptor = CollectionDescriptor::new("shop", "orders").with_excluded_index_path("");
        assert_eq!(descriptor.excluded_index_path(), None);
    }

    #[test]
    fn test_temp_descriptor_only_changes_name() {
        let source = orders();
        let temp = source.temp_descriptor("_").unwrap();

        assert_eq!(temp.collection_name(), "orders_");
        assert_eq!(temp.database_name(), source.database_name());
        assert_eq!(temp.partition_key_paths(), source.partition_key_paths());
        assert_eq!(temp.excluded_index_path(), source.excluded_index_path());
        assert_eq!(temp.unique_key_paths(), source.unique_key_paths());
        assert_eq!(temp.offer_throughput(), source.offer_throughput());
        // source is untouched
        assert_eq!(source.collection_name(), "orders");
    }

    #[test]
    fn test_temp_descriptor_rejects_empty_suffix() {
        assert!(matches!(
            orders().temp_descriptor(""),
            Err(ProvisionError::InvalidDescriptor(_))
        ));
    }

    #[test]
    fn test_validate() {
        assert!(orders().validate().is_ok());
        assert!(CollectionDescriptor::new("", "orders").validate().is_err());
        assert!(CollectionDescriptor::new("shop", " ").validate().is_err());
        assert!(CollectionDescriptor::new("shop", "orders")
            .with_offer_throughput(0)
            .validate()
            .is_err());
        assert!(CollectionDescriptor::new("shop", "orders")
            .with_unique_key("sku")
            .validate()
            .is_err());
    }
}
