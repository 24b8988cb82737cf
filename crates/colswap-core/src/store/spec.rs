//! Store-side collection definitions.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::Document;
use crate::error::StoreError;

/// Smallest throughput a collection can be provisioned with.
pub const MIN_THROUGHPUT: u32 = 400;

/// Largest throughput a collection can be provisioned with.
pub const MAX_THROUGHPUT: u32 = 1_000_000;

/// Throughput must be a multiple of this.
pub const THROUGHPUT_INCREMENT: u32 = 100;

static UNDEFINED: Value = Value::Null;

/// Default time-to-live of documents in a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TimeToLive {
    /// TTL disabled.
    #[default]
    Off,
    /// TTL enabled, documents never expire unless they set their own TTL.
    NoDefaultExpiry,
    /// Documents expire this many seconds after their last write.
    Seconds(u32),
}

/// Data types that receive range indexes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DataType {
    String,
    Number,
}

/// A range index over one data type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeIndex {
    pub data_type: DataType,
    /// Index precision in bytes; `None` is maximum precision.
    pub precision: Option<u8>,
}

impl RangeIndex {
    /// A maximum-precision range index.
    pub fn max_precision(data_type: DataType) -> Self {
        Self {
            data_type,
            precision: None,
        }
    }
}

/// Which values get indexed.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexingPolicy {
    pub range_indexes: Vec<RangeIndex>,
    pub excluded_paths: Vec<String>,
}

impl IndexingPolicy {
    /// Range index strings and numbers at maximum precision, nothing excluded.
    pub fn range_all() -> Self {
        Self {
            range_indexes: vec![
                RangeIndex::max_precision(DataType::String),
                RangeIndex::max_precision(DataType::Number),
            ],
            excluded_paths: Vec::new(),
        }
    }
}

/// Partition key paths of a collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartitionKeyDefinition {
    pub paths: Vec<String>,
}

/// A set of paths whose values must be jointly unique within a partition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UniqueKey {
    pub paths: Vec<String>,
}

/// Unique key constraints of a collection.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UniqueKeyPolicy {
    pub unique_keys: Vec<UniqueKey>,
}

/// A collection definition as submitted to and stored by a store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionSpec {
    pub id: String,
    pub default_ttl: TimeToLive,
    pub indexing_policy: IndexingPolicy,
    pub partition_key: Option<PartitionKeyDefinition>,
    pub unique_key_policy: UniqueKeyPolicy,
    pub throughput: u32,
}

impl CollectionSpec {
    /// A bare definition with default policies and minimum throughput.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            default_ttl: TimeToLive::default(),
            indexing_policy: IndexingPolicy::default(),
            partition_key: None,
            unique_key_policy: UniqueKeyPolicy::default(),
            throughput: MIN_THROUGHPUT,
        }
    }

    /// Apply the store's acceptance rules.
    pub fn validate(&self) -> Result<(), StoreError> {
        if self.id.trim().is_empty() {
            return Err(StoreError::InvalidSchema("collection id is empty".to_string()));
        }
        if self.id.contains('\0') || self.id.contains('/') {
            return Err(StoreError::InvalidSchema(format!(
                "collection id {:?} contains a reserved character",
                self.id
            )));
        }

        if self.default_ttl == TimeToLive::Seconds(0) {
            return Err(StoreError::InvalidSchema(
                "default time-to-live must be positive".to_string(),
            ));
        }

        if !(MIN_THROUGHPUT..=MAX_THROUGHPUT).contains(&self.throughput)
            || self.throughput % THROUGHPUT_INCREMENT != 0
        {
            return Err(StoreError::InvalidSchema(format!(
                "throughput {} outside {MIN_THROUGHPUT}..={MAX_THROUGHPUT} in steps of {THROUGHPUT_INCREMENT}",
                self.throughput
            )));
        }

        if let Some(partition_key) = &self.partition_key {
            if partition_key.paths.is_empty() {
                return Err(StoreError::InvalidSchema(
                    "partition key has no paths".to_string(),
                ));
            }
        }
        if self
            .unique_key_policy
            .unique_keys
            .iter()
            .any(|key| key.paths.is_empty())
        {
            return Err(StoreError::InvalidSchema("unique key has no paths".to_string()));
        }

        let paths = self
            .partition_key
            .iter()
            .flat_map(|pk| pk.paths.iter())
            .chain(self.indexing_policy.excluded_paths.iter())
            .chain(
                self.unique_key_policy
                    .unique_keys
                    .iter()
                    .flat_map(|key| key.paths.iter()),
            );
        for path in paths {
            if !is_valid_path(path) {
                return Err(StoreError::InvalidSchema(format!("invalid path {path:?}")));
            }
        }

        Ok(())
    }

    /// Find the unique key `incoming` would violate next to `existing`.
    ///
    /// Documents with the same id never conflict (the write replaces).
    /// Uniqueness is scoped to the logical partition; a missing value counts
    /// as null.
    pub fn unique_conflict(&self, existing: &Document, incoming: &Document) -> Option<&UniqueKey> {
        if existing.id() == incoming.id() {
            return None;
        }

        let same_partition = self.partition_key.as_ref().map_or(true, |pk| {
            pk.paths
                .iter()
                .all(|path| value_at(existing, path) == value_at(incoming, path))
        });
        if !same_partition {
            return None;
        }

        self.unique_key_policy.unique_keys.iter().find(|key| {
            key.paths
                .iter()
                .all(|path| value_at(existing, path) == value_at(incoming, path))
        })
    }
}

fn value_at<'a>(document: &'a Document, path: &str) -> &'a Value {
    document.get(path).unwrap_or(&UNDEFINED)
}

fn is_valid_path(path: &str) -> bool {
    path.len() > 1 && path.starts_with('/') && !path.chars().any(char::is_whitespace)
}

/// Identifies a collection returned by a successful create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionHandle {
    pub database: String,
    pub collection: String,
}

impl CollectionHandle {
    pub fn new(database: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            collection: collection.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        Document::new(value).unwrap()
    }

    fn spec_with_unique(paths: &[&str]) -> CollectionSpec {
        let mut spec = CollectionSpec::new("orders");
        spec.unique_key_policy.unique_keys.push(UniqueKey {
            paths: paths.iter().map(|p| p.to_string()).collect(),
        });
        spec
    }

    #[test]
    fn test_throughput_range() {
        let mut spec = CollectionSpec::new("orders");
        assert!(spec.validate().is_ok());

        spec.throughput = 300;
        assert!(spec.validate().is_err());
        spec.throughput = 450;
        assert!(spec.validate().is_err());
        spec.throughput = MAX_THROUGHPUT + THROUGHPUT_INCREMENT;
        assert!(spec.validate().is_err());
        spec.throughput = 10_000;
        assert!(spec.validate().is_ok());
    }

    #[test]
    fn test_path_syntax() {
        let mut spec = CollectionSpec::new("orders");
        spec.indexing_policy.excluded_paths.push("payload/*".to_string());
        assert!(matches!(spec.validate(), Err(StoreError::InvalidSchema(_))));

        let spec = spec_with_unique(&["/"]);
        assert!(spec.validate().is_err());

        let mut spec = CollectionSpec::new("orders");
        spec.partition_key = Some(PartitionKeyDefinition { paths: vec![] });
        assert!(spec.validate().is_err());
    }

    #[test]
    fn test_zero_ttl_rejected() {
        let mut spec = CollectionSpec::new("orders");
        spec.default_ttl = TimeToLive::Seconds(0);
        assert!(spec.validate().is_err());
        spec.default_ttl = TimeToLive::Seconds(3600);
        assert!(spec.validate().is_ok());
    }

    #[test]
    fn test_reserved_id() {
        assert!(CollectionSpec::new("a/b").validate().is_err());
        assert!(CollectionSpec::new("").validate().is_err());
    }

    #[test]
    fn test_unique_conflict() {
        let spec = spec_with_unique(&["/sku", "/region"]);
        let a = doc(json!({"id": "a", "sku": "X", "region": "eu"}));
        let b = doc(json!({"id": "b", "sku": "X", "region": "eu"}));
        let c = doc(json!({"id": "c", "sku": "X", "region": "us"}));
        let a2 = doc(json!({"id": "a", "sku": "X", "region": "eu", "qty": 2}));

        assert!(spec.unique_conflict(&a, &b).is_some());
        assert!(spec.unique_conflict(&a, &c).is_none());
        assert!(spec.unique_conflict(&a, &a2).is_none());
    }

    #[test]
    fn test_unique_conflict_scoped_to_partition() {
        let mut spec = spec_with_unique(&["/sku"]);
        spec.partition_key = Some(PartitionKeyDefinition {
            paths: vec!["/customerId".to_string()],
        });

        let a = doc(json!({"id": "a", "customerId": "c1", "sku": "X"}));
        let b = doc(json!({"id": "b", "customerId": "c2", "sku": "X"}));
        let c = doc(json!({"id": "c", "customerId": "c1", "sku": "X"}));

        assert!(spec.unique_conflict(&a, &b).is_none());
        assert!(spec.unique_conflict(&a, &c).is_some());
    }

    #[test]
    fn test_missing_values_are_null() {
        let spec = spec_with_unique(&["/sku"]);
        let a = doc(json!({"id": "a"}));
        let b = doc(json!({"id": "b", "sku": null}));
        assert!(spec.unique_conflict(&a, &b).is_some());
    }

    #[test]
    fn test_spec_json_shape() {
        let mut spec = CollectionSpec::new("orders");
        spec.default_ttl = TimeToLive::NoDefaultExpiry;
        spec.indexing_policy = IndexingPolicy::range_all();
        let value = serde_json::to_value(&spec).unwrap();

        assert_eq!(value["defaultTtl"], json!("noDefaultExpiry"));
        assert_eq!(
            value["indexingPolicy"]["rangeIndexes"][0],
            json!({"dataType": "string", "precision": null})
        );
        let back: CollectionSpec = serde_json::from_value(value).unwrap();
        assert_eq!(back, spec);
    }
}
