//! Whole-collection document copy with duplicate and count checks.

use tracing::{debug, info, warn};

use crate::config::OnMismatch;
use crate::descriptor::CollectionDescriptor;
use crate::error::CopyError;
use crate::store::{Document, DocumentStore};

/// Per-copy options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CopyOptions {
    /// Log and skip documents rejected as duplicates instead of failing.
    pub skip_duplicates: bool,
    /// What to do when the destination count differs from the source count.
    pub on_mismatch: OnMismatch,
}

/// Outcome of a completed copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyResult {
    /// Documents read from the source.
    pub source_count: usize,
    /// Documents in the destination after the copy.
    pub destination_count: usize,
    /// Documents skipped as duplicates.
    pub duplicates_skipped: usize,
    /// Ids of the skipped documents, in enumeration order.
    pub skipped_ids: Vec<String>,
    /// Counts differed and the mismatch was tolerated.
    pub count_mismatch: bool,
}

/// Copies every document of one collection into another.
///
/// The source is read into memory in full, then replayed one upsert at a
/// time in enumeration order. There is no per-document retry and no rollback
/// of documents already written.
///
/// Verification compares the destination's final count with the number of
/// documents read from the source. A skipped duplicate therefore shows up as
/// a mismatch, which aborts the copy unless the mismatch is tolerated.
pub struct DocumentCopier<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S: DocumentStore + ?Sized> DocumentCopier<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Copy `source` into `destination` and verify the document count.
    pub async fn copy(
        &self,
        source: &CollectionDescriptor,
        destination: &CollectionDescriptor,
        options: CopyOptions,
    ) -> Result<CopyResult, CopyError> {
        let from = source.qualified_name();
        let to = destination.qualified_name();

        let documents = self.read_all(source, &from).await?;

        info!(from = %from, to = %to, documents = documents.len(), "copying documents");

        let mut skipped_ids = Vec::new();
        for document in &documents {
            let written = self
                .store
                .upsert_document(
                    destination.database_name(),
                    destination.collection_name(),
                    document,
                )
                .await;

            match written {
                Ok(()) => {
                    debug!(id = document.id(), to = %to, "document copied");
                }
                Err(err) if err.is_duplicate_key() && options.skip_duplicates => {
                    warn!(id = document.id(), to = %to, error = %err, "skipping duplicate document");
                    skipped_ids.push(document.id().to_string());
                }
                Err(err) if err.is_duplicate_key() => {
                    return Err(CopyError::DuplicateDocument {
                        id: document.id().to_string(),
                        destination: to,
                        source: err,
                    });
                }
                Err(err) => {
                    return Err(CopyError::Write {
                        id: document.id().to_string(),
                        collection: to,
                        source: err,
                    });
                }
            }
        }

        let destination_count = self.read_all(destination, &to).await?.len();

        let count_mismatch = destination_count != documents.len();
        if count_mismatch {
            match options.on_mismatch {
                OnMismatch::Abort => {
                    return Err(CopyError::CountMismatch {
                        from,
                        to,
                        source_count: documents.len(),
                        destination_count,
                    });
                }
                OnMismatch::ProceedAnyway => warn!(
                    from = %from,
                    to = %to,
                    source_count = documents.len(),
                    destination_count,
                    "document count mismatch tolerated"
                ),
            }
        }

        info!(
            from = %from,
            to = %to,
            source_count = documents.len(),
            destination_count,
            duplicates_skipped = skipped_ids.len(),
            "copy complete"
        );

        Ok(CopyResult {
            source_count: documents.len(),
            destination_count,
            duplicates_skipped: skipped_ids.len(),
            skipped_ids,
            count_mismatch,
        })
    }

    async fn read_all(
        &self,
        collection: &CollectionDescriptor,
        name: &str,
    ) -> Result<Vec<Document>, CopyError> {
        self.store
            .query_all_documents(collection.database_name(), collection.collection_name())
            .await
            .map_err(|err| CopyError::Read {
                collection: name.to_string(),
                source: err,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provisioner::CollectionProvisioner;
    use crate::store::{Fault, FaultPoint, MemoryStore};
    use serde_json::json;

    fn doc(id: &str) -> Document {
        Document::new(json!({"id": id, "sku": format!("sku-{id}")})).unwrap()
    }

    async fn setup(ids: &[&str]) -> (MemoryStore, CollectionDescriptor, CollectionDescriptor) {
        let store = MemoryStore::new();
        let source = CollectionDescriptor::new("shop", "orders");
        let destination = CollectionDescriptor::new("shop", "orders_");
        {
            let provisioner = CollectionProvisioner::new(&store);
            provisioner.create(&source).await.unwrap();
            provisioner.create(&destination).await.unwrap();
        }
        for id in ids {
            store.upsert_document("shop", "orders", &doc(id)).await.unwrap();
        }
        (store, source, destination)
    }

    #[tokio::test]
    async fn test_copy_preserves_order_and_counts() {
        let (store, source, destination) = setup(&["c", "a", "b"]).await;

        let result = DocumentCopier::new(&store)
            .copy(&source, &destination, CopyOptions::default())
            .await
            .unwrap();

        assert_eq!(result.source_count, 3);
        assert_eq!(result.destination_count, 3);
        assert_eq!(result.duplicates_skipped, 0);
        assert!(!result.count_mismatch);

        let copied = store.query_all_documents("shop", "orders_").await.unwrap();
        let ids: Vec<&str> = copied.iter().map(Document::id).collect();
        assert_eq!(ids, ["c", "a", "b"]);
    }

    #[tokio::test]
    async fn test_empty_source() {
        let (store, source, destination) = setup(&[]).await;
        let result = DocumentCopier::new(&store)
            .copy(&source, &destination, CopyOptions::default())
            .await
            .unwrap();
        assert_eq!(result.source_count, 0);
        assert_eq!(result.destination_count, 0);
    }

    #[tokio::test]
    async fn test_missing_source() {
        let (store, _, destination) = setup(&[]).await;
        let missing = CollectionDescriptor::new("shop", "missing");
        let err = DocumentCopier::new(&store)
            .copy(&missing, &destination, CopyOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CopyError::Read { .. }));
    }

    #[tokio::test]
    async fn test_write_failure_stops_copy() {
        let (store, source, destination) = setup(&["a", "b", "c"]).await;
        store.inject("shop", "orders_", FaultPoint::Upsert("b".to_string()), Fault::Transient);

        let err = DocumentCopier::new(&store)
            .copy(&source, &destination, CopyOptions { skip_duplicates: true, ..Default::default() })
            .await
            .unwrap_err();
        assert!(matches!(err, CopyError::Write { ref id, .. } if id == "b"));

        // "a" already landed, "c" was never attempted
        let copied = store.query_all_documents("shop", "orders_").await.unwrap();
        assert_eq!(copied.len(), 1);
        assert_eq!(copied[0].id(), "a");
    }

    #[tokio::test]
    async fn test_mismatch_can_be_tolerated() {
        let (store, source, destination) = setup(&["a", "b"]).await;
        store.inject("shop", "orders_", FaultPoint::Upsert("a".to_string()), Fault::Drop);

        let options = CopyOptions {
            on_mismatch: OnMismatch::ProceedAnyway,
            ..Default::default()
        };
        let result = DocumentCopier::new(&store)
            .copy(&source, &destination, options)
            .await
            .unwrap();

        assert!(result.count_mismatch);
        assert_eq!(result.source_count, 2);
        assert_eq!(result.destination_count, 1);
    }

    #[tokio::test]
    async fn test_skipped_duplicate_is_a_mismatch() {
        let (store, source, destination) = setup(&["a", "b", "c"]).await;
        store.inject("shop", "orders_", FaultPoint::Upsert("b".to_string()), Fault::DuplicateKey);
        let skip = CopyOptions {
            skip_duplicates: true,
            ..Default::default()
        };

        let err = DocumentCopier::new(&store)
            .copy(&source, &destination, skip)
            .await
            .unwrap_err();
        match err {
            CopyError::CountMismatch {
                source_count,
                destination_count,
                ..
            } => {
                assert_eq!(source_count, 3);
                assert_eq!(destination_count, 2);
            }
            other => panic!("expected count mismatch, got {other}"),
        }

        let tolerant = CopyOptions {
            on_mismatch: OnMismatch::ProceedAnyway,
            ..skip
        };
        let result = DocumentCopier::new(&store)
            .copy(&source, &destination, tolerant)
            .await
            .unwrap();
        assert!(result.count_mismatch);
        assert_eq!(result.skipped_ids, vec!["b".to_string()]);
    }
}
