//! Subcommand implementations.
//!
//! Each command is generic over the store so it can be exercised against
//! [`MemoryStore`](colswap_core::MemoryStore) in tests.

use colswap_core::{
    CollectionDescriptor, CollectionSpec, Document, DocumentStore, MigrationConfig, MigrationPlan,
    MigrationReport, Orchestrator, StoreError,
};
use serde_json::Value;
use tracing::{error, info};

use crate::error::{Error, Result};
use crate::output;

/// A collection definition with its current size.
#[derive(Debug, Clone)]
pub struct CollectionSummary {
    pub spec: CollectionSpec,
    pub document_count: usize,
}

/// Derive the plan for `descriptor`.
pub fn plan(descriptor: &CollectionDescriptor, config: &MigrationConfig) -> Result<MigrationPlan> {
    Ok(MigrationPlan::new(descriptor, config)?)
}

/// Run the swap protocol.
pub async fn migrate<S: DocumentStore + ?Sized>(
    store: &S,
    descriptor: &CollectionDescriptor,
    config: &MigrationConfig,
) -> Result<MigrationReport> {
    Ok(Orchestrator::new(store, config).run(descriptor).await?)
}

/// Render a migration outcome and fold in the result of flushing the store.
///
/// The outcome is rendered even when the flush failed. A flush failure is
/// returned only when the run itself succeeded; otherwise it is logged and
/// the migration error is kept.
pub fn conclude_migration(
    outcome: Result<MigrationReport>,
    flushed: std::result::Result<(), StoreError>,
) -> (String, Result<()>) {
    let (text, result) = match outcome {
        Ok(report) => (output::render_report(&report), Ok(())),
        Err(Error::Migration(err)) => (output::render_failure(&err), Err(Error::Migration(err))),
        Err(err) => (String::new(), Err(err)),
    };

    match (flushed, result) {
        (Ok(()), result) => (text, result),
        (Err(flush), Ok(())) => {
            error!(error = %flush, "failed to flush store");
            (text, Err(flush.into()))
        }
        (Err(flush), Err(err)) => {
            error!(error = %flush, "failed to flush store after failed migration");
            (text, Err(err))
        }
    }
}

/// List every collection of `database` with its document count.
pub async fn collections<S: DocumentStore + ?Sized>(
    store: &S,
    database: &str,
) -> Result<Vec<CollectionSummary>> {
    let mut summaries = Vec::new();
    for spec in store.list_collections(database).await? {
        let document_count = store.query_all_documents(database, &spec.id).await?.len();
        summaries.push(CollectionSummary {
            spec,
            document_count,
        });
    }
    Ok(summaries)
}

/// Upsert the documents of a JSON array into an existing collection.
///
/// Every element is validated before the first write. Returns the number of
/// documents written.
pub async fn import<S: DocumentStore + ?Sized>(
    store: &S,
    database: &str,
    collection: &str,
    json: &str,
) -> Result<usize> {
    let value: Value = serde_json::from_str(json).map_err(|e| Error::Input(e.to_string()))?;
    let Value::Array(items) = value else {
        return Err(Error::Input("expected a JSON array of documents".to_string()));
    };
    let documents = items
        .into_iter()
        .map(Document::new)
        .collect::<std::result::Result<Vec<_>, _>>()?;

    if store.read_collection(database, collection).await?.is_none() {
        return Err(StoreError::CollectionNotFound {
            database: database.to_string(),
            collection: collection.to_string(),
        }
        .into());
    }

    for document in &documents {
        store.upsert_document(database, collection, document).await?;
    }
    info!(
        collection = %format!("{database}/{collection}"),
        count = documents.len(),
        "imported documents"
    );
    Ok(documents.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use colswap_core::{CollectionProvisioner, Fault, FaultPoint, MemoryStore, Step};

    async fn store_with(descriptor: &CollectionDescriptor) -> MemoryStore {
        let store = MemoryStore::new();
        CollectionProvisioner::new(&store)
            .create(descriptor)
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_import_then_list() {
        let orders = CollectionDescriptor::new("shop", "orders");
        let store = store_with(&orders).await;

        let written = import(
            &store,
            "shop",
            "orders",
            r#"[{"id": "a", "total": 1}, {"id": "b", "total": 2}]"#,
        )
        .await
        .unwrap();
        assert_eq!(written, 2);

        let summaries = collections(&store, "shop").await.unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].spec.id, "orders");
        assert_eq!(summaries[0].document_count, 2);
    }

    #[tokio::test]
    async fn test_import_rejects_bad_input() {
        let orders = CollectionDescriptor::new("shop", "orders");
        let store = store_with(&orders).await;

        let err = import(&store, "shop", "orders", r#"{"id": "a"}"#).await.unwrap_err();
        assert!(matches!(err, Error::Input(_)));

        // second element has no id, nothing is written
        let err = import(&store, "shop", "orders", r#"[{"id": "a"}, {"total": 2}]"#)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Store(StoreError::InvalidDocument(_))));
        assert!(store.query_all_documents("shop", "orders").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_import_needs_existing_collection() {
        let store = MemoryStore::new();
        let err = import(&store, "shop", "orders", "[]").await.unwrap_err();
        assert!(matches!(
            err,
            Error::Store(StoreError::CollectionNotFound { .. })
        ));
        assert!(!store.contains("shop", "orders"));
    }

    #[tokio::test]
    async fn test_migrate_applies_new_properties() {
        let orders = CollectionDescriptor::new("shop", "orders");
        let store = store_with(&orders).await;
        import(&store, "shop", "orders", r#"[{"id": "a", "sku": "X"}]"#)
            .await
            .unwrap();

        let target = orders.clone().with_unique_key("/sku");
        let report = migrate(&store, &target, &MigrationConfig::default())
            .await
            .unwrap();
        assert!(report.is_success());

        let spec = store.read_collection("shop", "orders").await.unwrap().unwrap();
        assert_eq!(spec.unique_key_policy.unique_keys.len(), 1);
    }

    #[tokio::test]
    async fn test_migrate_missing_source_fails_at_staging() {
        let store = MemoryStore::new();
        let target = CollectionDescriptor::new("shop", "orders");

        let err = migrate(&store, &target, &MigrationConfig::default())
            .await
            .unwrap_err();
        match err {
            Error::Migration(err) => {
                assert_eq!(err.step, Step::StageCopy);
                assert!(!err.report.original_deleted());
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert!(!store.contains("shop", "orders_"));
    }

    #[tokio::test]
    async fn test_flush_failure_keeps_migration_failure() {
        let orders = CollectionDescriptor::new("shop", "orders");
        let store = store_with(&orders).await;
        import(&store, "shop", "orders", r#"[{"id": "a"}]"#).await.unwrap();
        store.inject("shop", "orders", FaultPoint::Create, Fault::Transient);

        let outcome = migrate(&store, &orders, &MigrationConfig::default()).await;
        let (text, result) =
            conclude_migration(outcome, Err(StoreError::Transient("disk full".to_string())));

        assert!(text.contains("Failed at:  recreate-original"));
        assert!(text.contains("shop/orders_ retained"));
        match result {
            Err(Error::Migration(err)) => assert_eq!(err.step, Step::RecreateOriginal),
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_flush_failure_after_success_is_returned() {
        let orders = CollectionDescriptor::new("shop", "orders");
        let store = store_with(&orders).await;

        let outcome = migrate(&store, &orders, &MigrationConfig::default()).await;
        let (text, result) =
            conclude_migration(outcome, Err(StoreError::Transient("disk full".to_string())));

        assert!(text.contains("Phase:      done"));
        assert!(matches!(result, Err(Error::Store(StoreError::Transient(_)))));
    }

    #[test]
    fn test_plan_rejects_invalid_descriptor() {
        let descriptor = CollectionDescriptor::new("shop", "").with_unique_key("/sku");
        assert!(matches!(
            plan(&descriptor, &MigrationConfig::default()),
            Err(Error::Provision(_))
        ));
    }
}
