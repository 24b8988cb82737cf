//! Error types for the swap protocol.
//!
//! Each layer has its own enum: the store reports [`StoreError`], the
//! provisioner wraps it in [`ProvisionError`], the copier in [`CopyError`].
//! The orchestrator folds both into [`StageError`] and reports the failed step
//! through [`MigrationError`].

use thiserror::Error;

use crate::orchestrator::{MigrationReport, Step};

/// Errors reported by a document store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A collection with the same name already exists.
    #[error("collection {database}/{collection} already exists")]
    CollectionExists {
        /// Database name.
        database: String,
        /// Collection name.
        collection: String,
    },

    /// The collection does not exist.
    #[error("collection {database}/{collection} not found")]
    CollectionNotFound {
        /// Database name.
        database: String,
        /// Collection name.
        collection: String,
    },

    /// The collection definition was rejected.
    #[error("invalid collection definition: {0}")]
    InvalidSchema(String),

    /// The document collides with another document on the unique key policy.
    #[error("duplicate key: document {id} conflicts on {paths:?}")]
    DuplicateKey {
        /// Id of the rejected document.
        id: String,
        /// Unique key paths that collided.
        paths: Vec<String>,
    },

    /// The document is not a JSON object with a string `id`.
    #[error("invalid document: {0}")]
    InvalidDocument(String),

    /// Transport, throttling or other failure the caller may retry.
    #[error("transient store failure: {0}")]
    Transient(String),

    /// Underlying sled failure.
    #[error("storage error: {0}")]
    Storage(#[from] sled::Error),

    /// Encoding or decoding failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Whether the store rejected a write as a duplicate.
    pub fn is_duplicate_key(&self) -> bool {
        matches!(self, StoreError::DuplicateKey { .. })
    }
}

/// Collection create/delete failures.
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// The descriptor cannot be turned into a collection.
    #[error("invalid descriptor: {0}")]
    InvalidDescriptor(String),

    /// The store rejected the create request.
    #[error("failed to create collection {database}/{collection}: {source}")]
    Create {
        /// Database name.
        database: String,
        /// Collection name.
        collection: String,
        /// Store failure.
        #[source]
        source: StoreError,
    },

    /// The store rejected the delete request.
    #[error("failed to delete collection {database}/{collection}: {source}")]
    Delete {
        /// Database name.
        database: String,
        /// Collection name.
        collection: String,
        /// Store failure.
        #[source]
        source: StoreError,
    },
}

/// Document copy failures.
#[derive(Debug, Error)]
pub enum CopyError {
    /// An upsert was rejected as a duplicate and duplicates are not skipped.
    #[error("document {id} rejected as duplicate by {destination}: {source}")]
    DuplicateDocument {
        /// Id of the rejected document.
        id: String,
        /// Qualified destination collection name.
        destination: String,
        /// Store failure.
        #[source]
        source: StoreError,
    },

    /// The destination count differs from the number of documents read.
    #[error(
        "document count mismatch copying {from} to {to}: {source_count} read, {destination_count} in destination"
    )]
    CountMismatch {
        /// Qualified source collection name.
        from: String,
        /// Qualified destination collection name.
        to: String,
        /// Documents read from the source.
        source_count: usize,
        /// Documents found in the destination after the copy.
        destination_count: usize,
    },

    /// Enumerating a collection failed.
    #[error("failed to read documents from {collection}: {source}")]
    Read {
        /// Qualified collection name.
        collection: String,
        /// Store failure.
        #[source]
        source: StoreError,
    },

    /// A non-duplicate upsert failure.
    #[error("failed to upsert document {id} into {collection}: {source}")]
    Write {
        /// Id of the document.
        id: String,
        /// Qualified collection name.
        collection: String,
        /// Store failure.
        #[source]
        source: StoreError,
    },
}

/// Failure of a single protocol step.
#[derive(Debug, Error)]
pub enum StageError {
    /// Provisioning failed.
    #[error(transparent)]
    Provision(#[from] ProvisionError),

    /// Copying failed.
    #[error(transparent)]
    Copy(#[from] CopyError),
}

/// A migration run that stopped before completion.
///
/// Carries the step that failed, the underlying cause, and the report of
/// what the run did up to that point (including whether the temp collection
/// was kept for manual recovery).
#[derive(Debug, Error)]
#[error("migration failed at step {step}: {cause}")]
pub struct MigrationError {
    /// The step that failed.
    pub step: Step,
    /// Underlying cause.
    #[source]
    pub cause: StageError,
    /// What the run did before stopping.
    pub report: Box<MigrationReport>,
}
