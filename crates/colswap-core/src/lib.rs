//! colswap core - re-provision document collections through a temp collection.
//!
//! Collection-level properties such as partition keys, excluded index paths,
//! unique keys and throughput cannot be changed on a live collection. This
//! crate stages the documents in a temp collection, recreates the original
//! with the new properties and copies the documents back.
//!
//! The run is a best-effort, recoverable migration rather than a
//! transaction: no other writer may touch the collections while it runs.

pub mod config;
pub mod copier;
pub mod descriptor;
pub mod error;
pub mod orchestrator;
pub mod plan;
pub mod provisioner;
pub mod store;

pub use config::{MigrationConfig, OnMismatch};
pub use copier::{CopyOptions, CopyResult, DocumentCopier};
pub use descriptor::CollectionDescriptor;
pub use error::{CopyError, MigrationError, ProvisionError, StageError, StoreError};
pub use orchestrator::{MigrationPhase, MigrationReport, Orchestrator, Step, TempDisposition};
pub use plan::MigrationPlan;
pub use provisioner::{collection_spec, CollectionProvisioner};
pub use store::{
    CollectionSpec, Document, DocumentStore, Fault, FaultPoint, MemoryStore, SledStore,
    StoreConfig,
};
