//! Command-line arguments.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use colswap_core::OnMismatch;

use crate::settings::Settings;

/// Re-provision a document collection with new collection properties
#[derive(Parser, Debug)]
#[command(name = "colswap")]
#[command(version, about = "Re-provision a document collection with new collection properties")]
pub struct Args {
    /// Settings file (defaults to ./appsettings.json when present)
    #[arg(short, long, global = true)]
    pub settings: Option<PathBuf>,

    /// Store directory (overrides DataPath)
    #[arg(short, long, global = true)]
    pub data_path: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Swap the collection for one with the new properties
    Migrate(MigrateArgs),

    /// Print the steps a migration would run without touching the store
    Plan(MigrateArgs),

    /// List the collections of a database
    Collections {
        /// Database name (overrides DatabaseName)
        #[arg(long)]
        database: Option<String>,
    },

    /// Load a JSON array of documents into an existing collection
    Import {
        /// JSON file holding an array of documents
        file: PathBuf,

        #[command(flatten)]
        target: TargetArgs,
    },
}

/// Collection selection.
#[derive(clap::Args, Debug, Default, Clone)]
pub struct TargetArgs {
    /// Database name (overrides DatabaseName)
    #[arg(long)]
    pub database: Option<String>,

    /// Collection name (overrides CollectionName)
    #[arg(long)]
    pub collection: Option<String>,
}

/// Collection properties and migration options.
#[derive(clap::Args, Debug, Default, Clone)]
pub struct MigrateArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Partition key path, repeatable (replaces PartitionKeys)
    #[arg(long = "partition-key")]
    pub partition_keys: Vec<String>,

    /// Path excluded from indexing
    #[arg(long)]
    pub excluded_path: Option<String>,

    /// Unique key path, repeatable (replaces UniqueKeys)
    #[arg(long = "unique-key")]
    pub unique_keys: Vec<String>,

    /// Provisioned throughput
    #[arg(long)]
    pub throughput: Option<u32>,

    /// Only stage the documents, leave the original collection in place
    #[arg(long)]
    pub keep_original: bool,

    /// Skip documents rejected as duplicates while staging (a skip is still
    /// a count mismatch, see --on-mismatch)
    #[arg(long)]
    pub skip_duplicates: bool,

    /// Suffix appended to the collection name for the temp collection
    #[arg(long)]
    pub temp_suffix: Option<String>,

    /// What to do when document counts differ after a copy
    #[arg(long, value_enum)]
    pub on_mismatch: Option<MismatchPolicy>,

    /// Delete the temp collection even when the original is already gone
    #[arg(long)]
    pub delete_temp_on_failure: bool,
}

/// Count mismatch policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MismatchPolicy {
    /// Fail the step
    Abort,
    /// Log a warning and continue
    ProceedAnyway,
}

impl From<MismatchPolicy> for OnMismatch {
    fn from(policy: MismatchPolicy) -> Self {
        match policy {
            MismatchPolicy::Abort => OnMismatch::Abort,
            MismatchPolicy::ProceedAnyway => OnMismatch::ProceedAnyway,
        }
    }
}

impl TargetArgs {
    pub fn apply(&self, settings: &mut Settings) {
        let props = &mut settings.collection_properties;
        if let Some(database) = &self.database {
            props.database_name = Some(database.clone());
        }
        if let Some(collection) = &self.collection {
            props.collection_name = Some(collection.clone());
        }
    }
}

impl MigrateArgs {
    /// Apply flags on top of the settings file.
    pub fn apply(&self, settings: &mut Settings) {
        self.target.apply(settings);

        let props = &mut settings.collection_properties;
        if !self.partition_keys.is_empty() {
            props.partition_keys = self.partition_keys.clone();
        }
        if let Some(path) = &self.excluded_path {
            props.excluded_paths = Some(path.clone());
        }
        if !self.unique_keys.is_empty() {
            props.unique_keys = self.unique_keys.clone();
        }
        if let Some(throughput) = self.throughput {
            props.offer_throughput = Some(throughput);
        }

        if self.keep_original {
            settings.delete_original = Some(false);
        }
        if self.skip_duplicates {
            settings.skip_duplicates = Some(true);
        }
        if let Some(suffix) = &self.temp_suffix {
            settings.temp_collection_suffix = Some(suffix.clone());
        }
        if let Some(policy) = self.on_mismatch {
            settings.on_mismatch = Some(policy.into());
        }
        if self.delete_temp_on_failure {
            settings.retain_temp_on_restore_failure = Some(false);
        }
    }
}
