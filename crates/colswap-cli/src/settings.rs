//! Settings file loading.
//!
//! The settings file is JSON with PascalCase keys. Every key is optional;
//! command-line flags are applied on top of the file values.

use std::path::{Path, PathBuf};

use colswap_core::{CollectionDescriptor, MigrationConfig, OnMismatch, StoreConfig};
use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};

/// File read when `--settings` is not given.
pub const DEFAULT_SETTINGS_FILE: &str = "appsettings.json";

/// Store directory used when neither the file nor the flags name one.
pub const DEFAULT_DATA_PATH: &str = "./colswap_data";

/// Contents of the settings file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Settings {
    pub data_path: Option<PathBuf>,
    pub store: StoreSettings,
    pub collection_properties: CollectionProperties,
    pub delete_original: Option<bool>,
    pub skip_duplicates: Option<bool>,
    #[serde(alias = "TempDatabasePrefix")]
    pub temp_collection_suffix: Option<String>,
    pub on_mismatch: Option<OnMismatch>,
    pub retain_temp_on_restore_failure: Option<bool>,
}

/// Target collection and the properties it should end up with.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct CollectionProperties {
    pub database_name: Option<String>,
    pub collection_name: Option<String>,
    pub partition_keys: Vec<String>,
    pub excluded_paths: Option<String>,
    pub unique_keys: Vec<String>,
    pub offer_throughput: Option<u32>,
}

/// Local store tuning.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct StoreSettings {
    /// Page cache size in bytes.
    pub cache_capacity: Option<u64>,
    /// Background flush interval; 0 flushes only on demand.
    pub flush_every_ms: Option<u64>,
    pub compression: Option<bool>,
}

impl Settings {
    /// Load settings.
    ///
    /// An explicitly named file must exist. Without one, `appsettings.json`
    /// in the working directory is read if present.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let (path, required) = match explicit {
            Some(path) => (path.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_SETTINGS_FILE), false),
        };

        if !required && !path.exists() {
            debug!(path = %path.display(), "no settings file, using defaults");
            return Ok(Self::default());
        }

        let text = std::fs::read_to_string(&path).map_err(|e| Error::settings(&path, e))?;
        let settings = Self::from_json(&text).map_err(|e| Error::settings(&path, e))?;
        debug!(path = %path.display(), "loaded settings");
        Ok(settings)
    }

    /// Parse settings from a JSON string.
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    /// Store directory, falling back to the default.
    pub fn data_path(&self) -> PathBuf {
        self.data_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_PATH))
    }

    /// Build the local store configuration.
    pub fn store_config(&self) -> StoreConfig {
        let mut config = StoreConfig::new(self.data_path());
        if let Some(bytes) = self.store.cache_capacity {
            config = config.with_cache_capacity(bytes);
        }
        if let Some(ms) = self.store.flush_every_ms {
            config = config.with_flush_every_ms((ms > 0).then_some(ms));
        }
        if let Some(enabled) = self.store.compression {
            config = config.with_compression(enabled);
        }
        config
    }

    /// Build the target descriptor. Database and collection names are required.
    pub fn descriptor(&self) -> Result<CollectionDescriptor> {
        let props = &self.collection_properties;
        let database = props
            .database_name
            .as_deref()
            .ok_or_else(|| Error::Input("database name is not set".to_string()))?;
        let collection = props
            .collection_name
            .as_deref()
            .ok_or_else(|| Error::Input("collection name is not set".to_string()))?;

        let mut descriptor = CollectionDescriptor::new(database, collection)
            .with_partition_keys(props.partition_keys.iter().cloned())
            .with_unique_keys(props.unique_keys.iter().cloned());
        if let Some(path) = &props.excluded_paths {
            descriptor = descriptor.with_excluded_index_path(path.clone());
        }
        if let Some(throughput) = props.offer_throughput {
            descriptor = descriptor.with_offer_throughput(throughput);
        }
        Ok(descriptor)
    }

    /// Build the migration options.
    pub fn migration_config(&self) -> MigrationConfig {
        let mut config = MigrationConfig::default();
        if let Some(delete) = self.delete_original {
            config = config.with_delete_original(delete);
        }
        if let Some(skip) = self.skip_duplicates {
            config = config.with_skip_duplicates(skip);
        }
        if let Some(suffix) = &self.temp_collection_suffix {
            config = config.with_temp_suffix(suffix.clone());
        }
        if let Some(policy) = self.on_mismatch {
            config = config.with_on_mismatch(policy);
        }
        if let Some(retain) = self.retain_temp_on_restore_failure {
            config = config.with_retain_temp_on_restore_failure(retain);
        }
        config
    }
}
