//! Migration run configuration.

use serde::{Deserialize, Serialize};

/// Default suffix appended to the source name to name the temp collection.
pub const DEFAULT_TEMP_SUFFIX: &str = "_";

/// What to do when a copy leaves a different number of documents behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnMismatch {
    /// Fail the copy.
    #[default]
    Abort,
    /// Log a warning and carry on.
    ProceedAnyway,
}

/// Options of a single migration run, fixed before the run starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationConfig {
    /// Delete and recreate the original after staging. When false the run
    /// only stages the documents and removes the temp collection again.
    pub delete_original: bool,
    /// Skip documents the store rejects as duplicates while staging.
    pub skip_duplicates: bool,
    /// Suffix for the temp collection name.
    pub temp_suffix: String,
    /// Policy when the destination count differs from the source count.
    pub on_mismatch: OnMismatch,
    /// Keep the temp collection when a step fails after the original was deleted.
    pub retain_temp_on_restore_failure: bool,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            delete_original: true,
            skip_duplicates: false,
            temp_suffix: DEFAULT_TEMP_SUFFIX.to_string(),
            on_mismatch: OnMismatch::Abort,
            retain_temp_on_restore_failure: true,
        }
    }
}

impl MigrationConfig {
    /// Set whether the original collection is deleted and recreated.
    pub fn with_delete_original(mut self, delete: bool) -> Self {
        self.delete_original = delete;
        self
    }

    /// Set whether duplicates are skipped while staging.
    pub fn with_skip_duplicates(mut self, skip: bool) -> Self {
        self.skip_duplicates = skip;
        self
    }

    /// Set the temp collection suffix.
    pub fn with_temp_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.temp_suffix = suffix.into();
        self
    }

    /// Set the count mismatch policy.
    pub fn with_on_mismatch(mut self, policy: OnMismatch) -> Self {
        self.on_mismatch = policy;
        self
    }

    /// Set whether the temp collection survives a failed restore.
    pub fn with_retain_temp_on_restore_failure(mut self, retain: bool) -> Self {
        self.retain_temp_on_restore_failure = retain;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MigrationConfig::default();
        assert!(config.delete_original);
        assert!(!config.skip_duplicates);
        assert_eq!(config.temp_suffix, "_");
        assert_eq!(config.on_mismatch, OnMismatch::Abort);
        assert!(config.retain_temp_on_restore_failure);
    }

    #[test]
    fn test_builder() {
        let config = MigrationConfig::default()
            .with_delete_original(false)
            .with_skip_duplicates(true)
            .with_temp_suffix("_staging")
            .with_on_mismatch(OnMismatch::ProceedAnyway)
            .with_retain_temp_on_restore_failure(false);

        assert!(!config.delete_original);
        assert!(config.skip_duplicates);
        assert_eq!(config.temp_suffix, "_staging");
        assert_eq!(config.on_mismatch, OnMismatch::ProceedAnyway);
        assert!(!config.retain_temp_on_restore_failure);
    }

    #[test]
    fn test_mismatch_policy_names() {
        let policy: OnMismatch = serde_json::from_str("\"proceed_anyway\"").unwrap();
        assert_eq!(policy, OnMismatch::ProceedAnyway);
    }
}
