//! CLI error types.

use std::path::PathBuf;

use colswap_core::{MigrationError, ProvisionError, StoreError};
use thiserror::Error;

/// Errors surfaced by the `colswap` binary.
#[derive(Debug, Error)]
pub enum Error {
    /// The settings file could not be read or parsed.
    #[error("invalid settings file {path}: {message}")]
    Settings { path: PathBuf, message: String },

    /// Required input was missing or malformed.
    #[error("invalid input: {0}")]
    Input(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("provision error: {0}")]
    Provision(#[from] ProvisionError),

    #[error(transparent)]
    Migration(#[from] MigrationError),
}

impl Error {
    pub fn settings(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Error::Settings {
            path: path.into(),
            message: message.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
