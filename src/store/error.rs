//! Error types for the persistence store

use std::path::PathBuf;

use thiserror::Error;

use crate::config::StrikeLayout;

/// Errors that can occur while loading or saving a document
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading or writing the file failed
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The file holds invalid JSON, or the state could not be serialized
    #[error("JSON error on {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// The strike file was written with a different layout than configured
    #[error("Strike file {path} does not match the configured {expected:?} layout")]
    LayoutMismatch {
        path: PathBuf,
        expected: StrikeLayout,
    },
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;
