//! Persistence store
//!
//! Two independent JSON documents: per-member strike counts and per-server
//! log channel settings. Each document is owned by exactly one store and every
//! mutation rewrites the whole file.

mod document;
mod error;
mod log_config;
mod strikes;

pub use document::JsonDocument;
pub use error::{StoreError, StoreResult};
pub use log_config::{LogConfigStore, LogSettings, StoredLogEntry};
pub use strikes::{StrikeLedger, StrikeStore};
