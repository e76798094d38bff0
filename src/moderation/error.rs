//! Command failures
//!
//! The `Display` text of every variant is exactly what the invoking member
//! sees. Underlying platform and store errors are kept as sources so they can
//! be logged without being shown.

use thiserror::Error;

use super::platform::PlatformError;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum CommandError {
    /// The actor lacks the required capability
    #[error("{0}")]
    PermissionDenied(String),

    /// Missing or malformed argument, invalid duration, unresolvable target
    #[error("{0}")]
    Validation(String),

    /// The platform rejected the moderation call
    #[error("{notice}")]
    PlatformActionFailed {
        notice: String,
        #[source]
        source: PlatformError,
    },

    /// The new state could not be written to disk
    #[error("{notice}")]
    Persistence {
        notice: String,
        #[source]
        source: StoreError,
    },
}

impl CommandError {
    pub fn denied(notice: impl Into<String>) -> Self {
        Self::PermissionDenied(notice.into())
    }

    pub fn validation(notice: impl Into<String>) -> Self {
        Self::Validation(notice.into())
    }

    pub fn platform(notice: impl Into<String>, source: PlatformError) -> Self {
        Self::PlatformActionFailed {
            notice: notice.into(),
            source,
        }
    }

    pub fn persistence(notice: impl Into<String>, source: StoreError) -> Self {
        Self::Persistence {
            notice: notice.into(),
            source,
        }
    }

    /// Short name of the failure class, for structured logs
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::PermissionDenied(_) => "permission_denied",
            Self::Validation(_) => "validation",
            Self::PlatformActionFailed { .. } => "platform_action_failed",
            Self::Persistence { .. } => "persistence",
        }
    }
}
