//! Errors raised by adapters, the tag store and the sync driver

use std::path::PathBuf;
use thiserror::Error;

use super::types::Vendor;

/// Errors that can occur while syncing tags
#[derive(Debug, Error)]
pub enum TagSyncError {
    /// Session could not be established
    #[error("{vendor} authentication failed: {reason}")]
    Auth { vendor: Vendor, reason: String },

    /// Listing remote tags failed
    #[error("failed to list {vendor} tags: {reason}")]
    Fetch { vendor: Vendor, reason: String },

    /// A single tag could not be applied
    #[error("failed to upsert {vendor} tag '{name}': {reason}")]
    Upsert {
        vendor: Vendor,
        name: String,
        reason: String,
    },

    /// Tag file could not be read or written
    #[error("tag file {}: {reason}", .path.display())]
    Io { path: PathBuf, reason: String },
}

impl TagSyncError {
    pub(crate) fn auth(vendor: Vendor, reason: impl ToString) -> Self {
        Self::Auth {
            vendor,
            reason: reason.to_string(),
        }
    }

    pub(crate) fn fetch(vendor: Vendor, reason: impl ToString) -> Self {
        Self::Fetch {
            vendor,
            reason: reason.to_string(),
        }
    }

    pub(crate) fn upsert(vendor: Vendor, name: &str, reason: impl ToString) -> Self {
        Self::Upsert {
            vendor,
            name: name.to_string(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Io {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether the error aborts the current flow. Only per-tag upsert
    /// failures are isolated.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, TagSyncError::Upsert { .. })
    }
}
