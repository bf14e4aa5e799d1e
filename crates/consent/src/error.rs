//! Error types for the reconciliation engine

use serde::Serialize;
use thiserror::Error;

use crate::models::{Email, Store};

/// Errors produced while reconciling consent status.
///
/// Only [`SyncError::SourceUnavailable`] aborts a run. Every other variant is
/// recorded against a single record or email in the run report.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SyncError {
    /// A listed record is missing a required field and was dropped.
    #[error("malformed {store} record {record}: {reason}")]
    MalformedSnapshot {
        store: Store,
        /// Best available identifier for the record (email, id, or position)
        record: String,
        reason: String,
    },

    /// A create/update/delete call against a source or the ledger failed.
    #[error("{operation} on {store} failed for {email}: {reason}")]
    ExternalWriteFailure {
        email: Email,
        store: Store,
        operation: String,
        reason: String,
    },

    /// A duplicate contact could not be brought in line with its siblings.
    #[error("unresolved duplicate conflict for {email}: {reason}")]
    UnresolvedIntraSourceConflict { email: Email, reason: String },

    /// A listing or the ledger could not be read; nothing was written.
    #[error("{store} unavailable: {reason}")]
    SourceUnavailable { store: Store, reason: String },
}

impl SyncError {
    /// Convert an `anyhow` error from a fetch into a run-level failure
    pub(crate) fn unavailable(store: Store, err: &anyhow::Error) -> Self {
        SyncError::SourceUnavailable {
            store,
            reason: format!("{err:#}"),
        }
    }
}
