//! Reconciliation engine
//!
//! Planning ([`presync`], [`reconcile`], [`conflicts`]) is pure: each
//! planner reads a [`Snapshot`] and returns [`Command`]s. The [`Executor`]
//! is the only place writes are issued.

mod apply;
mod command;
pub mod conflicts;
mod engine;
pub mod presync;
pub mod reconcile;
mod snapshot;

pub use apply::Executor;
pub use command::{Command, LedgerGate, LedgerWrite, SourceWrite};
pub use engine::{SyncOptions, run_sync};
pub use snapshot::Snapshot;
