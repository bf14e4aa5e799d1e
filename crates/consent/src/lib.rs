//! Consent crate - opt-out reconciliation between a mailing list and a CRM
//!
//! This crate provides:
//! - Domain models (Email, ContactRecord, Outcome, RunReport)
//! - Mailchimp and Mercury clients behind the `MailingList` and
//!   `ContactDirectory` traits, plus in-memory versions of both
//! - The status ledger trait with SQLite and in-memory storage
//! - The idempotent reconciliation engine
//!
//! The engine is synchronous and executor-agnostic; scheduling is left to
//! the caller.

pub mod config;
pub mod error;
pub mod mailchimp;
pub mod mercury;
pub mod models;
pub mod storage;
pub mod sync;

pub use crate::config::{ConsentConfig, MailchimpConfig, MercuryConfig};
pub use error::SyncError;
pub use mailchimp::{InMemoryMailingList, MailchimpClient, MailingList};
pub use mercury::{ContactDirectory, InMemoryContactDirectory, MercuryClient};
pub use models::{Action, ContactId, ContactRecord, Email, Outcome, OutcomeStatus, RunReport, Store};
pub use storage::{InMemoryLedger, Ledger, LedgerStore, SqliteLedger};
pub use sync::{Snapshot, SyncOptions, run_sync};
