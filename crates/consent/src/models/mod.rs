//! Domain models for consent reconciliation

mod contact;
mod outcome;

pub use contact::{ContactId, ContactRecord, Email, Store};
pub use outcome::{Action, Outcome, OutcomeStatus, RunReport};
