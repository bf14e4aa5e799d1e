//! Command execution
//!
//! Issues the writes of a [`Command`] and converts every result into an
//! [`Outcome`]. Failures never propagate: they become outcomes and the next
//! write or command proceeds.

use anyhow::Result;
use log::{info, warn};

use super::command::{Command, LedgerGate, LedgerWrite, SourceWrite};
use crate::error::SyncError;
use crate::mailchimp::MailingList;
use crate::mercury::ContactDirectory;
use crate::models::{Action, Email, Outcome, OutcomeStatus, Store};
use crate::storage::LedgerStore;

/// Applies commands against the three stores
pub struct Executor<'a> {
    list: &'a dyn MailingList,
    directory: &'a dyn ContactDirectory,
    ledger: &'a dyn LedgerStore,
    dry_run: bool,
}

impl<'a> Executor<'a> {
    pub fn new(
        list: &'a dyn MailingList,
        directory: &'a dyn ContactDirectory,
        ledger: &'a dyn LedgerStore,
        dry_run: bool,
    ) -> Self {
        Self {
            list,
            directory,
            ledger,
            dry_run,
        }
    }

    /// Issue every write of `command`, returning one outcome per write in
    /// the same order (source writes first, then the ledger write)
    pub fn apply(&self, command: &Command) -> Vec<Outcome> {
        let mut outcomes = Vec::with_capacity(command.source_writes.len() + 1);
        let mut sources_ok = true;

        for write in &command.source_writes {
            let status = self.run(command, write.store(), || self.source_write(&command.email, write));
            if matches!(status, OutcomeStatus::Failed { .. }) {
                sources_ok = false;
            }
            outcomes.push(Outcome {
                email: command.email.clone(),
                action: command.action,
                store: write.store(),
                operation: write.operation(),
                status,
            });
        }

        if let Some(write) = command.ledger_write {
            let status = if !sources_ok && command.gate == LedgerGate::AfterSources {
                warn!(
                    "[{}] {}: ledger {} withheld after source failure",
                    command.action,
                    command.email,
                    write.operation()
                );
                OutcomeStatus::Skipped {
                    reason: "a source write for this email failed".to_string(),
                }
            } else {
                self.run(command, Store::Ledger, || self.ledger_write(&command.email, write))
            };
            outcomes.push(Outcome {
                email: command.email.clone(),
                action: command.action,
                store: Store::Ledger,
                operation: write.operation(),
                status,
            });
        }

        outcomes
    }

    /// Run one write, logging and classifying its result
    fn run(&self, command: &Command, store: Store, write: impl FnOnce() -> Result<String>) -> OutcomeStatus {
        if self.dry_run {
            return OutcomeStatus::Planned;
        }

        match write() {
            Ok(operation) => {
                info!("[{}] {}: {} on {}", command.action, command.email, operation, store);
                OutcomeStatus::Applied
            }
            Err(e) => {
                let error = failure(command, store, &e);
                warn!("[{}] {}", command.action, error);
                OutcomeStatus::Failed { error }
            }
        }
    }

    fn source_write(&self, email: &Email, write: &SourceWrite) -> Result<String> {
        match write {
            SourceWrite::CreateMember { unsubscribed } => {
                let id = self.list.create_member(email, *unsubscribed)?;
                return Ok(format!("created member {id}"));
            }
            SourceWrite::UpdateMember { id, unsubscribed } => {
                self.list.update_member_status(id, *unsubscribed)?
            }
            SourceWrite::DeleteMember { id, permanent: true } => {
                self.list.delete_member_permanently(id)?
            }
            SourceWrite::DeleteMember { id, permanent: false } => self.list.delete_member(id)?,
            SourceWrite::CreateContact { unsubscribed } => {
                let id = self.directory.create_contact(email, *unsubscribed)?;
                return Ok(format!("created contact {id}"));
            }
            SourceWrite::UpdateContact { id, unsubscribed } => {
                self.directory.update_contact_status(id, *unsubscribed)?
            }
        }
        Ok(write.operation())
    }

    fn ledger_write(&self, email: &Email, write: LedgerWrite) -> Result<String> {
        match write {
            LedgerWrite::Insert(value) => self.ledger.insert(email, value)?,
            LedgerWrite::Update(value) => self.ledger.update(email, value)?,
            LedgerWrite::Delete => self.ledger.delete(email)?,
        }
        Ok(write.operation())
    }
}

/// Classify a failed write
fn failure(command: &Command, store: Store, err: &anyhow::Error) -> SyncError {
    let reason = format!("{err:#}");
    match command.action {
        Action::RepairDuplicate => SyncError::UnresolvedIntraSourceConflict {
            email: command.email.clone(),
            reason,
        },
        _ => SyncError::ExternalWriteFailure {
            email: command.email.clone(),
            store,
            operation: command.action.to_string(),
            reason,
        },
    }
}
