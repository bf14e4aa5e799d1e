//! Sync orchestration
//!
//! One run: fetch → repair duplicates → six reconciliation cases →
//! cross-source conflicts. Safe to repeat; a run over settled stores issues
//! no writes.

use log::info;

use super::apply::Executor;
use super::command::SourceWrite;
use super::reconcile::{CASES, WorkingSets};
use super::{Snapshot, conflicts, presync};
use crate::error::SyncError;
use crate::mailchimp::MailingList;
use crate::mercury::ContactDirectory;
use crate::models::{OutcomeStatus, RunReport};
use crate::storage::LedgerStore;

/// Options controlling a sync run
#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    /// Plan every write and report it without issuing anything
    pub dry_run: bool,
}

/// Reconcile opt-out status across the mailing list, the contact directory
/// and the ledger
///
/// Fails only if one of the three stores cannot be read, and in that case
/// before any write is issued. Every other failure is an outcome in the
/// returned report.
pub fn run_sync(
    list: &dyn MailingList,
    directory: &dyn ContactDirectory,
    ledger: &dyn LedgerStore,
    options: &SyncOptions,
) -> Result<RunReport, SyncError> {
    let mut report = RunReport::begin(options.dry_run);
    info!(
        "Sync is running{}",
        if options.dry_run { " (dry run)" } else { "" }
    );

    let (mut snapshot, rejected) = Snapshot::fetch(list, directory, ledger)?;
    report.rejected = rejected;

    let executor = Executor::new(list, directory, ledger, options.dry_run);

    // Duplicate repair runs first so every later step can trust the first
    // directory contact to speak for the group
    for command in presync::plan_repairs(&snapshot) {
        let outcomes = executor.apply(&command);
        for (write, outcome) in command.source_writes.iter().zip(&outcomes) {
            let succeeded = matches!(outcome.status, OutcomeStatus::Applied | OutcomeStatus::Planned);
            if let (true, SourceWrite::UpdateContact { id, unsubscribed }) = (succeeded, write) {
                snapshot.set_contact_status(&command.email, id, *unsubscribed);
            }
        }
        report.outcomes.extend(outcomes);
    }

    let mut sets = WorkingSets::from_snapshot(&snapshot);
    for (name, case) in CASES {
        let (next, commands) = case(sets, &snapshot);
        sets = next;
        if !commands.is_empty() {
            info!("{} email(s) in case \"{}\"", commands.len(), name);
        }
        for command in &commands {
            report.outcomes.extend(executor.apply(command));
        }
    }

    for command in conflicts::plan_resolutions(&snapshot) {
        report.outcomes.extend(executor.apply(&command));
    }

    let report = report.finish();
    info!(
        "Sync complete in {}ms: {} applied, {} planned, {} skipped, {} failed, {} rejected",
        report.duration_ms(),
        report.applied(),
        report.planned(),
        report.skipped(),
        report.failed(),
        report.rejected.len()
    );
    Ok(report)
}
