//! Per-email outcomes and the run report

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

use super::{Email, Store};
use crate::error::SyncError;

/// Why the engine touched an email
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Stale CRM duplicate flipped to match its siblings
    RepairDuplicate,
    /// Case 1: only on the mailing list, created in the CRM
    NewFromMailingList,
    /// Case 2: only in the CRM, created on the mailing list
    NewFromDirectory,
    /// Case 3: gone from the CRM, removed from the mailing list
    RemovedFromDirectory,
    /// Case 4: gone from the mailing list, unsubscribed in the CRM
    RemovedFromMailingList,
    /// Case 5: ledger row with no backing record
    Orphaned,
    /// Case 6: present in both sources but not yet in the ledger
    FirstSeen,
    /// Mailing list diverged from the ledger and wins
    MailingListChanged,
    /// CRM diverged from the ledger and wins
    DirectoryChanged,
    /// Sources agree with each other but not the ledger
    LedgerRealigned,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Action::RepairDuplicate => "repair duplicate",
            Action::NewFromMailingList => "new from mailing list",
            Action::NewFromDirectory => "new from directory",
            Action::RemovedFromDirectory => "removed from directory",
            Action::RemovedFromMailingList => "removed from mailing list",
            Action::Orphaned => "orphaned",
            Action::FirstSeen => "first seen",
            Action::MailingListChanged => "mailing list changed",
            Action::DirectoryChanged => "directory changed",
            Action::LedgerRealigned => "ledger realigned",
        };
        f.write_str(name)
    }
}

/// Result of a single write
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OutcomeStatus {
    Applied,
    /// Dry run: the write would have been issued
    Planned,
    /// Not issued because an earlier write for the same email failed
    Skipped { reason: String },
    Failed { error: SyncError },
}

/// One write issued (or planned, or withheld) for one email
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Outcome {
    pub email: Email,
    pub action: Action,
    pub store: Store,
    pub operation: String,
    #[serde(flatten)]
    pub status: OutcomeStatus,
}

impl Outcome {
    pub fn is_failure(&self) -> bool {
        matches!(self.status, OutcomeStatus::Failed { .. })
    }
}

/// Everything a run did, in the order it did it
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub dry_run: bool,
    pub outcomes: Vec<Outcome>,
    /// Records dropped during normalization
    pub rejected: Vec<SyncError>,
}

impl RunReport {
    pub(crate) fn begin(dry_run: bool) -> Self {
        let now = Utc::now();
        Self {
            started_at: now,
            finished_at: now,
            dry_run,
            outcomes: Vec::new(),
            rejected: Vec::new(),
        }
    }

    pub(crate) fn finish(mut self) -> Self {
        self.finished_at = Utc::now();
        self
    }

    fn count(&self, pred: impl Fn(&OutcomeStatus) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(&o.status)).count()
    }

    pub fn applied(&self) -> usize {
        self.count(|s| matches!(s, OutcomeStatus::Applied))
    }

    pub fn planned(&self) -> usize {
        self.count(|s| matches!(s, OutcomeStatus::Planned))
    }

    pub fn skipped(&self) -> usize {
        self.count(|s| matches!(s, OutcomeStatus::Skipped { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, OutcomeStatus::Failed { .. }))
    }

    pub fn failures(&self) -> impl Iterator<Item = &Outcome> {
        self.outcomes.iter().filter(|o| o.is_failure())
    }

    /// Outcomes for one email, in issue order
    pub fn for_email<'a>(&'a self, email: &'a str) -> impl Iterator<Item = &'a Outcome> + 'a {
        self.outcomes.iter().filter(move |o| o.email.as_str() == email)
    }

    /// True when the run had nothing to do
    pub fn is_noop(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn duration_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }
}
