//! Side-effect commands produced by the planners
//!
//! Planners never call a client. They describe the writes for one email as a
//! [`Command`]; the [`Executor`](super::Executor) issues them and turns each
//! write into an [`Outcome`](crate::models::Outcome).

use crate::models::{Action, ContactId, Email, Store};

/// A write against one of the two sources
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceWrite {
    CreateMember { unsubscribed: bool },
    UpdateMember { id: ContactId, unsubscribed: bool },
    DeleteMember { id: ContactId, permanent: bool },
    CreateContact { unsubscribed: bool },
    UpdateContact { id: ContactId, unsubscribed: bool },
}

impl SourceWrite {
    pub fn store(&self) -> Store {
        match self {
            SourceWrite::CreateMember { .. }
            | SourceWrite::UpdateMember { .. }
            | SourceWrite::DeleteMember { .. } => Store::MailingList,
            SourceWrite::CreateContact { .. } | SourceWrite::UpdateContact { .. } => {
                Store::ContactDirectory
            }
        }
    }

    pub fn operation(&self) -> String {
        match self {
            SourceWrite::CreateMember { unsubscribed } => {
                format!("create member (unsubscribed={unsubscribed})")
            }
            SourceWrite::UpdateMember { id, unsubscribed } => {
                format!("update member {id} (unsubscribed={unsubscribed})")
            }
            SourceWrite::DeleteMember { id, permanent: true } => {
                format!("permanently delete member {id}")
            }
            SourceWrite::DeleteMember { id, permanent: false } => format!("delete member {id}"),
            SourceWrite::CreateContact { unsubscribed } => {
                format!("create contact (doNotMail={unsubscribed})")
            }
            SourceWrite::UpdateContact { id, unsubscribed } => {
                format!("update contact {id} (doNotMail={unsubscribed})")
            }
        }
    }
}

/// A write against the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerWrite {
    Insert(bool),
    Update(bool),
    Delete,
}

impl LedgerWrite {
    pub fn operation(&self) -> String {
        match self {
            LedgerWrite::Insert(value) => format!("insert (unsubscribed={value})"),
            LedgerWrite::Update(value) => format!("update (unsubscribed={value})"),
            LedgerWrite::Delete => "delete".to_string(),
        }
    }
}

/// When the ledger write of a command may be issued
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerGate {
    /// Only if every source write succeeded
    AfterSources,
    /// Regardless of source write failures
    Always,
}

/// All writes for one email, issued in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub email: Email,
    pub action: Action,
    /// Attempted independently; one failing does not stop the rest
    pub source_writes: Vec<SourceWrite>,
    pub ledger_write: Option<LedgerWrite>,
    pub gate: LedgerGate,
}

impl Command {
    pub fn new(email: Email, action: Action) -> Self {
        Self {
            email,
            action,
            source_writes: Vec::new(),
            ledger_write: None,
            gate: LedgerGate::AfterSources,
        }
    }

    pub fn write(mut self, write: SourceWrite) -> Self {
        self.source_writes.push(write);
        self
    }

    pub fn writes(mut self, writes: impl IntoIterator<Item = SourceWrite>) -> Self {
        self.source_writes.extend(writes);
        self
    }

    pub fn ledger(mut self, write: LedgerWrite) -> Self {
        self.ledger_write = Some(write);
        self
    }

    /// Issue the ledger write even if a source write fails
    pub fn ledger_always(mut self) -> Self {
        self.gate = LedgerGate::Always;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.source_writes.is_empty() && self.ledger_write.is_none()
    }
}
