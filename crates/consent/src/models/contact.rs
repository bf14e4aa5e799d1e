//! Contact records shared by both sources

use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical email address, the join key across both sources and the ledger
///
/// Always lower-cased and trimmed, never empty, always contains `@`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Email(String);

impl Email {
    /// Canonicalize a raw address, returning `None` if it cannot be a join key
    pub fn parse(raw: &str) -> Option<Self> {
        let canonical = raw.trim().to_lowercase();
        if canonical.is_empty() || !canonical.contains('@') {
            return None;
        }
        Some(Self(canonical))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque identifier assigned by a source (Mailchimp member id, Mercury uniqueId)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContactId(pub String);

impl ContactId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for ContactId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ContactId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for ContactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One normalized contact entry from either source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactRecord {
    pub email: Email,
    pub unsubscribed: bool,
    pub unique_id: ContactId,
    /// Bounced or invalid on the mailing list; always false for CRM contacts
    pub cleaned: bool,
}

impl ContactRecord {
    pub fn new(email: Email, unique_id: impl Into<ContactId>, unsubscribed: bool) -> Self {
        Self {
            email,
            unsubscribed,
            unique_id: unique_id.into(),
            cleaned: false,
        }
    }

    /// Mark the record as cleaned (implies unsubscribed)
    pub fn cleaned(mut self) -> Self {
        self.cleaned = true;
        self.unsubscribed = true;
        self
    }
}

/// Which store an operation or outcome refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Store {
    /// Source A, the mailing list
    MailingList,
    /// Source B, the CRM contact directory
    ContactDirectory,
    Ledger,
}

impl fmt::Display for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Store::MailingList => "mailing list",
            Store::ContactDirectory => "contact directory",
            Store::Ledger => "ledger",
        };
        f.write_str(name)
    }
}
