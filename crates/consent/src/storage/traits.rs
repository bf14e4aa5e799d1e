//! Storage trait definitions

use std::collections::BTreeMap;

use anyhow::Result;

use crate::models::Email;

/// Full ledger contents: email -> last known `unsubscribed`
pub type Ledger = BTreeMap<Email, bool>;

/// Trait for ledger storage operations
///
/// Implementations must key strictly by canonical email and fail, rather
/// than silently succeed, when a write does not match the stored state:
/// inserting an existing email, or updating/deleting a missing one.
pub trait LedgerStore: Send + Sync {
    /// Read every entry
    fn get_all(&self) -> Result<Ledger>;

    /// Add an entry for an email not yet in the ledger
    fn insert(&self, email: &Email, unsubscribed: bool) -> Result<()>;

    /// Overwrite the value for an existing entry
    fn update(&self, email: &Email, unsubscribed: bool) -> Result<()>;

    /// Remove an existing entry
    fn delete(&self, email: &Email) -> Result<()>;
}
