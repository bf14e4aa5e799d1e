//! In-memory ledger implementation
//!
//! Used for testing and dry runs against a copy of the real ledger.

use anyhow::{Result, bail};
use std::collections::HashSet;
use std::sync::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{Ledger, LedgerStore};
use crate::models::Email;

/// In-memory implementation of LedgerStore
///
/// Same strictness as the SQLite store so tests exercise the same failure
/// paths.
#[derive(Default)]
pub struct InMemoryLedger {
    entries: RwLock<Ledger>,
    failing: RwLock<HashSet<Email>>,
    unavailable: RwLock<bool>,
    writes: AtomicUsize,
}

impl InMemoryLedger {
    /// Create a new empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a ledger pre-populated with entries
    pub fn with_entries(entries: Ledger) -> Self {
        Self {
            entries: RwLock::new(entries),
            ..Self::default()
        }
    }

    /// Value for an email, if present
    pub fn get(&self, email: &str) -> Option<bool> {
        let email = Email::parse(email)?;
        self.entries.read().unwrap().get(&email).copied()
    }

    /// Make every write for `email` fail
    pub fn fail_writes_for(&self, email: &str) {
        if let Some(email) = Email::parse(email) {
            self.failing.write().unwrap().insert(email);
        }
    }

    /// Make `get_all` fail
    pub fn set_unavailable(&self, unavailable: bool) {
        *self.unavailable.write().unwrap() = unavailable;
    }

    /// Number of successful writes so far
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn write(&self, email: &Email, f: impl FnOnce(&mut Ledger) -> Result<()>) -> Result<()> {
        if self.failing.read().unwrap().contains(email) {
            bail!("ledger rejected write for {email}");
        }
        let mut entries = self.entries.write().unwrap();
        f(&mut *entries)?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl LedgerStore for InMemoryLedger {
    fn get_all(&self) -> Result<Ledger> {
        if *self.unavailable.read().unwrap() {
            bail!("ledger unavailable");
        }
        Ok(self.entries.read().unwrap().clone())
    }

    fn insert(&self, email: &Email, unsubscribed: bool) -> Result<()> {
        self.write(email, |entries| {
            if entries.contains_key(email) {
                bail!("ledger already has an entry for {email}");
            }
            entries.insert(email.clone(), unsubscribed);
            Ok(())
        })
    }

    fn update(&self, email: &Email, unsubscribed: bool) -> Result<()> {
        self.write(email, |entries| match entries.get_mut(email) {
            Some(value) => {
                *value = unsubscribed;
                Ok(())
            }
            None => bail!("ledger has no entry for {email}"),
        })
    }

    fn delete(&self, email: &Email) -> Result<()> {
        self.write(email, |entries| match entries.remove(email) {
            Some(_) => Ok(()),
            None => bail!("ledger has no entry for {email}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn email(s: &str) -> Email {
        Email::parse(s).unwrap()
    }

    #[test]
    fn test_crud() {
        let ledger = InMemoryLedger::new();
        ledger.insert(&email("a@x.com"), false).unwrap();
        assert_eq!(ledger.get("a@x.com"), Some(false));

        ledger.update(&email("a@x.com"), true).unwrap();
        assert_eq!(ledger.get("a@x.com"), Some(true));

        ledger.delete(&email("a@x.com")).unwrap();
        assert_eq!(ledger.get("a@x.com"), None);
        assert_eq!(ledger.writes(), 3);
    }

    #[test]
    fn test_strict_writes() {
        let ledger = InMemoryLedger::new();
        ledger.insert(&email("a@x.com"), false).unwrap();

        assert!(ledger.insert(&email("a@x.com"), true).is_err());
        assert!(ledger.update(&email("b@x.com"), true).is_err());
        assert!(ledger.delete(&email("b@x.com")).is_err());
        assert_eq!(ledger.get("a@x.com"), Some(false));
    }

    #[test]
    fn test_injected_failure() {
        let ledger = InMemoryLedger::new();
        ledger.fail_writes_for("a@x.com");
        assert!(ledger.insert(&email("a@x.com"), true).is_err());
        assert!(ledger.get_all().unwrap().is_empty());

        ledger.set_unavailable(true);
        assert!(ledger.get_all().is_err());
    }
}
