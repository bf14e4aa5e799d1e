//! Per-run snapshot of both sources and the ledger

use std::collections::BTreeMap;

use log::info;

use crate::error::SyncError;
use crate::mailchimp::{MailingList, normalize_members};
use crate::mercury::{ContactDirectory, normalize_contacts};
use crate::models::{ContactId, ContactRecord, Email, Store};
use crate::storage::{Ledger, LedgerStore};

/// Canonical state of all three stores at the start of a run
#[derive(Debug, Default, Clone)]
pub struct Snapshot {
    /// Source A: one record per email
    pub list: BTreeMap<Email, ContactRecord>,
    /// Source B: every live contact per email, in listing order
    pub directory: BTreeMap<Email, Vec<ContactRecord>>,
    pub ledger: Ledger,
}

impl Snapshot {
    /// Read all three stores
    ///
    /// Any store that cannot be read aborts the run before a single write
    /// is issued. Records dropped during normalization are returned
    /// alongside the snapshot.
    pub fn fetch(
        list: &dyn MailingList,
        directory: &dyn ContactDirectory,
        ledger: &dyn LedgerStore,
    ) -> Result<(Self, Vec<SyncError>), SyncError> {
        let members = list
            .list_members()
            .map_err(|e| SyncError::unavailable(Store::MailingList, &e))?;
        let contacts = directory
            .list_contacts()
            .map_err(|e| SyncError::unavailable(Store::ContactDirectory, &e))?;
        let entries = ledger
            .get_all()
            .map_err(|e| SyncError::unavailable(Store::Ledger, &e))?;

        let list = normalize_members(members);
        let directory = normalize_contacts(contacts);

        info!(
            "Fetched {} list members, {} directory emails, {} ledger entries",
            list.records.len(),
            directory.records.len(),
            entries.len()
        );

        let mut rejected = list.rejected;
        rejected.extend(directory.rejected);

        Ok((
            Self {
                list: list.records,
                directory: directory.records,
                ledger: entries,
            },
            rejected,
        ))
    }

    /// Status of the first directory contact for an email
    pub fn directory_status(&self, email: &Email) -> Option<bool> {
        self.directory
            .get(email)
            .and_then(|group| group.first())
            .map(|r| r.unsubscribed)
    }

    /// Record a successful directory write in the snapshot
    pub fn set_contact_status(&mut self, email: &Email, id: &ContactId, unsubscribed: bool) {
        if let Some(record) = self
            .directory
            .get_mut(email)
            .and_then(|group| group.iter_mut().find(|r| &r.unique_id == id))
        {
            record.unsubscribed = unsubscribed;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mailchimp::InMemoryMailingList;
    use crate::mailchimp::api::MemberStatus;
    use crate::mercury::InMemoryContactDirectory;
    use crate::storage::InMemoryLedger;

    #[test]
    fn test_fetch_normalizes_both_sources() {
        let list = InMemoryMailingList::new();
        list.insert("m1", "A@x.com", MemberStatus::Subscribed);
        list.insert("m2", "p@x.com", MemberStatus::Pending);

        let directory = InMemoryContactDirectory::new();
        directory.insert("c1", "b@x.com", true);
        directory.insert("c2", "b@x.com", false);

        let ledger = InMemoryLedger::new();

        let (snapshot, rejected) = Snapshot::fetch(&list, &directory, &ledger).unwrap();
        assert!(rejected.is_empty());
        assert_eq!(snapshot.list.len(), 1);
        assert_eq!(snapshot.directory[&Email::parse("b@x.com").unwrap()].len(), 2);
        assert!(snapshot.ledger.is_empty());
    }

    #[test]
    fn test_fetch_fails_when_ledger_unavailable() {
        let ledger = InMemoryLedger::new();
        ledger.set_unavailable(true);

        let err = Snapshot::fetch(
            &InMemoryMailingList::new(),
            &InMemoryContactDirectory::new(),
            &ledger,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            SyncError::SourceUnavailable { store: Store::Ledger, .. }
        ));
    }

    #[test]
    fn test_set_contact_status_targets_one_duplicate() {
        let email = Email::parse("d@x.com").unwrap();
        let mut snapshot = Snapshot::default();
        snapshot.directory.insert(
            email.clone(),
            vec![
                ContactRecord::new(email.clone(), "c1", true),
                ContactRecord::new(email.clone(), "c2", true),
            ],
        );

        snapshot.set_contact_status(&email, &ContactId::new("c2"), false);
        let flags: Vec<bool> = snapshot.directory[&email].iter().map(|r| r.unsubscribed).collect();
        assert_eq!(flags, vec![true, false]);
    }
}
