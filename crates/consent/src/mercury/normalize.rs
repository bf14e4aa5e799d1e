//! Mercury listing normalization

use std::collections::BTreeMap;

use log::warn;

use super::api::Contact;
use crate::error::SyncError;
use crate::models::{ContactRecord, Email, Store};

/// Canonical view of the contact directory, duplicates preserved
#[derive(Debug, Default, Clone)]
pub struct DirectorySnapshot {
    pub records: BTreeMap<Email, Vec<ContactRecord>>,
    pub rejected: Vec<SyncError>,
}

/// Normalize raw contacts, grouping them by canonical email in listing order
///
/// Deleted contacts and contacts without a usable email are dropped
/// before anything else is checked.
pub fn normalize_contacts(contacts: Vec<Contact>) -> DirectorySnapshot {
    let mut snapshot = DirectorySnapshot::default();

    for (position, contact) in contacts.into_iter().enumerate() {
        if contact.is_deleted {
            continue;
        }
        let Some(email) = contact.email.as_deref().and_then(Email::parse) else {
            continue;
        };

        let (unique_id, do_not_mail) = match (contact.unique_id, contact.do_not_mail) {
            (Some(id), Some(flag)) => (id, flag),
            (id, _) => {
                let reason = if id.is_none() {
                    "missing uniqueId"
                } else {
                    "missing doNotMail"
                };
                snapshot.rejected.push(SyncError::MalformedSnapshot {
                    store: Store::ContactDirectory,
                    record: format!("{email} (#{position})"),
                    reason: reason.to_string(),
                });
                continue;
            }
        };

        snapshot
            .records
            .entry(email.clone())
            .or_default()
            .push(ContactRecord::new(email, unique_id, do_not_mail));
    }

    for rejected in &snapshot.rejected {
        warn!("Dropped contact directory record: {}", rejected);
    }

    snapshot
}

#[cfg(test)]
mod tests {
    use super::*;

    fn email(s: &str) -> Email {
        Email::parse(s).unwrap()
    }

    #[test]
    fn test_groups_duplicates_in_order() {
        let snapshot = normalize_contacts(vec![
            Contact::new("u1", "dup@x.com", true),
            Contact::new("u2", "other@x.com", false),
            Contact::new("u3", " DUP@x.com", false),
        ]);

        let group = &snapshot.records[&email("dup@x.com")];
        assert_eq!(group.len(), 2);
        assert_eq!(group[0].unique_id.as_str(), "u1");
        assert!(group[0].unsubscribed);
        assert_eq!(group[1].unique_id.as_str(), "u3");
        assert!(!group[1].unsubscribed);
        assert!(group.iter().all(|r| !r.cleaned));
    }

    #[test]
    fn test_filters_deleted_and_unusable_emails() {
        let mut deleted = Contact::new("u1", "gone@x.com", false);
        deleted.is_deleted = true;

        let snapshot = normalize_contacts(vec![
            deleted,
            Contact::new("u2", "", false),
            Contact::new("u3", "no-at-sign", false),
            Contact {
                unique_id: Some("u4".into()),
                email: None,
                is_deleted: false,
                do_not_mail: Some(false),
            },
        ]);

        assert!(snapshot.records.is_empty());
        assert!(snapshot.rejected.is_empty());
    }

    #[test]
    fn test_missing_required_fields() {
        let snapshot = normalize_contacts(vec![
            Contact {
                unique_id: None,
                email: Some("a@x.com".into()),
                is_deleted: false,
                do_not_mail: Some(true),
            },
            Contact {
                unique_id: Some("u2".into()),
                email: Some("b@x.com".into()),
                is_deleted: false,
                do_not_mail: None,
            },
            Contact::new("u3", "c@x.com", false),
        ]);

        assert_eq!(snapshot.records.len(), 1);
        assert_eq!(snapshot.rejected.len(), 2);
        let reasons: Vec<String> = snapshot.rejected.iter().map(|e| e.to_string()).collect();
        assert!(reasons[0].contains("missing uniqueId"));
        assert!(reasons[1].contains("missing doNotMail"));
    }
}
