//! Duplicate repair within the contact directory
//!
//! The CRM allows several contacts per email. When they disagree on the
//! opt-out flag, the copies still holding the ledger's last known value are
//! the stale ones: whichever copy differs is the change a user made since
//! the previous run, and it is spread to the others.

use log::debug;

use super::Snapshot;
use super::command::{Command, SourceWrite};
use crate::models::{Action, ContactRecord};

/// True when a duplicate group does not agree on `unsubscribed`
pub fn is_conflicted(group: &[ContactRecord]) -> bool {
    group
        .split_first()
        .is_some_and(|(first, rest)| rest.iter().any(|r| r.unsubscribed != first.unsubscribed))
}

/// Plan one repair command per conflicted email
///
/// Emails the ledger has never seen are treated as last known
/// unsubscribed, so the repair lands on subscribed.
pub fn plan_repairs(snapshot: &Snapshot) -> Vec<Command> {
    snapshot
        .directory
        .iter()
        .filter(|(_, group)| is_conflicted(group))
        .map(|(email, group)| {
            let last_known = snapshot.ledger.get(email).copied().unwrap_or(true);
            debug!(
                "Directory duplicates disagree for {} (last known unsubscribed={})",
                email, last_known
            );

            let stale = group
                .iter()
                .filter(|r| r.unsubscribed == last_known)
                .map(|r| SourceWrite::UpdateContact {
                    id: r.unique_id.clone(),
                    unsubscribed: !last_known,
                });

            Command::new(email.clone(), Action::RepairDuplicate).writes(stale)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ContactId, Email};

    fn email(s: &str) -> Email {
        Email::parse(s).unwrap()
    }

    fn group(email: &Email, flags: &[bool]) -> Vec<ContactRecord> {
        flags
            .iter()
            .enumerate()
            .map(|(i, &flag)| ContactRecord::new(email.clone(), format!("c{i}"), flag))
            .collect()
    }

    #[test]
    fn test_is_conflicted() {
        let e = email("a@x.com");
        assert!(!is_conflicted(&[]));
        assert!(!is_conflicted(&group(&e, &[true])));
        assert!(!is_conflicted(&group(&e, &[false, false])));
        assert!(is_conflicted(&group(&e, &[true, false, true])));
    }

    #[test]
    fn test_flips_records_matching_ledger() {
        let e = email("a@x.com");
        let mut snapshot = Snapshot::default();
        snapshot.directory.insert(e.clone(), group(&e, &[true, false]));
        snapshot.ledger.insert(e.clone(), true);

        let commands = plan_repairs(&snapshot);
        assert_eq!(commands.len(), 1);
        assert_eq!(
            commands[0].source_writes,
            vec![SourceWrite::UpdateContact {
                id: ContactId::new("c0"),
                unsubscribed: false,
            }]
        );
        assert!(commands[0].ledger_write.is_none());
    }

    #[test]
    fn test_unknown_email_defaults_to_unsubscribed() {
        let e = email("new@x.com");
        let mut snapshot = Snapshot::default();
        snapshot.directory.insert(e.clone(), group(&e, &[false, true, true]));

        let commands = plan_repairs(&snapshot);
        let targets: Vec<_> = commands[0]
            .source_writes
            .iter()
            .map(|w| match w {
                SourceWrite::UpdateContact { id, unsubscribed } => (id.as_str().to_string(), *unsubscribed),
                other => panic!("unexpected write {other:?}"),
            })
            .collect();
        assert_eq!(targets, vec![("c1".to_string(), false), ("c2".to_string(), false)]);
    }

    #[test]
    fn test_agreeing_groups_are_left_alone() {
        let e = email("a@x.com");
        let mut snapshot = Snapshot::default();
        snapshot.directory.insert(e.clone(), group(&e, &[true, true]));
        snapshot.ledger.insert(e, false);

        assert!(plan_repairs(&snapshot).is_empty());
    }
}
