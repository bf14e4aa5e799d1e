//! Cross-source conflict resolution
//!
//! For emails every store already knows, the ledger tells which source
//! changed since the previous run: the one that no longer matches it. That
//! source's value is pushed to the other one.

use log::debug;

use super::Snapshot;
use super::command::{Command, LedgerWrite, SourceWrite};
use super::reconcile::effective_list_status;
use crate::models::Action;

/// Plan resolutions for every email present in A, B and L whose three
/// values are not all equal
///
/// Only the first directory contact is compared; duplicates were made to
/// agree beforehand.
pub fn plan_resolutions(snapshot: &Snapshot) -> Vec<Command> {
    let mut commands = Vec::new();

    for (email, member) in &snapshot.list {
        let (Some(&ledger), Some(group)) = (snapshot.ledger.get(email), snapshot.directory.get(email))
        else {
            continue;
        };
        let Some(first) = group.first() else {
            continue;
        };

        let directory = first.unsubscribed;
        let list = effective_list_status(member, directory);
        if ledger == list && list == directory {
            continue;
        }

        debug!(
            "Status conflict for {}: ledger={} list={} directory={}",
            email, ledger, list, directory
        );

        let command = if ledger == directory && directory != list {
            // The list changed: every duplicate follows it
            let writes = group
                .iter()
                .filter(|r| r.unsubscribed != list)
                .map(|r| SourceWrite::UpdateContact {
                    id: r.unique_id.clone(),
                    unsubscribed: list,
                });
            Command::new(email.clone(), Action::MailingListChanged)
                .writes(writes)
                .ledger(LedgerWrite::Update(list))
        } else if ledger == list && list != directory {
            // The directory changed: the single member follows it
            Command::new(email.clone(), Action::DirectoryChanged)
                .write(SourceWrite::UpdateMember {
                    id: member.unique_id.clone(),
                    unsubscribed: directory,
                })
                .ledger(LedgerWrite::Update(directory))
        } else {
            // Both sources agree; only the ledger is behind
            Command::new(email.clone(), Action::LedgerRealigned).ledger(LedgerWrite::Update(list))
        };

        commands.push(command);
    }

    commands
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ContactId, ContactRecord, Email};

    fn email(s: &str) -> Email {
        Email::parse(s).unwrap()
    }

    fn snapshot(ledger: bool, list: bool, directory: &[bool]) -> Snapshot {
        let e = email("c@x.com");
        let mut snapshot = Snapshot::default();
        snapshot
            .list
            .insert(e.clone(), ContactRecord::new(e.clone(), "m1", list));
        snapshot.directory.insert(
            e.clone(),
            directory
                .iter()
                .enumerate()
                .map(|(i, &f)| ContactRecord::new(e.clone(), format!("c{i}"), f))
                .collect(),
        );
        snapshot.ledger.insert(e, ledger);
        snapshot
    }

    #[test]
    fn test_agreement_is_not_a_conflict() {
        assert!(plan_resolutions(&snapshot(true, true, &[true])).is_empty());
        assert!(plan_resolutions(&snapshot(false, false, &[false, false])).is_empty());
    }

    #[test]
    fn test_list_changed_pushes_to_every_duplicate() {
        let commands = plan_resolutions(&snapshot(false, true, &[false, false]));

        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].action, Action::MailingListChanged);
        assert_eq!(
            commands[0].source_writes,
            vec![
                SourceWrite::UpdateContact {
                    id: ContactId::new("c0"),
                    unsubscribed: true
                },
                SourceWrite::UpdateContact {
                    id: ContactId::new("c1"),
                    unsubscribed: true
                },
            ]
        );
        assert_eq!(commands[0].ledger_write, Some(LedgerWrite::Update(true)));
    }

    #[test]
    fn test_directory_changed_pushes_to_member() {
        let commands = plan_resolutions(&snapshot(true, true, &[false]));

        assert_eq!(commands[0].action, Action::DirectoryChanged);
        assert_eq!(
            commands[0].source_writes,
            vec![SourceWrite::UpdateMember {
                id: ContactId::new("m1"),
                unsubscribed: false
            }]
        );
        assert_eq!(commands[0].ledger_write, Some(LedgerWrite::Update(false)));
    }

    #[test]
    fn test_sources_agree_against_ledger() {
        let commands = plan_resolutions(&snapshot(false, true, &[true]));

        assert_eq!(commands[0].action, Action::LedgerRealigned);
        assert!(commands[0].source_writes.is_empty());
        assert_eq!(commands[0].ledger_write, Some(LedgerWrite::Update(true)));
    }

    #[test]
    fn test_cleaned_member_takes_directory_value() {
        let mut snap = snapshot(false, false, &[false]);
        let e = email("c@x.com");
        let cleaned = snap.list[&e].clone().cleaned();
        snap.list.insert(e, cleaned);

        assert!(plan_resolutions(&snap).is_empty());
    }

    #[test]
    fn test_emails_missing_from_a_store_are_skipped() {
        let mut snap = snapshot(false, true, &[false]);
        snap.ledger.clear();
        assert!(plan_resolutions(&snap).is_empty());
    }
}
