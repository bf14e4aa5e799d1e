//! Three-way set reconciliation
//!
//! Membership is compared across the mailing list (A), the contact
//! directory (B) and the ledger (L) in six cases. Each case takes the
//! working sets left by the previous one and returns the updated sets plus
//! the commands to issue, so later cases see what earlier ones decided
//! without any shared mutable state.
//!
//! | # | condition        | effect                                            |
//! |---|------------------|---------------------------------------------------|
//! | 1 | A - B - L        | create in B, insert ledger                        |
//! | 2 | B - A - L        | create in A, insert ledger                        |
//! | 3 | (A ∩ L) - B      | delete from A, delete ledger                      |
//! | 4 | (B ∩ L) - A      | unsubscribe in B, ledger = true                   |
//! | 5 | L - (A ∪ B)      | delete ledger                                     |
//! | 6 | (A ∪ B) - L      | on disagreement unsubscribe both, ledger = A OR B |

use std::collections::BTreeSet;

use log::debug;

use super::Snapshot;
use super::command::{Command, LedgerWrite, SourceWrite};
use crate::models::{Action, ContactRecord, Email};

/// Email keys of each store as seen by the current case
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkingSets {
    pub list: BTreeSet<Email>,
    pub directory: BTreeSet<Email>,
    pub ledger: BTreeSet<Email>,
}

impl WorkingSets {
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        Self {
            list: snapshot.list.keys().cloned().collect(),
            directory: snapshot.directory.keys().cloned().collect(),
            ledger: snapshot.ledger.keys().cloned().collect(),
        }
    }
}

/// A reconciliation case
pub type Case = fn(WorkingSets, &Snapshot) -> (WorkingSets, Vec<Command>);

/// The six cases, in the order they must run
pub const CASES: [(&str, Case); 6] = [
    ("new on mailing list", new_from_list),
    ("new in directory", new_from_directory),
    ("gone from directory", gone_from_directory),
    ("gone from mailing list", gone_from_list),
    ("orphaned ledger rows", orphaned),
    ("first seen in both", first_seen),
];

/// Opt-out value of the mailing list record as compared with the directory
///
/// A cleaned member can't be resubscribed or unsubscribed, so its own status
/// is never treated as a disagreement: it takes the directory's value.
pub(crate) fn effective_list_status(member: &ContactRecord, directory_status: bool) -> bool {
    if member.cleaned {
        directory_status
    } else {
        member.unsubscribed
    }
}

/// Case 1: only on the mailing list. Create the contact in the directory
/// with the same opt-out value.
pub fn new_from_list(mut sets: WorkingSets, snapshot: &Snapshot) -> (WorkingSets, Vec<Command>) {
    let emails: Vec<Email> = sets
        .list
        .iter()
        .filter(|e| !sets.directory.contains(*e) && !sets.ledger.contains(*e))
        .cloned()
        .collect();

    let mut commands = Vec::new();
    for email in emails {
        if let Some(member) = snapshot.list.get(&email) {
            commands.push(
                Command::new(email.clone(), Action::NewFromMailingList)
                    .write(SourceWrite::CreateContact {
                        unsubscribed: member.unsubscribed,
                    })
                    .ledger(LedgerWrite::Insert(member.unsubscribed)),
            );
        }
        sets.directory.insert(email.clone());
        sets.ledger.insert(email);
    }

    (sets, commands)
}

/// Case 2: only in the directory. Create the list member from the first
/// contact's opt-out value.
pub fn new_from_directory(
    mut sets: WorkingSets,
    snapshot: &Snapshot,
) -> (WorkingSets, Vec<Command>) {
    let emails: Vec<Email> = sets
        .directory
        .iter()
        .filter(|e| !sets.list.contains(*e) && !sets.ledger.contains(*e))
        .cloned()
        .collect();

    let mut commands = Vec::new();
    for email in emails {
        if let Some(unsubscribed) = snapshot.directory_status(&email) {
            commands.push(
                Command::new(email.clone(), Action::NewFromDirectory)
                    .write(SourceWrite::CreateMember { unsubscribed })
                    .ledger(LedgerWrite::Insert(unsubscribed)),
            );
        }
        sets.list.insert(email.clone());
        sets.ledger.insert(email);
    }

    (sets, commands)
}

/// Case 3: known to the ledger and still on the list, but deleted from the
/// directory. Remove the member; cleaned members need a permanent delete.
pub fn gone_from_directory(
    mut sets: WorkingSets,
    snapshot: &Snapshot,
) -> (WorkingSets, Vec<Command>) {
    let emails: Vec<Email> = sets
        .list
        .intersection(&sets.ledger)
        .filter(|e| !sets.directory.contains(*e))
        .cloned()
        .collect();

    let mut commands = Vec::new();
    for email in emails {
        let mut command = Command::new(email.clone(), Action::RemovedFromDirectory);
        // A member removed by hand since the listing only needs the ledger row dropped
        if let Some(member) = snapshot.list.get(&email) {
            command = command.write(SourceWrite::DeleteMember {
                id: member.unique_id.clone(),
                permanent: member.cleaned,
            });
        }
        commands.push(command.ledger(LedgerWrite::Delete));

        sets.list.remove(&email);
        sets.ledger.remove(&email);
    }

    (sets, commands)
}

/// Case 4: known to the ledger and still in the directory, but gone from
/// the list. Leaving the list counts as opting out.
///
/// Nothing is issued when the directory and ledger already say
/// unsubscribed, which is the steady state after the first time.
pub fn gone_from_list(mut sets: WorkingSets, snapshot: &Snapshot) -> (WorkingSets, Vec<Command>) {
    let emails: Vec<Email> = sets
        .directory
        .intersection(&sets.ledger)
        .filter(|e| !sets.list.contains(*e))
        .cloned()
        .collect();

    let mut commands = Vec::new();
    for email in emails {
        let stale = snapshot
            .directory
            .get(&email)
            .into_iter()
            .flatten()
            .filter(|r| !r.unsubscribed)
            .map(|r| SourceWrite::UpdateContact {
                id: r.unique_id.clone(),
                unsubscribed: true,
            });

        let mut command = Command::new(email.clone(), Action::RemovedFromMailingList).writes(stale);
        if snapshot.ledger.get(&email) != Some(&true) {
            command = command.ledger(LedgerWrite::Update(true));
        }

        if command.is_empty() {
            debug!("{} already unsubscribed after leaving the list", email);
        } else {
            commands.push(command);
        }

        sets.directory.remove(&email);
        sets.ledger.remove(&email);
    }

    (sets, commands)
}

/// Case 5: ledger rows with no record in either source.
pub fn orphaned(mut sets: WorkingSets, _snapshot: &Snapshot) -> (WorkingSets, Vec<Command>) {
    let emails: Vec<Email> = sets
        .ledger
        .iter()
        .filter(|e| !sets.list.contains(*e) && !sets.directory.contains(*e))
        .cloned()
        .collect();

    let mut commands = Vec::new();
    for email in emails {
        sets.ledger.remove(&email);
        commands.push(Command::new(email, Action::Orphaned).ledger(LedgerWrite::Delete));
    }

    (sets, commands)
}

/// Case 6: present in a source but not in the ledger after cases 1-5,
/// which leaves exactly the emails both sources already had.
///
/// If the sources disagree, both sides end up unsubscribed. The ledger
/// records the opt-out whichever way the pushes went.
pub fn first_seen(mut sets: WorkingSets, snapshot: &Snapshot) -> (WorkingSets, Vec<Command>) {
    let emails: Vec<Email> = sets
        .list
        .union(&sets.directory)
        .filter(|e| !sets.ledger.contains(*e))
        .cloned()
        .collect();

    let mut commands = Vec::new();
    for email in emails {
        sets.ledger.insert(email.clone());

        let (Some(member), Some(group)) = (snapshot.list.get(&email), snapshot.directory.get(&email))
        else {
            debug!("{} is new to the ledger but missing from a source", email);
            continue;
        };
        let Some(first) = group.first() else {
            continue;
        };

        let directory_status = first.unsubscribed;
        let list_status = effective_list_status(member, directory_status);
        let mut command = Command::new(email.clone(), Action::FirstSeen);

        if list_status != directory_status {
            if !member.unsubscribed {
                command = command.write(SourceWrite::UpdateMember {
                    id: member.unique_id.clone(),
                    unsubscribed: true,
                });
            }
            command = command.writes(group.iter().filter(|r| !r.unsubscribed).map(|r| {
                SourceWrite::UpdateContact {
                    id: r.unique_id.clone(),
                    unsubscribed: true,
                }
            }));
        }

        commands.push(
            command
                .ledger(LedgerWrite::Insert(list_status || directory_status))
                .ledger_always(),
        );
    }

    (sets, commands)
}

/// Run all six cases without issuing anything
///
/// Returns the commands in the order they must be applied.
pub fn plan(snapshot: &Snapshot) -> Vec<Command> {
    let mut sets = WorkingSets::from_snapshot(snapshot);
    let mut all = Vec::new();
    for (_, case) in CASES {
        let (next, commands) = case(sets, snapshot);
        sets = next;
        all.extend(commands);
    }
    all
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ContactId;

    fn email(s: &str) -> Email {
        Email::parse(s).unwrap()
    }

    fn member(e: &str, id: &str, unsubscribed: bool) -> (Email, ContactRecord) {
        (email(e), ContactRecord::new(email(e), id, unsubscribed))
    }

    fn contacts(e: &str, flags: &[bool]) -> (Email, Vec<ContactRecord>) {
        let group = flags
            .iter()
            .enumerate()
            .map(|(i, &f)| ContactRecord::new(email(e), format!("{e}#{i}"), f))
            .collect();
        (email(e), group)
    }

    #[test]
    fn test_case_one_creates_in_directory() {
        let mut snapshot = Snapshot::default();
        snapshot.list.extend([member("a@x.com", "m1", false)]);

        let (sets, commands) = new_from_list(WorkingSets::from_snapshot(&snapshot), &snapshot);

        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].action, Action::NewFromMailingList);
        assert_eq!(
            commands[0].source_writes,
            vec![SourceWrite::CreateContact { unsubscribed: false }]
        );
        assert_eq!(commands[0].ledger_write, Some(LedgerWrite::Insert(false)));
        assert!(sets.directory.contains(&email("a@x.com")));
        assert!(sets.ledger.contains(&email("a@x.com")));
    }

    #[test]
    fn test_case_two_seeds_from_first_contact() {
        let mut snapshot = Snapshot::default();
        snapshot.directory.extend([contacts("b@x.com", &[true, false])]);

        let (sets, commands) =
            new_from_directory(WorkingSets::from_snapshot(&snapshot), &snapshot);

        assert_eq!(
            commands[0].source_writes,
            vec![SourceWrite::CreateMember { unsubscribed: true }]
        );
        assert_eq!(commands[0].ledger_write, Some(LedgerWrite::Insert(true)));
        assert!(sets.list.contains(&email("b@x.com")));
    }

    #[test]
    fn test_case_three_deletes_cleaned_permanently() {
        let mut snapshot = Snapshot::default();
        let (e, record) = member("c@x.com", "m3", true);
        snapshot.list.insert(e.clone(), record.cleaned());
        snapshot.list.extend([member("d@x.com", "m4", false)]);
        snapshot.ledger.insert(e.clone(), true);
        snapshot.ledger.insert(email("d@x.com"), false);

        let (sets, commands) =
            gone_from_directory(WorkingSets::from_snapshot(&snapshot), &snapshot);

        assert_eq!(commands.len(), 2);
        assert_eq!(
            commands[0].source_writes,
            vec![SourceWrite::DeleteMember {
                id: ContactId::new("m3"),
                permanent: true
            }]
        );
        assert_eq!(
            commands[1].source_writes,
            vec![SourceWrite::DeleteMember {
                id: ContactId::new("m4"),
                permanent: false
            }]
        );
        assert!(commands.iter().all(|c| c.ledger_write == Some(LedgerWrite::Delete)));
        assert!(sets.list.is_empty());
        assert!(sets.ledger.is_empty());
    }

    #[test]
    fn test_case_four_unsubscribes_remaining_contacts() {
        let mut snapshot = Snapshot::default();
        snapshot.directory.extend([contacts("e@x.com", &[false, true])]);
        snapshot.ledger.insert(email("e@x.com"), false);

        let (sets, commands) = gone_from_list(WorkingSets::from_snapshot(&snapshot), &snapshot);

        assert_eq!(
            commands[0].source_writes,
            vec![SourceWrite::UpdateContact {
                id: ContactId::new("e@x.com#0"),
                unsubscribed: true
            }]
        );
        assert_eq!(commands[0].ledger_write, Some(LedgerWrite::Update(true)));
        assert!(sets.directory.is_empty());
        assert!(sets.ledger.is_empty());
    }

    #[test]
    fn test_case_four_is_quiet_once_settled() {
        let mut snapshot = Snapshot::default();
        snapshot.directory.extend([contacts("e@x.com", &[true, true])]);
        snapshot.ledger.insert(email("e@x.com"), true);

        let (_, commands) = gone_from_list(WorkingSets::from_snapshot(&snapshot), &snapshot);
        assert!(commands.is_empty());
    }

    #[test]
    fn test_case_five_only_touches_orphans() {
        let mut snapshot = Snapshot::default();
        snapshot.list.extend([member("kept@x.com", "m1", false)]);
        snapshot.ledger.insert(email("kept@x.com"), false);
        snapshot.ledger.insert(email("orphan@x.com"), true);

        let (sets, commands) = orphaned(WorkingSets::from_snapshot(&snapshot), &snapshot);

        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].email, email("orphan@x.com"));
        assert!(commands[0].source_writes.is_empty());
        assert_eq!(sets.ledger.len(), 1);
    }

    #[test]
    fn test_case_six_disagreement_forces_opt_out() {
        let mut snapshot = Snapshot::default();
        snapshot.list.extend([member("f@x.com", "m6", false)]);
        snapshot.directory.extend([contacts("f@x.com", &[true, false])]);

        let (sets, commands) = first_seen(WorkingSets::from_snapshot(&snapshot), &snapshot);

        let command = &commands[0];
        assert_eq!(command.action, Action::FirstSeen);
        assert_eq!(
            command.source_writes,
            vec![
                SourceWrite::UpdateMember {
                    id: ContactId::new("m6"),
                    unsubscribed: true
                },
                SourceWrite::UpdateContact {
                    id: ContactId::new("f@x.com#1"),
                    unsubscribed: true
                },
            ]
        );
        assert_eq!(command.ledger_write, Some(LedgerWrite::Insert(true)));
        assert_eq!(command.gate, super::super::command::LedgerGate::Always);
        assert!(sets.ledger.contains(&email("f@x.com")));
    }

    #[test]
    fn test_case_six_cleaned_member_is_not_a_disagreement() {
        let mut snapshot = Snapshot::default();
        let (e, record) = member("g@x.com", "m7", true);
        snapshot.list.insert(e, record.cleaned());
        snapshot.directory.extend([contacts("g@x.com", &[false])]);

        let (_, commands) = first_seen(WorkingSets::from_snapshot(&snapshot), &snapshot);

        assert!(commands[0].source_writes.is_empty());
        assert_eq!(commands[0].ledger_write, Some(LedgerWrite::Insert(false)));
    }

    #[test]
    fn test_plan_cases_see_earlier_effects() {
        // Created in case 1 must not be treated as first seen in case 6
        let mut snapshot = Snapshot::default();
        snapshot.list.extend([member("a@x.com", "m1", true)]);
        snapshot.directory.extend([contacts("b@x.com", &[false])]);

        let commands = plan(&snapshot);
        let actions: Vec<Action> = commands.iter().map(|c| c.action).collect();
        assert_eq!(actions, vec![Action::NewFromMailingList, Action::NewFromDirectory]);
    }

    #[test]
    fn test_plan_settled_state_is_empty() {
        let mut snapshot = Snapshot::default();
        snapshot.list.extend([member("a@x.com", "m1", true)]);
        snapshot.directory.extend([contacts("a@x.com", &[true, true])]);
        snapshot.ledger.insert(email("a@x.com"), true);

        assert!(plan(&snapshot).is_empty());
    }
}
