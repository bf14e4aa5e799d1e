//! Mailchimp listing normalization
//!
//! Converts raw list members to one canonical record per email.

use std::collections::BTreeMap;

use log::warn;

use super::api::{ListMember, MemberStatus};
use crate::error::SyncError;
use crate::models::{ContactRecord, Email, Store};

/// Canonical view of the mailing list
#[derive(Debug, Default, Clone)]
pub struct MailingListSnapshot {
    pub records: BTreeMap<Email, ContactRecord>,
    /// Members dropped because a required field was missing
    pub rejected: Vec<SyncError>,
}

/// Normalize raw members
///
/// Pending and archived members are skipped: neither is on the list yet (or
/// any more). Members without a usable email are skipped silently since they
/// cannot be joined with anything.
pub fn normalize_members(members: Vec<ListMember>) -> MailingListSnapshot {
    let mut snapshot = MailingListSnapshot::default();

    for (position, member) in members.into_iter().enumerate() {
        let Some(email) = member.email_address.as_deref().and_then(Email::parse) else {
            continue;
        };

        let reject = |reason: &str| SyncError::MalformedSnapshot {
            store: Store::MailingList,
            record: format!("{email} (#{position})"),
            reason: reason.to_string(),
        };

        let Some(status) = member.status else {
            snapshot.rejected.push(reject("missing status"));
            continue;
        };

        let (unsubscribed, cleaned) = match status {
            MemberStatus::Pending | MemberStatus::Archived => continue,
            MemberStatus::Subscribed | MemberStatus::Transactional => (false, false),
            MemberStatus::Unsubscribed => (true, false),
            MemberStatus::Cleaned => (true, true),
            MemberStatus::Unknown => {
                snapshot.rejected.push(reject("unrecognized status"));
                continue;
            }
        };

        let Some(id) = member.id else {
            snapshot.rejected.push(reject("missing id"));
            continue;
        };

        if snapshot.records.contains_key(&email) {
            snapshot.rejected.push(reject("duplicate member for email"));
            continue;
        }

        let record = ContactRecord {
            email: email.clone(),
            unsubscribed,
            unique_id: id.into(),
            cleaned,
        };
        snapshot.records.insert(email, record);
    }

    for rejected in &snapshot.rejected {
        warn!("Dropped mailing list record: {}", rejected);
    }

    snapshot
}
