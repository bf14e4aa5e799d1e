//! In-memory mailing list
//!
//! Behaves like a Mailchimp audience closely enough to drive the sync engine
//! in tests: a standard delete archives the member, a permanent delete
//! removes it, and writes can be made to fail per email.

use anyhow::{Result, bail};
use std::collections::HashSet;
use std::sync::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::MailingList;
use super::api::{ListMember, MemberStatus};
use crate::models::{ContactId, Email};

/// In-memory implementation of [`MailingList`]
#[derive(Default)]
pub struct InMemoryMailingList {
    members: RwLock<Vec<ListMember>>,
    failing: RwLock<HashSet<String>>,
    unavailable: RwLock<bool>,
    next_id: AtomicUsize,
    writes: AtomicUsize,
}

impl InMemoryMailingList {
    /// Create a new empty list
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a member directly, bypassing the write counter
    pub fn insert(&self, id: &str, email: &str, status: MemberStatus) {
        self.members
            .write()
            .unwrap()
            .push(ListMember::new(id, email, status));
    }

    /// Make every write touching `email` fail
    pub fn fail_writes_for(&self, email: &str) {
        self.failing.write().unwrap().insert(email.to_lowercase());
    }

    /// Make listing fail
    pub fn set_unavailable(&self, unavailable: bool) {
        *self.unavailable.write().unwrap() = unavailable;
    }

    /// Current member for an email, if any
    pub fn member(&self, email: &str) -> Option<ListMember> {
        self.members
            .read()
            .unwrap()
            .iter()
            .find(|m| m.email_address.as_deref() == Some(email))
            .cloned()
    }

    /// Current status for an email, if it is a member
    pub fn status(&self, email: &str) -> Option<MemberStatus> {
        self.member(email).and_then(|m| m.status)
    }

    /// Number of successful writes so far
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn check_writable(&self, email: &str) -> Result<()> {
        if self.failing.read().unwrap().contains(&email.to_lowercase()) {
            bail!("mailing list rejected write for {email}");
        }
        Ok(())
    }

    /// Apply `f` to the member with `id`, failing if it doesn't exist
    fn modify(&self, id: &ContactId, f: impl FnOnce(&mut Vec<ListMember>, usize)) -> Result<()> {
        let mut members = self.members.write().unwrap();
        let Some(index) = members.iter().position(|m| m.id.as_deref() == Some(id.as_str())) else {
            bail!("no member with id {id}");
        };
        let email = members[index].email_address.clone().unwrap_or_default();
        self.check_writable(&email)?;
        f(&mut *members, index);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl MailingList for InMemoryMailingList {
    fn list_members(&self) -> Result<Vec<ListMember>> {
        if *self.unavailable.read().unwrap() {
            bail!("mailing list unavailable");
        }
        Ok(self.members.read().unwrap().clone())
    }

    fn create_member(&self, email: &Email, unsubscribed: bool) -> Result<ContactId> {
        self.check_writable(email.as_str())?;

        let mut members = self.members.write().unwrap();
        let status = MemberStatus::from_unsubscribed(unsubscribed);

        // Re-adding an archived member revives the same record
        if let Some(existing) = members
            .iter_mut()
            .find(|m| m.email_address.as_deref() == Some(email.as_str()))
        {
            if existing.status != Some(MemberStatus::Archived) {
                bail!("{email} is already a list member");
            }
            existing.status = Some(status);
            self.writes.fetch_add(1, Ordering::SeqCst);
            return Ok(ContactId::from(existing.id.clone().unwrap_or_default()));
        }

        let id = format!("mc-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        members.push(ListMember::new(&id, email.as_str(), status));
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(ContactId::new(id))
    }

    fn update_member_status(&self, id: &ContactId, unsubscribed: bool) -> Result<()> {
        self.modify(id, |members, i| {
            members[i].status = Some(MemberStatus::from_unsubscribed(unsubscribed));
        })
    }

    fn delete_member(&self, id: &ContactId) -> Result<()> {
        self.modify(id, |members, i| {
            members[i].status = Some(MemberStatus::Archived);
        })
    }

    fn delete_member_permanently(&self, id: &ContactId) -> Result<()> {
        self.modify(id, |members, i| {
            members.remove(i);
        })
    }
}
