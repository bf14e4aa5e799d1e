//! In-memory contact directory for tests and local runs

use anyhow::{Result, bail};
use std::collections::HashSet;
use std::sync::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::ContactDirectory;
use super::api::Contact;
use crate::models::{ContactId, Email};

/// In-memory implementation of [`ContactDirectory`]
///
/// Allows duplicate emails like the real CRM. Writes can be made to fail
/// per email or per contact id.
#[derive(Default)]
pub struct InMemoryContactDirectory {
    contacts: RwLock<Vec<Contact>>,
    failing: RwLock<HashSet<String>>,
    unavailable: RwLock<bool>,
    next_id: AtomicUsize,
    writes: AtomicUsize,
}

impl InMemoryContactDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a contact directly, bypassing the write counter
    pub fn insert(&self, id: &str, email: &str, do_not_mail: bool) {
        self.contacts
            .write()
            .unwrap()
            .push(Contact::new(id, email, do_not_mail));
    }

    /// Add an arbitrary raw contact
    pub fn insert_raw(&self, contact: Contact) {
        self.contacts.write().unwrap().push(contact);
    }

    /// Make every write touching `key` (an email or a contact id) fail
    pub fn fail_writes_for(&self, key: &str) {
        self.failing.write().unwrap().insert(key.to_lowercase());
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        *self.unavailable.write().unwrap() = unavailable;
    }

    /// All live contacts sharing an email, in insertion order
    pub fn contacts_for(&self, email: &str) -> Vec<Contact> {
        self.contacts
            .read()
            .unwrap()
            .iter()
            .filter(|c| !c.is_deleted && c.email.as_deref() == Some(email))
            .cloned()
            .collect()
    }

    /// Do-not-mail flags of every live contact for an email
    pub fn flags_for(&self, email: &str) -> Vec<bool> {
        self.contacts_for(email)
            .iter()
            .filter_map(|c| c.do_not_mail)
            .collect()
    }

    /// Soft-delete every contact for an email, as a CRM user would
    pub fn mark_deleted(&self, email: &str) {
        for contact in self.contacts.write().unwrap().iter_mut() {
            if contact.email.as_deref() == Some(email) {
                contact.is_deleted = true;
            }
        }
    }

    /// Number of successful writes so far
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn is_failing(&self, key: &str) -> bool {
        self.failing.read().unwrap().contains(&key.to_lowercase())
    }
}

impl ContactDirectory for InMemoryContactDirectory {
    fn list_contacts(&self) -> Result<Vec<Contact>> {
        if *self.unavailable.read().unwrap() {
            bail!("contact directory unavailable");
        }
        Ok(self.contacts.read().unwrap().clone())
    }

    fn create_contact(&self, email: &Email, unsubscribed: bool) -> Result<ContactId> {
        if self.is_failing(email.as_str()) {
            bail!("contact directory rejected create for {email}");
        }

        let id = format!("crm-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        self.contacts
            .write()
            .unwrap()
            .push(Contact::new(&id, email.as_str(), unsubscribed));
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(ContactId::new(id))
    }

    fn update_contact_status(&self, id: &ContactId, unsubscribed: bool) -> Result<()> {
        let mut contacts = self.contacts.write().unwrap();
        let Some(contact) = contacts
            .iter_mut()
            .find(|c| c.unique_id.as_deref() == Some(id.as_str()))
        else {
            bail!("no contact with id {id}");
        };

        let email = contact.email.clone().unwrap_or_default();
        if self.is_failing(id.as_str()) || self.is_failing(&email) {
            bail!("contact directory rejected update for {id}");
        }

        contact.do_not_mail = Some(unsubscribed);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
