//! Mailchimp integration (Source A, the mailing list)
//!
//! This module provides:
//! - The [`MailingList`] interface the sync engine consumes
//! - A Mailchimp Marketing API client
//! - Listing normalization to canonical contact records
//! - An in-memory list for tests and local runs

mod client;
mod memory;
mod normalize;

use anyhow::Result;

use crate::models::{ContactId, Email};

pub use client::MailchimpClient;
pub use memory::InMemoryMailingList;
pub use normalize::{MailingListSnapshot, normalize_members};

/// Operations the engine needs from the mailing list
///
/// Every mutating call either applies fully or returns an error.
pub trait MailingList: Send + Sync {
    /// List every member of the audience, in any status
    fn list_members(&self) -> Result<Vec<api::ListMember>>;

    /// Add a member, returning the id the list assigned
    fn create_member(&self, email: &Email, unsubscribed: bool) -> Result<ContactId>;

    /// Switch a member between subscribed and unsubscribed
    fn update_member_status(&self, id: &ContactId, unsubscribed: bool) -> Result<()>;

    /// Archive a member
    fn delete_member(&self, id: &ContactId) -> Result<()>;

    /// Erase a member and its history; required for cleaned members
    fn delete_member_permanently(&self, id: &ContactId) -> Result<()>;
}

/// Mailchimp API response types
pub mod api {
    use serde::{Deserialize, Serialize};

    /// Page of members from `GET /lists/{list_id}/members`
    #[derive(Debug, Deserialize)]
    pub struct ListMembersResponse {
        #[serde(default)]
        pub members: Vec<ListMember>,
        pub total_items: u32,
    }

    /// A list member as returned by the API
    ///
    /// Fields are optional so a single bad record can be rejected without
    /// failing the whole page.
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct ListMember {
        pub id: Option<String>,
        pub email_address: Option<String>,
        pub status: Option<MemberStatus>,
    }

    impl ListMember {
        pub fn new(id: &str, email_address: &str, status: MemberStatus) -> Self {
            Self {
                id: Some(id.to_string()),
                email_address: Some(email_address.to_string()),
                status: Some(status),
            }
        }
    }

    /// Member status on the audience
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum MemberStatus {
        Subscribed,
        Unsubscribed,
        Cleaned,
        Pending,
        Transactional,
        Archived,
        #[serde(other)]
        Unknown,
    }

    impl MemberStatus {
        /// Status to write for a given opt-out flag
        pub fn from_unsubscribed(unsubscribed: bool) -> Self {
            if unsubscribed {
                MemberStatus::Unsubscribed
            } else {
                MemberStatus::Subscribed
            }
        }
    }

    /// Body for creating a member
    #[derive(Debug, Serialize)]
    pub struct CreateMember<'a> {
        pub email_address: &'a str,
        pub status: MemberStatus,
    }

    /// Body for changing a member's status
    #[derive(Debug, Serialize)]
    pub struct UpdateMember {
        pub status: MemberStatus,
    }
}

#[cfg(test)]
mod tests {
    use super::api::*;

    #[test]
    fn test_parse_members_page() {
        let json = r#"{
            "members": [
                {"id": "a1", "email_address": "a@x.com", "status": "subscribed"},
                {"id": "b2", "email_address": "b@x.com", "status": "cleaned"},
                {"id": "c3", "email_address": "c@x.com", "status": "something-new"}
            ],
            "total_items": 3
        }"#;

        let page: ListMembersResponse = serde_json::from_str(json).unwrap();
        assert_eq!(page.total_items, 3);
        assert_eq!(page.members[0].status, Some(MemberStatus::Subscribed));
        assert_eq!(page.members[1].status, Some(MemberStatus::Cleaned));
        assert_eq!(page.members[2].status, Some(MemberStatus::Unknown));
    }

    #[test]
    fn test_status_for_write() {
        assert_eq!(MemberStatus::from_unsubscribed(true), MemberStatus::Unsubscribed);
        assert_eq!(MemberStatus::from_unsubscribed(false), MemberStatus::Subscribed);
        let body = serde_json::to_string(&UpdateMember {
            status: MemberStatus::Unsubscribed,
        })
        .unwrap();
        assert_eq!(body, r#"{"status":"unsubscribed"}"#);
    }
}
