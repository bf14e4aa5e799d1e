//! Mercury CRM integration (Source B, the contact directory)
//!
//! Mercury permits several contacts to share one email address, so the
//! normalized view groups contacts per email instead of keying them uniquely.

mod client;
mod memory;
mod normalize;

use anyhow::Result;

use crate::models::{ContactId, Email};

pub use client::MercuryClient;
pub use memory::InMemoryContactDirectory;
pub use normalize::{DirectorySnapshot, normalize_contacts};

/// Operations the engine needs from the contact directory
///
/// Every mutating call either applies fully or returns an error.
pub trait ContactDirectory: Send + Sync {
    /// List every contact, including ones flagged as deleted
    fn list_contacts(&self) -> Result<Vec<api::Contact>>;

    /// Create a contact carrying only an email address and its opt-out flag
    fn create_contact(&self, email: &Email, unsubscribed: bool) -> Result<ContactId>;

    /// Set a contact's do-not-mail flag
    fn update_contact_status(&self, id: &ContactId, unsubscribed: bool) -> Result<()>;
}

/// Mercury API types
pub mod api {
    use serde::{Deserialize, Serialize};

    /// A contact as returned by `GET /contacts`
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Contact {
        pub unique_id: Option<String>,
        pub email: Option<String>,
        #[serde(default)]
        pub is_deleted: bool,
        pub do_not_mail: Option<bool>,
    }

    impl Contact {
        pub fn new(unique_id: &str, email: &str, do_not_mail: bool) -> Self {
            Self {
                unique_id: Some(unique_id.to_string()),
                email: Some(email.to_string()),
                is_deleted: false,
                do_not_mail: Some(do_not_mail),
            }
        }
    }

    /// Body for `POST /contacts`
    ///
    /// Mercury requires a name, so a blank one is sent.
    #[derive(Debug, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct CreateContact<'a> {
        pub first_name: &'a str,
        pub last_name: &'a str,
        pub contact_methods: Vec<ContactMethod<'a>>,
        pub do_not_mail: bool,
    }

    impl<'a> CreateContact<'a> {
        pub fn for_email(email: &'a str, do_not_mail: bool) -> Self {
            Self {
                first_name: " ",
                last_name: " ",
                contact_methods: vec![ContactMethod {
                    contact_method: "Email 1",
                    content: email,
                }],
                do_not_mail,
            }
        }
    }

    #[derive(Debug, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ContactMethod<'a> {
        pub contact_method: &'a str,
        pub content: &'a str,
    }

    /// Body for `PATCH /contacts/{id}`
    #[derive(Debug, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct UpdateContact {
        pub do_not_mail: bool,
    }

    /// Response to a create
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct CreatedContact {
        pub unique_id: String,
    }
}

#[cfg(test)]
mod tests {
    use super::api::*;

    #[test]
    fn test_parse_contacts() {
        let json = r#"[
            {"uniqueId": "u1", "email": "a@x.com", "isDeleted": false, "doNotMail": true},
            {"uniqueId": "u2", "email": "b@x.com", "doNotMail": false},
            {"uniqueId": "u3", "isDeleted": true}
        ]"#;

        let contacts: Vec<Contact> = serde_json::from_str(json).unwrap();
        assert_eq!(contacts.len(), 3);
        assert_eq!(contacts[0].do_not_mail, Some(true));
        assert!(!contacts[1].is_deleted);
        assert!(contacts[2].email.is_none());
    }

    #[test]
    fn test_create_body_shape() {
        let body = serde_json::to_value(CreateContact::for_email("a@x.com", true)).unwrap();
        assert_eq!(body["firstName"], " ");
        assert_eq!(body["contactMethods"][0]["contactMethod"], "Email 1");
        assert_eq!(body["contactMethods"][0]["content"], "a@x.com");
        assert_eq!(body["doNotMail"], true);
    }
}
