//! Mailchimp Marketing API HTTP client
//!
//! Uses synchronous HTTP (ureq) to be executor-agnostic.

use anyhow::{Context, Result, anyhow};
use base64::prelude::*;
use log::debug;
use url::Url;

use super::MailingList;
use super::api::{CreateMember, ListMember, ListMembersResponse, MemberStatus, UpdateMember};
use crate::config::MailchimpConfig;
use crate::models::{ContactId, Email};

/// Mailchimp client scoped to a single audience
pub struct MailchimpClient {
    base_url: Url,
    list_id: String,
    authorization: String,
}

impl MailchimpClient {
    /// Members requested per page (API maximum)
    const PAGE_SIZE: u32 = 1000;

    /// Create a client for the configured audience
    pub fn new(config: &MailchimpConfig) -> Result<Self> {
        let server = config.server()?;
        let base_url = Url::parse(&format!("https://{server}.api.mailchimp.com/3.0"))
            .context("Invalid Mailchimp data-center prefix")?;
        Ok(Self::with_base_url(base_url, &config.list_id, &config.api_key))
    }

    /// Create a client against an explicit API root
    pub fn with_base_url(base_url: Url, list_id: &str, api_key: &str) -> Self {
        // Mailchimp accepts any username with the API key as password
        let credentials = BASE64_STANDARD.encode(format!("anystring:{api_key}"));
        Self {
            base_url,
            list_id: list_id.to_string(),
            authorization: format!("Basic {credentials}"),
        }
    }

    /// Build `<base>/lists/<list_id>/members[/<segments>...]`
    fn members_url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("Mailchimp base URL cannot have a path"))?
            .pop_if_empty()
            .extend(["lists", self.list_id.as_str(), "members"])
            .extend(segments);
        Ok(url)
    }

    /// Fetch one page of members
    fn list_members_page(&self, offset: u32) -> Result<ListMembersResponse> {
        let mut url = self.members_url(&[])?;
        url.query_pairs_mut()
            .append_pair("count", &Self::PAGE_SIZE.to_string())
            .append_pair("offset", &offset.to_string())
            .append_pair(
                "fields",
                "members.id,members.email_address,members.status,total_items",
            );

        let mut response = ureq::get(url.as_str())
            .header("Authorization", &self.authorization)
            .call()
            .context("Failed to send list members request")?;

        response
            .body_mut()
            .read_json()
            .context("Failed to parse list members response")
    }
}

impl MailingList for MailchimpClient {
    /// List ALL members, following `offset` until `total_items` is reached
    fn list_members(&self) -> Result<Vec<ListMember>> {
        let mut members = Vec::new();
        let mut offset = 0;

        loop {
            let page = self.list_members_page(offset)?;
            let fetched = page.members.len() as u32;
            members.extend(page.members);
            offset += fetched;

            debug!("Listed {} of {} mailing list members", offset, page.total_items);

            if fetched == 0 || offset >= page.total_items {
                break;
            }
        }

        Ok(members)
    }

    fn create_member(&self, email: &Email, unsubscribed: bool) -> Result<ContactId> {
        let url = self.members_url(&[])?;
        let body = CreateMember {
            email_address: email.as_str(),
            status: MemberStatus::from_unsubscribed(unsubscribed),
        };

        let mut response = ureq::post(url.as_str())
            .header("Authorization", &self.authorization)
            .send_json(&body)
            .context("Failed to send create member request")?;

        let created: ListMember = response
            .body_mut()
            .read_json()
            .context("Failed to parse create member response")?;

        created
            .id
            .map(ContactId::from)
            .context("Create member response has no id")
    }

    fn update_member_status(&self, id: &ContactId, unsubscribed: bool) -> Result<()> {
        let url = self.members_url(&[id.as_str()])?;
        let body = UpdateMember {
            status: MemberStatus::from_unsubscribed(unsubscribed),
        };

        ureq::patch(url.as_str())
            .header("Authorization", &self.authorization)
            .send_json(&body)
            .context("Failed to send update member request")?;

        Ok(())
    }

    fn delete_member(&self, id: &ContactId) -> Result<()> {
        let url = self.members_url(&[id.as_str()])?;

        ureq::delete(url.as_str())
            .header("Authorization", &self.authorization)
            .call()
            .context("Failed to send delete member request")?;

        Ok(())
    }

    fn delete_member_permanently(&self, id: &ContactId) -> Result<()> {
        let url = self.members_url(&[id.as_str(), "actions", "delete-permanent"])?;

        ureq::post(url.as_str())
            .header("Authorization", &self.authorization)
            .send_empty()
            .context("Failed to send permanent delete request")?;

        Ok(())
    }
}
