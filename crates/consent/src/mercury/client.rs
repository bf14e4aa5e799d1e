//! Mercury CRM HTTP client
//!
//! Uses synchronous HTTP (ureq) to be executor-agnostic.

use anyhow::{Context, Result, anyhow};
use url::Url;

use super::ContactDirectory;
use super::api::{Contact, CreateContact, CreatedContact, UpdateContact};
use crate::config::MercuryConfig;
use crate::models::{ContactId, Email};

/// Mercury contacts client
pub struct MercuryClient {
    base_url: Url,
    token: String,
    key: String,
}

impl MercuryClient {
    /// Create a client from configuration
    pub fn new(config: &MercuryConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url)
            .with_context(|| format!("Invalid Mercury base URL: {}", config.base_url))?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("Mercury base URL cannot have a path: {}", config.base_url);
        }

        Ok(Self {
            base_url,
            token: config.token.clone(),
            key: config.key.clone(),
        })
    }

    /// Build `<base>/contacts[/<id>]`
    fn contacts_url(&self, id: Option<&ContactId>) -> Result<Url> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| anyhow!("Mercury base URL cannot have a path"))?;
            segments.pop_if_empty().push("contacts");
            if let Some(id) = id {
                segments.push(id.as_str());
            }
        }
        Ok(url)
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

impl ContactDirectory for MercuryClient {
    fn list_contacts(&self) -> Result<Vec<Contact>> {
        let url = self.contacts_url(None)?;

        let mut response = ureq::get(url.as_str())
            .header("Authorization", &self.bearer())
            .header("x-api-key", &self.key)
            .call()
            .context("Failed to send list contacts request")?;

        response
            .body_mut()
            .read_json()
            .context("Failed to parse list contacts response")
    }

    fn create_contact(&self, email: &Email, unsubscribed: bool) -> Result<ContactId> {
        let url = self.contacts_url(None)?;

        let mut response = ureq::post(url.as_str())
            .header("Authorization", &self.bearer())
            .header("x-api-key", &self.key)
            .send_json(CreateContact::for_email(email.as_str(), unsubscribed))
            .context("Failed to send create contact request")?;

        let created: CreatedContact = response
            .body_mut()
            .read_json()
            .context("Failed to parse create contact response")?;

        Ok(ContactId::new(created.unique_id))
    }

    fn update_contact_status(&self, id: &ContactId, unsubscribed: bool) -> Result<()> {
        let url = self.contacts_url(Some(id))?;

        ureq::patch(url.as_str())
            .header("Authorization", &self.bearer())
            .header("x-api-key", &self.key)
            .send_json(UpdateContact {
                do_not_mail: unsubscribed,
            })
            .context("Failed to send update contact request")?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(base_url: &str) -> MercuryConfig {
        MercuryConfig {
            base_url: base_url.into(),
            token: "token".into(),
            key: "key".into(),
        }
    }

    #[test]
    fn test_contacts_url() {
        let client = MercuryClient::new(&config("https://crm.example.com/api/v1")).unwrap();
        assert_eq!(
            client.contacts_url(None).unwrap().as_str(),
            "https://crm.example.com/api/v1/contacts"
        );
    }

    #[test]
    fn test_contact_url_with_trailing_slash() {
        let client = MercuryClient::new(&config("https://crm.example.com/api/v1/")).unwrap();
        let id = ContactId::new("abc 1");
        assert_eq!(
            client.contacts_url(Some(&id)).unwrap().as_str(),
            "https://crm.example.com/api/v1/contacts/abc%201"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(MercuryClient::new(&config("not a url")).is_err());
        assert!(MercuryClient::new(&config("mailto:crm@example.com")).is_err());
    }
}
