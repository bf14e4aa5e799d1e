//! Configuration loading for consent sync
//!
//! Supports loading settings from (in order of priority):
//! 1. An explicit JSON file
//! 2. The default JSON file (~/.config/consent-sync/consent-sync.json)
//! 3. Runtime environment variables (fallback)

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Config filename in the consent-sync config directory
const CONFIG_FILE: &str = "consent-sync.json";

/// Ledger database filename in the data directory
const LEDGER_FILE: &str = "ledger.db";

/// Default number of hours between daemon runs
const DEFAULT_INTERVAL_HOURS: u64 = 24;

/// Mailchimp audience access
#[derive(Debug, Clone, Deserialize)]
pub struct MailchimpConfig {
    pub api_key: String,
    pub list_id: String,
    /// Data-center prefix (e.g. "us6"); derived from the API key when absent
    #[serde(default)]
    pub server: Option<String>,
}

impl MailchimpConfig {
    /// Resolve the data-center prefix used in the API host name
    pub fn server(&self) -> Result<String> {
        if let Some(server) = &self.server
            && !server.is_empty()
        {
            return Ok(server.clone());
        }
        match self.api_key.rsplit_once('-') {
            Some((_, dc)) if !dc.is_empty() => Ok(dc.to_string()),
            _ => bail!("Mailchimp API key has no data-center suffix and no server is configured"),
        }
    }
}

/// Mercury CRM access
#[derive(Debug, Clone, Deserialize)]
pub struct MercuryConfig {
    pub base_url: String,
    pub token: String,
    pub key: String,
}

/// Complete configuration for a sync run
#[derive(Debug, Clone, Deserialize)]
pub struct ConsentConfig {
    pub mailchimp: MailchimpConfig,
    pub mercury: MercuryConfig,
    /// SQLite ledger location; defaults to the data directory
    #[serde(default)]
    pub ledger_path: Option<PathBuf>,
    #[serde(default = "default_interval_hours")]
    pub interval_hours: u64,
}

fn default_interval_hours() -> u64 {
    DEFAULT_INTERVAL_HOURS
}

impl ConsentConfig {
    /// Load configuration using the following priority:
    /// 1. `path`, if given
    /// 2. JSON file (~/.config/consent-sync/consent-sync.json)
    /// 3. Runtime environment variables
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::from_file(path);
        }

        if config::config_exists(CONFIG_FILE) {
            return config::load_json(CONFIG_FILE);
        }

        Self::from_env()
    }

    /// Load configuration from a specific JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        config::load_json_file(path)
    }

    /// Parse configuration from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse configuration JSON")
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |name: &str| {
            lookup(name).with_context(|| format!("{name} environment variable not set"))
        };

        let interval_hours = match lookup("CONSENT_SYNC_INTERVAL_HOURS") {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("CONSENT_SYNC_INTERVAL_HOURS is not a number: {raw}"))?,
            None => DEFAULT_INTERVAL_HOURS,
        };

        Ok(Self {
            mailchimp: MailchimpConfig {
                api_key: required("MAILCHIMP_API_KEY")?,
                list_id: required("MAILCHIMP_LIST_ID")?,
                server: lookup("MAILCHIMP_SERVER"),
            },
            mercury: MercuryConfig {
                base_url: required("MERCURY_BASE_URL")?,
                token: required("MERCURY_TOKEN")?,
                key: required("MERCURY_KEY")?,
            },
            ledger_path: lookup("CONSENT_LEDGER_PATH").map(PathBuf::from),
            interval_hours,
        })
    }

    /// Where the ledger database lives
    pub fn ledger_path(&self) -> Result<PathBuf> {
        match &self.ledger_path {
            Some(path) => Ok(path.clone()),
            None => config::data_path(LEDGER_FILE).context("Could not determine data directory"),
        }
    }

    /// Get the default config file path (~/.config/consent-sync/consent-sync.json)
    pub fn default_config_path() -> Option<PathBuf> {
        config::config_path(CONFIG_FILE)
    }
}
