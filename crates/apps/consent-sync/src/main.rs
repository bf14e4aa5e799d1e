//! consent-sync - keeps opt-out status aligned between Mailchimp and Mercury
//!
//! # Usage
//!
//! ```text
//! consent-sync [--config <path>] run [--dry-run] [--json]
//! consent-sync [--config <path>] daemon [--interval-hours N]
//! consent-sync [--config <path>] ledger [--json]
//! ```

mod daemon;

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use consent::storage::LedgerStore;
use consent::{
    ConsentConfig, MailchimpClient, MercuryClient, RunReport, SqliteLedger, SyncOptions, run_sync,
};
use log::{info, warn};

#[derive(Parser, Debug)]
#[command(
    name = "consent-sync",
    version,
    about = "Reconcile subscription status across Mailchimp, Mercury and the local ledger",
    long_about = None,
)]
struct Cli {
    /// Config file (defaults to the user config directory, then the environment)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run one reconciliation and exit.
    Run {
        /// Report what would change without writing anything.
        #[arg(long)]
        dry_run: bool,

        /// Print the run report as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Reconcile now, then again every interval until Ctrl-C.
    Daemon {
        /// Hours between runs (overrides the config file).
        #[arg(long)]
        interval_hours: Option<u64>,
    },

    /// Print the ledger.
    Ledger {
        /// Print entries as a JSON object.
        #[arg(long)]
        json: bool,
    },
}

/// The three stores a run works against
pub struct Stores {
    pub list: MailchimpClient,
    pub directory: MercuryClient,
    pub ledger: SqliteLedger,
}

impl Stores {
    fn open(config: &ConsentConfig) -> Result<Self> {
        Ok(Self {
            list: MailchimpClient::new(&config.mailchimp)?,
            directory: MercuryClient::new(&config.mercury)?,
            ledger: open_ledger(config)?,
        })
    }

    pub fn sync(&self, options: &SyncOptions) -> Result<RunReport> {
        let report = run_sync(&self.list, &self.directory, &self.ledger, options)?;
        Ok(report)
    }
}

fn open_ledger(config: &ConsentConfig) -> Result<SqliteLedger> {
    let path = config.ledger_path()?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create ledger directory: {}", parent.display()))?;
    }
    info!("Using ledger at {}", path.display());
    SqliteLedger::new(&path)
}

fn print_summary(report: &RunReport) {
    println!(
        "{} applied, {} planned, {} skipped, {} failed, {} rejected ({}ms)",
        report.applied(),
        report.planned(),
        report.skipped(),
        report.failed(),
        report.rejected.len(),
        report.duration_ms()
    );
    for outcome in report.failures() {
        println!("  failed: {} {} on {}", outcome.email, outcome.operation, outcome.store);
    }
    for rejected in &report.rejected {
        println!("  rejected: {rejected}");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    if let Err(e) = config::init() {
        warn!("Failed to initialize config directory: {}", e);
    }

    let cli = Cli::parse();
    let config = ConsentConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Run { dry_run, json } => {
            let stores = Stores::open(&config)?;
            let report = tokio::task::spawn_blocking(move || stores.sync(&SyncOptions { dry_run }))
                .await
                .context("Sync task panicked")??;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_summary(&report);
            }

            if report.failed() > 0 {
                bail!("{} write(s) failed; they will be retried on the next run", report.failed());
            }
            Ok(())
        }
        Commands::Daemon { interval_hours } => {
            let hours = interval_hours.unwrap_or(config.interval_hours);
            let stores = Stores::open(&config)?;
            daemon::run(stores, hours).await
        }
        Commands::Ledger { json } => {
            let ledger = open_ledger(&config)?;
            let entries = ledger.get_all()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else if entries.is_empty() {
                println!("Ledger is empty");
            } else {
                for (email, unsubscribed) in &entries {
                    let status = if *unsubscribed { "unsubscribed" } else { "subscribed" };
                    println!("{email}\t{status}");
                }
            }
            Ok(())
        }
    }
}
