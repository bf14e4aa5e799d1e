//! Periodic reconciliation
//!
//! Runs one sync immediately and then once per interval. Each run executes
//! on a blocking worker; the next tick waits for it, so runs never overlap.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, bail};
use consent::SyncOptions;
use log::{error, info, warn};
use tokio::time::MissedTickBehavior;

use crate::Stores;

pub async fn run(stores: Stores, interval_hours: u64) -> Result<()> {
    if interval_hours == 0 {
        bail!("interval_hours must be at least 1");
    }

    let stores = Arc::new(stores);
    let mut interval = tokio::time::interval(Duration::from_secs(interval_hours * 60 * 60));
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    info!("Daemon started, syncing every {}h", interval_hours);

    loop {
        tokio::select! {
            signal = &mut shutdown => {
                match signal {
                    Ok(()) => info!("Received Ctrl-C, shutting down"),
                    Err(e) => error!("Ctrl-C handler failed: {}", e),
                }
                return Ok(());
            }
            _ = interval.tick() => {
                let stores = Arc::clone(&stores);
                let result =
                    tokio::task::spawn_blocking(move || stores.sync(&SyncOptions::default())).await;

                match result {
                    Ok(Ok(report)) if report.failed() > 0 => {
                        warn!("{} write(s) failed; retrying next run", report.failed());
                    }
                    Ok(Ok(_)) => {}
                    Ok(Err(e)) => error!("Sync aborted: {:#}", e),
                    Err(e) => error!("Sync task panicked: {}", e),
                }
            }
        }
    }
}
