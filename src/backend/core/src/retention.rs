//! Background retention sweeper.
//!
//! Runs `purge_older_than` on a fixed interval when configured. A failed
//! sweep is logged and the loop keeps going; entries it missed are picked up
//! by the next tick.

use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::RetentionConfig;
use crate::ledger::LedgerStore;

/// Spawn the sweeper if an interval is configured.
pub fn spawn_sweeper(store: LedgerStore, cfg: RetentionConfig) -> Option<JoinHandle<()>> {
    let interval = cfg.sweep_interval?;
    let max_age = cfg.max_age();

    info!(
        max_age_days = cfg.max_age_days,
        interval_secs = interval.as_secs(),
        "Starting retention sweeper"
    );

    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick fires immediately; skip it so startup is not a sweep.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            match store.purge_older_than(max_age).await {
                Ok(removed) => {
                    info!(removed, "Retention sweep complete");
                }
                Err(e) => {
                    warn!(error = %e, "Retention sweep failed; will retry next tick");
                }
            }
        }
    }))
}
