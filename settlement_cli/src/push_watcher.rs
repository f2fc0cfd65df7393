use std::{sync::Arc, time::Duration};

use log::*;
use settlement_engine::{CheckoutApi, ReconcileSummary, SqliteStore};
use tokio::{task::JoinHandle, time::MissedTickBehavior};

use crate::cipher::AppCipher;

/// Starts the push payment watcher. Do not await the returned JoinHandle, as it will run indefinitely.
///
/// Every `interval`, each open push transaction is polled once. A pass that overruns the interval delays the next
/// one rather than stacking passes up.
pub fn start_push_watcher(
    api: Arc<CheckoutApi<SqliteStore, AppCipher>>,
    interval: Duration,
    reconcile_on_start: bool,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let start = if reconcile_on_start {
            tokio::time::Instant::now()
        } else {
            tokio::time::Instant::now() + interval
        };
        let mut timer = tokio::time::interval_at(start, interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!("🕰️ Push payment watcher started. Polling every {}s", interval.as_secs());
        loop {
            timer.tick().await;
            debug!("🕰️ Running push payment reconciliation");
            match api.reconcile_open_push_payments().await {
                Ok(summary) => log_summary(&summary),
                Err(e) => {
                    error!("🕰️ Error running push payment reconciliation: {e}");
                },
            }
        }
    })
}

fn log_summary(summary: &ReconcileSummary) {
    if summary.polled == 0 {
        trace!("🕰️ No open push payments");
        return;
    }
    info!(
        "📲️ {} push payments polled. {} updated, {} could not be polled",
        summary.polled, summary.updated, summary.failed
    );
    if !summary.unknown.is_empty() {
        warn!(
            "📲️ {} push payments have an unknown outcome and may need a reversal: {}",
            summary.unknown.len(),
            summary.unknown.join(", ")
        );
    }
}
