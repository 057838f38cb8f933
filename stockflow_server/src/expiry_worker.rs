//! Reclaims the stock held by orders that were never paid.
//!
//! The worker wakes every `SF_EXPIRY_SWEEP_INTERVAL` and cancels every order that is still `Pending`/`Pending` past its
//! expiry time. An order therefore holds its stock for at most its timeout plus one interval.
use std::time::Duration;

use chrono::Utc;
use log::*;
use stockflow_engine::{db_types::Order, OrderFlowApi, SqliteDatabase};
use tokio::{sync::watch, task::JoinHandle, time::MissedTickBehavior};

/// Stops the expiry worker. Dropping the handle also stops it.
pub struct ExpiryWorkerHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl ExpiryWorkerHandle {
    /// Signals the worker to stop and waits for the current sweep, if any, to finish.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            error!("⏰️ Expiry worker did not shut down cleanly. {e}");
        }
    }
}

/// Starts the expiry worker on the current tokio runtime.
pub fn start_expiry_worker(api: OrderFlowApi<SqliteDatabase>, interval: Duration) -> ExpiryWorkerHandle {
    let (shutdown, mut signal) = watch::channel(false);
    let task = tokio::spawn(async move {
        let mut timer = tokio::time::interval(interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!("⏰️ Order expiry worker started. Sweeping every {}s", interval.as_secs());
        loop {
            tokio::select! {
                _ = timer.tick() => run_sweep(&api).await,
                changed = signal.changed() => {
                    if changed.is_err() || *signal.borrow() {
                        break;
                    }
                },
            }
        }
        info!("⏰️ Order expiry worker stopped");
    });
    ExpiryWorkerHandle { shutdown, task }
}

async fn run_sweep(api: &OrderFlowApi<SqliteDatabase>) {
    trace!("⏰️ Running order expiry job");
    match api.expire_stale_orders(Utc::now()).await {
        Ok(result) if result.is_empty() => trace!("⏰️ No orders expired"),
        Ok(result) => {
            info!("⏰️ {} orders expired", result.expired.len());
            debug!("⏰️ Expired orders: {}", order_list(&result.expired));
            if result.skipped > 0 {
                debug!("⏰️ {} orders were settled while the sweep was running", result.skipped);
            }
            for (order, e) in &result.failed {
                warn!("⏰️ Order {} could not be expired and will be retried on the next sweep. {e}", order.id);
            }
        },
        Err(e) => {
            error!("⏰️ Error running order expiry job: {e}");
        },
    }
}

fn order_list(orders: &[Order]) -> String {
    orders
        .iter()
        .map(|o| format!("[{}] {} held until {}", o.id, o.user_id, o.expires_at))
        .collect::<Vec<String>>()
        .join(", ")
}
