//! # Background Maintenance
//!
//! One tokio interval task, started by `main`:
//!
//! ```text
//! every REENABLE_INTERVAL_SECS
//!     ├── products.reenable_due(now)      disabled products whose reEnableAt passed
//!     └── carts.sweep_expired(now, ttl)   active carts idle for CART_TTL_DAYS
//! ```
//! Failures are logged and retried on the next tick.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::AppState;

/// Runs one maintenance pass. Returns `(re-enabled products, abandoned carts)`.
pub async fn run_once(state: &AppState) -> (u64, u64) {
    let now = Utc::now();

    let reenabled = match state.db.products().reenable_due(now).await {
        Ok(n) => n,
        Err(e) => {
            warn!(error = %e, "Product re-enable pass failed");
            0
        }
    };

    let abandoned = match state
        .db
        .carts()
        .sweep_expired(now, state.config.cart_ttl_days)
        .await
    {
        Ok(n) => n,
        Err(e) => {
            warn!(error = %e, "Cart expiry sweep failed");
            0
        }
    };

    if reenabled > 0 || abandoned > 0 {
        info!(reenabled, abandoned, "Maintenance pass complete");
    } else {
        debug!("Maintenance pass found nothing to do");
    }

    (reenabled, abandoned)
}

/// Spawns the periodic maintenance task.
pub fn spawn(state: Arc<AppState>) -> JoinHandle<()> {
    let period = Duration::from_secs(state.config.reenable_interval_secs);
    info!(interval_secs = period.as_secs(), "Starting maintenance job");

    tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            run_once(&state).await;
        }
    })
}
