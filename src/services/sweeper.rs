//! Periodic expiry sweep
//!
//! Runs `sweep_expired` on a fixed interval so regions flip to outside even
//! when no sightings arrive at all.

use crate::services::registry::RegionRegistry;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, info};

/// Sweep the registry every `interval_ms` until shutdown
///
/// Returns the total number of outside transitions observed.
pub async fn run_sweeper(
    registry: Arc<RegionRegistry>,
    interval_ms: u64,
    mut shutdown: watch::Receiver<bool>,
) -> usize {
    let mut ticker = interval(Duration::from_millis(interval_ms.max(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut total = 0;

    info!(interval_ms = %interval_ms, "sweeper_started");

    loop {
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    info!(exits = %total, "sweeper_stopped");
                    return total;
                }
            }
            _ = ticker.tick() => {
                let exits = registry.sweep_expired(registry.now_ms());
                if exits > 0 {
                    debug!(exits = %exits, "sweep_found_exits");
                }
                total += exits;
            }
        }
    }
}
