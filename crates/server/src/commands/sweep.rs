use std::time::Duration;

use fleetwatch_common::time::now_ms;

use super::CommandQueue;

/// Background loop that expires overdue commands. Runs until the
/// process exits.
pub async fn run_timeout_sweep(queue: CommandQueue, interval_ms: u64) {
    let mut ticker = tokio::time::interval(Duration::from_millis(interval_ms));
    loop {
        ticker.tick().await;
        let timed_out = queue.sweep(now_ms());
        if timed_out > 0 {
            tracing::info!(timed_out, "timeout sweep completed");
        }
    }
}
