//! Heartbeat ping/pong liveness monitoring.

use std::sync::Arc;
use std::time::Duration;

use tokio::time;
use tokio_util::sync::CancellationToken;

use super::connection::ClientConnection;

/// `time::interval` panics on a zero period
const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Outcome of the heartbeat loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeartbeatResult {
    /// The client stopped responding within the timeout window.
    TimedOut,
    /// The heartbeat was cancelled externally.
    Cancelled,
}

/// Ping a connection every `interval` until it stops answering.
///
/// Each tick checks whether anything arrived since the previous tick, then
/// queues a WebSocket ping. After `timeout / interval` consecutive silent
/// ticks (at least one) the connection is reported dead.
pub async fn run_heartbeat(
    connection: Arc<ClientConnection>,
    interval: Duration,
    timeout: Duration,
    cancel: CancellationToken,
) -> HeartbeatResult {
    let interval = interval.max(MIN_INTERVAL);
    let mut ticker = time::interval(interval);
    ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);
    let mut missed: u32 = 0;
    #[allow(clippy::cast_possible_truncation)]
    let max_missed = (timeout.as_millis() / interval.as_millis().max(1)).max(1) as u32;

    // the first tick completes immediately
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if connection.check_alive() {
                    missed = 0;
                } else {
                    missed += 1;
                    if missed >= max_missed {
                        return HeartbeatResult::TimedOut;
                    }
                }
                let _ = connection.send_ping();
            }
            () = cancel.cancelled() => {
                return HeartbeatResult::Cancelled;
            }
        }
    }
}
