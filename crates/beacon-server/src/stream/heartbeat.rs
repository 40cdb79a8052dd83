//! Keep-alive comments for idle event streams.

use std::sync::Weak;
use std::time::Duration;

use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::trace;

use super::broadcast::BroadcastManager;

/// Outcome of the heartbeat loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeartbeatResult {
    /// The heartbeat was stopped.
    Cancelled,
    /// The registry was dropped.
    ManagerDropped,
}

/// Write a `: ping` comment to every subscriber once per `interval`.
///
/// The first ping goes out one full interval after start. Holds only a weak
/// reference so a dropped registry ends the loop.
pub async fn run_heartbeat(
    manager: Weak<BroadcastManager>,
    interval: Duration,
    cancel: CancellationToken,
) -> HeartbeatResult {
    let period = interval.max(Duration::from_millis(1));
    let mut ticker = time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            () = cancel.cancelled() => return HeartbeatResult::Cancelled,
            _ = ticker.tick() => {
                let Some(manager) = manager.upgrade() else {
                    return HeartbeatResult::ManagerDropped;
                };
                let recipients = manager.ping();
                trace!(recipients, "heartbeat");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::stream::frame::Frame;

    #[tokio::test(start_paused = true)]
    async fn cancelled_before_first_tick() {
        let bm = Arc::new(BroadcastManager::new());
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = run_heartbeat(Arc::downgrade(&bm), Duration::from_secs(20), cancel).await;
        assert_eq!(result, HeartbeatResult::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn ends_when_manager_dropped() {
        let bm = Arc::new(BroadcastManager::new());
        let weak = Arc::downgrade(&bm);
        drop(bm);
        let result = run_heartbeat(weak, Duration::from_secs(1), CancellationToken::new()).await;
        assert_eq!(result, HeartbeatResult::ManagerDropped);
    }

    #[tokio::test(start_paused = true)]
    async fn pings_once_per_interval() {
        let bm = Arc::new(BroadcastManager::new());
        let mut sub = bm.subscribe();
        assert_eq!(sub.frames.recv().await.unwrap(), Frame::connected());

        let cancel = CancellationToken::new();
        let task = tokio::spawn(run_heartbeat(
            Arc::downgrade(&bm),
            Duration::from_secs(20),
            cancel.clone(),
        ));

        time::sleep(Duration::from_millis(19_900)).await;
        assert!(sub.frames.try_recv().is_err());

        time::sleep(Duration::from_millis(200)).await;
        assert_eq!(sub.frames.try_recv().unwrap(), Frame::ping());

        time::sleep(Duration::from_secs(20)).await;
        assert_eq!(sub.frames.try_recv().unwrap(), Frame::ping());
        assert!(sub.frames.try_recv().is_err());

        cancel.cancel();
        assert_eq!(task.await.unwrap(), HeartbeatResult::Cancelled);
    }
}
