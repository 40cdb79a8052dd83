//! Ordered teardown of a running beacon server.
//!
//! Event streams never end on their own, so the HTTP server can only drain
//! once the registry has dropped every subscriber. The order is: stop
//! accepting, end the streams, stop the heartbeat, close the UDP listener,
//! wait for the HTTP task, then close the sender socket.

use std::sync::Arc;
use std::time::Duration;

use beacon_udp::{DatagramSender, ListenerHandle};
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::stream::broadcast::BroadcastManager;

/// Time the HTTP task gets to finish in-flight requests before it is aborted.
pub const HTTP_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// What a teardown did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Event streams that were still open.
    pub streams_closed: usize,
    /// Whether a heartbeat was running.
    pub heartbeat_stopped: bool,
    /// Whether a UDP listener was running.
    pub listener_closed: bool,
    /// `false` when the HTTP task had to be aborted.
    pub http_drained: bool,
}

/// The pieces of a server that are torn down on stop.
pub struct Teardown<'a> {
    /// Cancels `axum::serve`'s graceful-shutdown future.
    pub http: &'a CancellationToken,
    /// Subscriber registry and heartbeat owner.
    pub registry: &'a BroadcastManager,
    /// Slot holding the live listener, emptied by the teardown.
    pub listener: &'a Arc<Mutex<Option<ListenerHandle>>>,
    /// Outbound datagram socket.
    pub sender: &'a DatagramSender,
}

impl Teardown<'_> {
    /// Run every step in order, waiting up to `drain_timeout` for `server`.
    pub async fn run(self, server: JoinHandle<()>, drain_timeout: Duration) -> ShutdownReport {
        info!("shutting down");
        self.http.cancel();

        let streams_closed = self.registry.close_all();
        let heartbeat_stopped = self.registry.stop_heartbeat();

        let listener = self.listener.lock().take();
        let listener_closed = match listener {
            Some(listener) => {
                listener.close();
                listener.closed().await;
                true
            }
            None => false,
        };

        let abort = server.abort_handle();
        let http_drained = if tokio::time::timeout(drain_timeout, server).await.is_ok() {
            true
        } else {
            warn!(timeout_ms = drain_timeout.as_millis(), "HTTP server did not drain, aborting");
            abort.abort();
            false
        };

        self.sender.close();

        let report = ShutdownReport {
            streams_closed,
            heartbeat_stopped,
            listener_closed,
            http_drained,
        };
        info!(
            streams = report.streams_closed,
            listener = report.listener_closed,
            drained = report.http_drained,
            "shutdown complete"
        );
        report
    }
}
