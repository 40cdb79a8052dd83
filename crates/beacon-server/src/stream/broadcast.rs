//! Event fan-out to open event streams.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use beacon_core::constants::UDP_EVENT_NAME;
use beacon_core::ids::SubscriberId;
use beacon_core::{EventSink, InboundEvent};
use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::connection::{SubscriberConnection, WriteError};
use super::frame::Frame;
use super::heartbeat;

/// Default per-subscriber queue length.
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// A registered subscriber: its ID and the receiving end of its frame queue.
#[derive(Debug)]
pub struct Subscription {
    /// Registry key, used to unsubscribe.
    pub id: SubscriberId,
    /// Frames to write to the response, starting with `: connected`.
    pub frames: mpsc::Receiver<Frame>,
}

/// Registry of open event streams.
///
/// Shared by the `/events` handler (subscribe/unsubscribe) and by producers
/// through [`EventSink`]. A subscriber whose queue is closed or full is
/// removed during the broadcast that hit the failure; the others still get
/// the frame.
pub struct BroadcastManager {
    /// Open streams indexed by subscriber ID.
    connections: RwLock<HashMap<SubscriberId, Arc<SubscriberConnection>>>,
    /// Capacity of each subscriber queue.
    queue_capacity: usize,
    /// Running heartbeat, if any.
    heartbeat: Mutex<Option<CancellationToken>>,
}

impl BroadcastManager {
    /// Create a registry with the default queue capacity.
    pub fn new() -> Self {
        Self::with_queue_capacity(DEFAULT_QUEUE_CAPACITY)
    }

    /// Create a registry whose subscriber queues hold `capacity` frames.
    pub fn with_queue_capacity(capacity: usize) -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
            queue_capacity: capacity.max(1),
            heartbeat: Mutex::new(None),
        }
    }

    /// Register a new subscriber. Its queue already holds `: connected`.
    pub fn subscribe(&self) -> Subscription {
        let id = SubscriberId::new();
        let (tx, rx) = mpsc::channel(self.queue_capacity);
        let connection = Arc::new(SubscriberConnection::new(id.clone(), tx));
        let _ = connection.send(Frame::connected());

        let count = {
            let mut conns = self.connections.write();
            let _ = conns.insert(id.clone(), connection);
            conns.len()
        };
        info!(conn_id = %id, connections = count, "subscriber connected");

        Subscription { id, frames: rx }
    }

    /// Remove a subscriber. Returns `false` if it was already gone.
    pub fn unsubscribe(&self, id: &SubscriberId) -> bool {
        let (removed, count) = {
            let mut conns = self.connections.write();
            let removed = conns.remove(id).is_some();
            (removed, conns.len())
        };
        if removed {
            info!(conn_id = %id, connections = count, "subscriber disconnected");
        }
        removed
    }

    /// Write `event: <name>` / `data: <data>` to every subscriber.
    ///
    /// Returns how many subscribers accepted the frame.
    pub fn broadcast(&self, event_name: &str, data: &str) -> usize {
        let recipients = self.deliver(&Frame::event(event_name, data));
        debug!(event = event_name, recipients, "broadcast event");
        recipients
    }

    /// Write a `: ping` comment to every subscriber.
    pub fn ping(&self) -> usize {
        self.deliver(&Frame::ping())
    }

    /// Number of open streams.
    pub fn connection_count(&self) -> usize {
        self.connections.read().len()
    }

    /// Drop every subscriber, ending their streams after queued frames.
    pub fn close_all(&self) -> usize {
        let drained: Vec<_> = self.connections.write().drain().collect();
        if !drained.is_empty() {
            info!(connections = drained.len(), "closing all event streams");
        }
        drained.len()
    }

    /// Start the keep-alive heartbeat. No-op (returns `false`) if running.
    pub fn start_heartbeat(self: &Arc<Self>, interval: Duration) -> bool {
        let mut slot = self.heartbeat.lock();
        if slot.is_some() {
            return false;
        }
        let cancel = CancellationToken::new();
        drop(tokio::spawn(heartbeat::run_heartbeat(
            Arc::downgrade(self),
            interval,
            cancel.clone(),
        )));
        *slot = Some(cancel);
        debug!(interval_ms = interval.as_millis(), "heartbeat started");
        true
    }

    /// Stop the heartbeat. Returns `false` if it was not running.
    pub fn stop_heartbeat(&self) -> bool {
        match self.heartbeat.lock().take() {
            Some(cancel) => {
                cancel.cancel();
                debug!("heartbeat stopped");
                true
            }
            None => false,
        }
    }

    /// Whether the heartbeat is running.
    pub fn is_heartbeat_running(&self) -> bool {
        self.heartbeat.lock().is_some()
    }

    fn deliver(&self, frame: &Frame) -> usize {
        let snapshot: Vec<Arc<SubscriberConnection>> =
            self.connections.read().values().cloned().collect();

        let mut delivered = 0;
        let mut failed = Vec::new();
        for conn in &snapshot {
            match conn.send(frame.clone()) {
                Ok(()) => delivered += 1,
                Err(WriteError::Closed) => {
                    debug!(conn_id = %conn.id, "subscriber stream closed, removing");
                    failed.push(conn.id.clone());
                }
                Err(WriteError::Full) => {
                    warn!(conn_id = %conn.id, "subscriber queue full, removing");
                    failed.push(conn.id.clone());
                }
            }
        }

        if !failed.is_empty() {
            let mut conns = self.connections.write();
            for id in &failed {
                let _ = conns.remove(id);
            }
        }
        delivered
    }
}

impl Default for BroadcastManager {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for BroadcastManager {
    fn drop(&mut self) {
        if let Some(cancel) = self.heartbeat.get_mut().take() {
            cancel.cancel();
        }
    }
}

impl EventSink for BroadcastManager {
    fn publish(&self, event: &InboundEvent) {
        match serde_json::to_string(event) {
            Ok(json) => {
                let _ = self.broadcast(UDP_EVENT_NAME, &json);
            }
            Err(e) => warn!(error = %e, "failed to serialize inbound event"),
        }
    }
}
