//! Event-stream subscriber connection state.

use beacon_core::ids::SubscriberId;
use tokio::sync::mpsc;

use super::frame::Frame;

/// Why a frame could not be queued for a subscriber.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum WriteError {
    /// The response stream was dropped (client disconnected).
    #[error("subscriber stream closed")]
    Closed,
    /// The subscriber is not draining its queue.
    #[error("subscriber queue full")]
    Full,
}

/// One open event stream.
pub struct SubscriberConnection {
    /// Unique subscriber ID.
    pub id: SubscriberId,
    /// Queue feeding the response body.
    tx: mpsc::Sender<Frame>,
}

impl SubscriberConnection {
    /// Create a new connection.
    pub fn new(id: SubscriberId, tx: mpsc::Sender<Frame>) -> Self {
        Self { id, tx }
    }

    /// Queue a frame without waiting.
    pub fn send(&self, frame: Frame) -> Result<(), WriteError> {
        self.tx.try_send(frame).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => WriteError::Full,
            mpsc::error::TrySendError::Closed(_) => WriteError::Closed,
        })
    }
}
