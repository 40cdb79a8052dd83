//! Producer-side seam for inbound events.

use crate::event::InboundEvent;

/// Receives every decoded datagram.
///
/// Producers (the UDP listener) depend only on this trait; the subscriber
/// registry implements it by fanning the event out to all open streams.
/// `publish` must not block: it is called inline from the receive loop.
pub trait EventSink: Send + Sync {
    /// Deliver one event.
    fn publish(&self, event: &InboundEvent);
}
