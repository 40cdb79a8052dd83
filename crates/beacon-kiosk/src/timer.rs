//! Replace-on-schedule deferred actions.
//!
//! A [`DeferredAction`] owns at most one pending timer. Scheduling aborts the
//! previous one and bumps a generation counter; the expiry is delivered as a
//! message carrying that generation, and [`DeferredAction::fire`] accepts it
//! only if it is still the current one. A timer that fired but was already
//! queued when it got superseded is therefore ignored.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// A single cancellable timer that delivers its expiry over a channel.
#[derive(Debug, Default)]
pub struct DeferredAction {
    generation: u64,
    handle: Option<JoinHandle<()>>,
}

impl DeferredAction {
    /// Create an idle action.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel any pending timer and start a new one.
    ///
    /// After `delay`, `make(generation)` is sent on `tx`. Returns the new
    /// generation.
    pub fn schedule<T, F>(&mut self, delay: Duration, tx: mpsc::UnboundedSender<T>, make: F) -> u64
    where
        T: Send + 'static,
        F: FnOnce(u64) -> T + Send + 'static,
    {
        self.abort();
        self.generation += 1;
        let generation = self.generation;
        self.handle = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(make(generation));
        }));
        generation
    }

    /// Cancel the pending timer, if any. Returns whether one was pending.
    pub fn cancel(&mut self) -> bool {
        let was_pending = self.handle.is_some();
        self.abort();
        // Invalidate an expiry that is already in flight.
        self.generation += 1;
        was_pending
    }

    /// Whether a timer is scheduled and has not been fired or cancelled.
    pub fn is_pending(&self) -> bool {
        self.handle.is_some()
    }

    /// Accept an expiry for `generation`.
    ///
    /// Returns `true` only for the current, still-pending timer, and clears it.
    pub fn fire(&mut self, generation: u64) -> bool {
        if generation != self.generation || self.handle.is_none() {
            return false;
        }
        self.handle = None;
        true
    }

    fn abort(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Drop for DeferredAction {
    fn drop(&mut self) {
        self.abort();
    }
}
