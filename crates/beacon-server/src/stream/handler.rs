//! `GET /events` handler.

use std::convert::Infallible;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::extract::State;
use axum::response::IntoResponse;
use axum::response::sse::{Event, Sse};
use beacon_core::ids::SubscriberId;
use futures::Stream;
use tokio::sync::mpsc;

use super::broadcast::{BroadcastManager, Subscription};
use super::frame::Frame;
use crate::server::AppState;

/// Response body of one event stream.
///
/// Dropping it (client went away, or the server is shutting down)
/// unsubscribes from the registry.
pub struct SubscriberStream {
    manager: Arc<BroadcastManager>,
    id: SubscriberId,
    frames: mpsc::Receiver<Frame>,
}

impl SubscriberStream {
    /// Wrap a fresh subscription.
    pub fn new(manager: Arc<BroadcastManager>, subscription: Subscription) -> Self {
        Self {
            manager,
            id: subscription.id,
            frames: subscription.frames,
        }
    }

    /// Registry key of this stream.
    pub fn id(&self) -> &SubscriberId {
        &self.id
    }
}

impl Stream for SubscriberStream {
    type Item = Result<Event, Infallible>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.frames
            .poll_recv(cx)
            .map(|frame| frame.map(|frame| Ok(frame.to_sse())))
    }
}

impl Drop for SubscriberStream {
    fn drop(&mut self) {
        let _ = self.manager.unsubscribe(&self.id);
    }
}

/// GET /events
pub async fn events_handler(State(state): State<AppState>) -> impl IntoResponse {
    let subscription = state.broadcast.subscribe();
    Sse::new(SubscriberStream::new(state.broadcast.clone(), subscription))
}
