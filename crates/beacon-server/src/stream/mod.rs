//! Event-stream subscribers: registry, frames, heartbeat and the `/events` handler.

pub mod broadcast;
pub mod connection;
pub mod frame;
pub mod handler;
pub mod heartbeat;

pub use broadcast::{BroadcastManager, Subscription};
pub use connection::{SubscriberConnection, WriteError};
pub use frame::Frame;
