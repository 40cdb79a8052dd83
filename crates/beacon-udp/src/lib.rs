//! # beacon-udp
//!
//! Datagram plumbing for the beacon bridge.
//!
//! - [`listener`]: binds a local address and publishes every received
//!   datagram to an [`EventSink`](beacon_core::EventSink) as an
//!   [`InboundEvent`](beacon_core::InboundEvent)
//! - [`sender`]: one long-lived outbound socket for fire-and-forget sends

#![deny(unsafe_code)]

pub mod errors;
pub mod listener;
pub mod sender;

pub use errors::{ListenerError, SendError};
pub use listener::{ListenerHandle, ListenerOptions, start_listener};
pub use sender::{DatagramSender, SendReceipt};
