//! # beacon-server
//!
//! Axum HTTP server for the beacon bridge.
//!
//! - `GET /events`: long-lived event stream; every received datagram is fanned
//!   out to all open streams as an `udp` event
//! - `POST /api/send`: send a language signal (or an arbitrary message) as one datagram
//! - `GET /api/health`, `GET /health`: status, targets and the trigger prefix
//! - Subscriber registry with keep-alive heartbeat ([`stream::BroadcastManager`])
//! - Ordered shutdown ([`shutdown::Teardown`])

#![deny(unsafe_code)]

pub mod config;
pub mod errors;
pub mod health;
pub mod send;
pub mod server;
pub mod shutdown;
pub mod stream;

pub use config::ServerConfig;
pub use errors::ServerError;
pub use server::{AppState, BeaconServer};
