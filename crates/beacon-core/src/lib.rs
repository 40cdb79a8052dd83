//! # beacon-core
//!
//! Shared vocabulary for the beacon bridge crates:
//!
//! - **Inbound events**: [`InboundEvent`] decoded from a raw datagram
//! - **Trigger parsing**: [`trigger::parse_trigger`], a total parser for `prefix<n>` payloads
//! - **Event sink**: the one-method [`EventSink`] seam between producers and the broadcaster
//! - **Language**: the two selectable wizard languages
//! - **Branded IDs** and logging setup

#![deny(unsafe_code)]

pub mod constants;
pub mod event;
pub mod ids;
pub mod language;
pub mod logging;
pub mod sink;
pub mod trigger;

pub use event::{InboundEvent, PeerInfo};
pub use language::{Language, ParseLanguageError};
pub use sink::EventSink;
pub use trigger::parse_trigger;
