//! # beacon-kiosk
//!
//! Terminal client for the beacon bridge.
//!
//! - [`api`]: HTTP client for health, send and the event stream (with reconnect)
//! - [`sse`]: event-stream frame parser over a chunked byte stream
//! - [`wizard`]: the four-step state machine driven by user actions and triggers
//! - [`timer`]: replace-on-schedule deferred actions
//! - [`messages`]: localized result text and the "last received" line
//! - [`view`] and [`app`]: stdout rendering and the stdin-driven run loop

#![deny(unsafe_code)]

pub mod api;
pub mod app;
pub mod errors;
pub mod messages;
pub mod sse;
pub mod timer;
pub mod view;
pub mod wizard;

pub use api::BridgeClient;
pub use app::{KioskOptions, run_kiosk};
pub use errors::ClientError;
pub use wizard::{LanguageSender, Step, Wizard, WizardInput, WizardOptions, WizardView};
