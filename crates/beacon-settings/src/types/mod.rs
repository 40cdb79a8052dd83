//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase", default)]`, so a settings
//! file may be partial: missing fields keep their compiled default.

mod udp;

pub use udp::*;

use beacon_core::constants::{DEFAULT_HEARTBEAT_INTERVAL_MS, DEFAULT_TRIGGER_PREFIX};
use serde::{Deserialize, Serialize};

/// Root settings type.
///
/// ```json
/// {
///   "web": { "port": 8080 },
///   "udp": { "listener": { "enabled": true } },
///   "trigger": { "prefix": "score=" }
/// }
/// ```
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BeaconSettings {
    /// HTTP server bind settings.
    pub web: WebSettings,
    /// Datagram target, listener and payload settings.
    pub udp: UdpSettings,
    /// Event-stream tuning.
    pub stream: StreamSettings,
    /// Trigger detection settings exposed to clients.
    pub trigger: TriggerSettings,
}

/// HTTP server bind settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WebSettings {
    /// Bind address.
    pub host: String,
    /// Bind port.
    pub port: u16,
}

impl Default for WebSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

/// Event-stream tuning.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StreamSettings {
    /// Keep-alive comment interval in milliseconds.
    pub heartbeat_interval_ms: u64,
    /// Frames buffered per subscriber before it is considered stalled.
    pub send_queue: usize,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            heartbeat_interval_ms: DEFAULT_HEARTBEAT_INTERVAL_MS,
            send_queue: 256,
        }
    }
}

/// Trigger detection settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TriggerSettings {
    /// Case-insensitive prefix of a trigger payload.
    pub prefix: String,
}

impl Default for TriggerSettings {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_TRIGGER_PREFIX.to_string(),
        }
    }
}
