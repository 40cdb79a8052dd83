//! Server configuration.

use std::time::Duration;

use beacon_settings::{BeaconSettings, UdpSettings};

/// Configuration for the beacon server.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Host to bind (default `"127.0.0.1"`).
    pub host: String,
    /// Port to bind (default `0` for auto-assign).
    pub port: u16,
    /// Interval between `: ping` keep-alive comments.
    pub heartbeat_interval: Duration,
    /// Frames buffered per subscriber before it is dropped as stalled.
    pub send_queue: usize,
    /// Datagram target, listener and payloads.
    pub udp: UdpSettings,
    /// Trigger prefix advertised to clients.
    pub trigger_prefix: String,
}

impl ServerConfig {
    /// Build from loaded settings.
    pub fn from_settings(settings: &BeaconSettings) -> Self {
        Self {
            host: settings.web.host.clone(),
            port: settings.web.port,
            heartbeat_interval: Duration::from_millis(settings.stream.heartbeat_interval_ms),
            send_queue: settings.stream.send_queue,
            udp: settings.udp.clone(),
            trigger_prefix: settings.trigger.prefix.clone(),
        }
    }

    /// `host:port` bind string.
    pub fn bind_addr(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        let settings = BeaconSettings::default();
        Self {
            host: "127.0.0.1".into(),
            port: 0,
            ..Self::from_settings(&settings)
        }
    }
}

impl From<&BeaconSettings> for ServerConfig {
    fn from(settings: &BeaconSettings) -> Self {
        Self::from_settings(settings)
    }
}
