//! Datagram target, listener and payload settings.

use beacon_core::Language;
use serde::{Deserialize, Serialize};

/// A `host:port` pair. Defaults to the loopback datagram target.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UdpEndpoint {
    /// Host name or IP.
    pub host: String,
    /// Port.
    pub port: u16,
}

impl Default for UdpEndpoint {
    fn default() -> Self {
        Self::new("127.0.0.1", 41234)
    }
}

impl UdpEndpoint {
    /// Build an endpoint.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

/// Datagram settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UdpSettings {
    /// Default destination for language signals.
    pub target: UdpEndpoint,
    /// Inbound listener.
    pub listener: ListenerSettings,
    /// Payload sent when English is selected.
    pub message_en: String,
    /// Payload sent when Arabic is selected.
    pub message_ar: String,
    /// Log every received and sent datagram.
    pub log_packets: bool,
}

impl UdpSettings {
    /// Payload configured for a language.
    pub fn message_for(&self, language: Language) -> &str {
        match language {
            Language::En => &self.message_en,
            Language::Ar => &self.message_ar,
        }
    }
}

impl Default for UdpSettings {
    fn default() -> Self {
        Self {
            target: UdpEndpoint::default(),
            listener: ListenerSettings::default(),
            message_en: "ENGLISH_SIGNAL".to_string(),
            message_ar: "ARABIC_SIGNAL".to_string(),
            log_packets: true,
        }
    }
}

/// Inbound listener settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ListenerSettings {
    /// Start the listener with the server.
    pub enabled: bool,
    /// Bind host.
    pub host: String,
    /// Bind port.
    pub port: u16,
}

impl Default for ListenerSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            host: "127.0.0.1".to_string(),
            port: 41235,
        }
    }
}
