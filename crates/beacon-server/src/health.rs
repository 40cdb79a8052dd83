//! `/api/health` and `/health` endpoints.

use std::time::Instant;

use beacon_core::constants::VERSION;
use beacon_settings::UdpEndpoint;
use serde::Serialize;

use crate::config::ServerConfig;

/// Health check response body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// Always `"ok"` when the server is running.
    pub status: String,
    /// Server build version.
    pub version: String,
    /// Default destination for language signals.
    pub udp_target: UdpEndpoint,
    /// Live listener address, `null` when disabled or bind failed.
    pub listener: Option<UdpEndpoint>,
    /// Trigger prefix clients should match against.
    pub trigger_prefix: String,
    /// Open event streams.
    pub connections: usize,
    /// Seconds since the server started.
    pub uptime_secs: u64,
}

/// Build a health response from config and live state.
pub fn health_check(
    start_time: Instant,
    config: &ServerConfig,
    listener: Option<UdpEndpoint>,
    connections: usize,
) -> HealthResponse {
    HealthResponse {
        status: "ok".into(),
        version: VERSION.into(),
        udp_target: config.udp.target.clone(),
        listener,
        trigger_prefix: config.trigger_prefix.clone(),
        connections,
        uptime_secs: start_time.elapsed().as_secs(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_is_ok() {
        let resp = health_check(Instant::now(), &ServerConfig::default(), None, 0);
        assert_eq!(resp.status, "ok");
        assert!(resp.uptime_secs < 2);
    }

    #[test]
    fn uptime_increases() {
        let start = Instant::now()
            .checked_sub(std::time::Duration::from_secs(60))
            .unwrap();
        let resp = health_check(start, &ServerConfig::default(), None, 0);
        assert!(resp.uptime_secs >= 59);
    }

    #[test]
    fn serialization_shape() {
        let listener = Some(UdpEndpoint::new("127.0.0.1", 41235));
        let resp = health_check(Instant::now(), &ServerConfig::default(), listener, 2);
        let parsed = serde_json::to_value(&resp).unwrap();

        assert_eq!(parsed["status"], "ok");
        assert_eq!(parsed["version"], VERSION);
        assert_eq!(parsed["udpTarget"]["host"], "127.0.0.1");
        assert_eq!(parsed["udpTarget"]["port"], 41234);
        assert_eq!(parsed["listener"]["port"], 41235);
        assert_eq!(parsed["triggerPrefix"], "end=");
        assert_eq!(parsed["connections"], 2);
        assert!(parsed["uptimeSecs"].is_number());
    }

    #[test]
    fn missing_listener_is_null() {
        let resp = health_check(Instant::now(), &ServerConfig::default(), None, 0);
        let parsed = serde_json::to_value(&resp).unwrap();
        assert!(parsed["listener"].is_null());
    }
}
