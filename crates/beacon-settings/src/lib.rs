//! # beacon-settings
//!
//! Configuration for the beacon bridge, loaded from three layers (in
//! priority order):
//! 1. **Compiled defaults**: [`BeaconSettings::default()`]
//! 2. **Settings file**: `~/.beacon/settings.json` or an explicit path, overlaid on the defaults
//! 3. **Environment variables**: `PORT`, `UDP_HOST`, `START_UDP_LISTENER`, ... (highest priority)

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{load_settings, load_settings_from_path, parse_settings, settings_path};
pub use types::*;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn re_exports_work() {
        let _settings = BeaconSettings::default();
        let _path = settings_path();
    }

    #[test]
    fn default_settings_are_valid() {
        let settings = BeaconSettings::default();
        assert_eq!(settings.web.port, 3000);
        assert_eq!(settings.udp.target.host, "127.0.0.1");
        assert_eq!(settings.udp.target.port, 41234);
        assert!(!settings.udp.listener.enabled);
        assert_eq!(settings.udp.listener.port, 41235);
        assert_eq!(settings.udp.message_en, "ENGLISH_SIGNAL");
        assert_eq!(settings.udp.message_ar, "ARABIC_SIGNAL");
        assert!(settings.udp.log_packets);
        assert_eq!(settings.trigger.prefix, "end=");
        assert_eq!(settings.stream.heartbeat_interval_ms, 20_000);
    }
}
