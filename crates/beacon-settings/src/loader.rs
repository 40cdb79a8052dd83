//! Settings loading: compiled defaults, then the settings file, then the
//! environment.
//!
//! Every settings struct is `#[serde(default)]`, so a partial file such as
//! `{"udp": {"listener": {"enabled": true}}}` keeps the defaults for every
//! key it leaves out, at any depth. An explicit `null` means "not set" and
//! is dropped before deserializing, so it keeps the default too.

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::errors::Result;
use crate::types::BeaconSettings;

/// Directory under the home directory holding the settings file.
pub const SETTINGS_DIR: &str = ".beacon";

/// Settings file name.
pub const SETTINGS_FILE: &str = "settings.json";

/// `$HOME/.beacon/settings.json`, or under the temp dir when `HOME` is unset.
pub fn settings_path() -> PathBuf {
    std::env::var_os("HOME")
        .map_or_else(std::env::temp_dir, PathBuf::from)
        .join(SETTINGS_DIR)
        .join(SETTINGS_FILE)
}

/// Load settings from [`settings_path`] with env var overrides.
pub fn load_settings() -> Result<BeaconSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from `path` with env var overrides.
///
/// A missing file yields the defaults (plus env overrides); malformed JSON or
/// a wrongly typed value is an error.
pub fn load_settings_from_path(path: &Path) -> Result<BeaconSettings> {
    let mut settings = load_file_layer(path)?;
    apply_env_overrides(&mut settings);
    Ok(settings)
}

/// Defaults overlaid with the settings file, without env overrides.
pub fn load_file_layer(path: &Path) -> Result<BeaconSettings> {
    if !path.exists() {
        debug!(?path, "no settings file, using defaults");
        return Ok(BeaconSettings::default());
    }
    debug!(?path, "loading settings file");
    let content = std::fs::read_to_string(path)?;
    parse_settings(&content)
}

/// Parse a (possibly partial) settings document.
pub fn parse_settings(json: &str) -> Result<BeaconSettings> {
    let raw: Value = serde_json::from_str(json)?;
    Ok(serde_json::from_value(drop_nulls(raw))?)
}

/// Remove `null` object members at every depth.
fn drop_nulls(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k, drop_nulls(v)))
                .collect(),
        ),
        other => other,
    }
}

/// Apply process environment overrides to loaded settings.
pub fn apply_env_overrides(settings: &mut BeaconSettings) {
    apply_overrides(settings, |name| std::env::var(name).ok());
}

/// Apply overrides from an arbitrary variable lookup.
///
/// Each variable has strict parsing rules:
/// - Ports must be integers in `1..=65535`
/// - Booleans accept `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`
/// - Empty strings and invalid values are ignored with a warning
pub fn apply_overrides<F>(settings: &mut BeaconSettings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let env = EnvReader { lookup };

    // ── Web ─────────────────────────────────────────────────────────
    if let Some(v) = env.u16("PORT") {
        settings.web.port = v;
    }
    if let Some(v) = env.string("WEB_HOST") {
        settings.web.host = v;
    }

    // ── UDP target ──────────────────────────────────────────────────
    if let Some(v) = env.string("UDP_HOST") {
        settings.udp.target.host = v;
    }
    if let Some(v) = env.u16("UDP_PORT") {
        settings.udp.target.port = v;
    }

    // ── UDP listener ────────────────────────────────────────────────
    if let Some(v) = env.bool("START_UDP_LISTENER") {
        settings.udp.listener.enabled = v;
    }
    if let Some(v) = env.string("UDP_LISTEN_HOST") {
        settings.udp.listener.host = v;
    }
    if let Some(v) = env.u16("UDP_LISTEN_PORT") {
        settings.udp.listener.port = v;
    }

    // ── Payloads ────────────────────────────────────────────────────
    if let Some(v) = env.string("UDP_MESSAGE_EN") {
        settings.udp.message_en = v;
    }
    if let Some(v) = env.string("UDP_MESSAGE_AR") {
        settings.udp.message_ar = v;
    }
    if let Some(v) = env.bool("LOG_UDP") {
        settings.udp.log_packets = v;
    }

    // ── Stream / trigger ────────────────────────────────────────────
    if let Some(v) = env.u64("HEARTBEAT_INTERVAL_MS", 1_000, 600_000) {
        settings.stream.heartbeat_interval_ms = v;
    }
    if let Some(v) = env.string("TRIGGER_PREFIX") {
        settings.trigger.prefix = v;
    }
}

// ── Pure parsing functions (testable without env vars) ──────────────────────

/// Parse a string as a boolean.
///
/// Accepts (case-insensitive): `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a string as a `u16` within a range.
pub fn parse_u16_range(val: &str, min: u16, max: u16) -> Option<u16> {
    let n: u16 = val.trim().parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `u64` within a range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.trim().parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

// ── Env var readers (thin wrappers) ─────────────────────────────────────────

struct EnvReader<F> {
    lookup: F,
}

impl<F> EnvReader<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn string(&self, name: &str) -> Option<String> {
        (self.lookup)(name).filter(|v| !v.is_empty())
    }

    fn bool(&self, name: &str) -> Option<bool> {
        let val = self.string(name)?;
        let result = parse_bool(&val);
        if result.is_none() {
            tracing::warn!(key = name, value = %val, "invalid boolean env var, ignoring");
        }
        result
    }

    fn u16(&self, name: &str) -> Option<u16> {
        let val = self.string(name)?;
        let result = parse_u16_range(&val, 1, u16::MAX);
        if result.is_none() {
            tracing::warn!(key = name, value = %val, "invalid port env var, ignoring");
        }
        result
    }

    fn u64(&self, name: &str, min: u64, max: u64) -> Option<u64> {
        let val = self.string(name)?;
        let result = parse_u64_range(&val, min, max);
        if result.is_none() {
            tracing::warn!(key = name, value = %val, "invalid u64 env var, ignoring");
        }
        result
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
