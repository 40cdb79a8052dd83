//! Structured form of a received datagram.
//!
//! An [`InboundEvent`] is built once per datagram by the listener and then
//! only read: it is serialized onto every open event stream and parsed back
//! by each kiosk client. The JSON shape is part of the wire contract:
//!
//! ```json
//! {"timestamp":"2026-01-01T00:00:00.000Z",
//!  "from":{"address":"127.0.0.1","port":5000,"family":"IPv4"},
//!  "text":"end=3","hex":"65 6e 64 3d 33","bytes":5}
//! ```

use std::fmt::Write as _;
use std::net::SocketAddr;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::INVALID_UTF8_SENTINEL;

/// Sender of a datagram.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerInfo {
    /// Source IP address.
    pub address: String,
    /// Source port.
    pub port: u16,
    /// `IPv4` or `IPv6`.
    pub family: String,
}

impl From<SocketAddr> for PeerInfo {
    fn from(addr: SocketAddr) -> Self {
        let family = if addr.is_ipv4() { "IPv4" } else { "IPv6" };
        Self {
            address: addr.ip().to_string(),
            port: addr.port(),
            family: family.into(),
        }
    }
}

/// One received datagram, decoded.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundEvent {
    /// Receive time, UTC, millisecond precision.
    pub timestamp: String,
    /// Who sent it.
    pub from: PeerInfo,
    /// Payload as UTF-8, or the invalid-UTF-8 sentinel.
    pub text: String,
    /// Payload as space-separated lowercase hex pairs.
    pub hex: String,
    /// Payload length in bytes.
    pub bytes: usize,
}

impl InboundEvent {
    /// Decode a datagram received now.
    pub fn from_datagram(payload: &[u8], from: SocketAddr) -> Self {
        Self::from_datagram_at(payload, from, Utc::now())
    }

    /// Decode a datagram with an explicit receive time.
    pub fn from_datagram_at(payload: &[u8], from: SocketAddr, received_at: DateTime<Utc>) -> Self {
        Self {
            timestamp: received_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            from: PeerInfo::from(from),
            text: decode_text(payload),
            hex: hex_pairs(payload),
            bytes: payload.len(),
        }
    }

    /// Multi-line human-readable dump used by packet logging.
    pub fn dump(&self) -> String {
        let rule = "-".repeat(50);
        format!(
            "{rule}\n{}  Received {} bytes from {}:{} ({})\n\n== As UTF-8 ==\n{}\n\n== As hex ==\n{}\n{rule}\n",
            self.timestamp,
            self.bytes,
            self.from.address,
            self.from.port,
            self.from.family,
            self.text,
            self.hex,
        )
    }
}

/// Decode a payload as UTF-8, substituting the sentinel on failure.
pub fn decode_text(payload: &[u8]) -> String {
    match std::str::from_utf8(payload) {
        Ok(text) => text.to_owned(),
        Err(_) => INVALID_UTF8_SENTINEL.to_owned(),
    }
}

/// Render bytes as `"de ad be ef"`.
pub fn hex_pairs(payload: &[u8]) -> String {
    let mut out = String::with_capacity(payload.len() * 3);
    for (i, byte) in payload.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        let _ = write!(out, "{byte:02x}");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn peer() -> SocketAddr {
        "127.0.0.1:5000".parse().unwrap()
    }

    #[test]
    fn decodes_utf8_payload() {
        let ev = InboundEvent::from_datagram(b"ENGLISH_SIGNAL", peer());
        assert_eq!(ev.text, "ENGLISH_SIGNAL");
        assert_eq!(ev.bytes, 14);
        assert_eq!(ev.hex, "45 4e 47 4c 49 53 48 5f 53 49 47 4e 41 4c");
    }

    #[test]
    fn invalid_utf8_uses_sentinel() {
        let ev = InboundEvent::from_datagram(&[0xff, 0xfe, 0x41], peer());
        assert_eq!(ev.text, INVALID_UTF8_SENTINEL);
        assert_eq!(ev.hex, "ff fe 41");
        assert_eq!(ev.bytes, 3);
    }

    #[test]
    fn empty_payload() {
        let ev = InboundEvent::from_datagram(b"", peer());
        assert_eq!(ev.text, "");
        assert_eq!(ev.hex, "");
        assert_eq!(ev.bytes, 0);
    }

    #[test]
    fn multibyte_text_kept() {
        let ev = InboundEvent::from_datagram("مرحبا".as_bytes(), peer());
        assert_eq!(ev.text, "مرحبا");
        assert_eq!(ev.bytes, 10);
    }

    #[test]
    fn peer_family() {
        let v4 = PeerInfo::from(peer());
        assert_eq!(v4.family, "IPv4");
        assert_eq!(v4.address, "127.0.0.1");
        assert_eq!(v4.port, 5000);

        let v6 = PeerInfo::from("[::1]:9000".parse::<SocketAddr>().unwrap());
        assert_eq!(v6.family, "IPv6");
        assert_eq!(v6.address, "::1");
    }

    #[test]
    fn timestamp_has_millis_and_z() {
        let at = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        let ev = InboundEvent::from_datagram_at(b"x", peer(), at);
        assert_eq!(ev.timestamp, "2026-01-02T03:04:05.000Z");
    }

    #[test]
    fn wire_shape() {
        let at = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let ev = InboundEvent::from_datagram_at(b"end=3", peer(), at);
        let v = serde_json::to_value(&ev).unwrap();
        assert_eq!(
            v,
            serde_json::json!({
                "timestamp": "2026-01-01T00:00:00.000Z",
                "from": {"address": "127.0.0.1", "port": 5000, "family": "IPv4"},
                "text": "end=3",
                "hex": "65 6e 64 3d 33",
                "bytes": 5
            })
        );
    }

    #[test]
    fn dump_contains_sections() {
        let ev = InboundEvent::from_datagram(b"hi", peer());
        let dump = ev.dump();
        assert!(dump.contains("Received 2 bytes from 127.0.0.1:5000 (IPv4)"));
        assert!(dump.contains("== As UTF-8 ==\nhi"));
        assert!(dump.contains("== As hex ==\n68 69"));
    }
}
