//! Package-level constants shared by the server and the kiosk client.

use std::time::Duration;

/// Current version of the bridge (sourced from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Package name.
pub const NAME: &str = "beacon";

/// Trigger prefix used when none is configured or the client cannot fetch one.
pub const DEFAULT_TRIGGER_PREFIX: &str = "end=";

/// Text placed in [`crate::InboundEvent::text`] when a payload is not valid UTF-8.
pub const INVALID_UTF8_SENTINEL: &str = "[invalid utf8]";

/// Event name used for datagram frames on the event stream.
pub const UDP_EVENT_NAME: &str = "udp";

/// Default keep-alive interval for open event streams, in milliseconds.
pub const DEFAULT_HEARTBEAT_INTERVAL_MS: u64 = 20_000;

/// Default keep-alive interval for open event streams.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_millis(DEFAULT_HEARTBEAT_INTERVAL_MS);

/// How long the result step stays visible before returning home.
pub const AUTO_RETURN_DELAY: Duration = Duration::from_millis(10_000);

/// How long a send status message stays before reverting to `Ready`.
pub const STATUS_RESET_DELAY: Duration = Duration::from_millis(1_400);
