//! Datagram error types.

use std::io;

use thiserror::Error;

/// Listener startup failure.
///
/// Non-fatal for the hosting process: the server keeps running without a
/// listener.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// The address could not be bound (in use, permission denied, bad host).
    #[error("failed to bind UDP listener on {addr}: {source}")]
    Bind {
        /// Requested `host:port`.
        addr: String,
        /// Underlying socket error.
        #[source]
        source: io::Error,
    },
}

/// Outbound send failure, reported to the caller as-is (no retry).
#[derive(Debug, Error)]
pub enum SendError {
    /// Host name lookup failed.
    #[error("failed to resolve {host}: {source}")]
    Resolve {
        /// Host that was looked up.
        host: String,
        /// Resolver error.
        #[source]
        source: io::Error,
    },
    /// Lookup succeeded but produced no address usable from the send socket.
    #[error("no usable address for {host}")]
    NoAddress {
        /// Host that was looked up.
        host: String,
    },
    /// Socket-level failure (bind or send).
    #[error("send failed: {0}")]
    Io(#[from] io::Error),
    /// The sender was closed during shutdown.
    #[error("sender socket is closed")]
    Closed,
}
