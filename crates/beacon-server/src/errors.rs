//! Server error types.

use std::io;

/// Errors starting or running the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// The HTTP listener could not bind.
    #[error("failed to bind HTTP server on {addr}: {source}")]
    Bind {
        /// Requested address.
        addr: String,
        /// Underlying I/O error.
        source: io::Error,
    },
}
