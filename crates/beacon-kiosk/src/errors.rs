//! Client error types.

/// Errors talking to the bridge server.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Transport failure (connect, read, timeout).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success status. `message` is the server's `error` field when present.
    #[error("{message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Human-readable reason.
        message: String,
    },

    /// Response body was not the expected JSON.
    #[error("invalid response: {0}")]
    Decode(#[from] serde_json::Error),
}
