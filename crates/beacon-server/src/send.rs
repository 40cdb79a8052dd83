//! `POST /api/send`: send one datagram.
//!
//! The body names either a language (`{"lang":"en"}`), whose payload comes
//! from configuration, or an explicit `message`. `message` wins when both
//! are present; a non-string `message` is sent as its JSON text. `host` and
//! `port` optionally override the configured target.

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use beacon_core::Language;
use beacon_settings::UdpSettings;
use beacon_udp::SendError;
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{error, info};

use crate::server::AppState;

/// A validated send: what goes where.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SendPlan {
    /// Datagram payload (UTF-8).
    pub payload: String,
    /// Destination host.
    pub host: String,
    /// Destination port.
    pub port: u16,
}

/// Request rejections and send failures.
#[derive(Debug, thiserror::Error)]
pub enum SendApiError {
    /// Neither a known `lang` nor a `message` was supplied.
    #[error("Missing lang or message in body")]
    MissingPayload,
    /// `port` was present but not a valid port number.
    #[error("Invalid port")]
    InvalidPort,
    /// The datagram could not be sent.
    #[error(transparent)]
    Send(#[from] SendError),
}

impl IntoResponse for SendApiError {
    fn into_response(self) -> Response {
        match self {
            Self::MissingPayload | Self::InvalidPort => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": self.to_string() })),
            )
                .into_response(),
            Self::Send(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "ok": false, "error": e.to_string() })),
            )
                .into_response(),
        }
    }
}

/// Successful send response.
#[derive(Debug, Clone, Serialize)]
pub struct SendResponse {
    /// Always `true`.
    pub ok: bool,
    /// `"<payload> → <host>:<port> (<n> bytes)"`.
    pub sent: String,
    /// Structured form of `sent`.
    pub meta: SendMeta,
}

/// What was sent, structured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SendMeta {
    /// Payload text.
    pub payload: String,
    /// Destination host.
    pub host: String,
    /// Destination port.
    pub port: u16,
    /// Bytes written.
    pub bytes: usize,
}

impl SendMeta {
    /// Human-readable one-line summary.
    pub fn summary(&self) -> String {
        format!(
            "{} → {}:{} ({} bytes)",
            self.payload, self.host, self.port, self.bytes
        )
    }
}

/// Work out payload and destination from a request body.
pub fn plan_send(body: &Value, udp: &UdpSettings) -> Result<SendPlan, SendApiError> {
    let payload = match body.get("message") {
        Some(Value::String(text)) => text.clone(),
        Some(Value::Null) | None => {
            let language = body
                .get("lang")
                .and_then(Value::as_str)
                .and_then(|code| code.parse::<Language>().ok())
                .ok_or(SendApiError::MissingPayload)?;
            udp.message_for(language).to_owned()
        }
        Some(other) => other.to_string(),
    };

    let host = match body.get("host") {
        Some(Value::String(host)) if !host.trim().is_empty() => host.trim().to_owned(),
        _ => udp.target.host.clone(),
    };

    let port = parse_port(body.get("port"))?.unwrap_or(udp.target.port);

    Ok(SendPlan {
        payload,
        host,
        port,
    })
}

/// Absent, `null`, `0` and `""` mean "use the default".
fn parse_port(value: Option<&Value>) -> Result<Option<u16>, SendApiError> {
    let port = match value {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Number(n)) => n.as_u64().ok_or(SendApiError::InvalidPort)?,
        Some(Value::String(s)) if s.trim().is_empty() => return Ok(None),
        Some(Value::String(s)) => s.trim().parse::<u64>().map_err(|_| SendApiError::InvalidPort)?,
        Some(_) => return Err(SendApiError::InvalidPort),
    };
    match port {
        0 => Ok(None),
        p => u16::try_from(p).map(Some).map_err(|_| SendApiError::InvalidPort),
    }
}

/// POST /api/send
pub async fn send_handler(State(state): State<AppState>, body: Bytes) -> Response {
    // An unparseable body is treated as an empty one.
    let body: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);

    match execute(&state, &body).await {
        Ok(response) => Json(response).into_response(),
        Err(e) => {
            if matches!(e, SendApiError::Send(_)) {
                error!(error = %e, "datagram send failed");
            }
            e.into_response()
        }
    }
}

async fn execute(state: &AppState, body: &Value) -> Result<SendResponse, SendApiError> {
    let plan = plan_send(body, &state.config.udp)?;
    let receipt = state
        .sender
        .send(plan.payload.as_bytes(), &plan.host, plan.port)
        .await?;

    let meta = SendMeta {
        payload: plan.payload,
        host: receipt.host,
        port: receipt.port,
        bytes: receipt.bytes,
    };
    if state.config.udp.log_packets {
        info!(target_host = %meta.host, port = meta.port, bytes = meta.bytes, payload = %meta.payload, "datagram sent");
    }

    Ok(SendResponse {
        ok: true,
        sent: meta.summary(),
        meta,
    })
}
