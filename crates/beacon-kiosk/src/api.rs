//! HTTP client for the bridge server.

use std::time::Duration;

use async_trait::async_trait;
use beacon_core::constants::{DEFAULT_TRIGGER_PREFIX, UDP_EVENT_NAME};
use beacon_core::{InboundEvent, Language};
use futures::Stream;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::errors::ClientError;
use crate::sse::{SseEvent, parse_sse_events};
use crate::wizard::LanguageSender;

/// Delay before reconnecting a dropped event stream.
pub const RECONNECT_DELAY: Duration = Duration::from_secs(3);

/// Subset of the health response the kiosk uses.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthInfo {
    /// `"ok"` when the server is up.
    pub status: String,
    /// Server build version; absent on older servers.
    #[serde(default)]
    pub version: Option<String>,
    /// Trigger prefix; absent on older servers.
    #[serde(default)]
    pub trigger_prefix: Option<String>,
    /// Open event streams.
    #[serde(default)]
    pub connections: usize,
}

impl HealthInfo {
    /// Prefix to match triggers against, falling back to `end=`.
    pub fn trigger_prefix_or_default(&self) -> String {
        match self.trigger_prefix.as_deref() {
            Some(prefix) if !prefix.is_empty() => prefix.to_owned(),
            _ => DEFAULT_TRIGGER_PREFIX.to_owned(),
        }
    }
}

/// Client for one bridge server.
#[derive(Clone, Debug)]
pub struct BridgeClient {
    base_url: String,
    http: reqwest::Client,
}

impl BridgeClient {
    /// Create a client for `base_url` (e.g. `http://127.0.0.1:3000`).
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        Self {
            base_url,
            http: reqwest::Client::new(),
        }
    }

    /// Server base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// GET /api/health
    pub async fn health(&self) -> Result<HealthInfo, ClientError> {
        let resp = self.http.get(self.url("/api/health")).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ClientError::Status {
                status: status.as_u16(),
                message: "health check failed".into(),
            });
        }
        let body = resp.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// POST /api/send with `{"lang": ...}`. Returns the server's `sent` summary.
    pub async fn send_language(&self, language: Language) -> Result<String, ClientError> {
        let resp = self
            .http
            .post(self.url("/api/send"))
            .json(&json!({ "lang": language.code() }))
            .send()
            .await?;
        let status = resp.status();
        let body = resp.bytes().await?;
        let parsed: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);

        if !status.is_success() {
            let message = parsed
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("Server error")
                .to_owned();
            return Err(ClientError::Status {
                status: status.as_u16(),
                message,
            });
        }

        Ok(sent_summary(&parsed))
    }

    /// GET /events as a stream of parsed events.
    pub async fn events(&self) -> Result<impl Stream<Item = SseEvent> + Send, ClientError> {
        let resp = self
            .http
            .get(self.url("/events"))
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ClientError::Status {
                status: status.as_u16(),
                message: format!("event stream rejected ({status})"),
            });
        }
        Ok(parse_sse_events(Box::pin(resp.bytes_stream())))
    }

    /// Forward every `udp` event to `tx` until `cancel` fires or `tx` closes.
    ///
    /// Reconnects [`RECONNECT_DELAY`] after the stream fails or ends.
    pub async fn run_subscription(
        &self,
        tx: mpsc::UnboundedSender<InboundEvent>,
        cancel: CancellationToken,
    ) {
        loop {
            tokio::select! {
                () = cancel.cancelled() => return,
                () = self.forward_events(&tx) => {}
            }
            if tx.is_closed() {
                return;
            }
            debug!(delay_ms = RECONNECT_DELAY.as_millis(), "reconnecting event stream");
            tokio::select! {
                () = cancel.cancelled() => return,
                () = tokio::time::sleep(RECONNECT_DELAY) => {}
            }
        }
    }

    async fn forward_events(&self, tx: &mpsc::UnboundedSender<InboundEvent>) {
        let stream = match self.events().await {
            Ok(stream) => stream,
            Err(e) => {
                warn!(error = %e, "event stream connect failed");
                return;
            }
        };
        info!(url = %self.base_url, "event stream connected");

        let mut stream = std::pin::pin!(stream);
        while let Some(event) = stream.next().await {
            if event.event != UDP_EVENT_NAME {
                continue;
            }
            match serde_json::from_str::<InboundEvent>(&event.data) {
                Ok(inbound) => {
                    if tx.send(inbound).is_err() {
                        return;
                    }
                }
                Err(e) => warn!(error = %e, "failed to parse udp event"),
            }
        }
        warn!("event stream ended");
    }
}

#[async_trait]
impl LanguageSender for BridgeClient {
    async fn send_language(&self, language: Language) -> Result<String, ClientError> {
        Self::send_language(self, language).await
    }
}

/// `sent`, else the JSON of `meta`, else `OK`.
fn sent_summary(body: &Value) -> String {
    if let Some(sent) = body.get("sent").and_then(Value::as_str) {
        return sent.to_owned();
    }
    match body.get("meta") {
        Some(meta) if !meta.is_null() => meta.to_string(),
        _ => "OK".to_owned(),
    }
}
