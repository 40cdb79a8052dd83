//! `BeaconServer`: Axum HTTP server wiring the registry, listener and sender.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::extract::State;
use axum::response::Json;
use axum::routing::{get, post};
use beacon_core::EventSink;
use beacon_settings::UdpEndpoint;
use beacon_udp::{DatagramSender, ListenerError, ListenerHandle, ListenerOptions, start_listener};
use parking_lot::Mutex;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::config::ServerConfig;
use crate::errors::ServerError;
use crate::health::{self, HealthResponse};
use crate::send::send_handler;
use crate::shutdown::{HTTP_DRAIN_TIMEOUT, ShutdownReport, Teardown};
use crate::stream::broadcast::BroadcastManager;
use crate::stream::handler::events_handler;

/// Shared state accessible from Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Subscriber registry.
    pub broadcast: Arc<BroadcastManager>,
    /// Outbound datagram socket.
    pub sender: Arc<DatagramSender>,
    /// Inbound listener, when running.
    pub listener: Arc<Mutex<Option<ListenerHandle>>>,
    /// When the server started.
    pub start_time: Instant,
}

impl AppState {
    /// Address of the live listener, if any.
    pub fn listener_endpoint(&self) -> Option<UdpEndpoint> {
        self.listener
            .lock()
            .as_ref()
            .filter(|handle| handle.is_active())
            .map(|handle| {
                let addr = handle.local_addr();
                UdpEndpoint::new(addr.ip().to_string(), addr.port())
            })
    }
}

/// The beacon server.
pub struct BeaconServer {
    state: AppState,
    http_shutdown: CancellationToken,
}

impl BeaconServer {
    /// Create a server around an already-bound sender socket.
    pub fn new(config: ServerConfig, sender: DatagramSender) -> Self {
        let broadcast = Arc::new(BroadcastManager::with_queue_capacity(config.send_queue));
        Self {
            state: AppState {
                config: Arc::new(config),
                broadcast,
                sender: Arc::new(sender),
                listener: Arc::new(Mutex::new(None)),
                start_time: Instant::now(),
            },
            http_shutdown: CancellationToken::new(),
        }
    }

    /// Build the Axum router with all routes.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/events", get(events_handler))
            .route("/api/send", post(send_handler))
            .route("/api/health", get(health_handler))
            .route("/health", get(health_handler))
            .with_state(self.state.clone())
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
    }

    /// Get the broadcast manager.
    pub fn broadcast(&self) -> &Arc<BroadcastManager> {
        &self.state.broadcast
    }

    /// Whether [`stop`](Self::stop) has begun.
    pub fn is_stopping(&self) -> bool {
        self.http_shutdown.is_cancelled()
    }

    /// Get the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.state.config
    }

    /// Get the datagram sender.
    pub fn sender(&self) -> &Arc<DatagramSender> {
        &self.state.sender
    }

    /// Bound address of the live listener.
    pub fn listener_addr(&self) -> Option<SocketAddr> {
        self.state
            .listener
            .lock()
            .as_ref()
            .filter(|handle| handle.is_active())
            .map(ListenerHandle::local_addr)
    }

    /// Start a listener publishing into the registry, replacing any running one.
    pub async fn start_listener(&self, host: &str, port: u16) -> Result<SocketAddr, ListenerError> {
        let sink: Arc<dyn EventSink> = self.state.broadcast.clone();
        let options = ListenerOptions {
            log_packets: self.state.config.udp.log_packets,
        };
        let handle = start_listener(host, port, sink, options).await?;
        let addr = handle.local_addr();

        if let Some(previous) = self.state.listener.lock().replace(handle) {
            previous.close();
        }
        Ok(addr)
    }

    /// Start the configured listener if enabled.
    ///
    /// A bind failure is logged and the server carries on without one.
    pub async fn start_configured_listener(&self) -> Option<SocketAddr> {
        let settings = &self.state.config.udp.listener;
        if !settings.enabled {
            return None;
        }
        match self.start_listener(&settings.host, settings.port).await {
            Ok(addr) => Some(addr),
            Err(e) => {
                error!(error = %e, "continuing without UDP listener");
                None
            }
        }
    }

    /// Bind the HTTP listener, start the heartbeat and serve in a background task.
    pub async fn listen(&self) -> Result<(SocketAddr, JoinHandle<()>), ServerError> {
        let addr = self.state.config.bind_addr();
        let tcp = TcpListener::bind(&addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: addr.clone(),
                source,
            })?;
        let local_addr = tcp
            .local_addr()
            .map_err(|source| ServerError::Bind { addr, source })?;

        let _ = self
            .state
            .broadcast
            .start_heartbeat(self.state.config.heartbeat_interval);

        let router = self.router();
        let token = self.http_shutdown.clone();
        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(tcp, router)
                .with_graceful_shutdown(token.cancelled_owned())
                .await
            {
                error!(error = %e, "HTTP server error");
            }
        });

        info!(addr = %local_addr, "HTTP server listening");
        Ok((local_addr, handle))
    }

    /// Stop serving and release every resource.
    ///
    /// See [`Teardown`] for the order of the steps.
    pub async fn stop(&self, server: JoinHandle<()>) -> ShutdownReport {
        Teardown {
            http: &self.http_shutdown,
            registry: &self.state.broadcast,
            listener: &self.state.listener,
            sender: &self.state.sender,
        }
        .run(server, HTTP_DRAIN_TIMEOUT)
        .await
    }
}

/// GET /health, GET /api/health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let resp = health::health_check(
        state.start_time,
        &state.config,
        state.listener_endpoint(),
        state.broadcast.connection_count(),
    );
    Json(resp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use futures::StreamExt;
    use tokio::net::UdpSocket;
    use tower::ServiceExt;

    async fn make_server() -> BeaconServer {
        let sender = DatagramSender::bind().await.unwrap();
        BeaconServer::new(ServerConfig::default(), sender)
    }

    async fn json_body(resp: axum::response::Response) -> serde_json::Value {
        let body = axum::body::to_bytes(resp.into_body(), 10_000).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    fn post_send(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/send")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_owned()))
            .unwrap()
    }

    #[tokio::test]
    async fn health_endpoint_returns_ok() {
        let server = make_server().await;
        for uri in ["/health", "/api/health"] {
            let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
            let resp = server.router().oneshot(req).await.unwrap();
            assert_eq!(resp.status(), StatusCode::OK);

            let parsed = json_body(resp).await;
            assert_eq!(parsed["status"], "ok");
            assert_eq!(parsed["udpTarget"]["port"], 41234);
            assert!(parsed["listener"].is_null());
            assert_eq!(parsed["triggerPrefix"], "end=");
            assert_eq!(parsed["connections"], 0);
        }
    }

    #[tokio::test]
    async fn health_reports_live_listener() {
        let server = make_server().await;
        let addr = server.start_listener("127.0.0.1", 0).await.unwrap();
        assert_eq!(server.listener_addr(), Some(addr));

        let req = Request::builder().uri("/api/health").body(Body::empty()).unwrap();
        let parsed = json_body(server.router().oneshot(req).await.unwrap()).await;
        assert_eq!(parsed["listener"]["host"], "127.0.0.1");
        assert_eq!(parsed["listener"]["port"], addr.port());
    }

    #[tokio::test]
    async fn configured_listener_bind_failure_is_not_fatal() {
        let blocker = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let mut config = ServerConfig::default();
        config.udp.listener.enabled = true;
        config.udp.listener.port = blocker.local_addr().unwrap().port();

        let server = BeaconServer::new(config, DatagramSender::bind().await.unwrap());
        assert_eq!(server.start_configured_listener().await, None);
        assert_eq!(server.listener_addr(), None);

        let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let resp = server.router().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn disabled_listener_is_not_started() {
        let server = make_server().await;
        assert_eq!(server.start_configured_listener().await, None);
    }

    #[tokio::test]
    async fn send_missing_payload_is_400() {
        let server = make_server().await;
        for body in ["{}", r#"{"lang":"fr"}"#, "not json", ""] {
            let resp = server.router().oneshot(post_send(body)).await.unwrap();
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
            let parsed = json_body(resp).await;
            assert_eq!(parsed["error"], "Missing lang or message in body");
        }
    }

    #[tokio::test]
    async fn send_invalid_port_is_400() {
        let server = make_server().await;
        let resp = server
            .router()
            .oneshot(post_send(r#"{"lang":"en","port":"abc"}"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(resp).await["error"], "Invalid port");
    }

    #[tokio::test]
    async fn send_delivers_datagram() {
        let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let port = receiver.local_addr().unwrap().port();
        let server = make_server().await;

        let body = format!(r#"{{"lang":"en","host":"127.0.0.1","port":{port}}}"#);
        let resp = server.router().oneshot(post_send(&body)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let parsed = json_body(resp).await;
        assert_eq!(parsed["ok"], true);
        assert_eq!(
            parsed["sent"],
            format!("ENGLISH_SIGNAL → 127.0.0.1:{port} (14 bytes)")
        );
        assert_eq!(parsed["meta"]["payload"], "ENGLISH_SIGNAL");
        assert_eq!(parsed["meta"]["bytes"], 14);

        let mut buf = [0u8; 64];
        let (n, _) = tokio::time::timeout(Duration::from_secs(5), receiver.recv_from(&mut buf))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(&buf[..n], b"ENGLISH_SIGNAL");
    }

    #[tokio::test]
    async fn send_failure_is_500() {
        let server = make_server().await;
        server.sender().close();

        let resp = server
            .router()
            .oneshot(post_send(r#"{"lang":"ar"}"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let parsed = json_body(resp).await;
        assert_eq!(parsed["ok"], false);
        assert_eq!(parsed["error"], "sender socket is closed");
    }

    #[tokio::test]
    async fn events_endpoint_streams_connected_comment() {
        let server = make_server().await;
        let req = Request::builder().uri("/events").body(Body::empty()).unwrap();
        let resp = server.router().oneshot(req).await.unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        let content_type = resp.headers()[header::CONTENT_TYPE].to_str().unwrap();
        assert!(content_type.starts_with("text/event-stream"));
        assert_eq!(resp.headers()[header::CACHE_CONTROL], "no-cache");
        assert_eq!(server.broadcast().connection_count(), 1);

        let mut body = resp.into_body().into_data_stream();
        let first = body.next().await.unwrap().unwrap();
        assert_eq!(&first[..], b": connected\n\n");

        let _ = server.broadcast().broadcast("udp", r#"{"text":"end=1"}"#);
        let second = body.next().await.unwrap().unwrap();
        assert_eq!(&second[..], b"event: udp\ndata: {\"text\":\"end=1\"}\n\n");

        drop(body);
        assert_eq!(server.broadcast().connection_count(), 0);
    }

    #[tokio::test]
    async fn unknown_route_returns_404() {
        let server = make_server().await;
        let req = Request::builder().uri("/nonexistent").body(Body::empty()).unwrap();
        let resp = server.router().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn listen_and_stop() {
        let server = make_server().await;
        let _ = server.start_listener("127.0.0.1", 0).await.unwrap();
        let (addr, handle) = server.listen().await.unwrap();
        assert_ne!(addr.port(), 0);
        assert!(server.broadcast().is_heartbeat_running());

        let report = server.stop(handle).await;
        assert!(report.listener_closed);
        assert!(report.heartbeat_stopped);
        assert!(report.http_drained);
        assert!(server.is_stopping());
        assert!(!server.broadcast().is_heartbeat_running());
        assert!(server.sender().is_closed());
        assert_eq!(server.listener_addr(), None);
    }
}
