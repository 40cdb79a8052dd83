//! Inbound datagram listener.
//!
//! [`start_listener`] binds a socket and spawns a receive loop that turns
//! every datagram into an [`InboundEvent`] and hands it to the configured
//! [`EventSink`]. Decoding and publishing are synchronous and non-blocking,
//! so the loop goes straight back to `recv_from`.
//!
//! A bind failure is returned as [`ListenerError::Bind`]; callers log it and
//! carry on without a listener. Errors after a successful bind are logged
//! and the loop keeps receiving after a short pause.

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use beacon_core::{EventSink, InboundEvent};
use parking_lot::Mutex;
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::errors::ListenerError;

/// Largest possible UDP payload.
const MAX_DATAGRAM: usize = 65_535;

/// Pause after a failed receive before reading again.
const RECV_ERROR_BACKOFF: Duration = Duration::from_millis(50);

/// Where the receive loop reads datagrams from.
trait DatagramSource: Send + Sync + 'static {
    fn recv_from(
        &self,
        buf: &mut [u8],
    ) -> impl Future<Output = io::Result<(usize, SocketAddr)>> + Send;
}

impl DatagramSource for UdpSocket {
    fn recv_from(
        &self,
        buf: &mut [u8],
    ) -> impl Future<Output = io::Result<(usize, SocketAddr)>> + Send {
        UdpSocket::recv_from(self, buf)
    }
}

/// Listener behaviour switches.
#[derive(Clone, Debug, Default)]
pub struct ListenerOptions {
    /// Log a full dump (text + hex) of every datagram at info level.
    pub log_packets: bool,
}

/// Handle to a running listener.
///
/// Cloning shares the same listener. [`close`](Self::close) may be called any
/// number of times; only the first call has an effect.
#[derive(Clone, Debug)]
pub struct ListenerHandle {
    local_addr: SocketAddr,
    cancel: CancellationToken,
    task: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl ListenerHandle {
    /// Address the socket is bound to (useful when binding port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Whether the listener is still receiving.
    pub fn is_active(&self) -> bool {
        !self.cancel.is_cancelled()
    }

    /// Stop receiving and release the socket.
    pub fn close(&self) {
        if self.cancel.is_cancelled() {
            return;
        }
        self.cancel.cancel();
        info!(addr = %self.local_addr, "UDP listener closed");
    }

    /// Wait for the receive loop to finish after [`close`](Self::close).
    pub async fn closed(&self) {
        let task = self.task.lock().take();
        if let Some(task) = task {
            let _ = task.await;
        }
    }
}

/// Bind `host:port` and start publishing datagrams to `sink`.
pub async fn start_listener(
    host: &str,
    port: u16,
    sink: Arc<dyn EventSink>,
    options: ListenerOptions,
) -> Result<ListenerHandle, ListenerError> {
    let addr = format_addr(host, port);
    debug!(addr = %addr, "binding UDP listener");

    let socket = UdpSocket::bind((host, port)).await.map_err(|source| {
        error!(addr = %addr, error = %source, "UDP listener bind failed");
        ListenerError::Bind {
            addr: addr.clone(),
            source,
        }
    })?;
    let local_addr = socket
        .local_addr()
        .map_err(|source| ListenerError::Bind { addr, source })?;

    info!(addr = %local_addr, "UDP listener listening");

    let cancel = CancellationToken::new();
    let task = tokio::spawn(receive_loop(socket, sink, cancel.clone(), options));

    Ok(ListenerHandle {
        local_addr,
        cancel,
        task: Arc::new(Mutex::new(Some(task))),
    })
}

async fn receive_loop<S: DatagramSource>(
    socket: S,
    sink: Arc<dyn EventSink>,
    cancel: CancellationToken,
    options: ListenerOptions,
) {
    let mut buf = vec![0u8; MAX_DATAGRAM];
    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            received = socket.recv_from(&mut buf) => match received {
                Ok((len, from)) => {
                    let event = InboundEvent::from_datagram(&buf[..len], from);
                    if options.log_packets {
                        info!("\n{}", event.dump());
                    } else {
                        debug!(from = %from, bytes = len, "datagram received");
                    }
                    sink.publish(&event);
                }
                Err(e) => {
                    warn!(error = %e, "UDP receive error");
                    tokio::select! {
                        () = cancel.cancelled() => break,
                        () = tokio::time::sleep(RECV_ERROR_BACKOFF) => {}
                    }
                }
            }
        }
    }
}

fn format_addr(host: &str, port: u16) -> String {
    if host.contains(':') {
        format!("[{host}]:{port}")
    } else {
        format!("{host}:{port}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tokio::sync::mpsc;
    use tokio::time::timeout;

    use crate::sender::DatagramSender;

    const TIMEOUT: Duration = Duration::from_secs(5);

    struct ChannelSink(mpsc::UnboundedSender<InboundEvent>);

    impl EventSink for ChannelSink {
        fn publish(&self, event: &InboundEvent) {
            let _ = self.0.send(event.clone());
        }
    }

    async fn listen() -> (ListenerHandle, mpsc::UnboundedReceiver<InboundEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = start_listener(
            "127.0.0.1",
            0,
            Arc::new(ChannelSink(tx)),
            ListenerOptions::default(),
        )
        .await
        .unwrap();
        (handle, rx)
    }

    #[tokio::test]
    async fn sender_to_listener_roundtrip() {
        let (handle, mut rx) = listen().await;
        let sender = DatagramSender::bind().await.unwrap();

        let receipt = sender
            .send(b"ENGLISH_SIGNAL", "127.0.0.1", handle.local_addr().port())
            .await
            .unwrap();
        assert_eq!(receipt.bytes, 14);

        let event = timeout(TIMEOUT, rx.recv()).await.unwrap().unwrap();
        assert_eq!(event.text, "ENGLISH_SIGNAL");
        assert_eq!(event.bytes, 14);
        assert_eq!(event.hex, "45 4e 47 4c 49 53 48 5f 53 49 47 4e 41 4c");
        assert_eq!(event.from.address, "127.0.0.1");
        assert_eq!(event.from.family, "IPv4");
        assert_eq!(event.from.port, sender.local_addr().unwrap().port());
    }

    #[tokio::test]
    async fn datagrams_published_in_order() {
        let (handle, mut rx) = listen().await;
        let sender = DatagramSender::bind().await.unwrap();
        let port = handle.local_addr().port();

        for i in 0..5 {
            let _ = sender
                .send(format!("end={i}").as_bytes(), "127.0.0.1", port)
                .await
                .unwrap();
        }
        for i in 0..5 {
            let event = timeout(TIMEOUT, rx.recv()).await.unwrap().unwrap();
            assert_eq!(event.text, format!("end={i}"));
        }
    }

    #[tokio::test]
    async fn invalid_utf8_is_published_with_sentinel() {
        let (handle, mut rx) = listen().await;
        let sender = DatagramSender::bind().await.unwrap();
        let _ = sender
            .send(&[0xc3, 0x28], "127.0.0.1", handle.local_addr().port())
            .await
            .unwrap();

        let event = timeout(TIMEOUT, rx.recv()).await.unwrap().unwrap();
        assert_eq!(event.text, beacon_core::constants::INVALID_UTF8_SENTINEL);
        assert_eq!(event.hex, "c3 28");
    }

    #[tokio::test]
    async fn bind_conflict_is_reported_not_fatal() {
        let (first, _rx) = listen().await;
        let (tx, _rx2) = mpsc::unbounded_channel();
        let result = start_listener(
            "127.0.0.1",
            first.local_addr().port(),
            Arc::new(ChannelSink(tx)),
            ListenerOptions::default(),
        )
        .await;
        let err = result.unwrap_err();
        assert!(matches!(err, ListenerError::Bind { .. }));
        assert!(first.is_active());
    }

    #[tokio::test]
    async fn close_is_idempotent_and_stops_publishing() {
        let (handle, mut rx) = listen().await;
        handle.close();
        handle.close();
        handle.closed().await;
        handle.closed().await;
        assert!(!handle.is_active());

        // Receive loop exited and dropped its sink.
        assert!(timeout(TIMEOUT, rx.recv()).await.unwrap().is_none());
    }

    /// Fails every read and counts the attempts.
    struct FailingSource(Arc<AtomicUsize>);

    impl DatagramSource for FailingSource {
        fn recv_from(
            &self,
            _buf: &mut [u8],
        ) -> impl Future<Output = io::Result<(usize, SocketAddr)>> + Send {
            let _ = self.0.fetch_add(1, Ordering::SeqCst);
            std::future::ready(Err(io::Error::from(io::ErrorKind::ConnectionReset)))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn receive_errors_back_off() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let (tx, _rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let task = tokio::spawn(receive_loop(
            FailingSource(attempts.clone()),
            Arc::new(ChannelSink(tx)),
            cancel.clone(),
            ListenerOptions::default(),
        ));

        tokio::time::sleep(Duration::from_secs(1)).await;
        let seen = attempts.load(Ordering::SeqCst);
        assert!((2..=21).contains(&seen), "{seen} reads in one second");

        // Cancelling during the pause ends the loop.
        cancel.cancel();
        timeout(TIMEOUT, task).await.unwrap().unwrap();
    }

    #[test]
    fn ipv6_addr_formatting() {
        assert_eq!(format_addr("::1", 5000), "[::1]:5000");
        assert_eq!(format_addr("127.0.0.1", 5000), "127.0.0.1:5000");
    }
}
