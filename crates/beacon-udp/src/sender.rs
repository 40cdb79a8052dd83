//! Outbound datagram sender.
//!
//! One socket is bound at startup and reused for every send until
//! [`DatagramSender::close`]. Each call resolves the destination, sends one
//! datagram and reports how many bytes went out. Sends are independent; no
//! ordering is promised across calls.

use std::net::SocketAddr;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::net::UdpSocket;
use tracing::{debug, trace};

use crate::errors::SendError;

/// Result of a successful send.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SendReceipt {
    /// Destination host as requested.
    pub host: String,
    /// Destination port.
    pub port: u16,
    /// Bytes written.
    pub bytes: usize,
}

/// Long-lived outbound datagram socket.
#[derive(Debug)]
pub struct DatagramSender {
    socket: Mutex<Option<Arc<UdpSocket>>>,
}

impl DatagramSender {
    /// Bind an IPv4 socket on an ephemeral port.
    pub async fn bind() -> Result<Self, SendError> {
        Self::bind_to("0.0.0.0:0").await
    }

    /// Bind the outbound socket to a specific local address.
    pub async fn bind_to(addr: &str) -> Result<Self, SendError> {
        let socket = UdpSocket::bind(addr).await?;
        debug!(local = %socket.local_addr()?, "UDP sender bound");
        Ok(Self {
            socket: Mutex::new(Some(Arc::new(socket))),
        })
    }

    /// Local address of the outbound socket.
    pub fn local_addr(&self) -> Result<SocketAddr, SendError> {
        let socket = self.socket.lock().clone().ok_or(SendError::Closed)?;
        Ok(socket.local_addr()?)
    }

    /// Send `payload` as one datagram to `host:port`.
    pub async fn send(&self, payload: &[u8], host: &str, port: u16) -> Result<SendReceipt, SendError> {
        let socket = self.socket.lock().clone().ok_or(SendError::Closed)?;
        let target = resolve(&socket, host, port).await?;

        trace!(remote = %target, bytes = payload.len(), "sending datagram");
        let bytes = socket.send_to(payload, target).await?;

        Ok(SendReceipt {
            host: host.to_owned(),
            port,
            bytes,
        })
    }

    /// Release the socket. Later sends fail with [`SendError::Closed`].
    pub fn close(&self) {
        if self.socket.lock().take().is_some() {
            debug!("UDP sender closed");
        }
    }

    /// Whether [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.socket.lock().is_none()
    }
}

/// Resolve `host:port`, preferring an address of the socket's family.
async fn resolve(socket: &UdpSocket, host: &str, port: u16) -> Result<SocketAddr, SendError> {
    let want_v4 = socket.local_addr()?.is_ipv4();
    let addrs = tokio::net::lookup_host((host, port))
        .await
        .map_err(|source| SendError::Resolve {
            host: host.to_owned(),
            source,
        })?;

    let mut fallback = None;
    for addr in addrs {
        if addr.is_ipv4() == want_v4 {
            return Ok(addr);
        }
        fallback.get_or_insert(addr);
    }
    fallback.ok_or_else(|| SendError::NoAddress {
        host: host.to_owned(),
    })
}
