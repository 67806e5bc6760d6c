//! UDP transport to the device.
//!
//! Each frame is one datagram. Sends never suspend the caller: frames are
//! queued on an unbounded channel and a sender task writes them to the socket
//! in order. The task stops once every clone of the transport is dropped.

use super::{Transport, TransportError};
use crate::codec::{CommandRequest, Message};
use log::{debug, info, warn};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Largest datagram the receiver accepts.
pub const MAX_DATAGRAM_SIZE: usize = 1024;

/// Frame waiting for the sender task.
#[derive(Debug)]
struct OutboundFrame {
    bytes: Vec<u8>,
    what: &'static str,
}

/// UDP link to one device.
#[derive(Debug, Clone)]
pub struct UdpTransport {
    socket: Arc<UdpSocket>,
    peer: SocketAddr,
    outbound: mpsc::UnboundedSender<OutboundFrame>,
}

impl UdpTransport {
    /// Bind a local socket and address frames to `peer`.
    pub async fn bind(local: SocketAddr, peer: SocketAddr) -> Result<Self, TransportError> {
        let socket = UdpSocket::bind(local)
            .await
            .map_err(TransportError::Bind)?;
        info!(
            "UDP transport bound to {}, device at {}",
            socket
                .local_addr()
                .map(|a| a.to_string())
                .unwrap_or_default(),
            peer
        );
        let socket = Arc::new(socket);
        let (outbound, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_sender(socket.clone(), peer, rx));

        Ok(Self {
            socket,
            peer,
            outbound,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        self.socket.local_addr().map_err(TransportError::Io)
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Forward datagrams from the device into `inbound` until cancelled.
    ///
    /// Datagrams from other addresses are ignored.
    pub fn spawn_receiver(
        &self,
        inbound: mpsc::Sender<Vec<u8>>,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        let socket = self.socket.clone();
        let peer = self.peer;

        tokio::spawn(async move {
            let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        debug!("UDP receiver shutting down");
                        break;
                    }

                    result = socket.recv_from(&mut buf) => {
                        match result {
                            Ok((len, from)) if from == peer => {
                                if inbound.send(buf[..len].to_vec()).await.is_err() {
                                    debug!("Inbound channel closed, stopping UDP receiver");
                                    break;
                                }
                            }
                            Ok((len, from)) => {
                                debug!("Ignoring {} byte datagram from {}", len, from);
                            }
                            Err(e) => {
                                warn!("UDP receive error: {}", e);
                            }
                        }
                    }
                }
            }
        })
    }

    fn send_frame(&self, bytes: Vec<u8>, what: &'static str) {
        if self.outbound.send(OutboundFrame { bytes, what }).is_err() {
            warn!("UDP sender stopped, dropping {}", what);
        }
    }
}

/// Write queued frames to `peer` until every sender handle is dropped.
async fn run_sender(
    socket: Arc<UdpSocket>,
    peer: SocketAddr,
    mut rx: mpsc::UnboundedReceiver<OutboundFrame>,
) {
    while let Some(frame) = rx.recv().await {
        match socket.send_to(&frame.bytes, peer).await {
            Ok(len) => debug!("Sent {} ({} bytes) to {}", frame.what, len, peer),
            Err(e) => warn!("Failed to send {} to {}: {}", frame.what, peer, e),
        }
    }
    debug!("UDP sender shutting down");
}

impl Transport for UdpTransport {
    fn send_message(&mut self, message: &Message) {
        self.send_frame(message.to_bytes(), message.payload.name());
    }

    fn send_command(&mut self, command: &CommandRequest) {
        self.send_frame(command.to_bytes(), "command");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{build_connect_network_message, decode_frame, Frame};
    use crate::config::{ProtocolConfig, SessionIds};
    use std::time::Duration;
    use tokio::time::timeout;

    const TIMEOUT: Duration = Duration::from_secs(5);

    fn loopback() -> SocketAddr {
        "127.0.0.1:0".parse().unwrap()
    }

    #[tokio::test]
    async fn test_send_message_reaches_peer() {
        let device = UdpSocket::bind(loopback()).await.unwrap();
        let mut transport = UdpTransport::bind(loopback(), device.local_addr().unwrap())
            .await
            .unwrap();

        let protocol = ProtocolConfig::default();
        let msg = build_connect_network_message(SessionIds::default(), &protocol, "Office").unwrap();
        transport.send_message(&msg);

        let mut buf = [0u8; MAX_DATAGRAM_SIZE];
        let (len, _) = timeout(TIMEOUT, device.recv_from(&mut buf))
            .await
            .expect("timed out")
            .unwrap();
        assert_eq!(decode_frame(&buf[..len], &protocol).unwrap(), Frame::Message(msg));
    }

    #[tokio::test]
    async fn test_back_to_back_sends_arrive_in_order() {
        let device = UdpSocket::bind(loopback()).await.unwrap();
        let mut transport = UdpTransport::bind(loopback(), device.local_addr().unwrap())
            .await
            .unwrap();

        let protocol = ProtocolConfig::default();
        let names = ["First", "Second", "Third"];
        let sent: Vec<Message> = names
            .iter()
            .map(|n| build_connect_network_message(SessionIds::default(), &protocol, n).unwrap())
            .collect();
        for msg in &sent {
            transport.send_message(msg);
        }

        let mut buf = [0u8; MAX_DATAGRAM_SIZE];
        for msg in sent {
            let (len, _) = timeout(TIMEOUT, device.recv_from(&mut buf))
                .await
                .expect("timed out")
                .unwrap();
            assert_eq!(decode_frame(&buf[..len], &protocol).unwrap(), Frame::Message(msg));
        }
    }

    #[tokio::test]
    async fn test_receiver_forwards_peer_datagrams_only() {
        let device = UdpSocket::bind(loopback()).await.unwrap();
        let stranger = UdpSocket::bind(loopback()).await.unwrap();
        let transport = UdpTransport::bind(loopback(), device.local_addr().unwrap())
            .await
            .unwrap();
        let local = transport.local_addr().unwrap();

        let (tx, mut rx) = mpsc::channel(8);
        let cancel = CancellationToken::new();
        let handle = transport.spawn_receiver(tx, cancel.clone());

        stranger.send_to(b"noise", local).await.unwrap();
        device.send_to(b"frame", local).await.unwrap();

        let received = timeout(TIMEOUT, rx.recv()).await.expect("timed out").unwrap();
        assert_eq!(received, b"frame");

        cancel.cancel();
        timeout(TIMEOUT, handle).await.expect("timed out").unwrap();
    }
}
