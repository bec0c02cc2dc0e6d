//! TCP transport
//!
//! A room address is hashed into a port inside a configured range; holding
//! the listening socket on that port is what makes a peer the host. Frames
//! are one JSON document per line.

use super::{Listener, PeerAddress, PeerLink, Transport, TransportError, TransportResult};
use crate::protocol::PeerMessage;
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::io::ErrorKind;
use std::net::{IpAddr, SocketAddr};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

/// Default first port of the room range
pub const DEFAULT_BASE_PORT: u16 = 47000;

/// Default number of ports rooms are spread over
pub const DEFAULT_PORT_SPAN: u16 = 1000;

#[derive(Debug, Clone)]
pub struct TcpTransport {
    host: IpAddr,
    base_port: u16,
    port_span: u16,
}

impl TcpTransport {
    pub fn new(host: IpAddr, base_port: u16, port_span: u16) -> Self {
        Self {
            host,
            base_port,
            port_span: port_span.max(1),
        }
    }

    /// Port a room address maps to. Stable across processes.
    pub fn port_for(&self, address: &PeerAddress) -> u16 {
        let digest = Sha256::digest(address.as_str().as_bytes());
        let n = u16::from_be_bytes([digest[0], digest[1]]);
        self.base_port.saturating_add(n % self.port_span)
    }

    fn socket_for(&self, address: &PeerAddress) -> SocketAddr {
        SocketAddr::new(self.host, self.port_for(address))
    }
}

impl Default for TcpTransport {
    fn default() -> Self {
        Self::new(
            IpAddr::from([127, 0, 0, 1]),
            DEFAULT_BASE_PORT,
            DEFAULT_PORT_SPAN,
        )
    }
}

pub struct TcpRoomListener {
    address: PeerAddress,
    listener: TcpListener,
}

#[async_trait]
impl Listener for TcpRoomListener {
    async fn accept(&mut self) -> TransportResult<PeerLink> {
        let (stream, peer) = self.listener.accept().await?;
        tracing::info!(%peer, address = %self.address, "Peer connected");
        Ok(spawn_link(stream, peer.to_string()))
    }

    fn address(&self) -> &PeerAddress {
        &self.address
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn listen(&self, address: &PeerAddress) -> TransportResult<Box<dyn Listener>> {
        let socket = self.socket_for(address);
        match TcpListener::bind(socket).await {
            Ok(listener) => {
                tracing::info!(%address, %socket, "Room address claimed");
                Ok(Box::new(TcpRoomListener {
                    address: address.clone(),
                    listener,
                }))
            }
            Err(e) if e.kind() == ErrorKind::AddrInUse => {
                Err(TransportError::AddressUnavailable(address.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn connect(&self, address: &PeerAddress) -> TransportResult<PeerLink> {
        let socket = self.socket_for(address);
        match TcpStream::connect(socket).await {
            Ok(stream) => {
                tracing::info!(%address, %socket, "Connected to room host");
                Ok(spawn_link(stream, socket.to_string()))
            }
            Err(e) if e.kind() == ErrorKind::ConnectionRefused => {
                Err(TransportError::PeerUnavailable(address.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn name(&self) -> &str {
        "tcp"
    }
}

/// Pump a socket into a [`PeerLink`]: one task decodes incoming lines, one
/// encodes outgoing messages. The link closes when the socket does.
fn spawn_link(stream: TcpStream, remote: String) -> PeerLink {
    let (read_half, mut write_half) = stream.into_split();
    let (in_tx, in_rx) = mpsc::unbounded_channel();
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<PeerMessage>();

    let reader_remote = remote.clone();
    tokio::spawn(async move {
        let mut lines = BufReader::new(read_half).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    match serde_json::from_str::<PeerMessage>(&line) {
                        Ok(msg) => {
                            if in_tx.send(msg).is_err() {
                                break;
                            }
                        }
                        // Unknown or malformed frames are dropped, the link stays up
                        Err(e) => {
                            tracing::warn!(remote = %reader_remote, "Dropping invalid frame: {}", e)
                        }
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!(remote = %reader_remote, "Read error: {}", e);
                    break;
                }
            }
        }
        tracing::debug!(remote = %reader_remote, "Link reader finished");
    });

    let writer_remote = remote.clone();
    tokio::spawn(async move {
        while let Some(msg) = out_rx.recv().await {
            let mut json = match serde_json::to_string(&msg) {
                Ok(json) => json,
                Err(e) => {
                    tracing::error!("Failed to encode frame: {}", e);
                    continue;
                }
            };
            json.push('\n');
            if let Err(e) = write_half.write_all(json.as_bytes()).await {
                tracing::warn!(remote = %writer_remote, "Write error: {}", e);
                break;
            }
        }
        let _ = write_half.shutdown().await;
    });

    PeerLink::new(remote, out_tx, in_rx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Action;

    /// Each test gets its own port range so they can run in parallel
    fn transport(base: u16) -> TcpTransport {
        TcpTransport::new(IpAddr::from([127, 0, 0, 1]), base, 1)
    }

    #[test]
    fn test_port_mapping_is_stable() {
        let t = TcpTransport::default();
        let a = PeerAddress::for_room("joli-tigre-7");
        assert_eq!(t.port_for(&a), t.port_for(&a));
        let port = t.port_for(&a);
        assert!((DEFAULT_BASE_PORT..DEFAULT_BASE_PORT + DEFAULT_PORT_SPAN).contains(&port));
    }

    #[tokio::test]
    async fn test_second_listen_reports_address_unavailable() {
        let t = transport(47811);
        let address = PeerAddress::for_room("course");
        let _held = t.listen(&address).await.unwrap();

        let second = t.listen(&address).await;
        assert!(matches!(second, Err(TransportError::AddressUnavailable(_))));
    }

    #[tokio::test]
    async fn test_frames_cross_the_socket() {
        let t = transport(47812);
        let address = PeerAddress::for_room("course");
        let mut listener = t.listen(&address).await.unwrap();

        let client = t.connect(&address).await.unwrap();
        let host = listener.accept().await.unwrap();

        let (client_tx, mut client_rx) = client.split();
        let (host_tx, mut host_rx) = host.split();

        client_tx
            .send(PeerMessage::ClientAction {
                action: Action::ResetGame,
            })
            .unwrap();
        match host_rx.recv().await {
            Some(PeerMessage::ClientAction { action }) => assert_eq!(action, Action::ResetGame),
            other => panic!("Expected CLIENT_ACTION, got {:?}", other),
        }

        // Closing the host side ends the client's stream
        drop(host_tx);
        drop(host_rx);
        assert!(client_rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_connect_to_empty_port_is_peer_unavailable() {
        let t = transport(47813);
        let result = t.connect(&PeerAddress::for_room("personne")).await;
        assert!(matches!(result, Err(TransportError::PeerUnavailable(_))));
    }
}
