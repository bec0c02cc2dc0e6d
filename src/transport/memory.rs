//! In-process transport: a shared registry of claimed addresses

use super::{Listener, PeerAddress, PeerLink, Transport, TransportError, TransportResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

/// Clones share the same network
#[derive(Debug, Clone, Default)]
pub struct MemoryTransport {
    registry: Arc<Mutex<HashMap<PeerAddress, mpsc::UnboundedSender<PeerLink>>>>,
    next_peer: Arc<std::sync::atomic::AtomicU64>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn peer_name(&self) -> String {
        let n = self
            .next_peer
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        format!("mem-peer-{}", n)
    }
}

pub struct MemoryListener {
    address: PeerAddress,
    incoming: mpsc::UnboundedReceiver<PeerLink>,
}

#[async_trait]
impl Listener for MemoryListener {
    async fn accept(&mut self) -> TransportResult<PeerLink> {
        self.incoming.recv().await.ok_or(TransportError::Closed)
    }

    fn address(&self) -> &PeerAddress {
        &self.address
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn listen(&self, address: &PeerAddress) -> TransportResult<Box<dyn Listener>> {
        let mut registry = self.registry.lock().await;

        // A dropped listener releases its address
        if let Some(existing) = registry.get(address) {
            if !existing.is_closed() {
                return Err(TransportError::AddressUnavailable(address.to_string()));
            }
        }

        let (tx, rx) = mpsc::unbounded_channel();
        registry.insert(address.clone(), tx);
        tracing::debug!(%address, "Memory address claimed");

        Ok(Box::new(MemoryListener {
            address: address.clone(),
            incoming: rx,
        }))
    }

    async fn connect(&self, address: &PeerAddress) -> TransportResult<PeerLink> {
        let registry = self.registry.lock().await;
        let acceptor = registry
            .get(address)
            .filter(|tx| !tx.is_closed())
            .ok_or_else(|| TransportError::PeerUnavailable(address.to_string()))?;

        let (host_end, client_end) = PeerLink::pair(self.peer_name(), address.to_string());
        acceptor
            .send(host_end)
            .map_err(|_| TransportError::PeerUnavailable(address.to_string()))?;

        Ok(client_end)
    }

    fn name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{Action, PeerMessage};

    #[tokio::test]
    async fn test_second_listen_is_refused() {
        let net = MemoryTransport::new();
        let address = PeerAddress::for_room("salle");

        let _listener = net.listen(&address).await.unwrap();
        let second = net.listen(&address).await;
        assert!(matches!(second, Err(TransportError::AddressUnavailable(_))));
    }

    #[tokio::test]
    async fn test_dropped_listener_frees_address() {
        let net = MemoryTransport::new();
        let address = PeerAddress::for_room("salle");

        let listener = net.listen(&address).await.unwrap();
        drop(listener);
        assert!(net.listen(&address).await.is_ok());
    }

    #[tokio::test]
    async fn test_connect_without_listener_fails() {
        let net = MemoryTransport::new();
        let result = net.connect(&PeerAddress::for_room("vide")).await;
        assert!(matches!(result, Err(TransportError::PeerUnavailable(_))));
    }

    #[tokio::test]
    async fn test_connect_and_exchange() {
        let net = MemoryTransport::new();
        let address = PeerAddress::for_room("salle");
        let mut listener = net.listen(&address).await.unwrap();

        let client = net.connect(&address).await.unwrap();
        let host = listener.accept().await.unwrap();

        let (client_tx, _client_rx) = client.split();
        let (_host_tx, mut host_rx) = host.split();
        client_tx
            .send(PeerMessage::ClientAction {
                action: Action::NextRound,
            })
            .unwrap();

        match host_rx.recv().await {
            Some(PeerMessage::ClientAction { action }) => assert_eq!(action, Action::NextRound),
            other => panic!("Expected CLIENT_ACTION, got {:?}", other),
        }
    }
}
