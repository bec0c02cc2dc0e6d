//! Peer transport boundary
//!
//! A room lives at an address derived from its slug. Whoever manages to
//! `listen` on that address is the host; everybody else `connect`s to it.
//! Each connection is a [`PeerLink`]: it opens when returned, carries
//! [`PeerMessage`]s in both directions, and is closed once `recv` yields
//! `None`.
//!
//! Two implementations are provided:
//! - [`memory::MemoryTransport`] for peers living in the same process
//! - [`tcp::TcpTransport`] for peers on the same host or LAN

pub mod memory;
pub mod tcp;

pub use memory::MemoryTransport;
pub use tcp::TcpTransport;

use crate::protocol::PeerMessage;
use async_trait::async_trait;
use std::fmt;
use tokio::sync::mpsc;

/// Namespace every room address lives in
pub const ADDRESS_NAMESPACE: &str = "undercover-game";

/// Addresses tried per room before giving up. Two slugs can land on the
/// same address (TCP ports are a hash bucket), so a room whose own address
/// is held by another room moves to the next one.
pub const ADDRESS_ATTEMPTS: u32 = 4;

/// Result type for transport operations
pub type TransportResult<T> = Result<T, TransportError>;

/// Errors surfaced by a transport
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Somebody already holds the address. This is how the create race
    /// tells a would-be host to join instead.
    #[error("Address {0} is already claimed")]
    AddressUnavailable(String),

    #[error("No peer is listening on {0}")]
    PeerUnavailable(String),

    #[error("Link closed")]
    Closed,

    #[error("Invalid frame: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Network address of a room
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PeerAddress(String);

impl PeerAddress {
    pub fn for_room(slug: &str) -> Self {
        Self(format!(
            "{}-{}",
            ADDRESS_NAMESPACE,
            crate::state::normalize_slug(slug)
        ))
    }

    /// The `attempt`th address to try for this room; attempt 0 is the
    /// room's own address
    pub fn fallback(&self, attempt: u32) -> Self {
        if attempt == 0 {
            self.clone()
        } else {
            Self(format!("{}~{}", self.0, attempt))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PeerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Sending half of a link. Cheap to clone.
#[derive(Debug, Clone)]
pub struct LinkSender {
    tx: mpsc::UnboundedSender<PeerMessage>,
}

impl LinkSender {
    pub fn send(&self, msg: PeerMessage) -> TransportResult<()> {
        self.tx.send(msg).map_err(|_| TransportError::Closed)
    }
}

/// Receiving half of a link
#[derive(Debug)]
pub struct LinkReceiver {
    rx: mpsc::UnboundedReceiver<PeerMessage>,
}

impl LinkReceiver {
    /// Next message, or `None` once the remote side is gone
    pub async fn recv(&mut self) -> Option<PeerMessage> {
        self.rx.recv().await
    }
}

/// One open pairwise connection
#[derive(Debug)]
pub struct PeerLink {
    remote: String,
    sender: LinkSender,
    receiver: LinkReceiver,
}

impl PeerLink {
    pub fn new(
        remote: String,
        tx: mpsc::UnboundedSender<PeerMessage>,
        rx: mpsc::UnboundedReceiver<PeerMessage>,
    ) -> Self {
        Self {
            remote,
            sender: LinkSender { tx },
            receiver: LinkReceiver { rx },
        }
    }

    /// Two in-process ends wired to each other
    pub fn pair(a_remote: String, b_remote: String) -> (PeerLink, PeerLink) {
        let (a_tx, b_rx) = mpsc::unbounded_channel();
        let (b_tx, a_rx) = mpsc::unbounded_channel();
        (
            PeerLink::new(a_remote, a_tx, a_rx),
            PeerLink::new(b_remote, b_tx, b_rx),
        )
    }

    /// Description of the other end, for logs
    pub fn remote(&self) -> &str {
        &self.remote
    }

    pub fn split(self) -> (LinkSender, LinkReceiver) {
        (self.sender, self.receiver)
    }
}

/// A claimed address accepting incoming links
#[async_trait]
pub trait Listener: Send {
    async fn accept(&mut self) -> TransportResult<PeerLink>;

    fn address(&self) -> &PeerAddress;
}

/// Connection factory for peers
#[async_trait]
pub trait Transport: Send + Sync {
    /// Claim `address`. Fails with [`TransportError::AddressUnavailable`]
    /// when another peer already holds it.
    async fn listen(&self, address: &PeerAddress) -> TransportResult<Box<dyn Listener>>;

    /// Open a link to whoever holds `address`
    async fn connect(&self, address: &PeerAddress) -> TransportResult<PeerLink>;

    /// Name of this transport
    fn name(&self) -> &str;
}
