//! Host side of a room: the only place `GameState` is ever mutated
//!
//! Every action, local or remote, goes through [`HostAuthority::submit`],
//! which applies it, stamps the metadata and rebroadcasts the full state to
//! every open link before the next action is looked at.

use super::Command;
use crate::protocol::{Action, PeerMessage, SessionStatus, Snapshot};
use crate::rng::GameRng;
use crate::state;
use crate::transport::{LinkReceiver, LinkSender, Listener, TransportError};
use crate::types::*;
use crate::words::WordCatalog;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

pub(crate) type LinkId = u64;

/// Where an action came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Origin {
    /// The host's own presentation layer
    Local,
    Link(LinkId),
}

struct HostLink {
    sender: LinkSender,
    /// Set once this link's JOIN_ROOM was accepted
    player_id: Option<PlayerId>,
    remote: String,
}

pub(crate) struct HostAuthority {
    state: GameState,
    rng: GameRng,
    catalog: Arc<dyn WordCatalog>,
    links: HashMap<LinkId, HostLink>,
    next_link: LinkId,
}

impl HostAuthority {
    pub fn new(state: GameState, rng: GameRng, catalog: Arc<dyn WordCatalog>) -> Self {
        Self {
            state,
            rng,
            catalog,
            links: HashMap::new(),
            next_link: 1,
        }
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn host_id(&self) -> Option<&str> {
        self.state.host().map(|p| p.id.as_str())
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            state: Some(self.state.clone()),
            player_id: self.host_id().map(str::to_string),
            is_host: true,
            status: SessionStatus::Active,
        }
    }

    /// Register a freshly accepted link and hand it the current state
    pub fn add_link(&mut self, sender: LinkSender, remote: String) -> LinkId {
        let id = self.next_link;
        self.next_link += 1;

        let initial = PeerMessage::SyncState {
            state: self.state.clone(),
            recipient: None,
        };
        if sender.send(initial).is_err() {
            tracing::warn!(link = id, %remote, "Link closed before first sync");
        }

        tracing::info!(link = id, %remote, "Peer link opened");
        self.links.insert(
            id,
            HostLink {
                sender,
                player_id: None,
                remote,
            },
        );
        id
    }

    /// Drop a closed link. The player it carried stays in the roster.
    pub fn remove_link(&mut self, id: LinkId) {
        if let Some(link) = self.links.remove(&id) {
            tracing::info!(
                link = id,
                remote = %link.remote,
                player_id = ?link.player_id,
                "Peer link closed"
            );
        }
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    /// Apply one action. Returns true when the state changed (and was
    /// rebroadcast), false when the action was dropped or was a no-op.
    pub fn submit(&mut self, origin: Origin, action: Action) -> bool {
        if let Origin::Link(link_id) = origin {
            if action.is_host_only() {
                tracing::warn!(
                    link = link_id,
                    action = action.kind(),
                    "Dropping host-only action from peer"
                );
                return false;
            }
            if matches!(action, Action::JoinRoom { .. })
                && self
                    .links
                    .get(&link_id)
                    .is_some_and(|l| l.player_id.is_some())
            {
                tracing::debug!(link = link_id, "Ignoring second JOIN_ROOM on a bound link");
                return false;
            }
        }

        let joining_name = match &action {
            Action::JoinRoom { player_name, .. } => Some(player_name.trim().to_string()),
            _ => None,
        };
        let kind = action.kind();

        let next = state::apply(
            self.state.clone(),
            action,
            &mut self.rng,
            self.catalog.as_ref(),
        );
        if next == self.state {
            tracing::debug!(
                action = kind,
                ?origin,
                phase = ?self.state.phase,
                "Action was a no-op"
            );
            return false;
        }

        let before_phase = self.state.phase;
        self.state = next;
        self.state.version += 1;
        self.state.last_active_at = chrono::Utc::now().to_rfc3339();

        if let (Origin::Link(link_id), Some(name)) = (origin, joining_name) {
            let player_id = self.state.player_by_name(&name).map(|p| p.id.clone());
            if let Some(link) = self.links.get_mut(&link_id) {
                link.player_id = player_id;
            }
        }

        tracing::info!(
            action = kind,
            ?origin,
            from = ?before_phase,
            to = ?self.state.phase,
            version = self.state.version,
            "State updated"
        );

        self.broadcast();
        true
    }

    /// Push the full state to every link, forgetting the ones that are gone
    fn broadcast(&mut self) {
        let mut closed = Vec::new();
        for (id, link) in &self.links {
            let msg = PeerMessage::SyncState {
                state: self.state.clone(),
                recipient: link.player_id.clone(),
            };
            if link.sender.send(msg).is_err() {
                closed.push(*id);
            }
        }
        for id in closed {
            self.remove_link(id);
        }
    }
}

/// Forward everything a link receives into the host's inbox. `None` marks
/// the link as closed.
fn spawn_link_reader(
    id: LinkId,
    mut receiver: LinkReceiver,
    inbox: mpsc::UnboundedSender<(LinkId, Option<PeerMessage>)>,
) {
    tokio::spawn(async move {
        while let Some(msg) = receiver.recv().await {
            if inbox.send((id, Some(msg))).is_err() {
                return;
            }
        }
        let _ = inbox.send((id, None));
    });
}

/// Host loop: accept links, apply their actions and the local intents one
/// at a time, publish a snapshot after every change.
pub(crate) async fn run(
    mut authority: HostAuthority,
    mut listener: Box<dyn Listener>,
    mut commands: mpsc::UnboundedReceiver<Command>,
    snapshots: watch::Sender<Snapshot>,
) {
    let (inbox_tx, mut inbox_rx) = mpsc::unbounded_channel();
    snapshots.send_replace(authority.snapshot());

    tracing::info!(
        address = %listener.address(),
        slug = %authority.state().room_slug,
        "Hosting room"
    );

    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok(link) => {
                    let remote = link.remote().to_string();
                    let (sender, receiver) = link.split();
                    let id = authority.add_link(sender, remote);
                    spawn_link_reader(id, receiver, inbox_tx.clone());
                }
                Err(TransportError::Closed) => {
                    tracing::warn!("Listener closed");
                    break;
                }
                Err(e) => tracing::warn!("Failed to accept peer: {}", e),
            },

            Some((id, msg)) = inbox_rx.recv() => match msg {
                Some(PeerMessage::ClientAction { action }) => {
                    if authority.submit(Origin::Link(id), action) {
                        snapshots.send_replace(authority.snapshot());
                    }
                }
                Some(PeerMessage::SyncState { .. }) => {
                    tracing::warn!(link = id, "Ignoring SYNC_STATE sent to the host");
                }
                None => authority.remove_link(id),
            },

            cmd = commands.recv() => match cmd {
                Some(Command::Intent(action)) => {
                    if authority.submit(Origin::Local, action) {
                        snapshots.send_replace(authority.snapshot());
                    }
                }
                Some(Command::Shutdown) | None => break,
            },
        }
    }

    tracing::info!(
        slug = %authority.state().room_slug,
        links = authority.link_count(),
        "Host stopped, closing room"
    );
}
