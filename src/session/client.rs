//! Non-host side of a room: a disposable mirror of the host's state

use super::{Command, SessionError, SessionResult};
use crate::protocol::{Action, PeerMessage, SessionStatus, Snapshot};
use crate::transport::{LinkReceiver, LinkSender, PeerLink};
use crate::types::*;
use std::time::Duration;
use tokio::sync::{mpsc, watch};

/// Local copy of the room. Replaced wholesale on every sync, never edited.
#[derive(Debug)]
pub(crate) struct ClientMirror {
    name: String,
    player_id: Option<PlayerId>,
    state: Option<GameState>,
    status: SessionStatus,
}

impl ClientMirror {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.trim().to_string(),
            player_id: None,
            state: None,
            status: SessionStatus::Joining,
        }
    }

    /// Take a SYNC_STATE. Our id is adopted the first time the host addresses
    /// a sync to us and that id carries the name we joined with.
    pub fn on_sync(&mut self, state: GameState, recipient: Option<PlayerId>) {
        if matches!(self.status, SessionStatus::HostLost { .. }) {
            return;
        }
        if self.player_id.is_none() {
            if let Some(id) = recipient {
                if state.player(&id).is_some_and(|p| p.name == self.name) {
                    tracing::info!(player_id = %id, name = %self.name, "Joined room");
                    self.player_id = Some(id);
                    self.status = SessionStatus::Active;
                }
            }
        }
        self.state = Some(state);
    }

    pub fn on_host_lost(&mut self, reason: String) {
        tracing::warn!(%reason, "Host lost");
        self.status = SessionStatus::HostLost { reason };
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            state: self.state.clone(),
            player_id: self.player_id.clone(),
            is_host: false,
            status: self.status.clone(),
        }
    }
}

/// A link whose host has shown us the room it holds
#[derive(Debug)]
pub(crate) struct Connected {
    sender: LinkSender,
    receiver: LinkReceiver,
    remote: String,
    state: GameState,
}

/// Wait for the sync the host sends every new link and make sure it comes
/// from the room we asked for. Another room sharing the address yields
/// [`SessionError::AddressCollision`].
pub(crate) async fn handshake(
    link: PeerLink,
    slug: &str,
    timeout: Duration,
) -> SessionResult<Connected> {
    let remote = link.remote().to_string();
    let (sender, mut receiver) = link.split();

    let state = loop {
        match tokio::time::timeout(timeout, receiver.recv()).await {
            Err(_) => return Err(SessionError::JoinTimeout(timeout)),
            Ok(None) => {
                return Err(SessionError::HostLost(format!(
                    "Connection to host {} closed",
                    remote
                )))
            }
            Ok(Some(PeerMessage::SyncState { state, .. })) => break state,
            Ok(Some(PeerMessage::ClientAction { action })) => {
                tracing::warn!(action = action.kind(), "Ignoring CLIENT_ACTION sent by the host");
            }
        }
    };

    if state.room_slug != slug {
        tracing::info!(
            %remote,
            wanted = slug,
            found = %state.room_slug,
            "Address held by another room"
        );
        return Err(SessionError::AddressCollision(state.room_slug));
    }

    Ok(Connected {
        sender,
        receiver,
        remote,
        state,
    })
}

/// Client loop: send JOIN_ROOM, then mirror every sync and forward intents
/// until the host goes away or the session is closed.
pub(crate) async fn run(
    connected: Connected,
    name: String,
    mut commands: mpsc::UnboundedReceiver<Command>,
    snapshots: watch::Sender<Snapshot>,
) {
    let Connected {
        sender,
        mut receiver,
        remote,
        state,
    } = connected;
    let slug = state.room_slug.clone();
    let mut mirror = ClientMirror::new(&name);
    mirror.on_sync(state, None);
    snapshots.send_replace(mirror.snapshot());

    let join = Action::JoinRoom {
        slug,
        player_name: name.trim().to_string(),
    };
    if sender.send(PeerMessage::ClientAction { action: join }).is_err() {
        mirror.on_host_lost(format!("Could not reach host at {}", remote));
        snapshots.send_replace(mirror.snapshot());
        return;
    }

    loop {
        tokio::select! {
            msg = receiver.recv() => match msg {
                Some(PeerMessage::SyncState { state, recipient }) => {
                    tracing::debug!(version = state.version, phase = ?state.phase, "Sync received");
                    mirror.on_sync(state, recipient);
                    snapshots.send_replace(mirror.snapshot());
                }
                Some(PeerMessage::ClientAction { action }) => {
                    tracing::warn!(
                        action = action.kind(),
                        "Ignoring CLIENT_ACTION sent by the host"
                    );
                }
                None => {
                    mirror.on_host_lost(format!("Connection to host {} closed", remote));
                    snapshots.send_replace(mirror.snapshot());
                    break;
                }
            },

            cmd = commands.recv() => match cmd {
                Some(Command::Intent(action)) => {
                    tracing::debug!(action = action.kind(), "Forwarding intent to host");
                    if sender.send(PeerMessage::ClientAction { action }).is_err() {
                        mirror.on_host_lost(format!("Connection to host {} closed", remote));
                        snapshots.send_replace(mirror.snapshot());
                        break;
                    }
                }
                Some(Command::Shutdown) | None => break,
            },
        }
    }

    tracing::info!(name = %mirror.name, "Client session stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::GameRng;
    use crate::state::{apply, draw_avatar};
    use crate::words::BuiltinCatalog;

    fn room_with(names: &[&str]) -> GameState {
        let mut rng = GameRng::new(9);
        let mut state = GameState::new_room(
            rng.next_id(),
            "salle".to_string(),
            rng.next_id(),
            names[0].to_string(),
            draw_avatar(&mut rng),
        );
        for name in &names[1..] {
            state = apply(
                state,
                Action::JoinRoom {
                    slug: "salle".to_string(),
                    player_name: name.to_string(),
                },
                &mut rng,
                &BuiltinCatalog::new(),
            );
        }
        state
    }

    #[test]
    fn test_unaddressed_sync_keeps_joining() {
        let mut mirror = ClientMirror::new("Bob");
        mirror.on_sync(room_with(&["Alice", "Bob"]), None);

        let snap = mirror.snapshot();
        assert_eq!(snap.status, SessionStatus::Joining);
        assert!(snap.player_id.is_none());
        assert!(snap.state.is_some());
    }

    #[test]
    fn test_addressed_sync_adopts_id() {
        let state = room_with(&["Alice", "Bob"]);
        let bob = state.player_by_name("Bob").unwrap().id.clone();

        let mut mirror = ClientMirror::new(" Bob ");
        mirror.on_sync(state, Some(bob.clone()));

        let snap = mirror.snapshot();
        assert_eq!(snap.status, SessionStatus::Active);
        assert_eq!(snap.player_id, Some(bob));
        assert_eq!(snap.me().unwrap().name, "Bob");
    }

    #[test]
    fn test_recipient_with_other_name_is_not_adopted() {
        let state = room_with(&["Alice", "Bob"]);
        let alice = state.player_by_name("Alice").unwrap().id.clone();

        let mut mirror = ClientMirror::new("Bob");
        mirror.on_sync(state, Some(alice));
        assert!(mirror.snapshot().player_id.is_none());
    }

    #[tokio::test]
    async fn test_handshake_accepts_the_requested_room() {
        let (host_end, client_end) = PeerLink::pair("client".to_string(), "host".to_string());
        let (host_tx, _host_rx) = host_end.split();
        host_tx
            .send(PeerMessage::SyncState {
                state: room_with(&["Alice"]),
                recipient: None,
            })
            .unwrap();

        let connected = handshake(client_end, "salle", Duration::from_millis(200))
            .await
            .unwrap();
        assert_eq!(connected.state.room_slug, "salle");
        assert_eq!(connected.remote, "host");
    }

    #[tokio::test]
    async fn test_handshake_rejects_another_room() {
        let (host_end, client_end) = PeerLink::pair("client".to_string(), "host".to_string());
        let (host_tx, _host_rx) = host_end.split();
        host_tx
            .send(PeerMessage::SyncState {
                state: room_with(&["Alice"]),
                recipient: None,
            })
            .unwrap();

        let result = handshake(client_end, "grenier", Duration::from_millis(200)).await;
        assert!(matches!(
            result,
            Err(SessionError::AddressCollision(ref found)) if found == "salle"
        ));
    }

    #[tokio::test]
    async fn test_handshake_times_out_on_a_silent_host() {
        let (host_end, client_end) = PeerLink::pair("client".to_string(), "host".to_string());
        let result = handshake(client_end, "salle", Duration::from_millis(50)).await;
        assert!(matches!(result, Err(SessionError::JoinTimeout(_))));
        drop(host_end);
    }

    #[test]
    fn test_host_lost_is_terminal() {
        let state = room_with(&["Alice", "Bob"]);
        let bob = state.player_by_name("Bob").unwrap().id.clone();
        let mut mirror = ClientMirror::new("Bob");
        mirror.on_host_lost("gone".to_string());
        mirror.on_sync(state, Some(bob));

        let snap = mirror.snapshot();
        assert_eq!(
            snap.status,
            SessionStatus::HostLost {
                reason: "gone".to_string()
            }
        );
        assert!(snap.player_id.is_none());
    }
}
