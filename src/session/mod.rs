//! Room sessions
//!
//! A [`Session`] is what the presentation layer holds. Behind it runs either
//! the host loop (sole owner of the authoritative state) or a client loop
//! mirroring the host. Both publish [`Snapshot`]s through a watch channel;
//! intents travel the other way as [`Command`]s.

mod client;
mod host;

use crate::protocol::{Action, SessionStatus, Snapshot};
use crate::rng::GameRng;
use crate::state::{draw_avatar, generate_room_slug, normalize_slug};
use crate::transport::{
    Listener, PeerAddress, PeerLink, Transport, TransportError, ADDRESS_ATTEMPTS,
};
use crate::types::*;
use crate::words::{BuiltinCatalog, WordCatalog};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch, Mutex};

/// How long a joiner waits for a sync that names it
pub const DEFAULT_JOIN_TIMEOUT: Duration = Duration::from_millis(3000);

pub type SessionResult<T> = Result<T, SessionError>;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Only the host can do that")]
    NotHost,

    #[error("Not joined to a room yet")]
    NotJoined,

    #[error("Player name must not be empty")]
    InvalidName,

    /// The room's address is held by a room with another slug
    #[error("Address is held by another room ({0})")]
    AddressCollision(String),

    #[error("Host lost: {0}")]
    HostLost(String),

    /// No sync carrying our name arrived in time, usually a duplicate name
    #[error("No answer from the host after {0:?}")]
    JoinTimeout(Duration),

    #[error("Session closed")]
    Closed,
}

impl SessionError {
    /// Error code reported to the presentation layer
    pub fn code(&self) -> &'static str {
        match self {
            SessionError::Transport(TransportError::PeerUnavailable(_)) => "ROOM_NOT_FOUND",
            SessionError::Transport(_) | SessionError::AddressCollision(_) => "TRANSPORT_ERROR",
            SessionError::NotHost => "UNAUTHORIZED",
            SessionError::NotJoined => "NOT_IN_ROOM",
            SessionError::InvalidName => "INVALID_NAME",
            SessionError::HostLost(_) | SessionError::Closed => "HOST_LOST",
            SessionError::JoinTimeout(_) => "JOIN_TIMEOUT",
        }
    }
}

#[derive(Clone)]
pub struct SessionOptions {
    pub join_timeout: Duration,
    /// Seeds the host's randomness; entropy when unset
    pub seed: Option<u64>,
    pub catalog: Arc<dyn WordCatalog>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            join_timeout: DEFAULT_JOIN_TIMEOUT,
            seed: None,
            catalog: Arc::new(BuiltinCatalog::new()),
        }
    }
}

/// Presentation -> session loop
#[derive(Debug)]
pub(crate) enum Command {
    Intent(Action),
    Shutdown,
}

/// An intent as it was sent, with the phase and round it was meant for
#[derive(Debug, Clone)]
struct SentIntent {
    action: Action,
    stage: Option<(GamePhase, u32)>,
}

/// Handle on one participant's view of a room. Clones share the session.
#[derive(Clone)]
pub struct Session {
    commands: mpsc::UnboundedSender<Command>,
    snapshots: watch::Receiver<Snapshot>,
    slug: String,
    name: String,
    last_intent: Arc<Mutex<Option<SentIntent>>>,
}

impl Session {
    fn new(
        commands: mpsc::UnboundedSender<Command>,
        snapshots: watch::Receiver<Snapshot>,
        slug: String,
        name: String,
    ) -> Self {
        Self {
            commands,
            snapshots,
            slug,
            name,
            last_intent: Arc::new(Mutex::new(None)),
        }
    }

    /// Claim the room as host, or join it if somebody got there first.
    /// Returns whether this participant became the host.
    pub async fn create_room(
        transport: Arc<dyn Transport>,
        name: &str,
        slug: Option<&str>,
        options: SessionOptions,
    ) -> SessionResult<(Session, bool)> {
        let name = validate_name(name)?;
        let slug = match slug.map(normalize_slug).filter(|s| !s.is_empty()) {
            Some(slug) => slug,
            None => generate_room_slug(),
        };
        let base = PeerAddress::for_room(&slug);

        for attempt in 0..ADDRESS_ATTEMPTS {
            let address = base.fallback(attempt);
            match transport.listen(&address).await {
                Ok(listener) => return Ok((Self::host_room(listener, name, slug, options), true)),
                Err(TransportError::AddressUnavailable(_)) => {}
                Err(e) => return Err(e.into()),
            }

            let link = transport.connect(&address).await?;
            match Self::join_link(link, &name, &slug, &options).await {
                Ok(session) => {
                    tracing::info!(%slug, "Room already hosted, joined instead");
                    return Ok((session, false));
                }
                Err(SessionError::AddressCollision(other)) => {
                    tracing::info!(
                        %slug,
                        %address,
                        %other,
                        "Address taken by another room, trying the next address"
                    );
                }
                Err(e) => return Err(e),
            }
        }

        Err(SessionError::AddressCollision(base.to_string()))
    }

    fn host_room(
        listener: Box<dyn Listener>,
        name: String,
        slug: String,
        options: SessionOptions,
    ) -> Session {
        let mut rng = match options.seed {
            Some(seed) => GameRng::new(seed),
            None => GameRng::from_entropy(),
        };
        let room_id = rng.next_id();
        let host_id = rng.next_id();
        let avatar = draw_avatar(&mut rng);
        let state = GameState::new_room(room_id, slug.clone(), host_id, name.clone(), avatar);

        tracing::info!(
            %slug,
            host = %name,
            address = %listener.address(),
            seed = rng.seed(),
            "Room created"
        );

        let authority = host::HostAuthority::new(state, rng, options.catalog);
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (snap_tx, snap_rx) = watch::channel(authority.snapshot());
        tokio::spawn(host::run(authority, listener, cmd_rx, snap_tx));

        Session::new(cmd_tx, snap_rx, slug, name)
    }

    /// Connect to the room's host and wait until it accepts us
    pub async fn join_room(
        transport: Arc<dyn Transport>,
        name: &str,
        slug: &str,
        options: SessionOptions,
    ) -> SessionResult<Session> {
        let name = validate_name(name)?;
        let slug = normalize_slug(slug);
        let base = PeerAddress::for_room(&slug);

        let mut missing = None;
        for attempt in 0..ADDRESS_ATTEMPTS {
            let address = base.fallback(attempt);
            let link = match transport.connect(&address).await {
                Ok(link) => link,
                // A room pushed off its own address can sit behind a free one
                Err(e @ TransportError::PeerUnavailable(_)) => {
                    if missing.is_none() {
                        missing = Some(e);
                    }
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            match Self::join_link(link, &name, &slug, &options).await {
                Err(SessionError::AddressCollision(other)) => {
                    tracing::info!(
                        %slug,
                        %address,
                        %other,
                        "Address taken by another room, trying the next address"
                    );
                }
                result => return result,
            }
        }

        Err(match missing {
            Some(e) => e.into(),
            None => SessionError::AddressCollision(base.to_string()),
        })
    }

    /// Check the link leads to `slug`, then run the client loop on it until
    /// the host confirms our player
    async fn join_link(
        link: PeerLink,
        name: &str,
        slug: &str,
        options: &SessionOptions,
    ) -> SessionResult<Session> {
        let connected = client::handshake(link, slug, options.join_timeout).await?;

        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (snap_tx, snap_rx) = watch::channel(Snapshot {
            state: None,
            player_id: None,
            is_host: false,
            status: SessionStatus::Joining,
        });
        tokio::spawn(client::run(connected, name.to_string(), cmd_rx, snap_tx));

        let session = Session::new(cmd_tx, snap_rx, slug.to_string(), name.to_string());
        if let Err(e) = session.wait_joined(options.join_timeout).await {
            tracing::warn!(slug = %session.slug, name = %session.name, "Join failed: {}", e);
            session.close();
            return Err(e);
        }
        Ok(session)
    }

    /// Wait until the host has confirmed our player
    pub async fn wait_joined(&self, timeout: Duration) -> SessionResult<()> {
        let mut rx = self.snapshots.clone();
        let waited = tokio::time::timeout(
            timeout,
            rx.wait_for(|s| !matches!(s.status, SessionStatus::Joining)),
        )
        .await;

        let status = match waited {
            Err(_) => return Err(SessionError::JoinTimeout(timeout)),
            Ok(Err(_)) => return Err(SessionError::Closed),
            Ok(Ok(snapshot)) => snapshot.status.clone(),
        };
        match status {
            SessionStatus::HostLost { reason } => Err(SessionError::HostLost(reason)),
            _ => Ok(()),
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        self.snapshots.borrow().clone()
    }

    /// Receiver that changes on every published snapshot
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.snapshots.clone()
    }

    pub fn slug(&self) -> &str {
        &self.slug
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn player_id(&self) -> Option<PlayerId> {
        self.snapshots.borrow().player_id.clone()
    }

    pub fn is_host(&self) -> bool {
        self.snapshots.borrow().is_host
    }

    pub async fn toggle_ready(&self) -> SessionResult<()> {
        let player_id = self.require_player()?;
        self.send_intent(Action::ToggleReady { player_id }).await
    }

    pub async fn start_game(&self) -> SessionResult<()> {
        self.require_host()?;
        self.send_intent(Action::StartGame).await
    }

    pub async fn confirm_word_seen(&self) -> SessionResult<()> {
        let player_id = self.require_player()?;
        self.send_intent(Action::RevealConfirm { player_id }).await
    }

    pub async fn finish_speaking(&self) -> SessionResult<()> {
        let player_id = self.require_player()?;
        self.send_intent(Action::FinishSpeaking { player_id }).await
    }

    pub async fn vote(&self, target_id: &str) -> SessionResult<()> {
        let voter_id = self.require_player()?;
        self.send_intent(Action::Vote {
            voter_id,
            target_id: target_id.to_string(),
        })
        .await
    }

    pub async fn start_tie_vote(&self) -> SessionResult<()> {
        self.require_host()?;
        self.send_intent(Action::StartTieVote).await
    }

    pub async fn next_round(&self) -> SessionResult<()> {
        self.require_host()?;
        self.send_intent(Action::NextRound).await
    }

    pub async fn reset_game(&self) -> SessionResult<()> {
        self.require_host()?;
        self.send_intent(Action::ResetGame).await
    }

    /// Send the last intent again. Apart from TOGGLE_READY, which is never
    /// recorded, every intent is idempotent within one phase of one round, so
    /// a duplicate is harmless there. Returns false when there was nothing to
    /// send or the room has moved past the phase the intent was made in.
    pub async fn retry_last_intent(&self) -> SessionResult<bool> {
        self.require_player()?;
        let Some(last) = self.last_intent.lock().await.clone() else {
            return Ok(false);
        };

        let stage = self.current_stage();
        if stage != last.stage {
            tracing::debug!(
                action = last.action.kind(),
                sent_in = ?last.stage,
                now = ?stage,
                "Not re-sending an intent from an earlier phase"
            );
            return Ok(false);
        }

        tracing::info!(action = last.action.kind(), "Re-sending last intent");
        self.commands
            .send(Command::Intent(last.action))
            .map_err(|_| SessionError::Closed)?;
        Ok(true)
    }

    /// Leave the room. For the host this closes the room for everybody.
    pub fn close(&self) {
        let _ = self.commands.send(Command::Shutdown);
    }

    async fn send_intent(&self, action: Action) -> SessionResult<()> {
        if !matches!(action, Action::ToggleReady { .. }) {
            *self.last_intent.lock().await = Some(SentIntent {
                action: action.clone(),
                stage: self.current_stage(),
            });
        }
        self.commands
            .send(Command::Intent(action))
            .map_err(|_| SessionError::Closed)
    }

    fn current_stage(&self) -> Option<(GamePhase, u32)> {
        self.snapshots
            .borrow()
            .state
            .as_ref()
            .map(|s| (s.phase, s.round_no))
    }

    fn require_player(&self) -> SessionResult<PlayerId> {
        let snapshot = self.snapshots.borrow();
        if let SessionStatus::HostLost { reason } = &snapshot.status {
            return Err(SessionError::HostLost(reason.clone()));
        }
        snapshot.player_id.clone().ok_or(SessionError::NotJoined)
    }

    fn require_host(&self) -> SessionResult<PlayerId> {
        let player_id = self.require_player()?;
        if !self.is_host() {
            return Err(SessionError::NotHost);
        }
        Ok(player_id)
    }
}

fn validate_name(name: &str) -> SessionResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(SessionError::InvalidName);
    }
    Ok(name.to_string())
}
