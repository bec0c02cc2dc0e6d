use crate::config::AppConfig;
use crate::protocol::SessionStatus;
use crate::session::{Session, SessionOptions, SessionResult};
use crate::transport::Transport;
use std::sync::Arc;
use tokio::sync::watch;

/// Shared state of the presentation bridge: the one participant this process
/// plays as, and how it reaches other peers.
pub struct AppState {
    pub config: AppConfig,
    transport: Arc<dyn Transport>,
    options: SessionOptions,
    session: watch::Sender<Option<Session>>,
}

impl AppState {
    pub fn new(config: AppConfig, transport: Arc<dyn Transport>) -> Self {
        let options = config.session_options();
        Self::with_options(config, transport, options)
    }

    pub fn with_options(
        config: AppConfig,
        transport: Arc<dyn Transport>,
        options: SessionOptions,
    ) -> Self {
        tracing::info!(transport = transport.name(), "Presentation bridge ready");
        let (session, _) = watch::channel(None);
        Self {
            config,
            transport,
            options,
            session,
        }
    }

    pub fn current_session(&self) -> Option<Session> {
        self.session.borrow().clone()
    }

    /// Changes whenever this process enters a different room
    pub fn subscribe_session(&self) -> watch::Receiver<Option<Session>> {
        self.session.subscribe()
    }

    /// True while a session exists whose host is still reachable
    pub fn in_active_room(&self) -> bool {
        self.session.borrow().as_ref().is_some_and(|s| {
            !matches!(s.snapshot().status, SessionStatus::HostLost { .. })
        })
    }

    /// Create-or-join race for `slug` (a fresh slug when `None`)
    pub async fn enter(&self, name: &str, slug: Option<&str>) -> SessionResult<(Session, bool)> {
        let (session, host_claimed) =
            Session::create_room(self.transport.clone(), name, slug, self.options.clone()).await?;
        self.replace_session(session.clone());
        Ok((session, host_claimed))
    }

    pub async fn join(&self, name: &str, slug: &str) -> SessionResult<Session> {
        let session =
            Session::join_room(self.transport.clone(), name, slug, self.options.clone()).await?;
        self.replace_session(session.clone());
        Ok(session)
    }

    fn replace_session(&self, session: Session) {
        tracing::info!(slug = session.slug(), host = session.is_host(), "Entered room");
        if let Some(old) = self.session.send_replace(Some(session)) {
            old.close();
        }
    }
}
