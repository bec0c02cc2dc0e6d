//! Presentation command dispatch
//!
//! Room entry is handled here directly; every other command needs a session
//! and is forwarded to it. Host-only commands are checked before dispatch.

use crate::app::AppState;
use crate::protocol::{UiCommand, UiEvent};
use crate::session::{Session, SessionError, SessionResult};
use std::sync::Arc;

/// Macro to check host authorization and return early if unauthorized
macro_rules! check_host {
    ($session:expr, $action:expr) => {
        if !$session.is_host() {
            return Some(UiEvent::Error {
                code: "UNAUTHORIZED".to_string(),
                msg: format!("Only host can {}", $action),
            });
        }
    };
}

pub fn error_event(err: &SessionError) -> UiEvent {
    UiEvent::Error {
        code: err.code().to_string(),
        msg: err.to_string(),
    }
}

fn respond(result: SessionResult<()>) -> Option<UiEvent> {
    match result {
        Ok(()) => None,
        Err(e) => {
            tracing::debug!("Command failed: {}", e);
            Some(error_event(&e))
        }
    }
}

fn already_in_room(state: &AppState) -> Option<UiEvent> {
    let session = state.current_session()?;
    state.in_active_room().then(|| UiEvent::Error {
        code: "ALREADY_IN_ROOM".to_string(),
        msg: format!("Already playing in room {}", session.slug()),
    })
}

/// Handle one presentation command and return an optional direct response.
/// State changes reach the presentation through the snapshot stream.
pub async fn handle_command(cmd: UiCommand, state: &Arc<AppState>) -> Option<UiEvent> {
    match cmd {
        UiCommand::Enter { name, slug } => {
            if let Some(err) = already_in_room(state) {
                return Some(err);
            }
            match state.enter(&name, slug.as_deref()).await {
                Ok((session, host_claimed)) => Some(UiEvent::Entered {
                    slug: session.slug().to_string(),
                    host_claimed,
                }),
                Err(e) => Some(error_event(&e)),
            }
        }

        UiCommand::JoinRoom { slug, name } => {
            if let Some(err) = already_in_room(state) {
                return Some(err);
            }
            match state.join(&name, &slug).await {
                Ok(session) => Some(UiEvent::Entered {
                    slug: session.slug().to_string(),
                    host_claimed: false,
                }),
                Err(e) => Some(error_event(&e)),
            }
        }

        cmd => {
            let Some(session) = state.current_session() else {
                return Some(UiEvent::Error {
                    code: "NOT_IN_ROOM".to_string(),
                    msg: "Enter a room first".to_string(),
                });
            };
            handle_session_command(cmd, &session).await
        }
    }
}

async fn handle_session_command(cmd: UiCommand, session: &Session) -> Option<UiEvent> {
    match cmd {
        UiCommand::ToggleReady => respond(session.toggle_ready().await),

        UiCommand::ConfirmWordSeen => respond(session.confirm_word_seen().await),

        UiCommand::FinishSpeaking => respond(session.finish_speaking().await),

        UiCommand::Vote { target_id } => respond(session.vote(&target_id).await),

        UiCommand::RetryLastIntent => match session.retry_last_intent().await {
            Ok(_) => None,
            Err(e) => Some(error_event(&e)),
        },

        // Host-only commands
        UiCommand::StartGame => {
            check_host!(session, "start the game");
            respond(session.start_game().await)
        }

        UiCommand::StartTieVote => {
            check_host!(session, "open the tie-break vote");
            respond(session.start_tie_vote().await)
        }

        UiCommand::NextRound => {
            check_host!(session, "advance the round");
            respond(session.next_round().await)
        }

        UiCommand::ResetGame => {
            check_host!(session, "reset the game");
            respond(session.reset_game().await)
        }

        UiCommand::Enter { .. } | UiCommand::JoinRoom { .. } => None,
    }
}
