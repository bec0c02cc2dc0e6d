use crate::types::*;
use serde::{Deserialize, Serialize};

/// Every transition the state machine understands.
///
/// Anything that does not deserialize into one of these variants is dropped
/// by the host without touching the state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    JoinRoom {
        slug: String,
        player_name: String,
    },
    ToggleReady {
        player_id: PlayerId,
    },
    StartGame,
    RevealConfirm {
        player_id: PlayerId,
    },
    FinishSpeaking {
        player_id: PlayerId,
    },
    Vote {
        voter_id: PlayerId,
        target_id: PlayerId,
    },
    StartTieVote,
    NextRound,
    ResetGame,
}

impl Action {
    /// Actions only the host may trigger
    pub fn is_host_only(&self) -> bool {
        matches!(
            self,
            Action::StartGame | Action::StartTieVote | Action::NextRound | Action::ResetGame
        )
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Action::JoinRoom { .. } => "JOIN_ROOM",
            Action::ToggleReady { .. } => "TOGGLE_READY",
            Action::StartGame => "START_GAME",
            Action::RevealConfirm { .. } => "REVEAL_CONFIRM",
            Action::FinishSpeaking { .. } => "FINISH_SPEAKING",
            Action::Vote { .. } => "VOTE",
            Action::StartTieVote => "START_TIE_VOTE",
            Action::NextRound => "NEXT_ROUND",
            Action::ResetGame => "RESET_GAME",
        }
    }
}

/// Envelope exchanged over a pairwise peer link
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PeerMessage {
    /// Non-host -> host
    ClientAction { action: Action },
    /// Host -> every connected peer, after each mutation
    SyncState {
        state: GameState,
        /// Player bound to the receiving link, once its join was accepted
        #[serde(default)]
        recipient: Option<PlayerId>,
    },
}

/// Connection status of the local participant
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    /// Connected to the host, waiting for a sync that names us
    Joining,
    Active,
    /// The link to the host is gone. Terminal for this session.
    HostLost { reason: String },
}

/// Read-only view handed to the presentation layer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Snapshot {
    /// None until the first sync reaches a joining client
    pub state: Option<GameState>,
    pub player_id: Option<PlayerId>,
    pub is_host: bool,
    pub status: SessionStatus,
}

impl Snapshot {
    pub fn me(&self) -> Option<&Player> {
        let id = self.player_id.as_deref()?;
        self.state.as_ref()?.player(id)
    }
}

/// Presentation -> core
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UiCommand {
    /// Create-or-join race for a room slug
    Enter {
        name: String,
        slug: Option<String>,
    },
    JoinRoom {
        slug: String,
        name: String,
    },
    ToggleReady,
    StartGame,
    ConfirmWordSeen,
    FinishSpeaking,
    Vote {
        target_id: PlayerId,
    },
    StartTieVote,
    NextRound,
    ResetGame,
    RetryLastIntent,
}

/// Core -> presentation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UiEvent {
    Welcome {
        protocol: String,
        server_now: String,
    },
    Entered {
        slug: String,
        host_claimed: bool,
    },
    Snapshot {
        snapshot: Snapshot,
    },
    /// Terminal notice: the host is gone and the round is over for us
    HostLost {
        reason: String,
    },
    Error {
        code: String,
        msg: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_wire_format() {
        let action = Action::Vote {
            voter_id: "a".to_string(),
            target_id: "b".to_string(),
        };
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(json["type"], "VOTE");
        assert_eq!(json["voter_id"], "a");

        let msg = PeerMessage::ClientAction {
            action: Action::StartGame,
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "CLIENT_ACTION");
        assert_eq!(json["action"]["type"], "START_GAME");
    }

    #[test]
    fn test_unknown_action_does_not_parse() {
        let raw = r#"{"type":"CLIENT_ACTION","action":{"type":"UPDATE_PLAYERS"}}"#;
        assert!(serde_json::from_str::<PeerMessage>(raw).is_err());
    }

    #[test]
    fn test_host_only_actions() {
        assert!(Action::StartGame.is_host_only());
        assert!(Action::ResetGame.is_host_only());
        assert!(!Action::ToggleReady {
            player_id: "p".to_string()
        }
        .is_host_only());
        assert_eq!(Action::StartTieVote.kind(), "START_TIE_VOTE");
    }

    #[test]
    fn test_ui_command_parse() {
        let cmd: UiCommand = serde_json::from_str(r#"{"t":"VOTE","target_id":"x"}"#).unwrap();
        assert!(matches!(cmd, UiCommand::Vote { target_id } if target_id == "x"));

        let cmd: UiCommand =
            serde_json::from_str(r#"{"t":"ENTER","name":"Alice","slug":null}"#).unwrap();
        assert!(matches!(cmd, UiCommand::Enter { slug: None, .. }));
    }
}
