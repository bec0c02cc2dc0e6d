use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Opaque ID types for readability
pub type RoomId = String;
pub type PlayerId = String;

/// Minimum number of ready players before the host may start a round
pub const MIN_READY_PLAYERS: usize = 4;

/// Rooms with at least this many players get a second impostor
pub const TWO_IMPOSTOR_THRESHOLD: usize = 8;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GamePhase {
    Lobby,
    RevealWord,
    Discussion,
    VoteWaiting,
    VoteInProgress,
    TieBreakerArgument,
    TieBreakerVote,
    RevealResult,
    GameOver,
}

impl GamePhase {
    /// Phases in which a ballot is open
    pub fn is_ballot(&self) -> bool {
        matches!(self, GamePhase::VoteInProgress | GamePhase::TieBreakerVote)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Civil,
    Imposter,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Facile,
    Moyen,
    Difficile,
}

impl std::str::FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "facile" | "easy" => Ok(Difficulty::Facile),
            "moyen" | "medium" => Ok(Difficulty::Moyen),
            "difficile" | "hard" => Ok(Difficulty::Difficile),
            other => Err(format!("Unknown difficulty: {}", other)),
        }
    }
}

/// The pair of words dealt for a round
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WordPair {
    pub civil: String,
    pub imposter: String,
    pub category: String,
    pub difficulty: Difficulty,
}

impl WordPair {
    /// Word handed to a player holding `role`
    pub fn word_for(&self, role: Role) -> &str {
        match role {
            Role::Civil => &self.civil,
            Role::Imposter => &self.imposter,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Avatar {
    pub emoji: String,
    pub color: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub avatar: Avatar,
    pub role: Option<Role>, // None in lobby and for late joiners
    pub word: Option<String>,
    pub is_host: bool,
    pub is_ready: bool,
    pub is_alive: bool,

    // Per-round progress flags
    pub has_seen_word: bool,
    pub has_finished_speaking: bool,
    pub voted_for_id: Option<PlayerId>,
}

impl Player {
    /// Fresh lobby participant
    pub fn new(id: PlayerId, name: String, avatar: Avatar, is_host: bool) -> Self {
        Self {
            id,
            name,
            avatar,
            role: None,
            word: None,
            is_host,
            is_ready: false,
            is_alive: true,
            has_seen_word: false,
            has_finished_speaking: false,
            voted_for_id: None,
        }
    }
}

/// The replicated room aggregate. Owned by the host, copied wholesale to every peer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameState {
    pub room_id: RoomId,
    pub room_slug: String,
    /// Bumped by the host after every state-changing action
    pub version: u64,
    pub round_no: u32,
    pub players: Vec<Player>,
    pub phase: GamePhase,
    pub current_word_pair: Option<WordPair>,
    /// voter id -> target id for the ballot in progress
    pub votes: HashMap<PlayerId, PlayerId>,
    pub tie_breaker_ids: Option<Vec<PlayerId>>,
    /// true = civilians caught an impostor, false = impostor won by parity, None = round continues
    pub impostor_found: Option<bool>,
    /// Player eliminated by the latest resolved ballot
    #[serde(default)]
    pub eliminated_id: Option<PlayerId>,
    /// Words already dealt in this room, excluded from later draws
    #[serde(default)]
    pub seen_words: Vec<String>,
    pub created_at: String,
    pub last_active_at: String,
}

impl GameState {
    pub fn player(&self, id: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn player_by_name(&self, name: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.name == name)
    }

    pub fn host(&self) -> Option<&Player> {
        self.players.iter().find(|p| p.is_host)
    }

    pub fn is_host(&self, id: &str) -> bool {
        self.player(id).map(|p| p.is_host).unwrap_or(false)
    }

    pub fn alive_players(&self) -> impl Iterator<Item = &Player> {
        self.players.iter().filter(|p| p.is_alive)
    }

    pub fn alive_count(&self) -> usize {
        self.alive_players().count()
    }

    pub fn ready_count(&self) -> usize {
        self.players.iter().filter(|p| p.is_ready).count()
    }

    pub fn is_alive(&self, id: &str) -> bool {
        self.player(id).map(|p| p.is_alive).unwrap_or(false)
    }
}
