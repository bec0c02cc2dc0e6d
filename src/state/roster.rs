//! Room membership: creation, joins, late joiners, ready flags

use crate::rng::GameRng;
use crate::types::*;
use rand::Rng;

const EMOJIS: &[&str] = &[
    "🐶", "🐱", "🐭", "🐹", "🐰", "🦊", "🐻", "🐼", "🐨", "🐯", "🦁", "🐮", "🐷", "🐸", "🐙", "🐵",
    "🐔", "🐧", "🐦", "🐤", "🐺", "🐗", "🐴", "🦄", "🐝", "🐛", "🦋", "🐌", "🐞", "🐜", "🕷", "🐢",
    "🐍", "🦎", "🦖", "🦕",
];

const COLORS: &[&str] = &[
    "bg-red-200",
    "bg-orange-200",
    "bg-amber-200",
    "bg-yellow-200",
    "bg-lime-200",
    "bg-green-200",
    "bg-emerald-200",
    "bg-teal-200",
    "bg-cyan-200",
    "bg-sky-200",
    "bg-blue-200",
    "bg-indigo-200",
    "bg-violet-200",
    "bg-purple-200",
    "bg-fuchsia-200",
    "bg-pink-200",
    "bg-rose-200",
];

/// Random emoji + colour pair for a new player
pub fn draw_avatar(rng: &mut GameRng) -> Avatar {
    let emoji = rng.choose(EMOJIS).copied().unwrap_or("🐶");
    let color = rng.choose(COLORS).copied().unwrap_or("bg-sky-200");
    Avatar {
        emoji: emoji.to_string(),
        color: color.to_string(),
    }
}

/// Human-readable room slug such as `brave-panda-42`
pub fn generate_room_slug() -> String {
    let words = petname::petname(2, "-").unwrap_or_else(|| "joyeux-renard".to_string());
    let num = rand::rng().random_range(1..=99);
    normalize_slug(&format!("{}-{}", words, num))
}

/// Canonical form of a user-supplied slug: lowercase, trimmed, dashes for blanks
pub fn normalize_slug(slug: &str) -> String {
    slug.trim()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
        .to_lowercase()
}

impl GameState {
    /// Fresh room with its creator as the single host
    pub fn new_room(
        room_id: RoomId,
        room_slug: String,
        host_id: PlayerId,
        host_name: String,
        avatar: Avatar,
    ) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            room_id,
            room_slug,
            version: 1,
            round_no: 0,
            players: vec![Player::new(host_id, host_name, avatar, true)],
            phase: GamePhase::Lobby,
            current_word_pair: None,
            votes: Default::default(),
            tie_breaker_ids: None,
            impostor_found: None,
            eliminated_id: None,
            seen_words: Vec::new(),
            created_at: now.clone(),
            last_active_at: now,
        }
    }

    /// Add a player. Duplicate names, blank names and joins addressed to
    /// another room are ignored. Returns the new player's id.
    pub(super) fn join(
        &mut self,
        slug: &str,
        player_name: &str,
        rng: &mut GameRng,
    ) -> Option<PlayerId> {
        let name = player_name.trim();
        if name.is_empty() {
            tracing::debug!("Ignoring join with blank name");
            return None;
        }
        if normalize_slug(slug) != self.room_slug {
            tracing::debug!(slug, room = %self.room_slug, "Ignoring join for another room");
            return None;
        }
        if self.player_by_name(name).is_some() {
            tracing::info!(name, "Join rejected: name already taken");
            return None;
        }

        let mut player = Player::new(rng.next_id(), name.to_string(), draw_avatar(rng), false);

        // Late joiners spectate the rest of the round and never block a gate
        if self.phase != GamePhase::Lobby {
            player.is_alive = false;
            player.has_seen_word = true;
            player.has_finished_speaking = true;
        }

        tracing::info!(
            name,
            player_id = %player.id,
            late = self.phase != GamePhase::Lobby,
            "Player joined"
        );

        let id = player.id.clone();
        self.players.push(player);
        Some(id)
    }

    pub(super) fn toggle_ready(&mut self, player_id: &str) {
        if self.phase != GamePhase::Lobby {
            return;
        }
        if let Some(player) = self.players.iter_mut().find(|p| p.id == player_id) {
            player.is_ready = !player.is_ready;
        }
    }
}
