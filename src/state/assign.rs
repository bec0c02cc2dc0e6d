//! Role and word dealing at round start

use crate::rng::GameRng;
use crate::types::*;
use crate::words::WordCatalog;

/// Number of impostors for a room of `player_count`
pub fn impostor_count(player_count: usize) -> usize {
    if player_count >= TWO_IMPOSTOR_THRESHOLD {
        2
    } else {
        1
    }
}

impl GameState {
    /// LOBBY -> REVEAL_WORD. Draws a word pair and deals roles to every
    /// player from a full shuffle of roster positions.
    pub(super) fn start_game(&mut self, rng: &mut GameRng, catalog: &dyn WordCatalog) {
        if self.phase != GamePhase::Lobby {
            return;
        }
        let ready = self.ready_count();
        if ready < MIN_READY_PLAYERS {
            tracing::debug!(ready, "Start ignored: not enough ready players");
            return;
        }

        let pair = catalog.draw(&self.seen_words, rng);
        let count = impostor_count(self.players.len());

        let mut indices: Vec<usize> = (0..self.players.len()).collect();
        rng.shuffle(&mut indices);
        let impostors = &indices[..count];

        for (idx, player) in self.players.iter_mut().enumerate() {
            let role = if impostors.contains(&idx) {
                Role::Imposter
            } else {
                Role::Civil
            };
            player.role = Some(role);
            player.word = Some(pair.word_for(role).to_string());
            player.is_alive = true;
            player.has_seen_word = false;
            player.has_finished_speaking = false;
            player.voted_for_id = None;
        }

        for word in [&pair.civil, &pair.imposter] {
            if !self.seen_words.contains(word) {
                self.seen_words.push(word.clone());
            }
        }

        tracing::info!(
            players = self.players.len(),
            impostors = count,
            category = %pair.category,
            "Round started"
        );

        self.current_word_pair = Some(pair);
        self.phase = GamePhase::RevealWord;
        self.round_no = 1;
        self.votes.clear();
        self.tie_breaker_ids = None;
        self.impostor_found = None;
        self.eliminated_id = None;
    }
}

#[cfg(test)]
mod tests {
    use super::super::apply;
    use super::super::test_support::*;
    use super::*;
    use crate::protocol::Action;
    use crate::words::BuiltinCatalog;

    const NAMES: [&str; 9] = [
        "Alice", "Bob", "Carol", "Dave", "Eve", "Frank", "Grace", "Heidi", "Ivan",
    ];

    fn started(n: usize, seed: u64) -> GameState {
        let mut rng = GameRng::new(seed);
        let catalog = BuiltinCatalog::new();
        let mut state = new_lobby(&NAMES[..n], &mut rng);
        let ids: Vec<PlayerId> = state.players.iter().map(|p| p.id.clone()).collect();
        for id in ids {
            state = apply(state, Action::ToggleReady { player_id: id }, &mut rng, &catalog);
        }
        apply(state, Action::StartGame, &mut rng, &catalog)
    }

    #[test]
    fn test_impostor_count_thresholds() {
        assert_eq!(impostor_count(4), 1);
        assert_eq!(impostor_count(7), 1);
        assert_eq!(impostor_count(8), 2);
        assert_eq!(impostor_count(12), 2);
    }

    #[test]
    fn test_role_counts_and_words() {
        for n in 4..=9 {
            for seed in 0..10 {
                let state = started(n, seed);
                assert_eq!(state.phase, GamePhase::RevealWord);

                let pair = state.current_word_pair.clone().unwrap();
                assert_ne!(pair.civil, pair.imposter);

                let impostors: Vec<&Player> = state
                    .players
                    .iter()
                    .filter(|p| p.role == Some(Role::Imposter))
                    .collect();
                let expected = if n >= 8 { 2 } else { 1 };
                assert_eq!(impostors.len(), expected);

                for p in &state.players {
                    assert!(p.is_alive);
                    assert!(!p.has_seen_word);
                    match p.role {
                        Some(Role::Imposter) => assert_eq!(p.word.as_ref(), Some(&pair.imposter)),
                        Some(Role::Civil) => assert_eq!(p.word.as_ref(), Some(&pair.civil)),
                        None => panic!("Every player should have a role"),
                    }
                }
            }
        }
    }

    #[test]
    fn test_seeded_deal_is_reproducible() {
        let a = started(6, 42);
        let b = started(6, 42);
        let roles_a: Vec<Option<Role>> = a.players.iter().map(|p| p.role).collect();
        let roles_b: Vec<Option<Role>> = b.players.iter().map(|p| p.role).collect();
        assert_eq!(roles_a, roles_b);
        assert_eq!(a.current_word_pair, b.current_word_pair);
    }

    #[test]
    fn test_start_requires_quorum() {
        let mut rng = GameRng::new(3);
        let catalog = BuiltinCatalog::new();
        let mut state = new_lobby(&NAMES[..5], &mut rng);
        let ids: Vec<PlayerId> = state.players.iter().map(|p| p.id.clone()).take(3).collect();
        for id in ids {
            state = apply(state, Action::ToggleReady { player_id: id }, &mut rng, &catalog);
        }
        let next = apply(state.clone(), Action::StartGame, &mut rng, &catalog);
        assert_eq!(next, state);
        assert_eq!(next.phase, GamePhase::Lobby);
    }

    #[test]
    fn test_seen_words_accumulate() {
        let state = started(4, 1);
        let pair = state.current_word_pair.clone().unwrap();
        assert!(state.seen_words.contains(&pair.civil));
        assert!(state.seen_words.contains(&pair.imposter));
    }
}
