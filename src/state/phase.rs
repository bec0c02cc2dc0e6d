//! Progress gates between phases: word reveal, discussion, tie-break
//! argument, round advance and reset

use crate::types::*;

impl GameState {
    /// REVEAL_WORD gate: moves to DISCUSSION once every alive player confirmed
    pub(super) fn reveal_confirm(&mut self, player_id: &str) {
        if self.phase != GamePhase::RevealWord {
            return;
        }
        let Some(player) = self.players.iter_mut().find(|p| p.id == player_id) else {
            return;
        };
        player.has_seen_word = true;

        if self.alive_players().all(|p| p.has_seen_word) {
            tracing::info!("All words seen, discussion opens");
            self.phase = GamePhase::Discussion;
        }
    }

    /// DISCUSSION -> VOTE_WAITING on the first finisher, VOTE_IN_PROGRESS once
    /// every alive player is done. During a tie-break argument only the tied
    /// suspects can mark themselves done and the phase does not move.
    pub(super) fn finish_speaking(&mut self, player_id: &str) {
        match self.phase {
            GamePhase::Discussion | GamePhase::VoteWaiting => {}
            GamePhase::TieBreakerArgument => {
                let suspect = self
                    .tie_breaker_ids
                    .as_ref()
                    .is_some_and(|ids| ids.iter().any(|id| id == player_id));
                if suspect {
                    if let Some(p) = self
                        .players
                        .iter_mut()
                        .find(|p| p.id == player_id && p.is_alive)
                    {
                        p.has_finished_speaking = true;
                    }
                }
                return;
            }
            _ => return,
        }

        let Some(player) = self
            .players
            .iter_mut()
            .find(|p| p.id == player_id && p.is_alive)
        else {
            return;
        };
        player.has_finished_speaking = true;

        if self.alive_players().all(|p| p.has_finished_speaking) {
            tracing::info!("Everybody finished speaking, ballot opens");
            self.open_ballot(GamePhase::VoteInProgress);
        } else if self.phase == GamePhase::Discussion {
            self.phase = GamePhase::VoteWaiting;
        }
    }

    /// TIE_BREAKER_ARGUMENT -> TIE_BREAKER_VOTE
    pub(super) fn start_tie_vote(&mut self) {
        if self.phase != GamePhase::TieBreakerArgument {
            return;
        }
        tracing::info!(suspects = ?self.tie_breaker_ids, "Tie-break ballot opens");
        self.open_ballot(GamePhase::TieBreakerVote);
    }

    /// Dedicated defense round for the tied suspects
    pub(super) fn enter_tie_breaker(&mut self, candidates: Vec<PlayerId>) {
        tracing::info!(?candidates, "First ballot tied, entering tie-break argument");
        self.phase = GamePhase::TieBreakerArgument;
        self.tie_breaker_ids = Some(candidates);
        self.votes.clear();
        for p in self.players.iter_mut() {
            p.voted_for_id = None;
            p.has_finished_speaking = false;
        }
    }

    /// REVEAL_RESULT -> DISCUSSION while the round is undecided, GAME_OVER otherwise
    pub(super) fn next_round(&mut self) {
        if self.phase != GamePhase::RevealResult {
            return;
        }
        if self.impostor_found.is_some() {
            self.phase = GamePhase::GameOver;
            return;
        }

        self.phase = GamePhase::Discussion;
        self.round_no += 1;
        self.votes.clear();
        self.tie_breaker_ids = None;
        self.eliminated_id = None;
        for p in self.players.iter_mut() {
            p.has_finished_speaking = false;
            p.voted_for_id = None;
        }
        tracing::info!(round_no = self.round_no, "Next discussion round");
    }

    /// Back to the lobby with the roster intact
    pub(super) fn reset_game(&mut self) {
        self.phase = GamePhase::Lobby;
        self.round_no = 0;
        self.current_word_pair = None;
        self.votes.clear();
        self.tie_breaker_ids = None;
        self.impostor_found = None;
        self.eliminated_id = None;
        for p in self.players.iter_mut() {
            p.role = None;
            p.word = None;
            p.is_ready = false;
            p.is_alive = true;
            p.has_seen_word = false;
            p.has_finished_speaking = false;
            p.voted_for_id = None;
        }
        tracing::info!(room = %self.room_slug, "Game reset to lobby");
    }

    fn open_ballot(&mut self, phase: GamePhase) {
        self.phase = phase;
        self.votes.clear();
        for p in self.players.iter_mut() {
            p.voted_for_id = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::apply;
    use super::super::test_support::*;
    use super::*;
    use crate::protocol::Action;
    use crate::rng::GameRng;
    use crate::words::BuiltinCatalog;

    const FIVE: [&str; 5] = ["Alice", "Bob", "Carol", "Dave", "Eve"];

    fn started(rng: &mut GameRng) -> GameState {
        let catalog = BuiltinCatalog::new();
        let mut state = new_lobby(&FIVE, rng);
        let ids: Vec<PlayerId> = state.players.iter().map(|p| p.id.clone()).collect();
        for id in ids {
            state = apply(state, Action::ToggleReady { player_id: id }, rng, &catalog);
        }
        apply(state, Action::StartGame, rng, &catalog)
    }

    #[test]
    fn test_reveal_confirm_is_idempotent() {
        let mut rng = GameRng::new(1);
        let catalog = BuiltinCatalog::new();
        let state = started(&mut rng);
        let bob = id_of(&state, "Bob");

        let once = apply(state, Action::RevealConfirm { player_id: bob.clone() }, &mut rng, &catalog);
        let twice = apply(once.clone(), Action::RevealConfirm { player_id: bob }, &mut rng, &catalog);
        assert_eq!(once, twice);
        assert_eq!(twice.phase, GamePhase::RevealWord);
    }

    #[test]
    fn test_discussion_only_after_every_alive_player_confirms() {
        let mut rng = GameRng::new(2);
        let catalog = BuiltinCatalog::new();
        let mut state = started(&mut rng);
        let ids: Vec<PlayerId> = state.players.iter().map(|p| p.id.clone()).collect();

        for (i, id) in ids.iter().enumerate() {
            assert_eq!(state.phase, GamePhase::RevealWord, "gate opened early at {}", i);
            state = apply(state, Action::RevealConfirm { player_id: id.clone() }, &mut rng, &catalog);
        }
        assert_eq!(state.phase, GamePhase::Discussion);
        assert!(state.alive_players().all(|p| p.has_seen_word));
    }

    #[test]
    fn test_finish_speaking_moves_through_vote_waiting() {
        let mut rng = GameRng::new(3);
        let catalog = BuiltinCatalog::new();
        let mut state = in_discussion(&FIVE, &mut rng);
        let ids: Vec<PlayerId> = state.players.iter().map(|p| p.id.clone()).collect();

        state = apply(state, Action::FinishSpeaking { player_id: ids[0].clone() }, &mut rng, &catalog);
        assert_eq!(state.phase, GamePhase::VoteWaiting);

        // Re-finishing changes nothing
        let again = apply(state.clone(), Action::FinishSpeaking { player_id: ids[0].clone() }, &mut rng, &catalog);
        assert_eq!(again, state);

        for id in &ids[1..] {
            state = apply(state, Action::FinishSpeaking { player_id: id.clone() }, &mut rng, &catalog);
        }
        assert_eq!(state.phase, GamePhase::VoteInProgress);
        assert!(state.votes.is_empty());
    }

    #[test]
    fn test_dead_players_do_not_gate_discussion() {
        let mut rng = GameRng::new(4);
        let catalog = BuiltinCatalog::new();
        let mut state = in_discussion(&FIVE, &mut rng);
        state.players[4].is_alive = false;
        let alive: Vec<PlayerId> = state.alive_players().map(|p| p.id.clone()).collect();
        let dead = state.players[4].id.clone();

        // A dead player's finish is ignored
        let next = apply(state.clone(), Action::FinishSpeaking { player_id: dead }, &mut rng, &catalog);
        assert_eq!(next, state);

        for id in alive {
            state = apply(state, Action::FinishSpeaking { player_id: id }, &mut rng, &catalog);
        }
        assert_eq!(state.phase, GamePhase::VoteInProgress);
    }

    #[test]
    fn test_reset_game_preserves_roster() {
        let mut rng = GameRng::new(5);
        let catalog = BuiltinCatalog::new();
        let mut state = open_ballot(in_discussion(&FIVE, &mut rng), &mut rng);
        state = vote(state, &mut rng, "Alice", "Bob");
        let room_id = state.room_id.clone();
        let slug = state.room_slug.clone();
        let ids: Vec<PlayerId> = state.players.iter().map(|p| p.id.clone()).collect();

        let state = apply(state, Action::ResetGame, &mut rng, &catalog);
        assert_eq!(state.phase, GamePhase::Lobby);
        assert_eq!(state.room_id, room_id);
        assert_eq!(state.room_slug, slug);
        assert_eq!(
            state.players.iter().map(|p| p.id.clone()).collect::<Vec<_>>(),
            ids
        );
        assert!(state.votes.is_empty());
        assert!(state.current_word_pair.is_none());
        for p in &state.players {
            assert_eq!(p.role, None);
            assert_eq!(p.word, None);
            assert!(!p.is_ready);
            assert!(p.is_alive);
            assert_eq!(p.voted_for_id, None);
        }
    }

    #[test]
    fn test_start_tie_vote_only_from_argument() {
        let mut rng = GameRng::new(6);
        let catalog = BuiltinCatalog::new();
        let state = in_discussion(&FIVE, &mut rng);
        let next = apply(state.clone(), Action::StartTieVote, &mut rng, &catalog);
        assert_eq!(next, state);
    }
}
