//! Ballots, tally and the two-stage tie escalation

use crate::types::*;
use std::collections::HashMap;

/// What a completed ballot decided
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum BallotOutcome {
    Eliminated(PlayerId),
    /// Several players share the top count, listed in roster order
    Tie(Vec<PlayerId>),
}

/// Count votes per target
pub(crate) fn tally(votes: &HashMap<PlayerId, PlayerId>) -> HashMap<PlayerId, u32> {
    let mut counts: HashMap<PlayerId, u32> = HashMap::new();
    for target in votes.values() {
        *counts.entry(target.clone()).or_insert(0) += 1;
    }
    counts
}

impl GameState {
    /// Record a vote. Once every alive player has voted the ballot resolves.
    pub(super) fn cast_vote(&mut self, voter_id: &str, target_id: &str) {
        if !self.phase.is_ballot() {
            return;
        }
        if !self.is_alive(voter_id) || !self.is_alive(target_id) {
            tracing::debug!(voter_id, target_id, "Ignoring vote from or for a non-alive player");
            return;
        }
        if self.phase == GamePhase::TieBreakerVote {
            let allowed = self
                .tie_breaker_ids
                .as_ref()
                .is_some_and(|ids| ids.iter().any(|id| id == target_id));
            if !allowed {
                tracing::debug!(target_id, "Ignoring tie-break vote outside the suspects");
                return;
            }
        }

        self.votes
            .insert(voter_id.to_string(), target_id.to_string());
        if let Some(voter) = self.players.iter_mut().find(|p| p.id == voter_id) {
            voter.voted_for_id = Some(target_id.to_string());
        }

        let all_voted = self
            .alive_players()
            .all(|p| self.votes.contains_key(&p.id));
        if all_voted {
            self.resolve_ballot();
        }
    }

    /// Outcome of the current ballot, without applying it
    pub(crate) fn ballot_outcome(&self) -> Option<BallotOutcome> {
        let counts = tally(&self.votes);
        let max = counts.values().copied().max()?;

        // Roster order keeps the candidate list stable across peers
        let leaders: Vec<PlayerId> = self
            .players
            .iter()
            .filter(|p| counts.get(&p.id) == Some(&max))
            .map(|p| p.id.clone())
            .collect();

        match leaders.len() {
            0 => None,
            1 => leaders.into_iter().next().map(BallotOutcome::Eliminated),
            _ => Some(BallotOutcome::Tie(leaders)),
        }
    }

    fn resolve_ballot(&mut self) {
        match self.ballot_outcome() {
            Some(BallotOutcome::Eliminated(id)) => self.eliminate(&id),
            Some(BallotOutcome::Tie(candidates)) if self.phase == GamePhase::VoteInProgress => {
                self.enter_tie_breaker(candidates);
            }
            Some(BallotOutcome::Tie(candidates)) => {
                tracing::info!(?candidates, "Second ballot tied, nobody is eliminated");
                self.eliminated_id = None;
                self.impostor_found = None;
                self.phase = GamePhase::RevealResult;
            }
            None => {
                self.eliminated_id = None;
                self.impostor_found = None;
                self.phase = GamePhase::RevealResult;
            }
        }
    }

    fn eliminate(&mut self, id: &str) {
        let mut role = None;
        if let Some(p) = self.players.iter_mut().find(|p| p.id == id) {
            p.is_alive = false;
            role = p.role;
        }

        let remaining = self.alive_count();
        self.impostor_found = if role == Some(Role::Imposter) {
            Some(true)
        } else if remaining <= 2 {
            Some(false)
        } else {
            None
        };

        tracing::info!(
            eliminated = id,
            ?role,
            remaining,
            impostor_found = ?self.impostor_found,
            "Ballot resolved"
        );

        self.eliminated_id = Some(id.to_string());
        self.tie_breaker_ids = None;
        self.phase = GamePhase::RevealResult;
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

    #[test]
    fn test_tally_counts_targets() {
        let mut votes = HashMap::new();
        votes.insert("a".to_string(), "x".to_string());
        votes.insert("b".to_string(), "x".to_string());
        votes.insert("c".to_string(), "y".to_string());
        let counts = tally(&votes);
        assert_eq!(counts.get("x"), Some(&2));
        assert_eq!(counts.get("y"), Some(&1));
    }

    #[test]
    fn test_plurality_eliminates_impostor() {
        let names = ["A", "B", "C", "X", "Y"];
        let mut rng = GameRng::new(1);
        let mut state = open_ballot(in_discussion(&names, &mut rng), &mut rng);
        force_impostor(&mut state, "X");

        state = vote(state, &mut rng, "A", "X");
        state = vote(state, &mut rng, "B", "X");
        state = vote(state, &mut rng, "C", "Y");
        state = vote(state, &mut rng, "X", "Y");
        assert_eq!(state.phase, GamePhase::VoteInProgress);
        state = vote(state, &mut rng, "Y", "X");

        assert_eq!(state.phase, GamePhase::RevealResult);
        assert!(!state.is_alive(&id_of(&state, "X")));
        assert_eq!(state.impostor_found, Some(true));
    }

    #[test]
    fn test_revote_overwrites() {
        let names = ["A", "B", "C", "D"];
        let mut rng = GameRng::new(2);
        let mut state = open_ballot(in_discussion(&names, &mut rng), &mut rng);

        state = vote(state, &mut rng, "A", "B");
        state = vote(state, &mut rng, "A", "C");
        assert_eq!(state.votes.len(), 1);
        assert_eq!(state.votes.get(&id_of(&state, "A")), Some(&id_of(&state, "C")));

        let same = vote(state.clone(), &mut rng, "A", "C");
        assert_eq!(same, state);
    }

    #[test]
    fn test_votes_from_or_for_dead_players_are_ignored() {
        let names = ["A", "B", "C", "D"];
        let mut rng = GameRng::new(3);
        let mut state = open_ballot(in_discussion(&names, &mut rng), &mut rng);
        state.players[3].is_alive = false;

        let from_dead = vote(state.clone(), &mut rng, "D", "A");
        assert_eq!(from_dead, state);
        let for_dead = vote(state.clone(), &mut rng, "A", "D");
        assert_eq!(for_dead, state);
    }

    #[test]
    fn test_first_tie_enters_argument_without_elimination() {
        let names = ["A", "B", "C", "D"];
        let mut rng = GameRng::new(4);
        let mut state = open_ballot(in_discussion(&names, &mut rng), &mut rng);

        state = vote(state, &mut rng, "A", "C");
        state = vote(state, &mut rng, "B", "D");
        state = vote(state, &mut rng, "C", "D");
        state = vote(state, &mut rng, "D", "C");

        assert_eq!(state.phase, GamePhase::TieBreakerArgument);
        let mut suspects = state.tie_breaker_ids.clone().unwrap();
        suspects.sort();
        let mut expected = vec![id_of(&state, "C"), id_of(&state, "D")];
        expected.sort();
        assert_eq!(suspects, expected);
        assert_eq!(state.alive_count(), 4);
        assert!(state.votes.is_empty());
        assert!(state.players.iter().all(|p| p.voted_for_id.is_none()));
        assert!(state.players.iter().all(|p| !p.has_finished_speaking));
    }

    #[test]
    fn test_double_tie_ends_without_elimination() {
        let names = ["A", "B", "C", "D"];
        let mut rng = GameRng::new(5);
        let catalog = BuiltinCatalog::new();
        let mut state = open_ballot(in_discussion(&names, &mut rng), &mut rng);
        for (voter, target) in [("A", "C"), ("B", "D"), ("C", "D"), ("D", "C")] {
            state = vote(state, &mut rng, voter, target);
        }
        state = apply(state, Action::StartTieVote, &mut rng, &catalog);
        assert_eq!(state.phase, GamePhase::TieBreakerVote);

        // Votes outside the suspects are ignored
        let outside = vote(state.clone(), &mut rng, "A", "B");
        assert_eq!(outside, state);

        for (voter, target) in [("A", "C"), ("B", "D"), ("C", "D"), ("D", "C")] {
            state = vote(state, &mut rng, voter, target);
        }

        assert_eq!(state.phase, GamePhase::RevealResult);
        assert_eq!(state.impostor_found, None);
        assert_eq!(state.eliminated_id, None);
        assert_eq!(state.alive_count(), 4);
    }

    #[test]
    fn test_tie_vote_can_eliminate() {
        let names = ["A", "B", "C", "D", "E"];
        let mut rng = GameRng::new(6);
        let catalog = BuiltinCatalog::new();
        let mut state = open_ballot(in_discussion(&names, &mut rng), &mut rng);
        force_impostor(&mut state, "E");
        for (voter, target) in [("A", "C"), ("B", "D"), ("C", "D"), ("D", "C"), ("E", "A")] {
            state = vote(state, &mut rng, voter, target);
        }
        assert_eq!(state.phase, GamePhase::TieBreakerArgument);
        state = apply(state, Action::StartTieVote, &mut rng, &catalog);

        for (voter, target) in [("A", "C"), ("B", "C"), ("C", "D"), ("D", "C"), ("E", "C")] {
            state = vote(state, &mut rng, voter, target);
        }
        assert_eq!(state.phase, GamePhase::RevealResult);
        assert!(!state.is_alive(&id_of(&state, "C")));
        assert_eq!(state.impostor_found, None);
        assert_eq!(state.tie_breaker_ids, None);
    }

    #[test]
    fn test_parity_win_with_two_left() {
        let names = ["A", "B", "C", "D"];
        let mut rng = GameRng::new(7);
        let mut state = open_ballot(in_discussion(&names, &mut rng), &mut rng);
        force_impostor(&mut state, "D");
        state.players[0].is_alive = false;

        state = vote(state, &mut rng, "B", "C");
        state = vote(state, &mut rng, "C", "B");
        state = vote(state, &mut rng, "D", "C");

        assert_eq!(state.phase, GamePhase::RevealResult);
        assert_eq!(state.alive_count(), 2);
        assert_eq!(state.impostor_found, Some(false));
    }
}
