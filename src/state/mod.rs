//! Phase state machine
//!
//! `apply` maps `(state, action)` to the next state. It performs no I/O; the
//! only randomness comes from the `GameRng` and `WordCatalog` passed in.
//! Actions that are not the expected trigger for the current phase, or that
//! name unknown players, return the state unchanged.

mod assign;
mod phase;
mod roster;
mod vote;

pub use assign::impostor_count;
pub use roster::{draw_avatar, generate_room_slug, normalize_slug};

use crate::protocol::Action;
use crate::rng::GameRng;
use crate::types::*;
use crate::words::WordCatalog;

/// Apply one action to the authoritative state
pub fn apply(
    mut state: GameState,
    action: Action,
    rng: &mut GameRng,
    catalog: &dyn WordCatalog,
) -> GameState {
    match action {
        Action::JoinRoom { slug, player_name } => {
            state.join(&slug, &player_name, rng);
        }
        Action::ToggleReady { player_id } => state.toggle_ready(&player_id),
        Action::StartGame => state.start_game(rng, catalog),
        Action::RevealConfirm { player_id } => state.reveal_confirm(&player_id),
        Action::FinishSpeaking { player_id } => state.finish_speaking(&player_id),
        Action::Vote {
            voter_id,
            target_id,
        } => state.cast_vote(&voter_id, &target_id),
        Action::StartTieVote => state.start_tie_vote(),
        Action::NextRound => state.next_round(),
        Action::ResetGame => state.reset_game(),
    }
    state
}
