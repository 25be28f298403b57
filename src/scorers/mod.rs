//! Static position evaluators used at the leaves of the search.
//!
//! A [`Scorer`] estimates the probability that `perspective` wins the round
//! from the given position. All scorers share one convention: values lie in
//! `[0, 1]` and finished rounds score exactly `1.0` for the winner and `0.0`
//! for the loser, so the search can mix terminal values and estimates.

mod network;
mod pubeval;
mod race;

pub use network::{DenseNetwork, InferenceEngine, NetworkScorer, network_features};
pub use pubeval::{PubevalScorer, is_race, pubeval_board, pubeval_embedding};
pub use race::{RaceScorer, race_table, race_win_probability};

use crate::state::{GameState, Player};

/// Estimates winning chances of a position.
pub trait Scorer: Send {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Win probability estimate for `perspective`. Must not change `state`.
    fn score(&mut self, state: &GameState, perspective: Player) -> f32;
}

impl<S: Scorer + ?Sized> Scorer for Box<S> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn score(&mut self, state: &GameState, perspective: Player) -> f32 {
        (**self).score(state, perspective)
    }
}

/// `1.0` or `0.0` once the round is decided, from `perspective`'s point of view.
pub fn terminal_value(state: &GameState, perspective: Player) -> Option<f32> {
    state
        .round_result()
        .winner()
        .map(|winner| if winner == perspective { 1.0 } else { 0.0 })
}
