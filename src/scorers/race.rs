//! Pure race evaluation from pip counts.
//!
//! `P[i][j]` is the chance that the player on roll, needing `i` pips, wins
//! against an opponent needing `j` pips:
//!
//! ```text
//! P[0][j] = 1
//! P[i][j] = sum over rolls r of w(r)/36 * (1 if pips(r) >= i else 1 - P[j][i - pips(r)])
//! ```
//!
//! Wasted pips on bear-off and blocked moves are ignored, so the table is
//! only a rough guide while contact remains.

use std::sync::OnceLock;

use crate::constants::{DICE_OUTCOMES, MAX_PIPS};
use crate::dice::weighted_outcomes;
use crate::scorers::{Scorer, terminal_value};
use crate::state::{GameState, Player};

const SIDE: usize = MAX_PIPS + 1;

/// The shared `(MAX_PIPS + 1)²` table, row-major, built on first use.
pub fn race_table() -> &'static [f32] {
    static TABLE: OnceLock<Vec<f32>> = OnceLock::new();
    TABLE.get_or_init(build_table)
}

fn build_table() -> Vec<f32> {
    let mut p = vec![0.0f32; SIDE * SIDE];
    let rolls: Vec<(usize, f32)> = weighted_outcomes()
        .iter()
        .map(|&(dice, w)| (dice.pips() as usize, w as f32 / DICE_OUTCOMES as f32))
        .collect();

    for j in 0..SIDE {
        p[j] = 1.0;
    }
    let cell = |p: &[f32], i: usize, j: usize| -> f32 {
        rolls
            .iter()
            .map(|&(pips, w)| if pips >= i { w } else { w * (1.0 - p[j * SIDE + i - pips]) })
            .sum()
    };

    // P[i][0] stays 0: the opponent is already off.
    // every cell only depends on cells with a smaller max(i, j), or on row m
    // entries with a smaller column when filling column m
    for m in 1..SIDE {
        for k in 1..m {
            let v = cell(&p, m, k);
            p[m * SIDE + k] = v;
        }
        for k in 1..=m {
            let v = cell(&p, k, m);
            p[k * SIDE + m] = v;
        }
    }
    p
}

/// Probability that the side on roll wins a race of `on_roll` against `other` pips.
pub fn race_win_probability(on_roll: u32, other: u32) -> f32 {
    let i = (on_roll as usize).min(MAX_PIPS);
    let j = (other as usize).min(MAX_PIPS);
    race_table()[i * SIDE + j]
}

/// Scores positions as if they were pure races.
#[derive(Debug, Default, Clone, Copy)]
pub struct RaceScorer;

impl Scorer for RaceScorer {
    fn name(&self) -> &'static str {
        "race"
    }

    fn score(&mut self, state: &GameState, perspective: Player) -> f32 {
        if let Some(value) = terminal_value(state, perspective) {
            return value;
        }
        let on_roll = state.turn();
        let p = race_win_probability(
            state.pip_count(on_roll),
            state.pip_count(on_roll.opponent()),
        );
        if on_roll == perspective { p } else { 1.0 - p }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::EXIT;
    use crate::state::Move;

    #[test]
    fn test_table_bounds() {
        assert!(race_table().iter().all(|&p| (-1e-5..=1.0 + 1e-5).contains(&p)));
    }

    #[test]
    fn test_short_races() {
        // any roll clears 2 pips
        assert!((race_win_probability(2, 50) - 1.0).abs() < 1e-5);
        // 1 pip against an opponent who cannot finish in one roll
        assert!((race_win_probability(1, 30) - 1.0).abs() < 1e-5);
        // opponent already done
        assert_eq!(race_win_probability(10, 0), 0.0);
    }

    #[test]
    fn test_monotonic_in_own_pips() {
        for j in [20, 60, 120] {
            let mut last = 1.0;
            for i in (10..150).step_by(10) {
                let p = race_win_probability(i, j);
                assert!(p <= last + 1e-5, "P[{i}][{j}] = {p} > {last}");
                last = p;
            }
        }
    }

    #[test]
    fn test_being_on_roll_helps() {
        let p = race_win_probability(80, 80);
        assert!(p > 0.5 && p < 0.8);
    }

    #[test]
    fn test_scorer_perspective() {
        let state = GameState::from_layout(Player::One, &[(24, 2)], &[(20, 15)]);
        let mut scorer = RaceScorer;
        let one = scorer.score(&state, Player::One);
        let two = scorer.score(&state, Player::Two);
        assert!((one + two - 1.0).abs() < 1e-5);
        assert!(one > 0.99);
    }

    #[test]
    fn test_scorer_terminal() {
        let mut state = GameState::from_layout(Player::One, &[(24, 1)], &[(20, 3)]);
        state.set_dice(crate::dice::Dice::new(1, 2));
        state.force_move(Move::new(24, EXIT));
        let mut scorer = RaceScorer;
        assert_eq!(scorer.score(&state, Player::One), 1.0);
        assert_eq!(scorer.score(&state, Player::Two), 0.0);
    }
}
