//! Tesauro's public linear evaluator ("pubeval").
//!
//! The position is seen from the evaluated side as if it were player two,
//! moving from point 24 down to point 1. Each point contributes five inputs;
//! two weight vectors exist, one for positions with contact and one for pure
//! races.

use crate::constants::{CHECKERS, NUM_SLOTS, PUBEVAL_INPUTS, PUBEVAL_MAX_SCORE, Slot};
use crate::scorers::{Scorer, terminal_value};
use crate::state::{GameState, Player};

#[rustfmt::skip]
const RACE_WEIGHTS: [f32; PUBEVAL_INPUTS] = [
    0.00000, -0.17160, 0.27010, 0.29906, -0.08471,
    0.00000, -1.40375, -1.05121, 0.07217, -0.01351,
    0.00000, -1.29506, -2.16183, 0.13246, -1.03508,
    0.00000, -2.29847, -2.34631, 0.17253, 0.08302,
    0.00000, -1.27266, -2.87401, -0.07456, -0.34240,
    0.00000, -1.34640, -2.46556, -0.13022, -0.01591,
    0.00000, 0.27448, 0.60015, 0.48302, 0.25236,
    0.00000, 0.39521, 0.68178, 0.05281, 0.09266,
    0.00000, 0.24855, -0.06844, -0.37646, 0.05685,
    0.00000, 0.17405, 0.00430, 0.74427, 0.00576,
    0.00000, 0.12392, 0.31202, -0.91035, -0.16270,
    0.00000, 0.01418, -0.10839, -0.02781, -0.88035,
    0.00000, 1.07274, 2.00366, 1.16242, 0.22520,
    0.00000, 0.85631, 1.06349, 1.49549, 0.18966,
    0.00000, 0.37183, -0.50352, -0.14818, 0.12039,
    0.00000, 0.13681, 0.13978, 1.11245, -0.12707,
    0.00000, -0.22082, 0.20178, -0.06285, -0.52728,
    0.00000, -0.13597, -0.19412, -0.09308, -1.26062,
    0.00000, 3.05454, 5.16874, 1.50680, 5.35000,
    0.00000, 2.19605, 3.85390, 0.88296, 2.30052,
    0.00000, 0.92321, 1.08744, -0.11696, -0.78560,
    0.00000, -0.09795, -0.83050, -1.09167, -4.94251,
    0.00000, -1.00316, -3.66465, -2.56906, -9.67677,
    0.00000, -2.77982, -7.26713, -3.40177, -12.32252,
    0.00000, 3.42040,
];

#[rustfmt::skip]
const CONTACT_WEIGHTS: [f32; PUBEVAL_INPUTS] = [
    0.25696, -0.66937, -1.66135, -2.02487, -2.53398,
    -0.16092, -1.11725, -1.06654, -0.92830, -1.99558,
    -1.10388, -0.80802, 0.09856, -0.62086, -1.27999,
    -0.59220, -0.73667, 0.89032, -0.38933, -1.59847,
    -1.50197, -0.60966, 1.56166, -0.47389, -1.80390,
    -0.83425, -0.97741, -1.41371, 0.24500, 0.10970,
    -1.36476, -1.05572, 1.15420, 0.11069, -0.38319,
    -0.74816, -0.59244, 0.81116, -0.39511, 0.11424,
    -0.73169, -0.56074, 1.09792, 0.15977, 0.13786,
    -1.18435, -0.43363, 1.06169, -0.21329, 0.04798,
    -0.94373, -0.22982, 1.22737, -0.13099, -0.06295,
    -0.75882, -0.13658, 1.78389, 0.30416, 0.36797,
    -0.69851, 0.13003, 1.23070, 0.40868, -0.21081,
    -0.64073, 0.31061, 1.59554, 0.65718, 0.25429,
    -0.80789, 0.08240, 1.78964, 0.54304, 0.41174,
    -1.06161, 0.07851, 2.01451, 0.49786, 0.91936,
    -0.90750, 0.05941, 1.83120, 0.58722, 1.28777,
    -0.83711, -0.33248, 2.64983, 0.52698, 0.82132,
    -0.58897, -1.18223, 3.35809, 0.62017, 0.57353,
    -0.07276, -0.36214, 4.37655, 0.45481, 0.21746,
    0.10504, -0.61977, 3.54001, 0.04612, -0.18108,
    0.63211, -0.87046, 2.47673, -0.48016, -1.27157,
    0.86505, -1.11342, 1.24612, -0.82385, -2.77082,
    1.23606, -1.59529, 0.10438, -1.30206, -4.11520,
    5.62596, -2.75800,
];

/// 27-entry board seen by `me`.
///
/// Index 0 holds the opponent's bar (negative), `1..=24` the points with my
/// checkers positive and the opponent's negative, 25 my bar and 26 my
/// checkers already borne off.
pub fn pubeval_board(state: &GameState, me: Player) -> [i32; 27] {
    let mut board = [0i32; 27];
    let mut mine = 0;
    for slot in 0..NUM_SLOTS as Slot {
        let n = state.count(slot) as i32;
        let index = match me {
            Player::Two => slot as usize,
            Player::One => (25 - slot) as usize,
        };
        if state.owner(slot) == Some(me) {
            mine += n;
            board[index] = n;
        } else {
            board[index] = -n;
        }
    }
    board[26] = CHECKERS as i32 - mine;
    board
}

/// The 122 pubeval inputs of a board built by [`pubeval_board`].
pub fn pubeval_embedding(board: &[i32; 27]) -> [f32; PUBEVAL_INPUTS] {
    let mut x = [0.0f32; PUBEVAL_INPUTS];
    for j in 1..=24 {
        let base = 5 * (j - 1);
        match board[25 - j] {
            -1 => x[base] = 1.0,
            1 => x[base + 1] = 1.0,
            n if n >= 2 => {
                x[base + 2] = 1.0;
                if n == 3 {
                    x[base + 3] = 1.0;
                } else if n >= 4 {
                    x[base + 4] = (n - 3) as f32 / 2.0;
                }
            }
            _ => {}
        }
    }
    x[120] = -board[0] as f32 / 2.0;
    x[121] = board[26] as f32 / 15.0;
    x
}

/// No contact left: my rearmost checker is past the opponent's rearmost one.
pub fn is_race(board: &[i32; 27]) -> bool {
    let mut my_last = 25;
    while my_last > 0 && board[my_last] <= 0 {
        my_last -= 1;
    }
    let mut their_first = 0;
    while their_first < 25 && board[their_first] >= 0 {
        their_first += 1;
    }
    my_last <= their_first
}

/// Linear evaluation clamped to `±max_score` and mapped onto `[0, 1]`.
#[derive(Debug, Clone, Copy)]
pub struct PubevalScorer {
    max_score: f32,
}

impl PubevalScorer {
    pub fn new(max_score: f32) -> Self {
        Self { max_score }
    }

    /// Raw pubeval sum for `me`.
    pub fn raw(&self, state: &GameState, me: Player) -> f32 {
        let board = pubeval_board(state, me);
        if board[26] == CHECKERS as i32 {
            return f32::INFINITY;
        }
        let weights = if is_race(&board) { &RACE_WEIGHTS } else { &CONTACT_WEIGHTS };
        pubeval_embedding(&board)
            .iter()
            .zip(weights)
            .map(|(x, w)| x * w)
            .sum()
    }
}

impl Default for PubevalScorer {
    fn default() -> Self {
        Self::new(PUBEVAL_MAX_SCORE)
    }
}

impl Scorer for PubevalScorer {
    fn name(&self) -> &'static str {
        "pubeval"
    }

    fn score(&mut self, state: &GameState, perspective: Player) -> f32 {
        if let Some(value) = terminal_value(state, perspective) {
            return value;
        }
        let clamped = self.raw(state, perspective).clamp(-self.max_score, self.max_score);
        (clamped / self.max_score + 1.0) / 2.0
    }
}
