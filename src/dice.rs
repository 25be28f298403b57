//! A roll of two six-sided dice and the probability tables built from it.
//!
//! Chance nodes of the search only need the 21 distinct outcomes: a double
//! appears once out of 36 rolls, any other pair twice (as `a,b` and `b,a`).

use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::constants::{DICE_OUTCOMES, UNIQUE_DICE_OUTCOMES};

/// One roll of two dice. `first` and `second` are both in `1..=6`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dice {
    pub first: u8,
    pub second: u8,
}

impl Dice {
    pub fn new(first: u8, second: u8) -> Self {
        debug_assert!((1..=6).contains(&first) && (1..=6).contains(&second));
        Self { first, second }
    }

    /// Roll both dice with the given generator.
    pub fn roll(rng: &mut fastrand::Rng) -> Self {
        Self::new(rng.u8(1..=6), rng.u8(1..=6))
    }

    #[inline]
    pub fn is_double(&self) -> bool {
        self.first == self.second
    }

    /// Numbers that may be played with this roll.
    ///
    /// A double yields four copies of its number, otherwise the two values
    /// in ascending order.
    pub fn numbers(&self) -> Vec<u8> {
        if self.is_double() {
            vec![self.first; 4]
        } else {
            vec![self.first.min(self.second), self.first.max(self.second)]
        }
    }

    /// Sum of the pips this roll can move (doubles count four times).
    pub fn pips(&self) -> u32 {
        self.numbers().iter().map(|&n| n as u32).sum()
    }

    /// All 36 ordered outcomes.
    pub fn all() -> impl Iterator<Item = Dice> {
        (1..=6).flat_map(|a| (1..=6).map(move |b| Dice::new(a, b)))
    }
}

/// The 21 unordered outcomes with their multiplicity out of 36.
pub fn weighted_outcomes() -> &'static [(Dice, u32); UNIQUE_DICE_OUTCOMES] {
    static TABLE: OnceLock<[(Dice, u32); UNIQUE_DICE_OUTCOMES]> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut table = [(Dice::new(1, 1), 0); UNIQUE_DICE_OUTCOMES];
        let mut k = 0;
        for a in 1..=6 {
            for b in a..=6 {
                table[k] = (Dice::new(a, b), if a == b { 1 } else { 2 });
                k += 1;
            }
        }
        debug_assert_eq!(
            table.iter().map(|&(_, w)| w).sum::<u32>(),
            DICE_OUTCOMES
        );
        table
    })
}
