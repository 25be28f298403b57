//! Constants for board geometry, the starting layout, and engine parameters.
//!
//! The board is stored as a flat array of 26 slots:
//! - `1..=24` are the points, numbered from player one's starting corner
//! - `0` is player one's bar, `25` is player two's bar
//! - [`EXIT`] (`-1`) is the shared "borne off" destination and never indexes the array
//!
//! Player one moves from low to high slots and bears off from `19..=24`,
//! player two moves from high to low slots and bears off from `1..=6`.

use std::time::Duration;

// =============================================================================
// Board Geometry
// =============================================================================

/// A slot on the board. Negative values are only valid as [`EXIT`].
pub type Slot = i8;

/// Number of real slots (24 points and two bars).
pub const NUM_SLOTS: usize = 26;

/// Off-board destination used for bearing off.
pub const EXIT: Slot = -1;

/// Player one's bar slot.
pub const BAR_ONE: Slot = 0;

/// Player two's bar slot.
pub const BAR_TWO: Slot = 25;

/// First and last board point.
pub const FIRST_POINT: Slot = 1;
pub const LAST_POINT: Slot = 24;

/// Checkers per player.
pub const CHECKERS: u8 = 15;

/// Size of a home board.
pub const HOME_SIZE: Slot = 6;

/// Starting layout for player one as `(slot, checkers)`.
/// Player two's layout is the mirror image (`25 - slot`).
pub const START_LAYOUT: [(Slot, u8); 4] = [(1, 2), (12, 5), (17, 3), (19, 5)];

// =============================================================================
// Dice
// =============================================================================

/// Number of outcomes when rolling two dice.
pub const DICE_OUTCOMES: u32 = 36;

/// Number of distinct outcomes when order does not matter.
pub const UNIQUE_DICE_OUTCOMES: usize = 21;

// =============================================================================
// Search and Difficulty Parameters
// =============================================================================

/// Lowest and highest supported difficulty level.
pub const MIN_LEVEL: u8 = 1;
pub const MAX_LEVEL: u8 = 5;

/// Default difficulty level.
pub const DEFAULT_LEVEL: u8 = 3;

/// Maximum search depth (in plies, counting chance and decision nodes) per level.
pub const MAX_DEPTH_PER_LEVEL: [usize; 5] = [2, 2, 3, 3, 3];

/// Default thinking time for the computer player.
pub const DEFAULT_TIME_LIMIT: Duration = Duration::from_millis(500);

// =============================================================================
// Scorer Parameters
// =============================================================================

/// Pip counts above this ceiling are clamped before the race table lookup.
pub const MAX_PIPS: usize = 300;

/// Raw pubeval outputs are clamped into `[-PUBEVAL_MAX_SCORE, PUBEVAL_MAX_SCORE]`.
pub const PUBEVAL_MAX_SCORE: f32 = 50.0;

/// Width of the pubeval input embedding.
pub const PUBEVAL_INPUTS: usize = 122;

/// Width of the TD-Gammon style network input.
pub const NETWORK_INPUTS: usize = 198;

/// Maximum depth allowed for a level. `level` must already be validated.
#[inline]
pub fn max_depth_for_level(level: u8) -> usize {
    MAX_DEPTH_PER_LEVEL[(level - MIN_LEVEL) as usize]
}
