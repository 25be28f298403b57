//! Backgammon board state, move execution and undo.
//!
//! A [`GameState`] holds the checker count and owner of every slot, the die
//! numbers the side to move has not used yet, and an undo log of the atomic
//! moves made in each turn. Mutations are always recorded in the log, so any
//! sequence of moves can be reverted exactly, captured checkers and consumed
//! die numbers included. The search relies on this to explore a private copy
//! of the state in place.
//!
//! Legal move generation lives in [`crate::movegen`].

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::*;
use crate::dice::Dice;

/// One of the two sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Player {
    /// Moves from slot 1 towards 24, bar on slot 0.
    One,
    /// Moves from slot 24 towards 1, bar on slot 25.
    Two,
}

impl Player {
    #[inline]
    pub fn opponent(self) -> Player {
        match self {
            Player::One => Player::Two,
            Player::Two => Player::One,
        }
    }

    /// The slot holding this player's hit checkers.
    #[inline]
    pub fn bar(self) -> Slot {
        match self {
            Player::One => BAR_ONE,
            Player::Two => BAR_TWO,
        }
    }

    /// +1 if the player moves towards higher slots, -1 otherwise.
    #[inline]
    pub fn direction(self) -> Slot {
        match self {
            Player::One => 1,
            Player::Two => -1,
        }
    }

    /// Whether `slot` is one of the six points this player bears off from.
    #[inline]
    pub fn in_home(self, slot: Slot) -> bool {
        match self {
            Player::One => (LAST_POINT - HOME_SIZE + 1..=LAST_POINT).contains(&slot),
            Player::Two => (FIRST_POINT..=HOME_SIZE).contains(&slot),
        }
    }

    /// Pips a checker on `slot` still has to travel to leave the board.
    #[inline]
    pub fn pips_from(self, slot: Slot) -> u32 {
        match self {
            Player::One => (BAR_TWO - slot) as u32,
            Player::Two => slot as u32,
        }
    }

    /// 1 or 2, as players are usually numbered.
    pub fn number(self) -> u8 {
        match self {
            Player::One => 1,
            Player::Two => 2,
        }
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "player {}", self.number())
    }
}

/// A move of one checker, possibly spanning several dice (a compound move).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Move {
    pub from: Slot,
    /// Destination slot, or [`EXIT`] when bearing off.
    pub to: Slot,
}

impl Move {
    pub const fn new(from: Slot, to: Slot) -> Self {
        Self { from, to }
    }

    #[inline]
    pub fn is_bear_off(&self) -> bool {
        self.to == EXIT
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slot = |s: Slot| match s {
            EXIT => "off".to_string(),
            BAR_ONE | BAR_TWO => "bar".to_string(),
            s => s.to_string(),
        };
        write!(f, "{}/{}", slot(self.from), slot(self.to))
    }
}

/// An atomic move as it was executed, with everything needed to revert it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveMade {
    pub from: Slot,
    pub to: Slot,
    /// An opposing blot was sent to its bar.
    pub hit: bool,
    /// The die number consumed, 0 if none was available.
    pub die: u8,
    /// Continuation of the previous atomic move within one compound move.
    pub with_previous: bool,
}

/// Error returned when a requested move cannot be played.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoveError {
    #[error("move {from} -> {to} is not possible")]
    NotPossible { from: Slot, to: Slot },
    #[error("no dice numbers left to move with")]
    NoDiceLeft,
}

/// Reason a position read from outside is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    #[error("invalid dice numbers {0:?}")]
    Dice(Vec<u8>),
    #[error("slot {0} has an owner without checkers or checkers without an owner")]
    Slot(usize),
    #[error("{player} has {count} checkers on the board")]
    Checkers { player: Player, count: u32 },
    #[error("{player} has checkers on the other player's bar")]
    Bar { player: Player },
}

/// Outcome of the current round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundResult {
    NotStarted,
    Running,
    PlayerOneWon,
    PlayerTwoWon,
}

impl RoundResult {
    pub fn winner(self) -> Option<Player> {
        match self {
            RoundResult::PlayerOneWon => Some(Player::One),
            RoundResult::PlayerTwoWon => Some(Player::Two),
            _ => None,
        }
    }

    pub fn won_by(player: Player) -> Self {
        match player {
            Player::One => RoundResult::PlayerOneWon,
            Player::Two => RoundResult::PlayerTwoWon,
        }
    }
}

/// Moves of one turn, and the die numbers left unused when it ended.
#[derive(Debug, Clone, Default)]
struct TurnLog {
    moves: Vec<MoveMade>,
    unused: Vec<u8>,
}

fn fresh_log() -> Vec<TurnLog> {
    vec![TurnLog::default()]
}

/// Serialized form of [`GameState`], checked before use.
#[derive(Deserialize)]
struct StateRecord {
    turn: Player,
    counts: [u8; NUM_SLOTS],
    owners: [Option<Player>; NUM_SLOTS],
    remaining: Vec<u8>,
}

impl TryFrom<StateRecord> for GameState {
    type Error = StateError;

    fn try_from(record: StateRecord) -> Result<Self, StateError> {
        let state = Self {
            turn: record.turn,
            counts: record.counts,
            owners: record.owners,
            remaining: record.remaining,
            turns: fresh_log(),
            cache: None,
        };
        state.validate()?;
        Ok(state)
    }
}

/// State of one backgammon round.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "StateRecord")]
pub struct GameState {
    turn: Player,
    counts: [u8; NUM_SLOTS],
    owners: [Option<Player>; NUM_SLOTS],
    /// Die numbers not used yet this turn (four entries for a double).
    remaining: Vec<u8>,
    #[serde(skip)]
    turns: Vec<TurnLog>,
    /// Legal sequences of the current position, dropped on every mutation.
    #[serde(skip)]
    pub(crate) cache: Option<Arc<[Vec<Move>]>>,
}

impl GameState {
    /// The standard starting position with `first` to move.
    pub fn initial(first: Player) -> Self {
        Self::from_layout(first, &START_LAYOUT, &START_LAYOUT.map(|(s, n)| (BAR_TWO - s, n)))
    }

    /// Build a position from `(slot, checkers)` lists of both players.
    ///
    /// Checkers missing from a list are considered borne off.
    pub fn from_layout(turn: Player, player_one: &[(Slot, u8)], player_two: &[(Slot, u8)]) -> Self {
        let mut state = Self {
            turn,
            counts: [0; NUM_SLOTS],
            owners: [None; NUM_SLOTS],
            remaining: Vec::new(),
            turns: fresh_log(),
            cache: None,
        };
        for (player, layout) in [(Player::One, player_one), (Player::Two, player_two)] {
            for &(slot, n) in layout {
                if n == 0 {
                    continue;
                }
                state.counts[slot as usize] = n;
                state.owners[slot as usize] = Some(player);
            }
        }
        state.debug_check();
        state
    }

    /// Deep copy without the undo history.
    pub fn snapshot(&self) -> Self {
        Self {
            turn: self.turn,
            counts: self.counts,
            owners: self.owners,
            remaining: self.remaining.clone(),
            turns: fresh_log(),
            cache: None,
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// The side to move.
    #[inline]
    pub fn turn(&self) -> Player {
        self.turn
    }

    #[inline]
    pub fn count(&self, slot: Slot) -> u8 {
        self.counts[slot as usize]
    }

    #[inline]
    pub fn owner(&self, slot: Slot) -> Option<Player> {
        self.owners[slot as usize]
    }

    /// Whether `player` has at least one checker on `slot`.
    #[inline]
    pub fn holds(&self, player: Player, slot: Slot) -> bool {
        self.owners[slot as usize] == Some(player) && self.counts[slot as usize] > 0
    }

    /// Die numbers not used yet this turn.
    pub fn remaining(&self) -> &[u8] {
        &self.remaining
    }

    /// Atomic moves made so far in the current turn.
    pub fn moves_this_turn(&self) -> &[MoveMade] {
        self.turns.last().map(|t| t.moves.as_slice()).unwrap_or(&[])
    }

    /// Checkers of `player` still on the board (bar included).
    pub fn checkers_on_board(&self, player: Player) -> u8 {
        self.slots_of(player).map(|s| self.counts[s as usize]).sum()
    }

    pub fn borne_off(&self, player: Player) -> u8 {
        CHECKERS - self.checkers_on_board(player)
    }

    /// Total pips `player` needs to bear off every checker.
    pub fn pip_count(&self, player: Player) -> u32 {
        self.slots_of(player)
            .map(|s| player.pips_from(s) * self.counts[s as usize] as u32)
            .sum()
    }

    /// Slots on which `player` has checkers, in ascending order.
    pub fn slots_of(&self, player: Player) -> impl Iterator<Item = Slot> + '_ {
        (0..NUM_SLOTS as Slot).filter(move |&s| self.holds(player, s))
    }

    // =========================================================================
    // Turn handling
    // =========================================================================

    /// Replace the die numbers available to the side to move.
    pub fn set_dice(&mut self, dice: Dice) {
        self.remaining = dice.numbers();
        self.cache = None;
    }

    /// Drop the die numbers left this turn.
    pub fn clear_dice(&mut self) {
        self.remaining.clear();
        self.cache = None;
    }

    /// End the current turn and hand the move to the opponent.
    ///
    /// Unused die numbers are kept in the log so [`undo_last_turn`](Self::undo_last_turn)
    /// can give them back.
    pub fn next_turn(&mut self) {
        let unused = std::mem::take(&mut self.remaining);
        if let Some(log) = self.turns.last_mut() {
            log.unused = unused;
        }
        self.turns.push(TurnLog::default());
        self.turn = self.turn.opponent();
        self.cache = None;
    }

    // =========================================================================
    // Mutation
    // =========================================================================

    /// Execute an atomic move consuming `die`. Legality is not checked.
    pub(crate) fn apply(&mut self, mv: Move, die: u8, with_previous: bool) {
        self.cache = None;
        let from = mv.from as usize;
        self.counts[from] -= 1;
        if self.counts[from] == 0 {
            self.owners[from] = None;
        }

        let mut hit = false;
        if mv.to != EXIT {
            let to = mv.to as usize;
            let opponent = self.turn.opponent();
            hit = self.counts[to] == 1 && self.owners[to] == Some(opponent);
            if hit {
                let bar = opponent.bar() as usize;
                self.counts[bar] += 1;
                self.owners[bar] = Some(opponent);
            } else {
                self.counts[to] += 1;
            }
            self.owners[to] = Some(self.turn);
        }

        let die = match self.remaining.iter().position(|&n| n == die) {
            Some(i) => self.remaining.swap_remove(i),
            None => 0,
        };
        if let Some(log) = self.turns.last_mut() {
            log.moves.push(MoveMade {
                from: mv.from,
                to: mv.to,
                hit,
                die,
                with_previous,
            });
        }
        self.debug_check();
    }

    /// Revert the most recent atomic move of the current turn.
    pub(crate) fn undo_atomic(&mut self) -> Option<MoveMade> {
        let made = self.turns.last_mut()?.moves.pop()?;
        self.cache = None;

        if made.hit {
            let opponent = self.turn.opponent();
            let bar = opponent.bar() as usize;
            self.owners[made.to as usize] = Some(opponent);
            self.counts[bar] -= 1;
            if self.counts[bar] == 0 {
                self.owners[bar] = None;
            }
        } else if made.to != EXIT {
            let to = made.to as usize;
            self.counts[to] -= 1;
            if self.counts[to] == 0 {
                self.owners[to] = None;
            }
        }
        let from = made.from as usize;
        self.owners[from] = Some(self.turn);
        self.counts[from] += 1;
        if made.die != 0 {
            self.remaining.push(made.die);
        }
        self.debug_check();
        Some(made)
    }

    /// Execute an atomic move without checking it.
    ///
    /// The die is the move's distance; a bear-off uses the exact number if it
    /// is available and the largest remaining one otherwise.
    pub fn force_move(&mut self, mv: Move) {
        let die = if mv.to != EXIT {
            (mv.to - mv.from).unsigned_abs()
        } else {
            let exact = self.turn.pips_from(mv.from) as u8;
            if self.remaining.contains(&exact) {
                exact
            } else {
                self.remaining.iter().copied().max().unwrap_or(exact)
            }
        };
        self.apply(mv, die, false);
    }

    /// Execute a whole sequence of atomic moves without checking it.
    ///
    /// Plain moves take the number matching their distance. Bear-offs then
    /// take the exact number if left, else the smallest larger one, so a
    /// legal sequence always consumes exactly the numbers it was built from.
    pub fn force_sequence(&mut self, moves: &[Move]) {
        let mut pool = self.remaining.clone();
        let mut dice = vec![0u8; moves.len()];
        for (i, mv) in moves.iter().enumerate().filter(|(_, m)| !m.is_bear_off()) {
            let distance = (mv.to - mv.from).unsigned_abs();
            if let Some(k) = pool.iter().position(|&n| n == distance) {
                pool.swap_remove(k);
            }
            dice[i] = distance;
        }
        for (i, mv) in moves.iter().enumerate().filter(|(_, m)| m.is_bear_off()) {
            let needed = self.turn.pips_from(mv.from) as u8;
            let pick = (0..pool.len())
                .filter(|&k| pool[k] >= needed)
                .min_by_key(|&k| pool[k]);
            dice[i] = match pick {
                Some(k) => pool.swap_remove(k),
                None => needed,
            };
        }
        for (&mv, die) in moves.iter().zip(dice) {
            self.apply(mv, die, false);
        }
    }

    /// Undo the last move made this turn. A compound move is reverted as a whole.
    ///
    /// Returns `false` if nothing was played this turn.
    pub fn undo_last_move(&mut self) -> bool {
        let Some(mut made) = self.undo_atomic() else {
            return false;
        };
        while made.with_previous {
            match self.undo_atomic() {
                Some(m) => made = m,
                None => break,
            }
        }
        true
    }

    /// Revert the whole current turn and give the move back to the previous player.
    ///
    /// The board returns to how it was at the end of the previous turn, with
    /// the numbers that player left unused. Returns `false` if there is no
    /// previous turn.
    pub fn undo_last_turn(&mut self) -> bool {
        if self.turns.len() < 2 {
            return false;
        }
        while self.undo_atomic().is_some() {}
        self.turns.pop();
        self.turn = self.turn.opponent();
        self.remaining = self
            .turns
            .last_mut()
            .map(|log| std::mem::take(&mut log.unused))
            .unwrap_or_default();
        self.cache = None;
        true
    }

    /// Check a position that did not come from this crate's own moves.
    ///
    /// Dice must be at most four numbers in `1..=6` (more than two only for a
    /// double), every slot must have an owner exactly when it has checkers,
    /// no side may have more than fifteen checkers and no checker may sit on
    /// the opponent's bar.
    pub fn validate(&self) -> Result<(), StateError> {
        let dice = &self.remaining;
        let dice_ok = dice.len() <= 4
            && dice.iter().all(|n| (1..=6).contains(n))
            && (dice.len() <= 2 || dice.windows(2).all(|w| w[0] == w[1]));
        if !dice_ok {
            return Err(StateError::Dice(dice.clone()));
        }
        for s in 0..NUM_SLOTS {
            if self.owners[s].is_none() != (self.counts[s] == 0) {
                return Err(StateError::Slot(s));
            }
        }
        for player in [Player::One, Player::Two] {
            if self.holds(player, player.opponent().bar()) {
                return Err(StateError::Bar { player });
            }
            let count: u32 = (0..NUM_SLOTS)
                .filter(|&s| self.owners[s] == Some(player))
                .map(|s| self.counts[s] as u32)
                .sum();
            if count > CHECKERS as u32 {
                return Err(StateError::Checkers { player, count });
            }
        }
        Ok(())
    }

    // =========================================================================
    // Results
    // =========================================================================

    /// `Running`, or the winner once a side has no checker left on the board.
    pub fn round_result(&self) -> RoundResult {
        for player in [Player::One, Player::Two] {
            if !self.owners.iter().any(|&o| o == Some(player)) {
                return RoundResult::won_by(player);
            }
        }
        RoundResult::Running
    }

    /// Points earned by `winner` in the current position.
    ///
    /// 1 for a normal win, 2 if the loser has not borne off any checker
    /// (gammon), 3 if in addition the loser still has a checker on its bar
    /// or in the winner's home (backgammon).
    pub fn win_points(&self, winner: Player) -> u8 {
        let loser = winner.opponent();
        if self.checkers_on_board(loser) < CHECKERS {
            return 1;
        }
        let stuck = self
            .slots_of(loser)
            .any(|s| s == loser.bar() || winner.in_home(s));
        if stuck { 3 } else { 2 }
    }

    #[inline]
    fn debug_check(&self) {
        #[cfg(debug_assertions)]
        {
            for player in [Player::One, Player::Two] {
                let total: u32 = (0..NUM_SLOTS)
                    .filter(|&s| self.owners[s] == Some(player))
                    .map(|s| self.counts[s] as u32)
                    .sum();
                debug_assert!(total <= CHECKERS as u32, "{player} has {total} checkers");
            }
            for s in 0..NUM_SLOTS {
                debug_assert_eq!(
                    self.owners[s].is_none(),
                    self.counts[s] == 0,
                    "owner/count mismatch on slot {s}"
                );
            }
        }
    }
}

impl PartialEq for GameState {
    /// Compares the board, the side to move and the unused numbers as a multiset.
    fn eq(&self, other: &Self) -> bool {
        let mut a = self.remaining.clone();
        let mut b = other.remaining.clone();
        a.sort_unstable();
        b.sort_unstable();
        self.turn == other.turn && self.counts == other.counts && self.owners == other.owners && a == b
    }
}

impl Eq for GameState {}
