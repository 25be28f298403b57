//! Legal move generation.
//!
//! The rules enforced here:
//! - a checker moves exactly one die number towards its home, never onto a
//!   point held by two or more opposing checkers; a single opposing checker
//!   is hit and sent to its bar
//! - while a player has checkers on the bar, only those may move
//! - bearing off starts once all fifteen checkers are in the home board; a
//!   larger number than needed may bear off a checker only if no checker
//!   sits on a higher home point
//! - a player must use as many numbers as possible, and if only one of two
//!   different numbers can be used, the larger one
//!
//! Full sequences are enumerated by depth-first search over the atomic moves,
//! playing and undoing them on the state itself. The result is cached on the
//! state until the next mutation.

use std::collections::HashSet;
use std::sync::Arc;

use crate::constants::*;
use crate::state::{GameState, Move, MoveError, Player};

impl GameState {
    /// Whether the side to move has every remaining checker in its home board.
    fn can_bear_off(&self) -> bool {
        let player = self.turn();
        self.slots_of(player).all(|s| player.in_home(s))
    }

    /// Legality of an atomic move ignoring which numbers were rolled.
    fn is_legal_without_dice(&self, mv: Move) -> bool {
        let player = self.turn();
        if !(0..NUM_SLOTS as Slot).contains(&mv.from) || !self.holds(player, mv.from) {
            return false;
        }
        if mv.from == player.opponent().bar() {
            return false;
        }
        if mv.from != player.bar() && self.count(player.bar()) > 0 {
            return false;
        }
        if mv.to == EXIT {
            return player.in_home(mv.from) && self.can_bear_off();
        }

        let step = (mv.to - mv.from) * player.direction();
        if !(1..=6).contains(&step) || !(FIRST_POINT..=LAST_POINT).contains(&mv.to) {
            return false;
        }
        !(self.owner(mv.to) == Some(player.opponent()) && self.count(mv.to) >= 2)
    }

    /// Legality of an atomic move played with die number `n`.
    pub(crate) fn is_legal_with(&self, mv: Move, n: u8) -> bool {
        if !self.is_legal_without_dice(mv) {
            return false;
        }
        if mv.to != EXIT {
            return (mv.to - mv.from).unsigned_abs() == n;
        }

        let player = self.turn();
        let needed = player.pips_from(mv.from);
        match (n as u32).cmp(&needed) {
            std::cmp::Ordering::Equal => true,
            std::cmp::Ordering::Less => false,
            // overshoot: only from the highest occupied home point
            std::cmp::Ordering::Greater => {
                let mut farther = match player {
                    Player::One => LAST_POINT - HOME_SIZE + 1..mv.from,
                    Player::Two => mv.from + 1..HOME_SIZE + 1,
                };
                !farther.any(|s| self.holds(player, s))
            }
        }
    }

    /// Atomic moves playable with number `n`, exact bear-off included.
    fn candidates(&self, n: u8) -> Vec<Move> {
        let player = self.turn();
        let n = n as Slot;
        let sources = match player {
            Player::One => BAR_ONE..=BAR_TWO - 1 - n,
            Player::Two => n + 1..=BAR_TWO,
        };
        let mut moves: Vec<Move> = sources
            .filter(|&from| self.holds(player, from))
            .map(|from| Move::new(from, from + n * player.direction()))
            .filter(|&mv| self.is_legal_without_dice(mv))
            .collect();

        let exact = match player {
            Player::One => BAR_TWO - n,
            Player::Two => n,
        };
        let bear_off = Move::new(exact, EXIT);
        if self.is_legal_with(bear_off, n as u8) {
            moves.push(bear_off);
        }
        moves
    }

    /// Bear-off of the farthest home checker with the largest remaining number,
    /// when that number exceeds the checker's distance.
    fn overshoot_bear_off(&self) -> Option<(Move, u8)> {
        let max = self.remaining().iter().copied().max()?;
        let player = self.turn();
        let reach = max as Slot - 1;
        let from = match player {
            Player::One => (BAR_TWO - reach..=LAST_POINT).find(|&s| self.holds(player, s)),
            Player::Two => (FIRST_POINT..=reach).rev().find(|&s| self.holds(player, s)),
        }?;
        let mv = Move::new(from, EXIT);
        self.is_legal_with(mv, max).then_some((mv, max))
    }

    fn collect_sequences(&mut self, path: &mut Vec<Move>, out: &mut Vec<Vec<Move>>) {
        let mut numbers = self.remaining().to_vec();
        numbers.sort_unstable();
        numbers.dedup();

        let mut edges: Vec<(Move, u8)> = Vec::new();
        for &n in &numbers {
            edges.extend(self.candidates(n).into_iter().map(|mv| (mv, n)));
        }
        if edges.is_empty() {
            edges.extend(self.overshoot_bear_off());
        }
        if edges.is_empty() {
            if !path.is_empty() {
                out.push(path.clone());
            }
            return;
        }

        for (mv, n) in edges {
            self.apply(mv, n, false);
            path.push(mv);
            self.collect_sequences(path, out);
            path.pop();
            self.undo_atomic();
        }
    }

    /// Every legal sequence of atomic moves for the numbers left this turn.
    ///
    /// Only sequences of maximal length are kept. If just one number can be
    /// used out of two different ones, only moves with the larger survive
    /// whenever such a move exists. Empty when the side cannot move.
    pub fn legal_sequences(&mut self) -> Arc<[Vec<Move>]> {
        if let Some(cached) = &self.cache {
            return Arc::clone(cached);
        }

        let mut all = Vec::new();
        self.collect_sequences(&mut Vec::new(), &mut all);
        let longest = all.iter().map(Vec::len).max().unwrap_or(0);
        all.retain(|seq| seq.len() == longest);

        if longest == 1 && self.remaining().len() > 1 {
            if let Some(&max) = self.remaining().iter().max() {
                let with_max: Vec<Vec<Move>> = all
                    .iter()
                    .filter(|seq| self.is_legal_with(seq[0], max))
                    .cloned()
                    .collect();
                if !with_max.is_empty() {
                    all = with_max;
                }
            }
        }

        let sequences: Arc<[Vec<Move>]> = all.into();
        self.cache = Some(Arc::clone(&sequences));
        sequences
    }

    /// Legal sequences with permutations of the same moves collapsed.
    pub fn unique_sequences(&mut self) -> Vec<Vec<Move>> {
        let mut seen = HashSet::new();
        self.legal_sequences()
            .iter()
            .filter(|seq| {
                let mut key = seq.to_vec();
                key.sort_unstable();
                seen.insert(key)
            })
            .cloned()
            .collect()
    }

    pub fn any_moves_possible(&mut self) -> bool {
        !self.legal_sequences().is_empty()
    }

    /// Slots the side to move can start a move from.
    pub fn movable_slots(&mut self) -> Vec<Slot> {
        let mut slots = Vec::new();
        for seq in self.legal_sequences().iter() {
            if !slots.contains(&seq[0].from) {
                slots.push(seq[0].from);
            }
        }
        slots
    }

    /// Destinations reachable from `slot` by one checker, compound moves included.
    pub fn possible_moves_from(&mut self, slot: Slot) -> Vec<Move> {
        let mut moves = Vec::new();
        for seq in self.legal_sequences().iter() {
            let mut at = slot;
            for step in seq.iter() {
                if step.from != at {
                    break;
                }
                let mv = Move::new(slot, step.to);
                if !moves.contains(&mv) {
                    moves.push(mv);
                }
                at = step.to;
            }
        }
        moves
    }

    /// Split a possibly compound move into the atomic steps that realise it.
    ///
    /// The shortest chain found in any legal sequence wins; between chains of
    /// equal length one whose first step hits is preferred.
    pub fn decompose(&mut self, mv: Move) -> Option<Vec<Move>> {
        let sequences = self.legal_sequences();
        let opponent = self.turn().opponent();
        let mut best: Option<&[Move]> = None;

        for seq in sequences.iter() {
            let mut at = mv.from;
            for (i, step) in seq.iter().enumerate() {
                if step.from != at {
                    break;
                }
                if step.to == mv.to {
                    let chain = &seq[..=i];
                    if chain.len() == 1 {
                        return Some(chain.to_vec());
                    }
                    let hits = |c: &[Move]| c[0].to != EXIT && self.owner(c[0].to) == Some(opponent);
                    let better = match best {
                        None => true,
                        Some(b) => chain.len() < b.len() || (chain.len() == b.len() && hits(chain) && !hits(b)),
                    };
                    if better {
                        best = Some(chain);
                    }
                    break;
                }
                at = step.to;
            }
        }
        best.map(<[Move]>::to_vec)
    }

    pub fn is_move_possible(&mut self, mv: Move) -> bool {
        self.decompose(mv).is_some()
    }

    /// Play a possibly compound move, returning the atomic steps executed.
    ///
    /// Each step uses the larger remaining number when it is legal with it.
    pub fn make_move(&mut self, mv: Move) -> Result<Vec<Move>, MoveError> {
        if self.remaining().is_empty() {
            return Err(MoveError::NoDiceLeft);
        }
        let steps = self.decompose(mv).ok_or(MoveError::NotPossible {
            from: mv.from,
            to: mv.to,
        })?;

        for (i, &step) in steps.iter().enumerate() {
            let high = self.remaining().iter().copied().max().unwrap_or(0);
            let low = self.remaining().iter().copied().min().unwrap_or(0);
            let die = if self.is_legal_with(step, high) { high } else { low };
            self.apply(step, die, i > 0);
        }
        Ok(steps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dice::Dice;

    fn state_with(turn: Player, one: &[(Slot, u8)], two: &[(Slot, u8)], dice: (u8, u8)) -> GameState {
        let mut state = GameState::from_layout(turn, one, two);
        state.set_dice(Dice::new(dice.0, dice.1));
        state
    }

    #[test]
    fn test_opening_sequence_count() {
        let mut state = GameState::initial(Player::One);
        state.set_dice(Dice::new(1, 3));
        let sequences = state.legal_sequences();
        assert_eq!(sequences.len(), 31);
        assert!(sequences.iter().all(|s| s.len() == 2));
    }

    #[test]
    fn test_blocked_point() {
        let mut state = state_with(Player::One, &[(1, 1)], &[(4, 2)], (3, 3));
        assert!(!state.is_legal_with(Move::new(1, 4), 3));
        assert!(!state.any_moves_possible());
    }

    #[test]
    fn test_bar_first() {
        let mut state = state_with(Player::One, &[(BAR_ONE, 1), (10, 2)], &[(20, 2)], (2, 5));
        assert_eq!(state.movable_slots(), vec![BAR_ONE]);
        assert!(!state.is_move_possible(Move::new(10, 12)));
        assert!(state.is_move_possible(Move::new(BAR_ONE, 2)));
    }

    #[test]
    fn test_bear_off_requires_home() {
        let mut state = state_with(Player::One, &[(18, 1), (22, 1)], &[(1, 1)], (3, 6));
        assert!(!state.is_legal_with(Move::new(22, EXIT), 3));
        state.force_move(Move::new(18, 24));
        assert!(state.is_legal_with(Move::new(22, EXIT), 3));
    }

    #[test]
    fn test_overshoot_only_from_highest_point() {
        let state = state_with(Player::Two, &[(20, 1)], &[(2, 1), (4, 1)], (6, 5));
        assert!(state.is_legal_with(Move::new(4, EXIT), 6));
        assert!(!state.is_legal_with(Move::new(2, EXIT), 6));
    }

    #[test]
    fn test_double_bear_off_single_sequence() {
        let mut state = state_with(Player::Two, &[(20, 1)], &[(5, 1), (2, 2), (1, 1)], (6, 6));
        let sequences = state.legal_sequences();
        assert_eq!(sequences.len(), 1);
        assert_eq!(
            sequences[0],
            vec![
                Move::new(5, EXIT),
                Move::new(2, EXIT),
                Move::new(2, EXIT),
                Move::new(1, EXIT)
            ]
        );
    }

    #[test]
    fn test_larger_number_preferred() {
        // only one checker, and after either number it is blocked
        let mut state = state_with(Player::One, &[(1, 1)], &[(7, 2), (9, 2), (10, 2), (4, 2), (8, 2)], (2, 5));
        let sequences = state.legal_sequences();
        assert!(!sequences.is_empty());
        assert!(sequences.iter().all(|s| s.len() == 1));
        assert!(sequences.iter().all(|s| s[0] == Move::new(1, 6)));
    }

    #[test]
    fn test_decompose_compound() {
        let mut state = state_with(Player::One, &[(1, 1)], &[(20, 2)], (2, 4));
        let steps = state.decompose(Move::new(1, 7)).unwrap();
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].from, 1);
        assert_eq!(steps[1].to, 7);
    }

    #[test]
    fn test_decompose_prefers_hit() {
        let mut state = state_with(Player::One, &[(1, 1)], &[(5, 1), (20, 2)], (4, 2));
        let steps = state.decompose(Move::new(1, 7)).unwrap();
        assert_eq!(steps, vec![Move::new(1, 5), Move::new(5, 7)]);
    }

    #[test]
    fn test_make_move_uses_larger_number() {
        let mut state = state_with(Player::One, &[(1, 1), (20, 1)], &[(10, 2)], (1, 4));
        state.make_move(Move::new(20, 24)).unwrap();
        assert_eq!(state.remaining(), &[1]);
        assert_eq!(state.moves_this_turn()[0].die, 4);
    }

    #[test]
    fn test_make_move_errors() {
        let mut state = GameState::initial(Player::One);
        assert_eq!(state.make_move(Move::new(1, 3)), Err(MoveError::NoDiceLeft));
        state.set_dice(Dice::new(1, 2));
        assert_eq!(
            state.make_move(Move::new(1, 9)),
            Err(MoveError::NotPossible { from: 1, to: 9 })
        );
    }

    #[test]
    fn test_possible_moves_from() {
        let mut state = state_with(Player::One, &[(1, 1)], &[(20, 2)], (2, 4));
        let mut tos: Vec<Slot> = state.possible_moves_from(1).iter().map(|m| m.to).collect();
        tos.sort_unstable();
        assert_eq!(tos, vec![3, 5, 7]);
    }

    #[test]
    fn test_unique_sequences_collapse_permutations() {
        let mut state = state_with(Player::One, &[(1, 1), (10, 1)], &[(24, 2)], (2, 3));
        let all = state.legal_sequences().len();
        let unique = state.unique_sequences().len();
        assert!(unique < all);
    }

    #[test]
    fn test_enumeration_leaves_state_untouched() {
        let mut state = GameState::initial(Player::Two);
        state.set_dice(Dice::new(6, 6));
        let before = state.clone();
        state.legal_sequences();
        assert_eq!(state, before);
        assert!(state.moves_this_turn().is_empty());
    }
}
