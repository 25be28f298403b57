//! Rounds, match score and turn sequencing.
//!
//! [`Game`] drives a match between two sides: it rolls the opening dice,
//! hands out rolls, applies moves through the [`GameState`] rules, detects the
//! end of a round and scores it. Every step is reported as a [`GameEvent`] to
//! an optional listener so a front end can animate the board.

use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::Slot;
use crate::dice::Dice;
use crate::state::{GameState, Move, MoveError, Player, RoundResult};

/// Something that happened in the game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEvent {
    RoundStarted { round: u32 },
    /// Opening rolls; `first` is player one's die, `second` player two's.
    /// All but the last roll were ties.
    InitialRolls(Vec<Dice>),
    TurnChanged(Player),
    DiceRolled(Dice),
    MoveMade(Move),
    RoundEnded { winner: Player, points: u8 },
    GameEnded { winner: Player },
}

#[derive(Debug, Error)]
pub enum GameError {
    #[error("a round is already running")]
    RoundRunning,
    #[error("the match is finished")]
    MatchFinished,
    #[error("no round is running")]
    RoundNotRunning,
    #[error(transparent)]
    Move(#[from] MoveError),
}

/// Everything needed to resume a match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameSnapshot {
    pub state: Option<GameState>,
    pub scores: [u32; 2],
    pub round: u32,
    pub target: u32,
    pub dice: Option<Dice>,
}

pub type Listener = Box<dyn FnMut(&GameEvent) + Send>;

/// A match played to `target` points.
pub struct Game {
    state: Option<GameState>,
    dice: Option<Dice>,
    scores: [u32; 2],
    round: u32,
    target: u32,
    rng: fastrand::Rng,
    listener: Option<Listener>,
}

impl Game {
    pub fn new(target: u32) -> Self {
        Self::with_rng(target, fastrand::Rng::new())
    }

    /// A match with reproducible dice.
    pub fn with_seed(target: u32, seed: u64) -> Self {
        Self::with_rng(target, fastrand::Rng::with_seed(seed))
    }

    fn with_rng(target: u32, rng: fastrand::Rng) -> Self {
        Self {
            state: None,
            dice: None,
            scores: [0, 0],
            round: 0,
            target: target.max(1),
            rng,
            listener: None,
        }
    }

    /// Resume a match saved with [`snapshot`](Self::snapshot).
    pub fn restore(snapshot: GameSnapshot, seed: u64) -> Self {
        let mut game = Self::with_seed(snapshot.target, seed);
        game.state = snapshot.state;
        game.dice = snapshot.dice;
        game.scores = snapshot.scores;
        game.round = snapshot.round;
        game
    }

    pub fn snapshot(&self) -> GameSnapshot {
        GameSnapshot {
            state: self.state.as_ref().map(GameState::snapshot),
            scores: self.scores,
            round: self.round,
            target: self.target,
            dice: self.dice,
        }
    }

    pub fn set_listener(&mut self, listener: Listener) {
        self.listener = Some(listener);
    }

    fn raise(&mut self, event: GameEvent) {
        debug!("game event: {event:?}");
        if let Some(listener) = self.listener.as_mut() {
            listener(&event);
        }
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn state(&self) -> Option<&GameState> {
        self.state.as_ref()
    }

    pub fn turn(&self) -> Option<Player> {
        self.state.as_ref().map(GameState::turn)
    }

    /// The roll of the current turn, if the dice were thrown.
    pub fn dice(&self) -> Option<Dice> {
        self.dice
    }

    pub fn score(&self, player: Player) -> u32 {
        match player {
            Player::One => self.scores[0],
            Player::Two => self.scores[1],
        }
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn round_result(&self) -> RoundResult {
        self.state
            .as_ref()
            .map_or(RoundResult::NotStarted, GameState::round_result)
    }

    /// `Running` until a player reaches the target score.
    pub fn match_result(&self) -> RoundResult {
        if self.round == 0 {
            return RoundResult::NotStarted;
        }
        for player in [Player::One, Player::Two] {
            if self.score(player) >= self.target {
                return RoundResult::won_by(player);
            }
        }
        RoundResult::Running
    }

    pub fn is_move_possible(&mut self, from: Slot, to: Slot) -> bool {
        self.state
            .as_mut()
            .is_some_and(|s| s.is_move_possible(Move::new(from, to)))
    }

    pub fn movable_slots(&mut self) -> Vec<Slot> {
        self.state.as_mut().map(GameState::movable_slots).unwrap_or_default()
    }

    /// Destinations the checker on `slot` can reach this turn.
    pub fn destinations_from(&mut self, slot: Slot) -> Vec<Slot> {
        self.state
            .as_mut()
            .map(|s| s.possible_moves_from(slot).iter().map(|m| m.to).collect())
            .unwrap_or_default()
    }

    // =========================================================================
    // Actions
    // =========================================================================

    /// Start the next round. The opening roll decides who moves first.
    pub fn start_new_round(&mut self) -> Result<(), GameError> {
        if self.round_result() == RoundResult::Running {
            return Err(GameError::RoundRunning);
        }
        if !matches!(self.match_result(), RoundResult::NotStarted | RoundResult::Running) {
            return Err(GameError::MatchFinished);
        }

        self.round += 1;
        let mut rolls = Vec::new();
        loop {
            let roll = Dice::roll(&mut self.rng);
            rolls.push(roll);
            if !roll.is_double() {
                break;
            }
        }
        let opening = rolls[rolls.len() - 1];
        let first = if opening.first > opening.second { Player::One } else { Player::Two };
        self.state = Some(GameState::initial(first));
        self.dice = None;

        self.raise(GameEvent::RoundStarted { round: self.round });
        self.raise(GameEvent::InitialRolls(rolls));
        self.raise(GameEvent::TurnChanged(first));
        Ok(())
    }

    pub fn roll_dice(&mut self) -> Result<Dice, GameError> {
        let dice = Dice::roll(&mut self.rng);
        self.set_dice(dice)?;
        Ok(dice)
    }

    /// Use `dice` as the roll of the side to move.
    ///
    /// If the roll leaves no legal move the turn passes to the opponent.
    pub fn set_dice(&mut self, dice: Dice) -> Result<(), GameError> {
        if self.round_result() != RoundResult::Running {
            return Err(GameError::RoundNotRunning);
        }
        let state = self.state.as_mut().ok_or(GameError::RoundNotRunning)?;
        state.set_dice(dice);
        let blocked = !state.any_moves_possible();
        self.dice = Some(dice);
        self.raise(GameEvent::DiceRolled(dice));
        if blocked {
            debug!("no legal move with {}-{}", dice.first, dice.second);
            self.next_turn();
        }
        Ok(())
    }

    fn next_turn(&mut self) {
        let Some(state) = self.state.as_mut() else {
            return;
        };
        state.next_turn();
        let turn = state.turn();
        self.dice = None;
        self.raise(GameEvent::TurnChanged(turn));
    }

    /// Move a checker from `from` to `to`, possibly over several dice.
    ///
    /// Ends the turn or the round once no further move is possible.
    pub fn make_move(&mut self, from: Slot, to: Slot) -> Result<(), GameError> {
        if self.round_result() != RoundResult::Running {
            return Err(GameError::RoundNotRunning);
        }
        let state = self.state.as_mut().ok_or(GameError::RoundNotRunning)?;
        let steps = state.make_move(Move::new(from, to))?;
        self.after_moves(steps);
        Ok(())
    }

    /// Play a whole legal sequence, e.g. one suggested by the computer.
    ///
    /// The sequence must be one of the state's legal sequences, so it always
    /// consumes exactly the numbers it was generated from.
    pub fn play_sequence(&mut self, moves: &[Move]) -> Result<(), GameError> {
        if moves.is_empty() {
            return Ok(());
        }
        if self.round_result() != RoundResult::Running {
            return Err(GameError::RoundNotRunning);
        }
        let state = self.state.as_mut().ok_or(GameError::RoundNotRunning)?;
        if !state.legal_sequences().iter().any(|seq| seq.as_slice() == moves) {
            let first = moves[0];
            return Err(MoveError::NotPossible {
                from: first.from,
                to: first.to,
            }
            .into());
        }
        state.force_sequence(moves);
        self.after_moves(moves.to_vec());
        Ok(())
    }

    /// Report `steps` and close the turn or the round if nothing is left to play.
    fn after_moves(&mut self, steps: Vec<Move>) {
        let Some(state) = self.state.as_mut() else {
            return;
        };
        let done = !state.any_moves_possible();
        let result = state.round_result();
        let points = result.winner().map(|w| state.win_points(w));

        for step in steps {
            self.raise(GameEvent::MoveMade(step));
        }
        if !done {
            return;
        }

        match (result.winner(), points) {
            (Some(winner), Some(points)) => {
                match winner {
                    Player::One => self.scores[0] += points as u32,
                    Player::Two => self.scores[1] += points as u32,
                }
                self.dice = None;
                self.raise(GameEvent::RoundEnded { winner, points });
                if let Some(champion) = self.match_result().winner() {
                    self.raise(GameEvent::GameEnded { winner: champion });
                }
            }
            _ => self.next_turn(),
        }
    }

    /// Take back the last move of the current turn.
    pub fn undo_last_move(&mut self) -> bool {
        self.state.as_mut().is_some_and(GameState::undo_last_move)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::constants::EXIT;

    fn recording_game(seed: u64) -> (Game, Arc<Mutex<Vec<GameEvent>>>) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let mut game = Game::with_seed(3, seed);
        game.set_listener(Box::new(move |e: &GameEvent| sink.lock().unwrap().push(e.clone())));
        (game, events)
    }

    #[test]
    fn test_start_new_round_events() {
        let (mut game, events) = recording_game(11);
        assert_eq!(game.round_result(), RoundResult::NotStarted);
        game.start_new_round().unwrap();

        let events = events.lock().unwrap();
        assert_eq!(events[0], GameEvent::RoundStarted { round: 1 });
        let GameEvent::InitialRolls(rolls) = &events[1] else {
            panic!("expected opening rolls, got {:?}", events[1]);
        };
        let last = rolls.last().unwrap();
        assert!(!last.is_double());
        assert!(rolls[..rolls.len() - 1].iter().all(Dice::is_double));
        let first = if last.first > last.second { Player::One } else { Player::Two };
        assert_eq!(events[2], GameEvent::TurnChanged(first));
        assert_eq!(game.turn(), Some(first));
    }

    #[test]
    fn test_start_twice_fails() {
        let mut game = Game::with_seed(1, 3);
        game.start_new_round().unwrap();
        assert!(matches!(game.start_new_round(), Err(GameError::RoundRunning)));
    }

    #[test]
    fn test_dice_require_round() {
        let mut game = Game::with_seed(1, 3);
        assert!(matches!(game.roll_dice(), Err(GameError::RoundNotRunning)));
    }

    #[test]
    fn test_illegal_move_rejected() {
        let mut game = Game::with_seed(1, 5);
        game.start_new_round().unwrap();
        game.set_dice(Dice::new(1, 2)).unwrap();
        assert!(matches!(
            game.make_move(1, 20),
            Err(GameError::Move(MoveError::NotPossible { from: 1, to: 20 }))
        ));
    }

    #[test]
    fn test_turn_passes_after_moves() {
        let (mut game, events) = recording_game(5);
        game.start_new_round().unwrap();
        let mover = game.turn().unwrap();
        game.set_dice(Dice::new(6, 5)).unwrap();
        let from = match mover {
            Player::One => 1,
            Player::Two => 24,
        };
        let to = match mover {
            Player::One => 12,
            Player::Two => 13,
        };
        game.make_move(from, to).unwrap();
        assert_eq!(game.turn(), Some(mover.opponent()));
        assert_eq!(game.dice(), None);

        let events = events.lock().unwrap();
        let moves = events.iter().filter(|e| matches!(e, GameEvent::MoveMade(_))).count();
        assert_eq!(moves, 2);
        assert_eq!(events.last(), Some(&GameEvent::TurnChanged(mover.opponent())));
    }

    #[test]
    fn test_blocked_roll_skips_turn() {
        // player one on the bar facing a closed board
        let closed: Vec<(Slot, u8)> = (1..=6).map(|s| (s, 2)).collect();
        let snapshot = GameSnapshot {
            state: Some(GameState::from_layout(Player::One, &[(0, 1), (20, 14)], &closed)),
            scores: [0, 0],
            round: 1,
            target: 1,
            dice: None,
        };
        let mut game = Game::restore(snapshot, 1);
        game.set_dice(Dice::new(3, 5)).unwrap();
        assert_eq!(game.turn(), Some(Player::Two));
    }

    #[test]
    fn test_round_end_scores_and_match_end() {
        let snapshot = GameSnapshot {
            state: Some(GameState::from_layout(Player::One, &[(24, 1)], &[(13, 15)])),
            scores: [0, 0],
            round: 1,
            target: 2,
            dice: None,
        };
        let mut game = Game::restore(snapshot, 1);
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        game.set_listener(Box::new(move |e: &GameEvent| sink.lock().unwrap().push(e.clone())));

        game.set_dice(Dice::new(1, 2)).unwrap();
        game.make_move(24, EXIT).unwrap();
        assert_eq!(game.round_result(), RoundResult::PlayerOneWon);
        assert_eq!(game.score(Player::One), 2);
        assert_eq!(game.match_result(), RoundResult::PlayerOneWon);

        let events = events.lock().unwrap();
        assert!(events.contains(&GameEvent::RoundEnded { winner: Player::One, points: 2 }));
        assert_eq!(events.last(), Some(&GameEvent::GameEnded { winner: Player::One }));
        drop(events);
        assert!(matches!(game.start_new_round(), Err(GameError::MatchFinished)));
    }

    #[test]
    fn test_snapshot_roundtrip() {
        let mut game = Game::with_seed(5, 21);
        game.start_new_round().unwrap();
        game.roll_dice().unwrap();
        let json = serde_json::to_string(&game.snapshot()).unwrap();
        let back: GameSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, game.snapshot());
        let restored = Game::restore(back, 0);
        assert_eq!(restored.state(), game.state());
        assert_eq!(restored.round(), 1);
    }

    #[test]
    fn test_play_sequence_checks_legality() {
        let snapshot = GameSnapshot {
            state: Some(GameState::from_layout(Player::One, &[(22, 1), (24, 1), (1, 1)], &[(13, 15)])),
            scores: [0, 0],
            round: 1,
            target: 1,
            dice: None,
        };
        let mut game = Game::restore(snapshot, 1);
        game.set_dice(Dice::new(5, 3)).unwrap();
        let wrong = [Move::new(22, EXIT), Move::new(24, EXIT)];
        assert!(game.play_sequence(&wrong).is_err());
        assert_eq!(game.turn(), Some(Player::One));

        let right = [Move::new(1, 6), Move::new(6, 9)];
        game.play_sequence(&right).unwrap();
        assert_eq!(game.turn(), Some(Player::Two));
        assert_eq!(game.state().unwrap().count(9), 1);
    }
}
