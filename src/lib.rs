//! Backgammon rules engine and computer player.
//!
//! The crate keeps the full board state with an exact undo log, generates
//! legal move sequences under the official dice rules, and searches the game
//! tree with expectiminimax and iterative deepening under a time budget.
//!
//! ## Modules
//!
//! - [`constants`] - Board geometry and engine parameters
//! - [`dice`] - Dice rolls and the weighted outcome table
//! - [`state`] - Board state, move execution and undo
//! - [`movegen`] - Legal move generation and compound move decomposition
//! - [`game`] - Rounds, match score and events
//! - [`scorers`] - Static evaluators (race table, pubeval, neural network)
//! - [`search`] - Expectiminimax search with iterative deepening
//! - [`ai`] - Computer player configured by difficulty level
//! - [`worker`] - JSON line protocol serving the computer player
//! - [`board`] - ASCII rendering of a position
//!
//! ## Example
//!
//! ```
//! use std::time::Duration;
//!
//! use backgammon_ai::dice::Dice;
//! use backgammon_ai::scorers::PubevalScorer;
//! use backgammon_ai::search::search;
//! use backgammon_ai::state::{GameState, Player};
//!
//! let mut state = GameState::initial(Player::One);
//! state.set_dice(Dice::new(3, 1));
//! assert_eq!(state.legal_sequences().len(), 31);
//!
//! let outcome = search(&state, &mut PubevalScorer::default(), Duration::from_millis(200), 2);
//! println!("best: {:?}", outcome.moves);
//! ```

pub mod ai;
pub mod board;
pub mod constants;
pub mod dice;
pub mod game;
pub mod movegen;
pub mod scorers;
pub mod search;
pub mod state;
pub mod worker;
