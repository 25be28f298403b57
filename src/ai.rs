//! The computer player.
//!
//! A difficulty level picks a scorer and a maximum search depth:
//!
//! | level | scorer                  | depth |
//! |-------|-------------------------|-------|
//! | 1     | race table              | 2     |
//! | 2     | pubeval                 | 2     |
//! | 3     | pubeval                 | 3     |
//! | 4, 5  | network (pubeval if none configured) | 3 |
//!
//! Level 1 is meant to be weak: it plays every position, contact included,
//! as a pure pip race.

use std::path::PathBuf;
use std::time::Duration;

use log::{info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{DEFAULT_LEVEL, DEFAULT_TIME_LIMIT, MAX_LEVEL, MIN_LEVEL, max_depth_for_level};
use crate::scorers::{DenseNetwork, NetworkScorer, PubevalScorer, RaceScorer, Scorer};
use crate::search::{SearchOutcome, search};
use crate::state::{GameState, Move};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid computer level {0}, expected {}..={}", MIN_LEVEL, MAX_LEVEL)]
    InvalidLevel(u8),
    #[error("cannot load network: {0:#}")]
    Network(anyhow::Error),
}

/// Settings of a computer player.
#[derive(Debug, Clone, PartialEq)]
pub struct AiConfig {
    pub level: u8,
    pub time_limit: Duration,
    /// JSON weights for [`DenseNetwork`], used by levels 4 and 5.
    pub network: Option<PathBuf>,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LEVEL,
            time_limit: DEFAULT_TIME_LIMIT,
            network: None,
        }
    }
}

/// A request to the computer: pick the moves for `board_state`.
///
/// The state must have the side to move and its dice set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub board_state: GameState,
    pub difficulty_level: u8,
    pub time_limit_ms: u64,
}

/// The chosen sequence; empty if no move is possible.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub moves: Vec<Move>,
}

pub struct Computer {
    level: u8,
    time_limit: Duration,
    max_depth: usize,
    scorer: Box<dyn Scorer>,
}

impl Computer {
    pub fn new(config: AiConfig) -> Result<Self, ConfigError> {
        let level = config.level;
        if !(MIN_LEVEL..=MAX_LEVEL).contains(&level) {
            return Err(ConfigError::InvalidLevel(level));
        }

        let scorer: Box<dyn Scorer> = match (level, &config.network) {
            (1, _) => Box::new(RaceScorer),
            (2 | 3, _) => Box::new(PubevalScorer::default()),
            (_, Some(path)) => {
                let network = DenseNetwork::load(path).map_err(ConfigError::Network)?;
                Box::new(NetworkScorer::warm_up(Box::new(network)).map_err(ConfigError::Network)?)
            }
            (_, None) => {
                warn!("level {level} without a network, using pubeval");
                Box::new(PubevalScorer::default())
            }
        };
        let max_depth = max_depth_for_level(level);
        info!("computer level {level}: {} scorer, depth {max_depth}", scorer.name());

        Ok(Self {
            level,
            time_limit: config.time_limit,
            max_depth,
            scorer,
        })
    }

    pub fn level(&self) -> u8 {
        self.level
    }

    pub fn scorer_name(&self) -> &'static str {
        self.scorer.name()
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Best sequence for the side to move in `state`.
    pub fn suggest(&mut self, state: &GameState) -> Vec<Move> {
        self.think(state, self.time_limit).moves
    }

    /// Search with an explicit time budget and report the details.
    pub fn think(&mut self, state: &GameState, time_limit: Duration) -> SearchOutcome {
        search(state, self.scorer.as_mut(), time_limit, self.max_depth)
    }

    /// Answer `query` with this player's scorer and the query's time budget.
    pub fn answer(&mut self, query: &Query) -> Response {
        if query.difficulty_level != self.level {
            warn!(
                "query asks for level {}, answering with level {}",
                query.difficulty_level, self.level
            );
        }
        let outcome = self.think(&query.board_state, Duration::from_millis(query.time_limit_ms));
        Response { moves: outcome.moves }
    }
}
