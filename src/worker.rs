//! Line protocol for running the computer player in a separate process.
//!
//! Every input line is one JSON [`Query`]; the worker answers each with one
//! line holding a JSON [`Response`], or `{"error": "..."}` if the query could
//! not be served. Empty lines and lines starting with `#` are skipped, `quit`
//! ends the session.
//!
//! ## Example
//!
//! ```text
//! > {"board_state": {...}, "difficulty_level": 3, "time_limit_ms": 500}
//! < {"moves":[{"from":12,"to":17},{"from":1,"to":4}]}
//! ```

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use log::{debug, info};
use serde_json::json;

use crate::ai::{AiConfig, Computer, ConfigError, Query, Response};
use crate::constants::{DEFAULT_TIME_LIMIT, MAX_LEVEL, MIN_LEVEL};

/// Serves queries, keeping one computer player per level.
pub struct Worker {
    network: Option<PathBuf>,
    computers: Vec<Option<Computer>>,
}

impl Default for Worker {
    fn default() -> Self {
        Self::new(None)
    }
}

impl Worker {
    /// `network` is handed to the players of levels 4 and 5.
    pub fn new(network: Option<PathBuf>) -> Self {
        Self {
            network,
            computers: (MIN_LEVEL..=MAX_LEVEL).map(|_| None).collect(),
        }
    }

    /// Serve stdin until it closes or `quit` is received.
    pub fn run(&mut self) -> Result<()> {
        let stdin = io::stdin();
        self.serve(stdin.lock(), io::stdout())
    }

    pub fn serve<R: BufRead, W: Write>(&mut self, input: R, mut output: W) -> Result<()> {
        info!("worker ready");
        for line in input.lines() {
            let line = line.context("cannot read query")?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if line == "quit" {
                break;
            }

            let reply = self.execute(line);
            writeln!(output, "{reply}")?;
            output.flush()?;
        }
        info!("worker done");
        Ok(())
    }

    /// Answer one query line.
    fn execute(&mut self, line: &str) -> String {
        match self.handle(line) {
            Ok(response) => serde_json::to_string(&response)
                .unwrap_or_else(|e| json!({ "error": e.to_string() }).to_string()),
            Err(e) => {
                debug!("query failed: {e:#}");
                json!({ "error": format!("{e:#}") }).to_string()
            }
        }
    }

    fn handle(&mut self, line: &str) -> Result<Response> {
        let query: Query = serde_json::from_str(line).context("malformed query")?;
        let computer = self.computer(query.difficulty_level)?;
        Ok(computer.answer(&query))
    }

    fn computer(&mut self, level: u8) -> Result<&mut Computer, ConfigError> {
        if !(MIN_LEVEL..=MAX_LEVEL).contains(&level) {
            return Err(ConfigError::InvalidLevel(level));
        }
        let slot = &mut self.computers[(level - MIN_LEVEL) as usize];
        let computer = match slot.take() {
            Some(computer) => computer,
            None => Computer::new(AiConfig {
                level,
                time_limit: DEFAULT_TIME_LIMIT,
                network: self.network.clone(),
            })?,
        };
        Ok(slot.insert(computer))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::dice::Dice;
    use crate::state::{GameState, Player};

    fn query_line(level: u8) -> String {
        let mut state = GameState::initial(Player::One);
        state.set_dice(Dice::new(4, 2));
        serde_json::to_string(&Query {
            board_state: state,
            difficulty_level: level,
            time_limit_ms: 200,
        })
        .unwrap()
    }

    #[test]
    fn test_answers_query() {
        let mut worker = Worker::default();
        let reply = worker.execute(&query_line(2));
        let response: Response = serde_json::from_str(&reply).unwrap();
        assert_eq!(response.moves.len(), 2);
    }

    #[test]
    fn test_malformed_query() {
        let mut worker = Worker::default();
        let reply: serde_json::Value = serde_json::from_str(&worker.execute("{not json")).unwrap();
        assert!(reply["error"].as_str().unwrap().contains("malformed query"));
    }

    #[test]
    fn test_invalid_level() {
        let mut worker = Worker::default();
        let reply: serde_json::Value = serde_json::from_str(&worker.execute(&query_line(9))).unwrap();
        assert!(reply["error"].as_str().unwrap().contains("level 9"));
    }

    #[test]
    fn test_invalid_board_is_an_error_reply() {
        let mut query: serde_json::Value = serde_json::from_str(&query_line(2)).unwrap();
        query["board_state"]["remaining"] = json!([200]);
        let input = format!("{query}\n{}\n", query_line(1));
        let mut output = Vec::new();
        let mut worker = Worker::default();
        worker.serve(Cursor::new(input), &mut output).unwrap();

        let text = String::from_utf8(output).unwrap();
        let replies: Vec<serde_json::Value> = text.lines().map(|l| serde_json::from_str(l).unwrap()).collect();
        assert_eq!(replies.len(), 2);
        assert!(replies[0]["error"].as_str().unwrap().contains("invalid dice"));
        assert_eq!(replies[1]["moves"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_serve_session() {
        let input = format!("# comment\n\n{}\nquit\n{}\n", query_line(1), query_line(1));
        let mut output = Vec::new();
        let mut worker = Worker::default();
        worker.serve(Cursor::new(input), &mut output).unwrap();
        let text = String::from_utf8(output).unwrap();
        assert_eq!(text.lines().count(), 1);
        assert!(text.starts_with("{\"moves\":"));
    }

    #[test]
    fn test_computer_is_cached() {
        let mut worker = Worker::default();
        worker.computer(3).unwrap();
        assert!(worker.computers[2].is_some());
        assert!(worker.computers[0].is_none());
    }
}
