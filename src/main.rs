//! Backgammon AI command line.
//!
//! ## Usage
//!
//! - `backgammon-ai` - Play one computer-vs-computer round
//! - `backgammon-ai selfplay --level 3 --target 3` - Play a match
//! - `backgammon-ai worker` - Serve JSON queries on stdin/stdout
//! - `backgammon-ai suggest --dice 3,1` - Suggest an opening move

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{ArgAction, Parser, Subcommand};
use log::{LevelFilter, Log, Metadata, Record};

use backgammon_ai::ai::{AiConfig, Computer};
use backgammon_ai::dice::Dice;
use backgammon_ai::game::{Game, GameEvent};
use backgammon_ai::search::format_moves;
use backgammon_ai::state::{GameState, Player, RoundResult};
use backgammon_ai::worker::Worker;

/// Backgammon rules engine with an expectiminimax computer player
#[derive(Parser)]
#[command(name = "backgammon-ai")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log more to stderr (-v info, -vv debug, -vvv trace); warnings are always shown
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Let two computer players play a match and print the board after every turn
    Selfplay {
        /// Difficulty of player one (1-5)
        #[arg(long, default_value_t = 3)]
        level: u8,
        /// Difficulty of player two, same as player one if omitted
        #[arg(long)]
        opponent: Option<u8>,
        /// Points needed to win the match
        #[arg(long, default_value_t = 1)]
        target: u32,
        /// Seed for reproducible dice
        #[arg(long)]
        seed: Option<u64>,
        /// Thinking time per move in milliseconds
        #[arg(long, default_value_t = 500)]
        time_ms: u64,
        /// Network weights for levels 4 and 5
        #[arg(long)]
        network: Option<PathBuf>,
    },
    /// Answer JSON queries, one per line, on stdin
    Worker {
        /// Network weights for levels 4 and 5
        #[arg(long)]
        network: Option<PathBuf>,
    },
    /// Print the suggested move for the opening position
    Suggest {
        /// The roll, e.g. `3,1`
        #[arg(long, value_parser = parse_dice)]
        dice: Dice,
        #[arg(long, default_value_t = 3)]
        level: u8,
        #[arg(long, default_value_t = 500)]
        time_ms: u64,
    },
}

fn parse_dice(s: &str) -> Result<Dice, String> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    let [a, b] = parts.as_slice() else {
        return Err(format!("expected two numbers like 3,1, got {s}"));
    };
    let parse = |x: &str| match x.parse::<u8>() {
        Ok(n) if (1..=6).contains(&n) => Ok(n),
        _ => Err(format!("invalid die number {x}")),
    };
    Ok(Dice::new(parse(*a)?, parse(*b)?))
}

/// Writes log records to stderr, keeping stdout free for the worker protocol.
struct StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record<'_>) {
        if self.enabled(record.metadata()) {
            eprintln!("[{} {}] {}", record.level(), record.target(), record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: StderrLogger = StderrLogger;

fn level_filter(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

fn init_logging(verbose: u8) {
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level_filter(verbose));
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Some(Commands::Selfplay {
            level,
            opponent,
            target,
            seed,
            time_ms,
            network,
        }) => selfplay(level, opponent.unwrap_or(level), target, seed, time_ms, network),
        Some(Commands::Worker { network }) => Worker::new(network).run(),
        Some(Commands::Suggest { dice, level, time_ms }) => suggest(dice, level, time_ms),
        None => selfplay(3, 3, 1, None, 500, None),
    }
}

fn selfplay(
    level: u8,
    opponent: u8,
    target: u32,
    seed: Option<u64>,
    time_ms: u64,
    network: Option<PathBuf>,
) -> Result<()> {
    let computer = |level| {
        Computer::new(AiConfig {
            level,
            time_limit: Duration::from_millis(time_ms),
            network: network.clone(),
        })
    };
    let mut players = [computer(level)?, computer(opponent)?];

    let mut game = match seed {
        Some(seed) => Game::with_seed(target, seed),
        None => Game::new(target),
    };
    game.set_listener(Box::new(|event: &GameEvent| match event {
        GameEvent::RoundStarted { round } => println!("=== Round {round} ==="),
        GameEvent::RoundEnded { winner, points } => println!("{winner} wins the round ({points} points)"),
        GameEvent::GameEnded { winner } => println!("{winner} wins the match"),
        _ => {}
    }));

    while matches!(game.match_result(), RoundResult::NotStarted | RoundResult::Running) {
        game.start_new_round()?;
        while game.round_result() == RoundResult::Running {
            let Some(mover) = game.turn() else {
                bail!("round running without a turn");
            };
            let dice = game.roll_dice()?;
            if game.dice().is_none() {
                println!("{mover} rolls {}-{} and cannot move", dice.first, dice.second);
                continue;
            }

            let state = game.state().context("round running without a state")?;
            let index = if mover == Player::One { 0 } else { 1 };
            let mut moves = players[index].suggest(state);
            if moves.is_empty() {
                // out of time before the first depth completed
                moves = state.snapshot().legal_sequences().first().cloned().unwrap_or_default();
            }
            println!("{mover} rolls {}-{} and plays {}", dice.first, dice.second, format_moves(&moves));
            game.play_sequence(&moves)?;
            if let Some(state) = game.state() {
                println!("{state}\n");
            }
        }
    }
    println!(
        "Final score: {} - {}",
        game.score(Player::One),
        game.score(Player::Two)
    );
    Ok(())
}

fn suggest(dice: Dice, level: u8, time_ms: u64) -> Result<()> {
    let mut computer = Computer::new(AiConfig {
        level,
        time_limit: Duration::from_millis(time_ms),
        network: None,
    })?;
    let mut state = GameState::initial(Player::One);
    state.set_dice(dice);
    println!("{state}\n");

    let outcome = computer.think(&state, Duration::from_millis(time_ms));
    println!(
        "Best: {} (value {:.3}, depth {}, {} nodes)",
        format_moves(&outcome.moves),
        outcome.value.unwrap_or(f32::NAN),
        outcome.depth,
        outcome.nodes
    );
    Ok(())
}
