//! Expectiminimax search with iterative deepening.
//!
//! The tree alternates two node kinds:
//! - a [`DecisionNode`] is a position where the side to move has rolled; its
//!   children are the distinct move sequences it may play
//! - a [`ChanceNode`] is the position after such a sequence, before the
//!   opponent rolls; its children are the 21 distinct rolls
//!
//! Values are win probabilities of the player to move at the root. Decision
//! nodes of that player take the maximum over their children, the
//! opponent's the minimum, chance nodes the weighted average.
//!
//! All nodes share one [`GameState`] which is moved forward and undone as the
//! search walks the tree. Nodes keep their children between iterations, so a
//! deeper pass reuses the tree of the previous one.

use std::time::{Duration, Instant};

use log::{debug, info};

use crate::constants::DICE_OUTCOMES;
use crate::dice::{Dice, weighted_outcomes};
use crate::scorers::{Scorer, terminal_value};
use crate::state::{GameState, Move, Player};

/// A position where the side to move picks a move sequence.
pub struct DecisionNode {
    /// Roll leading here from the parent chance node (`None` at the root).
    pub dice: Option<Dice>,
    /// Multiplicity of `dice` out of 36.
    pub weight: u32,
    pub maximize: bool,
    /// Value of the last completed expansion.
    pub value: Option<f32>,
    pub children: Vec<ChanceNode>,
    expanded: bool,
}

/// The position after a move sequence, before the next roll.
pub struct ChanceNode {
    pub moves: Vec<Move>,
    pub value: Option<f32>,
    /// The round ended with `moves`.
    pub terminal: bool,
    pub children: Vec<DecisionNode>,
}

impl DecisionNode {
    /// Root for the side to move, which maximizes.
    pub fn root() -> Self {
        Self::new(None, 1, true)
    }

    fn new(dice: Option<Dice>, weight: u32, maximize: bool) -> Self {
        Self {
            dice,
            weight,
            maximize,
            value: None,
            children: Vec::new(),
            expanded: false,
        }
    }

    /// Index of the child with the best value for this node's player.
    ///
    /// Ties go to the first such child.
    pub fn best_child(&self) -> Option<usize> {
        let mut best: Option<(usize, f32)> = None;
        for (i, child) in self.children.iter().enumerate() {
            let Some(v) = child.value else {
                continue;
            };
            let better = match best {
                None => true,
                Some((_, b)) if self.maximize => v > b,
                Some((_, b)) => v < b,
            };
            if better {
                best = Some((i, v));
            }
        }
        best.map(|(i, _)| i)
    }
}

impl ChanceNode {
    fn new(moves: Vec<Move>) -> Self {
        Self {
            moves,
            value: None,
            terminal: false,
            children: Vec::new(),
        }
    }
}

/// Result of [`iterative_deepening`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchOutcome {
    /// Best sequence of the deepest completed iteration, empty if none completed.
    pub moves: Vec<Move>,
    pub value: Option<f32>,
    /// Deepest completed depth, 0 if none.
    pub depth: usize,
    /// Node expansions over all iterations.
    pub nodes: u64,
}

struct Search<'a> {
    scorer: &'a mut dyn Scorer,
    perspective: Player,
    deadline: Instant,
    nodes: u64,
}

impl Search<'_> {
    #[inline]
    fn expired(&self) -> bool {
        Instant::now() >= self.deadline
    }

    fn expand_decision(&mut self, node: &mut DecisionNode, state: &mut GameState, depth: usize) -> Option<f32> {
        if self.expired() {
            return None;
        }
        self.nodes += 1;

        if depth == 0 {
            let v = self.scorer.score(state, self.perspective);
            node.value = Some(v);
            return node.value;
        }

        if !node.expanded {
            let mut sequences = state.unique_sequences();
            if sequences.is_empty() {
                // forced pass
                sequences.push(Vec::new());
            }
            node.children = sequences.into_iter().map(ChanceNode::new).collect();
            node.expanded = true;
        }

        let mut best: Option<f32> = None;
        for child in &mut node.children {
            state.force_sequence(&child.moves);
            state.next_turn();
            let result = self.expand_chance(child, state, depth - 1, !node.maximize);
            state.undo_last_turn();
            for _ in 0..child.moves.len() {
                state.undo_last_move();
            }

            let v = result?;
            best = Some(match best {
                None => v,
                Some(b) if node.maximize => b.max(v),
                Some(b) => b.min(v),
            });
        }
        node.value = best;
        best
    }

    fn expand_chance(
        &mut self,
        node: &mut ChanceNode,
        state: &mut GameState,
        depth: usize,
        maximize_next: bool,
    ) -> Option<f32> {
        if self.expired() {
            return None;
        }
        self.nodes += 1;

        if let Some(v) = terminal_value(state, self.perspective) {
            node.terminal = true;
            node.value = Some(v);
            return node.value;
        }
        if depth == 0 {
            let v = self.scorer.score(state, self.perspective);
            node.value = Some(v);
            return node.value;
        }

        if node.children.is_empty() {
            node.children = weighted_outcomes()
                .iter()
                .map(|&(dice, weight)| DecisionNode::new(Some(dice), weight, maximize_next))
                .collect();
        }

        let mut total = 0.0f32;
        for child in &mut node.children {
            if let Some(dice) = child.dice {
                state.set_dice(dice);
            }
            let result = self.expand_decision(child, state, depth - 1);
            state.clear_dice();
            total += child.weight as f32 * result?;
        }
        let v = total / DICE_OUTCOMES as f32;
        node.value = Some(v);
        node.value
    }
}

/// Search `state` at depths `1..=max_depth` until `deadline`.
///
/// `state` must belong to the side to move with its dice set; it is returned
/// unchanged. `root` keeps the tree and should be fresh for a new position.
pub fn iterative_deepening(
    root: &mut DecisionNode,
    state: &mut GameState,
    scorer: &mut dyn Scorer,
    deadline: Instant,
    max_depth: usize,
) -> SearchOutcome {
    let started = Instant::now();
    let mut search = Search {
        scorer,
        perspective: state.turn(),
        deadline,
        nodes: 0,
    };
    let mut outcome = SearchOutcome::default();

    for depth in 1..=max_depth {
        if search.expand_decision(root, state, depth).is_none() {
            debug!("depth {depth} aborted after {} nodes", search.nodes);
            break;
        }
        if let Some(i) = root.best_child() {
            let child = &root.children[i];
            outcome.moves = child.moves.clone();
            outcome.value = child.value;
            outcome.depth = depth;
            debug!(
                "depth {depth} done: {} children, best {} ({:.4}), {} nodes",
                root.children.len(),
                format_moves(&outcome.moves),
                child.value.unwrap_or(f32::NAN),
                search.nodes
            );
        }
    }

    outcome.nodes = search.nodes;
    info!(
        "{} chose {} at depth {} in {:?} ({} nodes, value {:?})",
        search.scorer.name(),
        format_moves(&outcome.moves),
        outcome.depth,
        started.elapsed(),
        outcome.nodes,
        outcome.value
    );
    outcome
}

/// Search a copy of `state` for at most `time_limit`.
pub fn search(state: &GameState, scorer: &mut dyn Scorer, time_limit: Duration, max_depth: usize) -> SearchOutcome {
    let deadline = Instant::now() + time_limit;
    let mut state = state.snapshot();
    let mut root = DecisionNode::root();
    iterative_deepening(&mut root, &mut state, scorer, deadline, max_depth)
}

/// Moves as `from/to` separated by spaces, `pass` if empty.
pub fn format_moves(moves: &[Move]) -> String {
    if moves.is_empty() {
        return "pass".to_string();
    }
    moves.iter().map(Move::to_string).collect::<Vec<_>>().join(" ")
}

/// Log the values of the root's children.
pub fn log_children(root: &DecisionNode) {
    for child in &root.children {
        debug!(
            "{:<24} value={:?} terminal={} children={}",
            format_moves(&child.moves),
            child.value,
            child.terminal,
            child.children.len()
        );
    }
}
