//! Neural network evaluation with TD-Gammon's board encoding.
//!
//! The scorer only owns the encoding and the interpretation of the two
//! outputs; the network itself sits behind [`InferenceEngine`]. A small dense
//! network loaded from JSON is provided as [`DenseNetwork`].

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail, ensure};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::constants::{CHECKERS, FIRST_POINT, LAST_POINT, NETWORK_INPUTS};
use crate::scorers::{PubevalScorer, Scorer, terminal_value};
use crate::state::{GameState, Player};

/// Evaluates an encoded position.
///
/// Output index 0 is player two's winning chance, index 1 player one's.
pub trait InferenceEngine: Send {
    fn evaluate(&mut self, features: &[f32]) -> Result<[f32; 2]>;
}

/// The 198 TD-Gammon inputs of a position.
///
/// Per player 4 units for each point (1, 2, 3 checkers, then half the
/// excess), half the bar count and the fraction of checkers not on a point.
/// The last unit counts the bar too, as trained TD-Gammon weights expect.
/// Player two's block comes first. The last two units tell whose turn it is.
pub fn network_features(state: &GameState) -> [f32; NETWORK_INPUTS] {
    let mut f = [0.0f32; NETWORK_INPUTS];
    for (player, offset) in [(Player::Two, 0), (Player::One, 98)] {
        let mut on_points = 0u8;
        for point in FIRST_POINT..=LAST_POINT {
            if state.owner(point) != Some(player) {
                continue;
            }
            let n = state.count(point);
            on_points += n;
            let base = offset + (point as usize - 1) * 4;
            for j in 1..=3 {
                if n >= j {
                    f[base + j as usize - 1] = 1.0;
                }
            }
            if n >= 4 {
                f[base + 3] = (n - 3) as f32 / 2.0;
            }
        }
        f[offset + 96] = state.count(player.bar()) as f32 / 2.0;
        f[offset + 97] = (CHECKERS - on_points) as f32 / CHECKERS as f32;
    }
    if state.turn() == Player::Two {
        f[196] = 1.0;
    } else {
        f[197] = 1.0;
    }
    f
}

/// Scores positions with a trained network.
///
/// Inference errors do not abort a search: they are logged and the position
/// is scored by pubeval instead.
pub struct NetworkScorer {
    engine: Box<dyn InferenceEngine>,
    fallback: PubevalScorer,
    failures: u64,
}

impl NetworkScorer {
    /// Check that `engine` answers before it is used in a search.
    pub fn warm_up(mut engine: Box<dyn InferenceEngine>) -> Result<Self> {
        let probe = network_features(&GameState::initial(Player::One));
        let out = engine.evaluate(&probe).context("network warm-up failed")?;
        ensure!(
            out.iter().all(|v| v.is_finite()),
            "network returned non-finite values {out:?}"
        );
        info!("network ready, opening estimate {:.3}/{:.3}", out[1], out[0]);
        Ok(Self {
            engine,
            fallback: PubevalScorer::default(),
            failures: 0,
        })
    }

    /// Evaluations answered by the fallback so far.
    pub fn failures(&self) -> u64 {
        self.failures
    }
}

impl Scorer for NetworkScorer {
    fn name(&self) -> &'static str {
        "network"
    }

    fn score(&mut self, state: &GameState, perspective: Player) -> f32 {
        if let Some(value) = terminal_value(state, perspective) {
            return value;
        }
        match self.engine.evaluate(&network_features(state)) {
            Ok(out) => match perspective {
                Player::One => out[1],
                Player::Two => out[0],
            },
            Err(e) => {
                if self.failures == 0 {
                    warn!("network evaluation failed, using pubeval: {e:#}");
                } else {
                    debug!("network evaluation failed: {e:#}");
                }
                self.failures += 1;
                self.fallback.score(state, perspective)
            }
        }
    }
}

/// A fully connected network with one sigmoid hidden layer and two sigmoid outputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DenseNetwork {
    /// `hidden x inputs`
    pub hidden_weights: Vec<Vec<f32>>,
    pub hidden_bias: Vec<f32>,
    /// `2 x hidden`
    pub output_weights: Vec<Vec<f32>>,
    pub output_bias: Vec<f32>,
}

#[inline]
fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

impl DenseNetwork {
    /// Load weights from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("cannot read network weights {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("invalid network file {}", path.display()))
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let network: DenseNetwork = serde_json::from_str(text)?;
        network.validate()?;
        Ok(network)
    }

    fn validate(&self) -> Result<()> {
        let hidden = self.hidden_weights.len();
        ensure!(hidden > 0, "network has no hidden units");
        ensure!(self.hidden_bias.len() == hidden, "hidden bias has {} entries, expected {hidden}", self.hidden_bias.len());
        for (i, row) in self.hidden_weights.iter().enumerate() {
            ensure!(
                row.len() == NETWORK_INPUTS,
                "hidden unit {i} has {} weights, expected {NETWORK_INPUTS}",
                row.len()
            );
        }
        ensure!(self.output_weights.len() == 2, "expected 2 output units");
        ensure!(self.output_bias.len() == 2, "expected 2 output biases");
        for row in &self.output_weights {
            ensure!(row.len() == hidden, "output unit has {} weights, expected {hidden}", row.len());
        }
        Ok(())
    }
}

impl InferenceEngine for DenseNetwork {
    fn evaluate(&mut self, features: &[f32]) -> Result<[f32; 2]> {
        if features.len() != NETWORK_INPUTS {
            bail!("expected {NETWORK_INPUTS} inputs, got {}", features.len());
        }
        let hidden: Vec<f32> = self
            .hidden_weights
            .iter()
            .zip(&self.hidden_bias)
            .map(|(row, b)| sigmoid(row.iter().zip(features).map(|(w, x)| w * x).sum::<f32>() + b))
            .collect();
        let mut out = [0.0f32; 2];
        for (k, (row, b)) in self.output_weights.iter().zip(&self.output_bias).enumerate() {
            out[k] = sigmoid(row.iter().zip(&hidden).map(|(w, h)| w * h).sum::<f32>() + b);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{BAR_ONE, BAR_TWO, EXIT};
    use crate::state::Move;

    struct Fixed([f32; 2]);

    impl InferenceEngine for Fixed {
        fn evaluate(&mut self, _features: &[f32]) -> Result<[f32; 2]> {
            Ok(self.0)
        }
    }

    struct Broken;

    impl InferenceEngine for Broken {
        fn evaluate(&mut self, _features: &[f32]) -> Result<[f32; 2]> {
            bail!("session closed")
        }
    }

    struct FailsAfterWarmUp(bool);

    impl InferenceEngine for FailsAfterWarmUp {
        fn evaluate(&mut self, _features: &[f32]) -> Result<[f32; 2]> {
            if std::mem::replace(&mut self.0, true) {
                bail!("gone")
            }
            Ok([0.5, 0.5])
        }
    }

    fn tiny_network(hidden: usize) -> DenseNetwork {
        DenseNetwork {
            hidden_weights: vec![vec![0.0; NETWORK_INPUTS]; hidden],
            hidden_bias: vec![0.0; hidden],
            output_weights: vec![vec![1.0; hidden], vec![-1.0; hidden]],
            output_bias: vec![0.0, 0.0],
        }
    }

    #[test]
    fn test_features_initial_position() {
        let f = network_features(&GameState::initial(Player::One));
        // player two: 2 checkers on 24
        assert_eq!(&f[92..96], &[1.0, 1.0, 0.0, 0.0]);
        // player two: 5 checkers on 6
        assert_eq!(&f[20..24], &[1.0, 1.0, 1.0, 1.0]);
        // player one: 5 checkers on 12
        assert_eq!(&f[98 + 44..98 + 48], &[1.0, 1.0, 1.0, 1.0]);
        assert_eq!(f[96], 0.0);
        assert_eq!(f[97], 0.0);
        assert_eq!((f[196], f[197]), (0.0, 1.0));
        // 2 + 4 + 3 + 4 units per side plus the turn unit
        assert_eq!(f.iter().filter(|&&x| x != 0.0).count(), 2 * 13 + 1);
    }

    #[test]
    fn test_features_bar_and_off() {
        let state = GameState::from_layout(Player::Two, &[(BAR_ONE, 2), (20, 3)], &[(BAR_TWO, 1)]);
        let f = network_features(&state);
        assert_eq!(f[194], 1.0);
        assert!((f[195] - 12.0 / 15.0).abs() < 1e-6);
        assert_eq!(f[96], 0.5);
        assert_eq!(f[97], 1.0);
        assert_eq!((f[196], f[197]), (1.0, 0.0));
    }

    #[test]
    fn test_output_per_perspective() {
        let mut scorer = NetworkScorer::warm_up(Box::new(Fixed([0.3, 0.7]))).unwrap();
        let state = GameState::initial(Player::One);
        assert_eq!(scorer.score(&state, Player::One), 0.7);
        assert_eq!(scorer.score(&state, Player::Two), 0.3);
    }

    #[test]
    fn test_warm_up_failure() {
        assert!(NetworkScorer::warm_up(Box::new(Broken)).is_err());
    }

    #[test]
    fn test_fallback_to_pubeval() {
        let mut scorer = NetworkScorer::warm_up(Box::new(FailsAfterWarmUp(false))).unwrap();
        let state = GameState::initial(Player::Two);
        let expected = PubevalScorer::default().score(&state, Player::Two);
        assert_eq!(scorer.score(&state, Player::Two), expected);
        assert_eq!(scorer.failures(), 1);
    }

    #[test]
    fn test_terminal_skips_network() {
        let mut state = GameState::from_layout(Player::Two, &[(20, 1)], &[(1, 1)]);
        state.set_dice(crate::dice::Dice::new(1, 1));
        state.force_move(Move::new(1, EXIT));
        let mut scorer = NetworkScorer::warm_up(Box::new(Fixed([0.3, 0.7]))).unwrap();
        assert_eq!(scorer.score(&state, Player::Two), 1.0);
    }

    #[test]
    fn test_dense_network_json() {
        let json = serde_json::to_string(&tiny_network(3)).unwrap();
        let mut net = DenseNetwork::from_json(&json).unwrap();
        let out = net.evaluate(&[0.0; NETWORK_INPUTS]).unwrap();
        // hidden units are all 0.5
        assert!((out[0] - sigmoid(1.5)).abs() < 1e-6);
        assert!((out[1] - sigmoid(-1.5)).abs() < 1e-6);
        assert!(net.evaluate(&[0.0; 10]).is_err());
    }

    #[test]
    fn test_dense_network_rejects_bad_shapes() {
        let mut bad = tiny_network(2);
        bad.hidden_weights[1].pop();
        let json = serde_json::to_string(&bad).unwrap();
        assert!(DenseNetwork::from_json(&json).is_err());
        assert!(DenseNetwork::load(Path::new("/nonexistent/weights.json")).is_err());
    }
}
