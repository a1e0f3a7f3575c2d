//! SquareCB and FastCB exploration.
//!
//! Both turn the gap between the best value and the value of each action into
//! a sampling probability; actions far below the best are rarely tried.
use super::{argmax, ExplorationInput, ExplorationModule};
use anyhow::Result;
use armory_core::{CompareFields, Comparison};
use ndarray::{Array1, ArrayView1};
use rand::{distributions::WeightedIndex, rngs::SmallRng, Rng};

/// Samples an action from the probabilities of a row.
///
/// `probs` gives the probability of every action except the best one, which
/// receives the remaining mass. Negative and non-finite entries, which values
/// outside the reward bounds or NaN produce, are treated as zero.
fn sample(probs: Array1<f64>, best: usize, rng: &mut SmallRng) -> Result<usize> {
    let mut probs = probs.mapv(|p| if p.is_finite() && p > 0.0 { p } else { 0.0 });
    probs[best] = 0.0;
    probs[best] = (1.0 - probs.sum()).max(0.0);
    if probs.sum() <= 0.0 {
        return Ok(best);
    }
    Ok(rng.sample(WeightedIndex::new(probs.iter())?))
}

fn clamp_row(row: ArrayView1<f64>, lb: f64, ub: f64, clamp: bool) -> Array1<f64> {
    if clamp {
        row.mapv(|v| v.clamp(lb, ub))
    } else {
        row.to_owned()
    }
}

/// SquareCB (Foster and Rakhlin, 2020).
///
/// An action with value gap `g` to the best one is played with probability
/// `1 / (n_actions + gamma * g)`.
#[derive(Debug, Clone)]
pub struct SquareCbExploration {
    gamma: f64,
    reward_lb: f64,
    reward_ub: f64,
    clamp_values: bool,
}

impl SquareCbExploration {
    /// Creates the module; values are not clamped.
    pub fn new(gamma: f64, reward_lb: f64, reward_ub: f64) -> Self {
        Self {
            gamma,
            reward_lb,
            reward_ub,
            clamp_values: false,
        }
    }

    /// If `true`, values are clamped to the reward bounds.
    pub fn clamp_values(mut self, v: bool) -> Self {
        self.clamp_values = v;
        self
    }

    /// Sets the exploration strength; larger is greedier.
    pub fn set_gamma(&mut self, gamma: f64) {
        self.gamma = gamma;
    }

    /// Sets the lower bound of rewards.
    pub fn set_reward_lb(&mut self, reward_lb: f64) {
        self.reward_lb = reward_lb;
    }

    /// Sets the upper bound of rewards.
    pub fn set_reward_ub(&mut self, reward_ub: f64) {
        self.reward_ub = reward_ub;
    }
}

impl ExplorationModule for SquareCbExploration {
    fn act(&mut self, input: &ExplorationInput, rng: &mut SmallRng) -> Result<Vec<usize>> {
        let values = input.require_values()?;
        let n = values.ncols() as f64;
        values
            .rows()
            .into_iter()
            .map(|row| {
                let row = clamp_row(row, self.reward_lb, self.reward_ub, self.clamp_values);
                let best = argmax(row.view());
                let probs = row.mapv(|v| 1.0 / (n + self.gamma * (row[best] - v)));
                sample(probs, best, rng)
            })
            .collect()
    }
}

impl CompareFields for SquareCbExploration {
    const KIND: &'static str = "SquareCbExploration";

    fn compare_fields(&self, other: &Self, cmp: &mut Comparison) {
        cmp.field("gamma", &self.gamma, &other.gamma)
            .field("reward_lb", &self.reward_lb, &other.reward_lb)
            .field("reward_ub", &self.reward_ub, &other.reward_ub)
            .field("clamp_values", &self.clamp_values, &other.clamp_values);
    }
}

/// FastCB (Foster and Krishnamurthy, 2021).
///
/// Values are mapped to losses in `[0, 1]` with the reward bounds. With `l*`
/// the loss of the best action, an action of loss `l` is played with
/// probability `l* / (n_actions * l* + gamma * (l - l*))`.
#[derive(Debug, Clone)]
pub struct FastCbExploration {
    gamma: f64,
    reward_lb: f64,
    reward_ub: f64,
    clamp_values: bool,
}

impl FastCbExploration {
    /// Creates the module; values are not clamped.
    pub fn new(gamma: f64, reward_lb: f64, reward_ub: f64) -> Self {
        Self {
            gamma,
            reward_lb,
            reward_ub,
            clamp_values: false,
        }
    }

    /// If `true`, values are clamped to the reward bounds.
    pub fn clamp_values(mut self, v: bool) -> Self {
        self.clamp_values = v;
        self
    }

    /// Sets the exploration strength; larger is greedier.
    pub fn set_gamma(&mut self, gamma: f64) {
        self.gamma = gamma;
    }

    /// Sets the lower bound of rewards.
    pub fn set_reward_lb(&mut self, reward_lb: f64) {
        self.reward_lb = reward_lb;
    }

    /// Sets the upper bound of rewards.
    pub fn set_reward_ub(&mut self, reward_ub: f64) {
        self.reward_ub = reward_ub;
    }
}

impl ExplorationModule for FastCbExploration {
    fn act(&mut self, input: &ExplorationInput, rng: &mut SmallRng) -> Result<Vec<usize>> {
        let values = input.require_values()?;
        let n = values.ncols() as f64;
        let range = (self.reward_ub - self.reward_lb).max(f64::EPSILON);
        values
            .rows()
            .into_iter()
            .map(|row| {
                let row = clamp_row(row, self.reward_lb, self.reward_ub, self.clamp_values);
                let best = argmax(row.view());
                let loss = row.mapv(|v| (self.reward_ub - v) / range);
                let best_loss = loss[best];
                // the best value reaches the upper bound
                if best_loss.is_nan() || best_loss <= 0.0 {
                    return Ok(best);
                }
                let probs = loss.mapv(|l| {
                    let denom = n * best_loss + self.gamma * (l - best_loss);
                    if denom > 0.0 {
                        best_loss / denom
                    } else {
                        0.0
                    }
                });
                sample(probs, best, rng)
            })
            .collect()
    }
}

impl CompareFields for FastCbExploration {
    const KIND: &'static str = "FastCbExploration";

    fn compare_fields(&self, other: &Self, cmp: &mut Comparison) {
        cmp.field("gamma", &self.gamma, &other.gamma)
            .field("reward_lb", &self.reward_lb, &other.reward_lb)
            .field("reward_ub", &self.reward_ub, &other.reward_ub)
            .field("clamp_values", &self.clamp_values, &other.clamp_values);
    }
}
