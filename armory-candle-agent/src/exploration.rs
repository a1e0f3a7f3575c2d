//! Exploration modules.
//!
//! An exploration module picks one action per row of a batch from the scores
//! computed by a policy learner. What a module reads from
//! [`ExplorationInput`] depends on the strategy: greedy strategies only need
//! `values`, UCB needs `uncertainty`, Thompson sampling the `features` and
//! the `regressions` they were scored with.
mod deep_exploration;
mod egreedy;
mod no_exploration;
mod normal;
mod propensity;
mod square_cb;
mod thompson_sampling;
mod ucb;
mod vanilla_ucb;
mod warmup;
use crate::{action_space::DiscreteActionSpace, network::LinearRegression};
use anyhow::Result;
use armory_core::{ArmoryError, Compare};
use candle_core::Tensor;
pub use deep_exploration::DeepExploration;
pub use egreedy::EGreedyExploration;
use ndarray::{Array2, Array3, ArrayView1};
pub use no_exploration::NoExploration;
pub use normal::NormalDistributionExploration;
pub use propensity::PropensityExploration;
use rand::{rngs::SmallRng, Rng};
pub use square_cb::{FastCbExploration, SquareCbExploration};
pub use thompson_sampling::{
    ThompsonSamplingExplorationLinear, ThompsonSamplingExplorationLinearDisjoint,
};
pub use ucb::{DisjointUcbExploration, UcbExploration};
pub use vanilla_ucb::VanillaUcbExploration;
pub use warmup::Warmup;

/// Everything a policy learner knows when an action has to be taken.
///
/// Arrays are indexed by batch row first, then by action index.
#[derive(Clone, Copy)]
pub struct ExplorationInput<'a> {
    /// Available actions.
    pub action_space: &'a DiscreteActionSpace,

    /// Greedy actions, if the learner computed them.
    pub exploit_action: Option<&'a [usize]>,

    /// Estimated values, `(batch, n_actions)`.
    pub values: Option<&'a Array2<f64>>,

    /// Uncertainty of the values, `(batch, n_actions)`.
    pub uncertainty: Option<&'a Array2<f64>>,

    /// Features the values were computed from, `(batch, n_actions, feature_dim)`.
    pub features: Option<&'a Array3<f64>>,

    /// Regression models: a single shared model or one per action.
    pub regressions: Option<&'a [&'a LinearRegression]>,

    /// States of shape `(batch, state_dim)`.
    pub state: Option<&'a Tensor>,
}

impl<'a> ExplorationInput<'a> {
    /// Creates an input with no information beside the action space.
    pub fn new(action_space: &'a DiscreteActionSpace) -> Self {
        Self {
            action_space,
            exploit_action: None,
            values: None,
            uncertainty: None,
            features: None,
            regressions: None,
            state: None,
        }
    }

    /// Sets the greedy action of each row.
    pub fn exploit_action(mut self, v: &'a [usize]) -> Self {
        self.exploit_action = Some(v);
        self
    }

    /// Sets the estimated values, one row per batch element.
    pub fn values(mut self, v: &'a Array2<f64>) -> Self {
        self.values = Some(v);
        self
    }

    /// Sets the uncertainty of each value.
    pub fn uncertainty(mut self, v: &'a Array2<f64>) -> Self {
        self.uncertainty = Some(v);
        self
    }

    /// Sets the features of each (state, action) pair.
    pub fn features(mut self, v: &'a Array3<f64>) -> Self {
        self.features = Some(v);
        self
    }

    /// Sets the regression models behind the values.
    pub fn regressions(mut self, v: &'a [&'a LinearRegression]) -> Self {
        self.regressions = Some(v);
        self
    }

    /// Sets the raw state batch.
    pub fn state(mut self, v: &'a Tensor) -> Self {
        self.state = Some(v);
        self
    }

    /// Number of rows, taken from the first available input.
    pub fn batch_size(&self) -> Result<usize> {
        if let Some(v) = self.values {
            Ok(v.nrows())
        } else if let Some(f) = self.features {
            Ok(f.shape()[0])
        } else if let Some(a) = self.exploit_action {
            Ok(a.len())
        } else if let Some(s) = self.state {
            Ok(s.dims().first().copied().unwrap_or(1))
        } else {
            Err(ArmoryError::MissingExplorationInput("values").into())
        }
    }

    pub(crate) fn require_values(&self) -> Result<&'a Array2<f64>> {
        let values = self
            .values
            .ok_or(ArmoryError::MissingExplorationInput("values"))?;
        self.check_columns("values", values.ncols())?;
        Ok(values)
    }

    pub(crate) fn require_features(&self) -> Result<&'a Array3<f64>> {
        let features = self
            .features
            .ok_or(ArmoryError::MissingExplorationInput("features"))?;
        self.check_columns("features", features.shape()[1])?;
        Ok(features)
    }

    pub(crate) fn require_regressions(&self) -> Result<&'a [&'a LinearRegression]> {
        match self.regressions {
            Some(r) if !r.is_empty() => Ok(r),
            _ => Err(ArmoryError::MissingExplorationInput("regressions").into()),
        }
    }

    /// Greedy actions: `exploit_action` if given, otherwise the argmax of `values`.
    pub(crate) fn greedy_actions(&self) -> Result<Vec<usize>> {
        match self.exploit_action {
            Some(a) => {
                self.action_space.check_actions(a)?;
                Ok(a.to_vec())
            }
            None => Ok(argmax_rows(self.require_values()?)),
        }
    }

    fn check_columns(&self, what: &str, n: usize) -> Result<()> {
        if n != self.action_space.n() {
            return Err(ArmoryError::DimensionMismatch {
                what: what.to_string(),
                expected: self.action_space.n(),
                actual: n,
            }
            .into());
        }
        Ok(())
    }
}

/// Chooses actions from the scores of a policy learner.
pub trait ExplorationModule: Compare {
    /// Returns one action index per batch row.
    fn act(&mut self, input: &ExplorationInput, rng: &mut SmallRng) -> Result<Vec<usize>>;

    /// Clears transient state, such as step counters.
    fn reset(&mut self) {}
}

/// Index of the largest element, the first one on ties. NaN is never chosen
/// over a number.
pub(crate) fn argmax(row: ArrayView1<f64>) -> usize {
    let mut best = 0;
    for (i, v) in row.iter().enumerate() {
        if *v > row[best] || (row[best].is_nan() && !v.is_nan()) {
            best = i;
        }
    }
    best
}

pub(crate) fn argmax_rows(a: &Array2<f64>) -> Vec<usize> {
    a.rows().into_iter().map(argmax).collect()
}

/// Uniformly random actions.
pub(crate) fn random_actions(batch_size: usize, n: usize, rng: &mut SmallRng) -> Vec<usize> {
    (0..batch_size).map(|_| rng.gen_range(0..n)).collect()
}
