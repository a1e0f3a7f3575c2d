use crate::{
    action_space::DiscreteActionSpace,
    batch::TransitionBatch,
    exploration::{ExplorationInput, ExplorationModule},
    network::LinearRegression,
};
use anyhow::Result;
use armory_core::{record::Record, ArmoryError, Compare};
use candle_core::{DType, Tensor, D};
use ndarray::{Array2, Array3};
use rand::rngs::SmallRng;

/// Scores of every action in a batch of states.
#[derive(Debug, Clone)]
pub struct Scores {
    /// Estimated rewards, `(batch, n_actions)`.
    pub values: Array2<f64>,

    /// Uncertainty of the estimates, if the learner has a model of it.
    pub uncertainty: Option<Array2<f64>>,

    /// Features read by `regressions`, `(batch, n_actions, dim)`.
    pub features: Array3<f64>,

    /// Regression models behind the values: one shared or one per action.
    pub regressions: Vec<LinearRegression>,
}

/// Features of every action: `(batch, n_actions, feature_dim)`.
///
/// If `state_features_only`, the features are the state; otherwise the state
/// followed by the action tensor.
pub fn all_action_features(
    state: &Tensor,
    action_space: &DiscreteActionSpace,
    state_features_only: bool,
) -> Result<Tensor> {
    let state = state.to_dtype(DType::F32)?;
    let (batch_size, state_dim) = state.dims2()?;
    let n = action_space.n();
    let states = state.unsqueeze(1)?.broadcast_as((batch_size, n, state_dim))?;
    if state_features_only {
        return Ok(states.contiguous()?);
    }

    let actions = action_space.to_tensor()?.to_device(state.device())?;
    let actions = actions
        .unsqueeze(0)?
        .broadcast_as((batch_size, n, action_space.action_dim()))?;
    Ok(Tensor::cat(&[states.contiguous()?, actions.contiguous()?], D::Minus1)?)
}

/// Features of the actions played: `(batch, feature_dim)`.
pub fn played_features(
    state: &Tensor,
    actions: &[usize],
    action_space: &DiscreteActionSpace,
    state_features_only: bool,
) -> Result<Tensor> {
    action_space.check_actions(actions)?;
    let state = state.to_dtype(DType::F32)?;
    if state_features_only {
        return Ok(state);
    }

    let ixs = actions.iter().map(|a| *a as u32).collect::<Vec<_>>();
    let ixs = Tensor::new(ixs.as_slice(), state.device())?;
    let played = action_space
        .to_tensor()?
        .to_device(state.device())?
        .index_select(&ixs, 0)?;
    Ok(Tensor::cat(&[state, played], D::Minus1)?)
}

fn check_feature_dim(features: &Tensor, feature_dim: usize) -> Result<()> {
    let actual = features.dims().last().copied().unwrap_or(0);
    if actual != feature_dim {
        return Err(ArmoryError::DimensionMismatch {
            what: "bandit features".to_string(),
            expected: feature_dim,
            actual,
        }
        .into());
    }
    Ok(())
}

/// A contextual bandit policy learner.
///
/// Implementors provide scoring and learning on precomputed features; feature
/// construction, acting and learning from raw batches are provided.
pub trait ContextualBandit: Compare {
    /// Number of features of a (state, action) pair.
    fn feature_dim(&self) -> usize;

    /// Whether features are made of the state only.
    fn state_features_only(&self) -> bool;

    /// Sets whether features are made of the state only.
    fn set_state_features_only(&mut self, v: bool);

    /// Module turning scores into actions.
    fn exploration_module(&self) -> &dyn ExplorationModule;

    /// Mutable access to the exploration module.
    fn exploration_module_mut(&mut self) -> &mut dyn ExplorationModule;

    /// Scores features of shape `(batch, n_actions, feature_dim)`.
    fn score_features(&self, features: &Tensor) -> Result<Scores>;

    /// Learns from the features of the played actions, `(batch, feature_dim)`,
    /// and the rewards of `batch`.
    fn learn_features(&mut self, features: &Tensor, batch: &TransitionBatch) -> Result<Record>;

    /// Learns from a batch of interactions.
    fn learn_batch(
        &mut self,
        batch: &TransitionBatch,
        action_space: &DiscreteActionSpace,
    ) -> Result<Record> {
        let features = played_features(
            &batch.state,
            &batch.action,
            action_space,
            self.state_features_only(),
        )?;
        check_feature_dim(&features, self.feature_dim())?;
        self.learn_features(&features, batch)
    }

    /// Scores every action in the states of shape `(batch, state_dim)`.
    fn get_scores(&self, state: &Tensor, action_space: &DiscreteActionSpace) -> Result<Scores> {
        let features = all_action_features(state, action_space, self.state_features_only())?;
        check_feature_dim(&features, self.feature_dim())?;
        self.score_features(&features)
    }

    /// Chooses one action per state with the exploration module.
    fn act(
        &mut self,
        state: &Tensor,
        action_space: &DiscreteActionSpace,
        rng: &mut SmallRng,
    ) -> Result<Vec<usize>> {
        let scores = self.get_scores(state, action_space)?;
        let regressions = scores.regressions.iter().collect::<Vec<_>>();
        let mut input = ExplorationInput::new(action_space)
            .values(&scores.values)
            .features(&scores.features)
            .state(state);
        if let Some(u) = &scores.uncertainty {
            input = input.uncertainty(u);
        }
        if !regressions.is_empty() {
            input = input.regressions(&regressions);
        }
        self.exploration_module_mut().act(&input, rng)
    }
}
