use super::{ContextualBandit, Scores};
use crate::{
    batch::TransitionBatch,
    exploration::ExplorationModule,
    network::{LinearRegression, LinearRegressionConfig},
    util::{tensor_to_array1, tensor_to_array2, tensor_to_array3},
};
use anyhow::Result;
use armory_core::{record::Record, Compare, CompareFields, Comparison, ConfigFile};
use candle_core::Tensor;
use log::debug;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
/// Configuration of [`LinearBandit`].
pub struct LinearBanditConfig {
    /// Configuration of the model.
    pub model_config: LinearRegressionConfig,

    /// Sample weight learned between two discountings of the model; `0` disables discounting.
    pub apply_discounting_interval: f64,

    /// If `true`, actions are not part of the features.
    pub state_features_only: bool,
}

impl LinearBanditConfig {
    /// Default configuration for `feature_dim` features.
    pub fn new(feature_dim: usize) -> Self {
        Self {
            model_config: LinearRegressionConfig::new(feature_dim),
            apply_discounting_interval: 0.0,
            state_features_only: false,
        }
    }

    /// Sets the L2 regularization strength.
    pub fn l2_reg_lambda(mut self, v: f64) -> Self {
        self.model_config = self.model_config.l2_reg_lambda(v);
        self
    }

    /// Sets the discount factor.
    pub fn gamma(mut self, v: f64) -> Self {
        self.model_config = self.model_config.gamma(v);
        self
    }

    /// Sets the discounting interval.
    pub fn apply_discounting_interval(mut self, v: f64) -> Self {
        self.apply_discounting_interval = v;
        self
    }

    /// Sets whether actions are left out of the features.
    pub fn state_features_only(mut self, v: bool) -> Self {
        self.state_features_only = v;
        self
    }
}

impl ConfigFile for LinearBanditConfig {}

/// Bandit with a single linear regression over (state, action) features.
pub struct LinearBandit {
    feature_dim: usize,
    state_features_only: bool,
    apply_discounting_interval: f64,
    model: LinearRegression,
    exploration_module: Box<dyn ExplorationModule>,
    last_sum_weight_when_discounted: f64,
}

impl LinearBandit {
    /// Creates the bandit.
    pub fn build(config: LinearBanditConfig, exploration_module: Box<dyn ExplorationModule>) -> Self {
        Self {
            feature_dim: config.model_config.feature_dim,
            state_features_only: config.state_features_only,
            apply_discounting_interval: config.apply_discounting_interval,
            model: LinearRegression::build(config.model_config),
            exploration_module,
            last_sum_weight_when_discounted: 0.0,
        }
    }

    /// The value model.
    pub fn model(&self) -> &LinearRegression {
        &self.model
    }

    /// Mutable access to the value model.
    pub fn model_mut(&mut self) -> &mut LinearRegression {
        &mut self.model
    }

    /// Sets the discounting interval.
    pub fn set_apply_discounting_interval(&mut self, v: f64) {
        self.apply_discounting_interval = v;
    }
}

impl ContextualBandit for LinearBandit {
    fn feature_dim(&self) -> usize {
        self.feature_dim
    }

    fn state_features_only(&self) -> bool {
        self.state_features_only
    }

    fn set_state_features_only(&mut self, v: bool) {
        self.state_features_only = v;
    }

    fn exploration_module(&self) -> &dyn ExplorationModule {
        self.exploration_module.as_ref()
    }

    fn exploration_module_mut(&mut self) -> &mut dyn ExplorationModule {
        self.exploration_module.as_mut()
    }

    fn score_features(&self, features: &Tensor) -> Result<Scores> {
        let features = tensor_to_array3(features)?;
        let (batch_size, n, d) = features.dim();
        let x = features.clone().into_shape((batch_size * n, d))?;
        let values = self.model.predict_arrays(&x)?.into_shape((batch_size, n))?;
        let uncertainty = self.model.calculate_sigma(&x)?.into_shape((batch_size, n))?;

        Ok(Scores {
            values,
            uncertainty: Some(uncertainty),
            features,
            regressions: vec![self.model.clone()],
        })
    }

    fn learn_features(&mut self, features: &Tensor, batch: &TransitionBatch) -> Result<Record> {
        let x = tensor_to_array2(features)?;
        let y = tensor_to_array1(&batch.reward)?;
        let weight = match &batch.weight {
            Some(w) => Some(tensor_to_array1(w)?),
            None => None,
        };
        self.model.learn_arrays(&x, &y, weight.as_ref())?;

        let sum_weight = self.model.sum_weight();
        if self.apply_discounting_interval > 0.0
            && sum_weight - self.last_sum_weight_when_discounted >= self.apply_discounting_interval
        {
            debug!("LinearBandit: discount at sum_weight = {}", sum_weight);
            self.model.apply_discounting()?;
            self.last_sum_weight_when_discounted = self.model.sum_weight();
        }

        Ok(Record::from_scalar(
            "sum_weight",
            self.model.sum_weight() as f32,
        ))
    }
}

impl CompareFields for LinearBandit {
    const KIND: &'static str = "LinearBandit";

    fn compare_fields(&self, other: &Self, cmp: &mut Comparison) {
        cmp.field("feature_dim", &self.feature_dim, &other.feature_dim)
            .field(
                "state_features_only",
                &self.state_features_only,
                &other.state_features_only,
            )
            .field(
                "apply_discounting_interval",
                &self.apply_discounting_interval,
                &other.apply_discounting_interval,
            )
            .nested("model", &self.model, &other.model)
            .nested(
                "exploration_module",
                self.exploration_module.as_compare(),
                other.exploration_module.as_compare(),
            );
    }
}
