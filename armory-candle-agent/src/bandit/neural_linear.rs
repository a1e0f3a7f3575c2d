use super::{ContextualBandit, Scores};
use crate::{
    batch::TransitionBatch,
    exploration::ExplorationModule,
    network::{NeuralLinearRegression, NeuralLinearRegressionConfig},
    opt::{Optimizer, OptimizerConfig},
    util::{tensor_to_array2, LossType},
};
use anyhow::Result;
use armory_core::{
    record::{Record, RecordValue},
    Compare, CompareFields, Comparison, ConfigFile,
};
use candle_core::{DType, Device, Tensor};
use log::{debug, trace};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
/// Configuration of [`NeuralLinearBandit`].
pub struct NeuralLinearBanditConfig {
    /// Configuration of the model.
    pub model_config: NeuralLinearRegressionConfig,
    /// Training loss.
    pub loss_type: LossType,
    /// Optimizer of the network.
    pub opt_config: OptimizerConfig,

    /// Sample weight learned between two discountings of the linear layer; `0` disables discounting.
    pub apply_discounting_interval: f64,

    /// If `true`, actions are not part of the features.
    pub state_features_only: bool,
}

impl NeuralLinearBanditConfig {
    /// Default configuration for the given layer sizes.
    pub fn new(feature_dim: usize, hidden_dims: Vec<usize>) -> Self {
        Self {
            model_config: NeuralLinearRegressionConfig::new(feature_dim, hidden_dims),
            loss_type: LossType::Mse,
            opt_config: OptimizerConfig::default(),
            apply_discounting_interval: 0.0,
            state_features_only: false,
        }
    }

    /// Sets the training loss.
    pub fn loss_type(mut self, v: LossType) -> Self {
        self.loss_type = v;
        self
    }

    /// Sets the optimizer.
    pub fn opt_config(mut self, v: OptimizerConfig) -> Self {
        self.opt_config = v;
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

impl ConfigFile for NeuralLinearBanditConfig {}

/// Bandit scoring actions with a linear regression on learned neural features.
///
/// Values and uncertainty come from the linear layer, so UCB and Thompson
/// sampling apply as with [`LinearBandit`](super::LinearBandit).
pub struct NeuralLinearBandit {
    loss_type: LossType,
    opt_config: OptimizerConfig,
    apply_discounting_interval: f64,
    state_features_only: bool,
    model: NeuralLinearRegression,
    opt: Optimizer,
    exploration_module: Box<dyn ExplorationModule>,
    last_sum_weight_when_discounted: f64,
}

impl NeuralLinearBandit {
    /// Constructs the bandit with a randomly initialized network.
    pub fn build(
        config: NeuralLinearBanditConfig,
        exploration_module: Box<dyn ExplorationModule>,
        device: &Device,
    ) -> Result<Self> {
        let model = NeuralLinearRegression::build(config.model_config, device)?;
        let opt = config.opt_config.build(model.varmap().all_vars())?;

        Ok(Self {
            loss_type: config.loss_type,
            opt_config: config.opt_config,
            apply_discounting_interval: config.apply_discounting_interval,
            state_features_only: config.state_features_only,
            model,
            opt,
            exploration_module,
            last_sum_weight_when_discounted: 0.0,
        })
    }

    /// The value model.
    pub fn model(&self) -> &NeuralLinearRegression {
        &self.model
    }

    /// Mutable access to the value model.
    pub fn model_mut(&mut self) -> &mut NeuralLinearRegression {
        &mut self.model
    }

    /// Training loss.
    pub fn loss_type(&self) -> LossType {
        self.loss_type
    }

    /// Sets the training loss.
    pub fn set_loss_type(&mut self, loss_type: LossType) {
        self.loss_type = loss_type;
    }

    /// Copies the learned state of the model of `other`.
    pub fn load_state_from(&mut self, other: &Self) -> Result<()> {
        self.model.load_state_from(&other.model)
    }
}

impl ContextualBandit for NeuralLinearBandit {
    fn feature_dim(&self) -> usize {
        self.model.feature_dim()
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
        let (batch_size, n, d) = features.dims3()?;
        let nn_features = self
            .model
            .features(&features.reshape((batch_size * n, d))?)?
            .detach();
        let x = tensor_to_array2(&nn_features)?;
        let lr = self.model.linear_regression_layer();
        let values = lr.predict_arrays(&x)?.into_shape((batch_size, n))?;
        let uncertainty = lr.calculate_sigma(&x)?.into_shape((batch_size, n))?;
        let h = x.ncols();

        Ok(Scores {
            values,
            uncertainty: Some(uncertainty),
            features: x.into_shape((batch_size, n, h))?,
            regressions: vec![lr.clone()],
        })
    }

    fn learn_features(&mut self, features: &Tensor, batch: &TransitionBatch) -> Result<Record> {
        let reward = batch.reward.to_dtype(DType::F32)?;
        let weight = batch.weight.as_ref();
        let loss = self.model.loss(features, &reward, weight, self.loss_type)?;
        self.opt.backward_step(&loss)?;
        self.model.learn_linear(features, &reward, weight)?;

        let lr = self.model.linear_regression_layer_mut();
        let sum_weight = lr.sum_weight();
        if self.apply_discounting_interval > 0.0
            && sum_weight - self.last_sum_weight_when_discounted >= self.apply_discounting_interval
        {
            debug!("NeuralLinearBandit: discount at sum_weight = {}", sum_weight);
            lr.apply_discounting()?;
            self.last_sum_weight_when_discounted = lr.sum_weight();
        }

        let loss = loss.to_scalar::<f32>()?;
        trace!("NeuralLinearBandit: loss = {}", loss);
        Ok(Record::from_slice(&[
            ("loss", RecordValue::Scalar(loss)),
            ("sum_weight", RecordValue::Scalar(lr.sum_weight() as f32)),
        ]))
    }
}

impl CompareFields for NeuralLinearBandit {
    const KIND: &'static str = "NeuralLinearBandit";

    fn compare_fields(&self, other: &Self, cmp: &mut Comparison) {
        cmp.field("loss_type", &self.loss_type, &other.loss_type)
            .field("opt_config", &self.opt_config, &other.opt_config)
            .field(
                "apply_discounting_interval",
                &self.apply_discounting_interval,
                &other.apply_discounting_interval,
            )
            .field(
                "state_features_only",
                &self.state_features_only,
                &other.state_features_only,
            )
            .nested("model", &self.model, &other.model)
            .nested(
                "exploration_module",
                self.exploration_module.as_compare(),
                other.exploration_module.as_compare(),
            );
    }
}
