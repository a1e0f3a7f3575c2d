use super::{ContextualBandit, Scores};
use crate::{
    batch::TransitionBatch,
    exploration::ExplorationModule,
    mlp::{Mlp, MlpConfig},
    model::SubModel1,
    opt::{Optimizer, OptimizerConfig},
    util::{compare_varmaps, copy_params, tensor_to_array1, tensor_to_array3, LossType},
};
use anyhow::Result;
use armory_core::{record::Record, Compare, CompareFields, Comparison, ConfigFile};
use candle_core::{DType, Device, Tensor, D};
use candle_nn::{VarBuilder, VarMap};
use log::{info, trace};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
/// Configuration of [`NeuralBandit`].
pub struct NeuralBanditConfig {
    /// Number of input features.
    pub feature_dim: usize,
    /// Sizes of the hidden layers.
    pub hidden_dims: Vec<usize>,
    /// Training loss.
    pub loss_type: LossType,
    /// Optimizer of the network.
    pub opt_config: OptimizerConfig,
    /// If `true`, actions are not part of the features.
    pub state_features_only: bool,
}

impl NeuralBanditConfig {
    /// Default configuration for the given layer sizes.
    pub fn new(feature_dim: usize, hidden_dims: Vec<usize>) -> Self {
        Self {
            feature_dim,
            hidden_dims,
            loss_type: LossType::Mse,
            opt_config: OptimizerConfig::default(),
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

    /// Sets the learning rate of the optimizer.
    pub fn learning_rate(mut self, v: f64) -> Self {
        self.opt_config = self.opt_config.learning_rate(v);
        self
    }

    /// Sets whether actions are left out of the features.
    pub fn state_features_only(mut self, v: bool) -> Self {
        self.state_features_only = v;
        self
    }
}

impl ConfigFile for NeuralBanditConfig {}

/// Bandit whose reward model is an MLP trained by gradient descent.
///
/// The model gives no uncertainty estimate, so it goes with exploration
/// modules that only read values, such as epsilon-greedy.
pub struct NeuralBandit {
    feature_dim: usize,
    hidden_dims: Vec<usize>,
    loss_type: LossType,
    opt_config: OptimizerConfig,
    state_features_only: bool,
    device: Device,
    varmap: VarMap,
    model: Mlp,
    opt: Optimizer,
    exploration_module: Box<dyn ExplorationModule>,
}

impl NeuralBandit {
    /// Constructs the bandit with a randomly initialized model.
    pub fn build(
        config: NeuralBanditConfig,
        exploration_module: Box<dyn ExplorationModule>,
        device: &Device,
    ) -> Result<Self> {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, device);
        let mlp_config = MlpConfig::new(config.feature_dim, config.hidden_dims.clone(), 1, false);
        let model = Mlp::build(vb, mlp_config)?;
        let opt = config.opt_config.build(varmap.all_vars())?;

        Ok(Self {
            feature_dim: config.feature_dim,
            hidden_dims: config.hidden_dims,
            loss_type: config.loss_type,
            opt_config: config.opt_config,
            state_features_only: config.state_features_only,
            device: device.clone(),
            varmap,
            model,
            opt,
            exploration_module,
        })
    }

    /// Training loss.
    pub fn loss_type(&self) -> LossType {
        self.loss_type
    }

    /// Sets the training loss.
    pub fn set_loss_type(&mut self, loss_type: LossType) {
        self.loss_type = loss_type;
    }

    /// Parameters of the reward model.
    pub fn varmap(&self) -> &VarMap {
        &self.varmap
    }

    /// Overwrites the parameters of the reward model with those of `other`.
    pub fn copy_params_from(&mut self, other: &Self) -> Result<()> {
        copy_params(&self.varmap, &other.varmap)
    }

    /// Predicted rewards of features of shape `(batch, feature_dim)`.
    pub fn predict(&self, features: &Tensor) -> Result<Tensor> {
        let xs = features.to_device(&self.device)?.to_dtype(DType::F32)?;
        Ok(self.model.forward(&xs)?.squeeze(D::Minus1)?)
    }

    /// Saves the parameters of the reward model.
    pub fn save<T: AsRef<Path>>(&self, path: T) -> Result<()> {
        self.varmap.save(&path)?;
        info!("Save neural bandit to {:?}", path.as_ref());
        Ok(())
    }

    /// Loads the parameters of the reward model.
    pub fn load<T: AsRef<Path>>(&mut self, path: T) -> Result<()> {
        self.varmap.load(&path)?;
        info!("Load neural bandit from {:?}", path.as_ref());
        Ok(())
    }
}

impl ContextualBandit for NeuralBandit {
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
        let (batch_size, n, d) = features.dims3()?;
        let values = self.predict(&features.reshape((batch_size * n, d))?)?;
        let values = tensor_to_array1(&values)?.into_shape((batch_size, n))?;

        Ok(Scores {
            values,
            uncertainty: None,
            features: tensor_to_array3(features)?,
            regressions: vec![],
        })
    }

    fn learn_features(&mut self, features: &Tensor, batch: &TransitionBatch) -> Result<Record> {
        let pred = self.predict(features)?;
        let reward = batch.reward.to_device(&self.device)?.to_dtype(DType::F32)?;
        let loss = self.loss_type.loss(&pred, &reward, batch.weight.as_ref())?;
        self.opt.backward_step(&loss)?;

        let loss = loss.to_scalar::<f32>()?;
        trace!("NeuralBandit: loss = {}", loss);
        Ok(Record::from_scalar("loss", loss))
    }
}

impl CompareFields for NeuralBandit {
    const KIND: &'static str = "NeuralBandit";

    fn compare_fields(&self, other: &Self, cmp: &mut Comparison) {
        cmp.field("feature_dim", &self.feature_dim, &other.feature_dim)
            .field("hidden_dims", &self.hidden_dims, &other.hidden_dims)
            .field("loss_type", &self.loss_type, &other.loss_type)
            .field("opt_config", &self.opt_config, &other.opt_config)
            .field(
                "state_features_only",
                &self.state_features_only,
                &other.state_features_only,
            );
        compare_varmaps(cmp, "model", &self.varmap, &other.varmap);
        cmp.nested(
            "exploration_module",
            self.exploration_module.as_compare(),
            other.exploration_module.as_compare(),
        );
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        action_space::DiscreteActionSpace,
        exploration::{EGreedyExploration, UcbExploration},
    };
    use armory_core::Compare;
    use rand::{rngs::SmallRng, SeedableRng};

    fn bandit() -> Result<NeuralBandit> {
        let config = NeuralBanditConfig::new(3, vec![16, 8]).learning_rate(0.01);
        NeuralBandit::build(config, Box::new(EGreedyExploration::new(0.0)), &Device::Cpu)
    }

    #[test]
    fn test_learn_reduces_loss() -> Result<()> {
        let space = DiscreteActionSpace::from_indices(2, &Device::Cpu)?;
        let mut b = bandit()?;
        let state = Tensor::randn(0f32, 1f32, (32, 2), &Device::Cpu)?;
        let action = (0..32).map(|i| i % 2).collect::<Vec<_>>();
        let reward = Tensor::from_vec(
            action.iter().map(|a| *a as f32).collect::<Vec<_>>(),
            32,
            &Device::Cpu,
        )?;
        let batch = TransitionBatch::new(state, action, reward)?;

        let first = b.learn_batch(&batch, &space)?.get_scalar("loss")?;
        let mut last = first;
        for _ in 0..200 {
            last = b.learn_batch(&batch, &space)?.get_scalar("loss")?;
        }
        assert!(last < first, "{} >= {}", last, first);

        let mut rng = SmallRng::seed_from_u64(0);
        let query = Tensor::zeros((3, 2), DType::F32, &Device::Cpu)?;
        assert_eq!(b.act(&query, &space, &mut rng)?.len(), 3);
        assert_eq!(b.get_scores(&query, &space)?.values.dim(), (3, 2));
        Ok(())
    }

    #[test]
    fn test_compare() -> Result<()> {
        let config = NeuralBanditConfig::new(10, vec![32, 16]);
        let b1 = NeuralBandit::build(
            config.clone(),
            Box::new(UcbExploration::new(1.0)),
            &Device::Cpu,
        )?;
        let mut b2 = NeuralBandit::build(config, Box::new(UcbExploration::new(1.0)), &Device::Cpu)?;
        assert!(b1.compare(&b1).is_empty());
        assert!(b1.compare(&b2).mentions("model.mlp"));

        b2.copy_params_from(&b1)?;
        assert!(b1.compare(&b2).is_empty());

        b2.set_loss_type("mae".parse()?);
        assert_eq!(b1.compare(&b2).to_string(), "loss_type: Mse != Mae");
        Ok(())
    }
}
