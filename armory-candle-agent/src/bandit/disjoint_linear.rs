use super::{ContextualBandit, Scores};
use crate::{
    action_space::DiscreteActionSpace,
    batch::TransitionBatch,
    exploration::ExplorationModule,
    network::LinearRegression,
    util::{tensor_to_array1, tensor_to_array2, tensor_to_array3},
};
use anyhow::Result;
use armory_core::{
    record::{Record, RecordValue},
    ArmoryError, Compare, CompareFields, Comparison, ConfigFile,
};
use candle_core::Tensor;
use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
/// Configuration of [`DisjointLinearBandit`].
pub struct DisjointLinearBanditConfig {
    /// Number of features.
    pub feature_dim: usize,
    /// L2 regularization strength of each model.
    pub l2_reg_lambda: f64,
    /// Discount factor of each model.
    pub gamma: f64,
    /// If `true`, actions are not part of the features.
    pub state_features_only: bool,
}

impl DisjointLinearBanditConfig {
    /// Default configuration for `feature_dim` features.
    pub fn new(feature_dim: usize) -> Self {
        Self {
            feature_dim,
            l2_reg_lambda: 1.0,
            gamma: 1.0,
            state_features_only: true,
        }
    }

    /// Sets the L2 regularization strength.
    pub fn l2_reg_lambda(mut self, v: f64) -> Self {
        self.l2_reg_lambda = v;
        self
    }

    /// Sets the discount factor.
    pub fn gamma(mut self, v: f64) -> Self {
        self.gamma = v;
        self
    }

    /// Sets whether actions are left out of the features.
    pub fn state_features_only(mut self, v: bool) -> Self {
        self.state_features_only = v;
        self
    }
}

impl ConfigFile for DisjointLinearBanditConfig {}

/// Bandit with one linear regression per action of a fixed action space.
pub struct DisjointLinearBandit {
    feature_dim: usize,
    state_features_only: bool,
    action_space: DiscreteActionSpace,
    linear_regressions: Vec<LinearRegression>,
    exploration_module: Box<dyn ExplorationModule>,
}

impl DisjointLinearBandit {
    /// Creates one regression model per action of `action_space`.
    pub fn build(
        config: DisjointLinearBanditConfig,
        action_space: DiscreteActionSpace,
        exploration_module: Box<dyn ExplorationModule>,
    ) -> Self {
        let linear_regressions = (0..action_space.n())
            .map(|_| LinearRegression::new(config.feature_dim, config.l2_reg_lambda, config.gamma))
            .collect();

        Self {
            feature_dim: config.feature_dim,
            state_features_only: config.state_features_only,
            action_space,
            linear_regressions,
            exploration_module,
        }
    }

    /// Actions with a model of their own.
    pub fn action_space(&self) -> &DiscreteActionSpace {
        &self.action_space
    }

    /// Regression model of each action.
    pub fn linear_regressions(&self) -> &[LinearRegression] {
        &self.linear_regressions
    }

    /// Mutable access to the regression models.
    pub fn linear_regressions_mut(&mut self) -> &mut [LinearRegression] {
        &mut self.linear_regressions
    }
}

impl ContextualBandit for DisjointLinearBandit {
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
        let (batch_size, n, _) = features.dim();
        if n != self.linear_regressions.len() {
            return Err(ArmoryError::DimensionMismatch {
                what: "actions of DisjointLinearBandit".to_string(),
                expected: self.linear_regressions.len(),
                actual: n,
            }
            .into());
        }

        let mut values = Array2::<f64>::zeros((batch_size, n));
        let mut uncertainty = Array2::<f64>::zeros((batch_size, n));
        for (a, lr) in self.linear_regressions.iter().enumerate() {
            let x = features.index_axis(Axis(1), a).to_owned();
            values.column_mut(a).assign(&lr.predict_arrays(&x)?);
            uncertainty.column_mut(a).assign(&lr.calculate_sigma(&x)?);
        }

        Ok(Scores {
            values,
            uncertainty: Some(uncertainty),
            features,
            regressions: self.linear_regressions.clone(),
        })
    }

    fn learn_features(&mut self, features: &Tensor, batch: &TransitionBatch) -> Result<Record> {
        self.action_space.check_actions(&batch.action)?;
        let x = tensor_to_array2(features)?;
        let y = tensor_to_array1(&batch.reward)?;
        let weight = match &batch.weight {
            Some(w) => Some(tensor_to_array1(w)?),
            None => None,
        };

        for (a, lr) in self.linear_regressions.iter_mut().enumerate() {
            let rows = batch
                .action
                .iter()
                .enumerate()
                .filter(|(_, played)| **played == a)
                .map(|(i, _)| i)
                .collect::<Vec<_>>();
            if rows.is_empty() {
                continue;
            }
            let w = weight.as_ref().map(|w| w.select(Axis(0), &rows));
            lr.learn_arrays(
                &x.select(Axis(0), &rows),
                &y.select(Axis(0), &rows),
                w.as_ref(),
            )?;
        }

        let sum_weight = self
            .linear_regressions
            .iter()
            .map(|lr| lr.sum_weight() as f32)
            .collect();
        Ok(Record::from_slice(&[(
            "sum_weight",
            RecordValue::Array1(sum_weight),
        )]))
    }
}

impl CompareFields for DisjointLinearBandit {
    const KIND: &'static str = "DisjointLinearBandit";

    fn compare_fields(&self, other: &Self, cmp: &mut Comparison) {
        let lhs = self
            .linear_regressions
            .iter()
            .map(|lr| lr as &dyn Compare)
            .collect::<Vec<_>>();
        let rhs = other
            .linear_regressions
            .iter()
            .map(|lr| lr as &dyn Compare)
            .collect::<Vec<_>>();

        cmp.field("feature_dim", &self.feature_dim, &other.feature_dim)
            .field(
                "state_features_only",
                &self.state_features_only,
                &other.state_features_only,
            )
            .nested("action_space", &self.action_space, &other.action_space)
            .sequence("linear_regressions", &lhs, &rhs)
            .nested(
                "exploration_module",
                self.exploration_module.as_compare(),
                other.exploration_module.as_compare(),
            );
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::exploration::{DisjointUcbExploration, ThompsonSamplingExplorationLinearDisjoint};
    use candle_core::Device;
    use rand::{rngs::SmallRng, SeedableRng};

    fn bandit(exploration_module: Box<dyn ExplorationModule>) -> Result<DisjointLinearBandit> {
        let space = DiscreteActionSpace::from_indices(3, &Device::Cpu)?;
        Ok(DisjointLinearBandit::build(
            DisjointLinearBanditConfig::new(2).l2_reg_lambda(0.01),
            space,
            exploration_module,
        ))
    }

    #[test]
    fn test_routes_rows_to_arms() -> Result<()> {
        let mut b = bandit(Box::new(DisjointUcbExploration::new(0.0)))?;
        let space = b.action_space().clone();
        let state = Tensor::randn(0f32, 1f32, (7, 2), &Device::Cpu)?;
        let reward = Tensor::ones(7, candle_core::DType::F32, &Device::Cpu)?;
        let batch = TransitionBatch::new(state, vec![0, 0, 0, 2, 2, 0, 0], reward)?;

        let record = b.learn_batch(&batch, &space)?;
        assert_eq!(record.get_array1("sum_weight")?, vec![5.0, 0.0, 2.0]);
        assert!(b
            .learn_batch(
                &TransitionBatch::new(
                    Tensor::zeros((1, 2), candle_core::DType::F32, &Device::Cpu)?,
                    vec![3],
                    Tensor::zeros(1, candle_core::DType::F32, &Device::Cpu)?,
                )?,
                &space
            )
            .is_err());
        Ok(())
    }

    #[test]
    fn test_act() -> Result<()> {
        let mut rng = SmallRng::seed_from_u64(0);
        for exploration_module in [
            Box::new(DisjointUcbExploration::new(1.0)) as Box<dyn ExplorationModule>,
            Box::new(ThompsonSamplingExplorationLinearDisjoint::new(true)),
            Box::new(ThompsonSamplingExplorationLinearDisjoint::new(false)),
        ] {
            let mut b = bandit(exploration_module)?;
            let space = b.action_space().clone();
            let state = Tensor::randn(0f32, 1f32, (5, 2), &Device::Cpu)?;
            let actions = b.act(&state, &space, &mut rng)?;
            assert_eq!(actions.len(), 5);
            assert!(actions.iter().all(|a| *a < 3));
        }
        Ok(())
    }

    #[test]
    fn test_compare() -> Result<()> {
        let b1 = bandit(Box::new(DisjointUcbExploration::new(1.0)))?;
        let mut b2 = bandit(Box::new(DisjointUcbExploration::new(1.0)))?;
        assert!(b1.compare(&b2).is_empty());

        b2.set_state_features_only(false);
        b2.linear_regressions_mut()[0].set_gamma(0.9);
        assert_eq!(
            b1.compare(&b2).to_string(),
            "state_features_only: true != false\nlinear_regressions[0].gamma: 1.0 != 0.9"
        );
        Ok(())
    }
}
