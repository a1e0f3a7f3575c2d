use super::{ContextualBandit, Scores};
use crate::{batch::TransitionBatch, exploration::ExplorationModule, util::tensor_to_array3};
use anyhow::Result;
use armory_core::{record::Record, ArmoryError, Compare, CompareFields, Comparison};
use candle_core::Tensor;
use ndarray::{concatenate, Array2, Array3, ArrayView2, ArrayView3, Axis};

/// Bandit made of one sub-bandit per action.
///
/// Arm `a` scores and learns from the features of action `a` only. Features
/// are built by the container according to its own `state_features_only`.
pub struct DisjointBanditContainer {
    feature_dim: usize,
    state_features_only: bool,
    arm_bandits: Vec<Box<dyn ContextualBandit>>,
    exploration_module: Box<dyn ExplorationModule>,
}

impl DisjointBanditContainer {
    /// Creates a container; features are made of the state only.
    pub fn new(
        feature_dim: usize,
        arm_bandits: Vec<Box<dyn ContextualBandit>>,
        exploration_module: Box<dyn ExplorationModule>,
    ) -> Self {
        Self {
            feature_dim,
            state_features_only: true,
            arm_bandits,
            exploration_module,
        }
    }

    /// Number of arms.
    pub fn n_arms(&self) -> usize {
        self.arm_bandits.len()
    }

    /// Learner of each arm.
    pub fn arm_bandits(&self) -> &[Box<dyn ContextualBandit>] {
        &self.arm_bandits
    }

    /// Mutable access to the learner of each arm.
    pub fn arm_bandits_mut(&mut self) -> &mut [Box<dyn ContextualBandit>] {
        &mut self.arm_bandits
    }
}

impl ContextualBandit for DisjointBanditContainer {
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
        let (_, n, _) = features.dims3()?;
        if n != self.n_arms() {
            return Err(ArmoryError::DimensionMismatch {
                what: "arms of DisjointBanditContainer".to_string(),
                expected: self.n_arms(),
                actual: n,
            }
            .into());
        }

        let arm_scores = self
            .arm_bandits
            .iter()
            .enumerate()
            .map(|(a, arm)| -> Result<Scores> { arm.score_features(&features.narrow(1, a, 1)?) })
            .collect::<Result<Vec<_>>>()?;

        let values = arm_scores
            .iter()
            .map(|s| s.values.view())
            .collect::<Vec<ArrayView2<f64>>>();
        let values: Array2<f64> = concatenate(Axis(1), &values)?;

        let uncertainty = match arm_scores.iter().all(|s| s.uncertainty.is_some()) {
            true => {
                let u = arm_scores
                    .iter()
                    .filter_map(|s| s.uncertainty.as_ref().map(|u| u.view()))
                    .collect::<Vec<_>>();
                Some(concatenate(Axis(1), &u)?)
            }
            false => None,
        };

        // Per-arm regressions are exposed only if every arm has exactly one.
        let (features, regressions) = match arm_scores.iter().all(|s| s.regressions.len() == 1) {
            true => {
                let f = arm_scores
                    .iter()
                    .map(|s| s.features.view())
                    .collect::<Vec<ArrayView3<f64>>>();
                let features: Array3<f64> = concatenate(Axis(1), &f)?;
                let regressions = arm_scores
                    .iter()
                    .flat_map(|s| s.regressions.iter().cloned())
                    .collect();
                (features, regressions)
            }
            false => (tensor_to_array3(features)?, vec![]),
        };

        Ok(Scores {
            values,
            uncertainty,
            features,
            regressions,
        })
    }

    fn learn_features(&mut self, features: &Tensor, batch: &TransitionBatch) -> Result<Record> {
        if let Some(&action) = batch.action.iter().find(|&&a| a >= self.n_arms()) {
            return Err(ArmoryError::InvalidAction {
                action,
                n: self.n_arms(),
            }
            .into());
        }

        let mut record = Record::empty();
        for (a, arm) in self.arm_bandits.iter_mut().enumerate() {
            let sub_batch = match batch.select_action(a)? {
                Some(b) => b,
                None => continue,
            };
            let rows = batch
                .action
                .iter()
                .enumerate()
                .filter(|(_, played)| **played == a)
                .map(|(i, _)| i as u32)
                .collect::<Vec<_>>();
            let ixs = Tensor::new(rows.as_slice(), features.device())?;
            let arm_record = arm.learn_features(&features.index_select(&ixs, 0)?, &sub_batch)?;
            record.merge_prefixed(&format!("arm{}", a), arm_record);
        }
        Ok(record)
    }
}

impl CompareFields for DisjointBanditContainer {
    const KIND: &'static str = "DisjointBanditContainer";

    fn compare_fields(&self, other: &Self, cmp: &mut Comparison) {
        let lhs = self
            .arm_bandits
            .iter()
            .map(|b| b.as_compare())
            .collect::<Vec<_>>();
        let rhs = other
            .arm_bandits
            .iter()
            .map(|b| b.as_compare())
            .collect::<Vec<_>>();

        cmp.field("feature_dim", &self.feature_dim, &other.feature_dim)
            .field(
                "state_features_only",
                &self.state_features_only,
                &other.state_features_only,
            )
            .sequence("arm_bandits", &lhs, &rhs)
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
    use crate::{
        action_space::DiscreteActionSpace,
        bandit::{LinearBandit, LinearBanditConfig},
        exploration::{NoExploration, ThompsonSamplingExplorationLinearDisjoint, UcbExploration},
    };
    use candle_core::{DType, Device};
    use rand::{rngs::SmallRng, SeedableRng};

    fn container(exploration_module: Box<dyn ExplorationModule>) -> DisjointBanditContainer {
        let arms = (0..3)
            .map(|_| {
                Box::new(LinearBandit::build(
                    LinearBanditConfig::new(2).l2_reg_lambda(0.01),
                    Box::new(UcbExploration::new(1.0)),
                )) as Box<dyn ContextualBandit>
            })
            .collect();
        DisjointBanditContainer::new(2, arms, exploration_module)
    }

    #[test]
    fn test_learn_and_act() -> Result<()> {
        let mut rng = SmallRng::seed_from_u64(0);
        let space = DiscreteActionSpace::from_indices(3, &Device::Cpu)?;
        let mut c = container(Box::new(NoExploration::new()));

        // Arm 2 always pays 1, the others 0.
        let state = Tensor::randn(0f32, 1f32, (30, 2), &Device::Cpu)?;
        let action = (0..30).map(|i| i % 3).collect::<Vec<_>>();
        let reward = Tensor::from_vec(
            action.iter().map(|a| (*a == 2) as u8 as f32).collect::<Vec<_>>(),
            30,
            &Device::Cpu,
        )?;
        let record = c.learn_batch(&TransitionBatch::new(state, action, reward)?, &space)?;
        assert_eq!(record.get_scalar("arm1/sum_weight")?, 10.0);

        let query = Tensor::zeros((2, 2), DType::F32, &Device::Cpu)?;
        assert_eq!(c.act(&query, &space, &mut rng)?, vec![2, 2]);

        let mut c = container(Box::new(ThompsonSamplingExplorationLinearDisjoint::new(true)));
        assert_eq!(c.act(&query, &space, &mut rng)?.len(), 2);
        Ok(())
    }

    #[test]
    fn test_learn_rejects_actions_without_arm() -> Result<()> {
        let space = DiscreteActionSpace::from_indices(3, &Device::Cpu)?;
        let mut c = container(Box::new(NoExploration::new()));
        let state = Tensor::ones((2, 2), DType::F32, &Device::Cpu)?;
        let reward = Tensor::ones(2, DType::F32, &Device::Cpu)?;
        let batch = TransitionBatch::new(state.clone(), vec![5, 7], reward)?;
        assert!(c.learn_batch(&batch, &space).is_err());

        // Features built by the caller bypass the action space.
        let reward = Tensor::ones(2, DType::F32, &Device::Cpu)?;
        let batch = TransitionBatch::new(state.clone(), vec![0, 3], reward)?;
        assert!(c.learn_features(&state, &batch).is_err());

        let fresh = container(Box::new(NoExploration::new()));
        assert!(c.compare(&fresh).is_empty());
        Ok(())
    }

    #[test]
    fn test_compare_propagates_to_arms() -> Result<()> {
        let c1 = container(Box::new(NoExploration::new()));
        let mut c2 = container(Box::new(NoExploration::new()));
        assert!(c1.compare(&c1).is_empty());
        assert!(c1.compare(&c2).is_empty());

        c2.set_state_features_only(false);
        if let Some(arm) = c2.arm_bandits_mut()[0]
            .as_any_mut()
            .downcast_mut::<LinearBandit>()
        {
            arm.model_mut().set_gamma(0.9);
        }
        assert_eq!(
            c1.compare(&c2).to_string(),
            "state_features_only: true != false\narm_bandits[0].model.gamma: 1.0 != 0.9"
        );
        Ok(())
    }
}
