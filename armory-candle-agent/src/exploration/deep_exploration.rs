use super::{argmax, ExplorationInput, ExplorationModule};
use crate::{
    action_representation::ActionRepresentationModule,
    network::EnsembleQValueNetwork,
    util::{batch_size, copy_params, tensor_to_array1},
};
use anyhow::Result;
use armory_core::{ArmoryError, Compare, CompareFields, Comparison};
use log::debug;
use rand::{rngs::SmallRng, Rng};

/// Deep exploration with an ensemble of value networks.
///
/// A member of the ensemble is drawn at the first action of an episode and
/// followed greedily until [`ExplorationModule::reset`].
pub struct DeepExploration {
    q_ensemble_network: EnsembleQValueNetwork,
    action_representation_module: Box<dyn ActionRepresentationModule>,
    z: Option<usize>,
}

impl DeepExploration {
    /// Explores with a member of `q_ensemble_network` drawn at the start of each episode.
    pub fn new(
        q_ensemble_network: EnsembleQValueNetwork,
        action_representation_module: Box<dyn ActionRepresentationModule>,
    ) -> Self {
        Self {
            q_ensemble_network,
            action_representation_module,
            z: None,
        }
    }

    /// Ensemble of value networks.
    pub fn q_ensemble_network(&self) -> &EnsembleQValueNetwork {
        &self.q_ensemble_network
    }

    /// Mutable access to the ensemble.
    pub fn q_ensemble_network_mut(&mut self) -> &mut EnsembleQValueNetwork {
        &mut self.q_ensemble_network
    }

    /// Representation of the actions fed to the ensemble.
    pub fn action_representation_module(&self) -> &dyn ActionRepresentationModule {
        self.action_representation_module.as_ref()
    }

    /// Overwrites the parameters of the ensemble and of the action
    /// representation with those of `other`.
    pub fn copy_params_from(&mut self, other: &Self) -> Result<()> {
        self.q_ensemble_network
            .copy_params_from(&other.q_ensemble_network)?;
        match (
            self.action_representation_module.varmap(),
            other.action_representation_module.varmap(),
        ) {
            (Some(dest), Some(src)) => copy_params(dest, src),
            (None, None) => Ok(()),
            _ => Err(ArmoryError::MissingParameter(
                "action_representation_module".to_string(),
            )
            .into()),
        }
    }
}

impl ExplorationModule for DeepExploration {
    fn act(&mut self, input: &ExplorationInput, rng: &mut SmallRng) -> Result<Vec<usize>> {
        let state = input
            .state
            .ok_or(ArmoryError::MissingExplorationInput("state"))?;
        let z = match self.z {
            Some(z) => z,
            None => {
                let z = rng.gen_range(0..self.q_ensemble_network.ensemble_size().max(1));
                debug!("DeepExploration: follow ensemble member {}", z);
                self.z = Some(z);
                z
            }
        };

        let n = input.action_space.n();
        let actions = self
            .action_representation_module
            .represent(&input.action_space.to_tensor()?)?;
        (0..batch_size(state, "state")?)
            .map(|b| -> Result<usize> {
                let s = state.get(b)?.unsqueeze(0)?.repeat((n, 1))?;
                let q = self.q_ensemble_network.get_q_values(&s, &actions, z)?;
                Ok(argmax(tensor_to_array1(&q)?.view()))
            })
            .collect()
    }

    fn reset(&mut self) {
        self.z = None;
    }
}

impl CompareFields for DeepExploration {
    const KIND: &'static str = "DeepExploration";

    fn compare_fields(&self, other: &Self, cmp: &mut Comparison) {
        cmp.nested(
            "q_ensemble_network",
            &self.q_ensemble_network,
            &other.q_ensemble_network,
        )
        .nested(
            "action_representation_module",
            self.action_representation_module.as_compare(),
            other.action_representation_module.as_compare(),
        );
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        action_representation::{LinearActionRepresentation, OneHotActionRepresentation},
        action_space::DiscreteActionSpace,
        network::EnsembleQValueNetworkConfig,
    };
    use armory_core::Compare;
    use candle_core::{Device, Tensor};
    use rand::SeedableRng;

    fn q_network() -> Result<EnsembleQValueNetwork> {
        let config = EnsembleQValueNetworkConfig {
            state_dim: 10,
            action_dim: 3,
            hidden_dims: vec![32, 16],
            output_dim: 1,
            ensemble_size: 5,
        };
        EnsembleQValueNetwork::build(config, &Device::Cpu)
    }

    #[test]
    fn test_act() -> Result<()> {
        let mut rng = SmallRng::seed_from_u64(0);
        let space = DiscreteActionSpace::from_indices(3, &Device::Cpu)?;
        let state = Tensor::randn(0f32, 1f32, (4, 10), &Device::Cpu)?;
        let mut m = DeepExploration::new(
            q_network()?,
            Box::new(OneHotActionRepresentation::new(3)),
        );
        let input = ExplorationInput::new(&space).state(&state);
        let actions = m.act(&input, &mut rng)?;
        assert_eq!(actions.len(), 4);
        assert!(actions.iter().all(|a| *a < 3));
        assert_eq!(m.act(&input, &mut rng)?, actions);

        assert!(m.act(&ExplorationInput::new(&space), &mut rng).is_err());
        Ok(())
    }

    #[test]
    fn test_copy_params_from() -> Result<()> {
        let m1 = DeepExploration::new(
            q_network()?,
            Box::new(LinearActionRepresentation::build(3, 3, &Device::Cpu)?),
        );
        let mut m2 = DeepExploration::new(
            q_network()?,
            Box::new(LinearActionRepresentation::build(3, 3, &Device::Cpu)?),
        );
        assert!(m1.compare(&m1).is_empty());
        let diffs = m1.compare(&m2);
        assert!(diffs.mentions("q_ensemble_network.model"));
        assert!(diffs.mentions("action_representation_module.parameters"));

        m2.copy_params_from(&m1)?;
        assert!(m1.compare(&m2).is_empty());

        let m3 = DeepExploration::new(q_network()?, Box::new(OneHotActionRepresentation::new(3)));
        assert!(m1.compare(&m3).mentions("action_representation_module.kind"));
        Ok(())
    }
}
