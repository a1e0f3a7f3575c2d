use super::{ExplorationInput, ExplorationModule};
use anyhow::Result;
use armory_core::{CompareFields, Comparison};
use rand::{distributions::WeightedIndex, rngs::SmallRng, Rng};

/// Samples actions with probabilities proportional to the values.
///
/// The values must be non-negative, for instance the output of a softmax policy.
#[derive(Debug, Clone, Default)]
pub struct PropensityExploration;

impl PropensityExploration {
    /// Creates the module.
    pub fn new() -> Self {
        Self
    }
}

impl ExplorationModule for PropensityExploration {
    fn act(&mut self, input: &ExplorationInput, rng: &mut SmallRng) -> Result<Vec<usize>> {
        input
            .require_values()?
            .rows()
            .into_iter()
            .map(|p| -> Result<usize> { Ok(rng.sample(WeightedIndex::new(p.iter())?)) })
            .collect()
    }
}

impl CompareFields for PropensityExploration {
    const KIND: &'static str = "PropensityExploration";

    fn compare_fields(&self, _other: &Self, _cmp: &mut Comparison) {}
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{action_space::DiscreteActionSpace, exploration::NoExploration};
    use armory_core::Compare;
    use candle_core::Device;
    use ndarray::array;
    use rand::SeedableRng;

    #[test]
    fn test_propensity() -> Result<()> {
        let mut rng = SmallRng::seed_from_u64(42);
        let space = DiscreteActionSpace::from_indices(3, &Device::Cpu)?;
        let probs = array![[0.0, 0.0, 1.0], [1.0, 0.0, 0.0]];
        let input = ExplorationInput::new(&space).values(&probs);
        let mut m = PropensityExploration::new();
        assert_eq!(m.act(&input, &mut rng)?, vec![2, 0]);

        let bad = array![[0.0, 0.0, 0.0]];
        assert!(m
            .act(&ExplorationInput::new(&space).values(&bad), &mut rng)
            .is_err());

        assert!(m.compare(&PropensityExploration::new()).is_empty());
        assert!(!m.compare(&NoExploration::new()).is_empty());
        Ok(())
    }
}
