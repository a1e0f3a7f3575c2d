use super::{random_actions, ExplorationInput, ExplorationModule};
use anyhow::Result;
use armory_core::{Compare, CompareFields, Comparison};
use log::info;
use rand::rngs::SmallRng;

/// Takes uniformly random actions for `warmup_steps` calls, then defers to the
/// wrapped exploration module.
pub struct Warmup {
    exploration_module: Box<dyn ExplorationModule>,
    warmup_steps: usize,
    time_step: usize,
}

impl Warmup {
    /// Acts at random for `warmup_steps` calls, then delegates to `exploration_module`.
    pub fn new(exploration_module: Box<dyn ExplorationModule>, warmup_steps: usize) -> Self {
        Self {
            exploration_module,
            warmup_steps,
            time_step: 0,
        }
    }

    /// Number of random steps.
    pub fn warmup_steps(&self) -> usize {
        self.warmup_steps
    }

    /// Sets the number of random steps.
    pub fn set_warmup_steps(&mut self, warmup_steps: usize) {
        self.warmup_steps = warmup_steps;
    }

    /// Module used after the warmup.
    pub fn exploration_module(&self) -> &dyn ExplorationModule {
        self.exploration_module.as_ref()
    }

    /// Mutable access to the module used after the warmup.
    pub fn exploration_module_mut(&mut self) -> &mut dyn ExplorationModule {
        self.exploration_module.as_mut()
    }
}

impl ExplorationModule for Warmup {
    fn act(&mut self, input: &ExplorationInput, rng: &mut SmallRng) -> Result<Vec<usize>> {
        self.time_step += 1;
        if self.time_step <= self.warmup_steps {
            Ok(random_actions(input.batch_size()?, input.action_space.n(), rng))
        } else {
            if self.time_step == self.warmup_steps + 1 {
                info!("Warmup finished after {} steps", self.warmup_steps);
            }
            self.exploration_module.act(input, rng)
        }
    }

    fn reset(&mut self) {
        self.time_step = 0;
        self.exploration_module.reset();
    }
}

impl CompareFields for Warmup {
    const KIND: &'static str = "Warmup";

    fn compare_fields(&self, other: &Self, cmp: &mut Comparison) {
        cmp.nested(
            "exploration_module",
            self.exploration_module.as_compare(),
            other.exploration_module.as_compare(),
        )
        .field("warmup_steps", &self.warmup_steps, &other.warmup_steps);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        action_space::DiscreteActionSpace,
        exploration::{EGreedyExploration, NoExploration},
    };
    use armory_core::Compare;
    use candle_core::Device;
    use ndarray::Array2;
    use rand::SeedableRng;

    #[test]
    fn test_defers_after_warmup() -> Result<()> {
        let mut rng = SmallRng::seed_from_u64(0);
        let space = DiscreteActionSpace::from_indices(4, &Device::Cpu)?;
        let mut values = Array2::<f64>::zeros((100, 4));
        values.column_mut(2).fill(1.0);
        let input = ExplorationInput::new(&space).values(&values);
        let mut m = Warmup::new(Box::new(NoExploration::new()), 1);

        let random = m.act(&input, &mut rng)?;
        assert!(random.iter().any(|a| *a != 2));
        assert_eq!(m.act(&input, &mut rng)?, vec![2; 100]);

        m.reset();
        assert!(m.act(&input, &mut rng)?.iter().any(|a| *a != 2));
        Ok(())
    }

    #[test]
    fn test_compare() {
        let m1 = Warmup::new(Box::new(EGreedyExploration::new(0.1)), 1000);
        let mut m2 = Warmup::new(Box::new(EGreedyExploration::new(0.1)), 1000);
        assert!(m1.compare(&m1).is_empty());
        assert!(m1.compare(&m2).is_empty());

        m2.set_warmup_steps(500);
        assert_eq!(m1.compare(&m2).to_string(), "warmup_steps: 1000 != 500");

        let m3 = Warmup::new(Box::new(EGreedyExploration::new(0.2)), 1000);
        assert_eq!(
            m1.compare(&m3).to_string(),
            "exploration_module.epsilon: 0.1 != 0.2"
        );
    }
}
