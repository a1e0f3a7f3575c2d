use super::{random_actions, ExplorationInput, ExplorationModule};
use anyhow::Result;
use armory_core::{CompareFields, Comparison};
use log::trace;
use rand::{rngs::SmallRng, Rng};

/// Epsilon-greedy exploration.
///
/// If `start_epsilon`, `end_epsilon` and `warmup_steps` are all set, epsilon
/// decays linearly from `start_epsilon` to `end_epsilon` over `warmup_steps`
/// calls of [`ExplorationModule::act`]. Otherwise `epsilon` is used.
#[derive(Debug, Clone)]
pub struct EGreedyExploration {
    epsilon: f64,
    start_epsilon: Option<f64>,
    end_epsilon: Option<f64>,
    warmup_steps: Option<usize>,
    time_step: usize,
}

impl EGreedyExploration {
    /// Constant epsilon.
    pub fn new(epsilon: f64) -> Self {
        Self {
            epsilon,
            start_epsilon: None,
            end_epsilon: None,
            warmup_steps: None,
            time_step: 0,
        }
    }

    /// Epsilon at the first step of the decay.
    pub fn start_epsilon(mut self, v: f64) -> Self {
        self.start_epsilon = Some(v);
        self
    }

    /// Epsilon reached at the end of the decay.
    pub fn end_epsilon(mut self, v: f64) -> Self {
        self.end_epsilon = Some(v);
        self
    }

    /// Length of the decay.
    pub fn warmup_steps(mut self, v: usize) -> Self {
        self.warmup_steps = Some(v);
        self
    }

    /// Sets the constant epsilon.
    pub fn set_epsilon(&mut self, epsilon: f64) {
        self.epsilon = epsilon;
    }

    /// Sets the epsilon reached at the end of the decay.
    pub fn set_end_epsilon(&mut self, end_epsilon: f64) {
        self.end_epsilon = Some(end_epsilon);
    }

    /// Epsilon used by the next call of [`ExplorationModule::act`].
    pub fn current_epsilon(&self) -> f64 {
        match (self.start_epsilon, self.end_epsilon, self.warmup_steps) {
            (Some(start), Some(end), Some(steps)) if steps > 0 => {
                let d = (start - end) / steps as f64;
                if d >= 0.0 {
                    (start - d * self.time_step as f64).max(end)
                } else {
                    (start - d * self.time_step as f64).min(end)
                }
            }
            (Some(_), Some(end), Some(_)) => end,
            _ => self.epsilon,
        }
    }
}

impl ExplorationModule for EGreedyExploration {
    fn act(&mut self, input: &ExplorationInput, rng: &mut SmallRng) -> Result<Vec<usize>> {
        let eps = self.current_epsilon();
        self.time_step += 1;
        trace!("EGreedyExploration: epsilon = {}", eps);

        let greedy = input.greedy_actions()?;
        let random = random_actions(greedy.len(), input.action_space.n(), rng);
        Ok(greedy
            .into_iter()
            .zip(random)
            .map(|(g, r)| if rng.gen::<f64>() < eps { r } else { g })
            .collect())
    }

    fn reset(&mut self) {
        self.time_step = 0;
    }
}

impl CompareFields for EGreedyExploration {
    const KIND: &'static str = "EGreedyExploration";

    fn compare_fields(&self, other: &Self, cmp: &mut Comparison) {
        cmp.field("epsilon", &self.epsilon, &other.epsilon)
            .field("start_epsilon", &self.start_epsilon, &other.start_epsilon)
            .field("end_epsilon", &self.end_epsilon, &other.end_epsilon)
            .field("warmup_steps", &self.warmup_steps, &other.warmup_steps);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::action_space::DiscreteActionSpace;
    use armory_core::Compare;
    use candle_core::Device;
    use ndarray::array;
    use rand::SeedableRng;

    #[test]
    fn test_schedule() -> Result<()> {
        let mut rng = SmallRng::seed_from_u64(0);
        let space = DiscreteActionSpace::from_indices(2, &Device::Cpu)?;
        let values = array![[0.0, 1.0]];
        let input = ExplorationInput::new(&space).values(&values);

        let mut m = EGreedyExploration::new(0.1)
            .start_epsilon(1.0)
            .end_epsilon(0.0)
            .warmup_steps(4);
        assert_eq!(m.current_epsilon(), 1.0);
        for _ in 0..2 {
            m.act(&input, &mut rng)?;
        }
        assert_eq!(m.current_epsilon(), 0.5);
        for _ in 0..10 {
            m.act(&input, &mut rng)?;
        }
        assert_eq!(m.current_epsilon(), 0.0);
        assert_eq!(m.act(&input, &mut rng)?, vec![1]);

        m.reset();
        assert_eq!(m.current_epsilon(), 1.0);
        Ok(())
    }

    #[test]
    fn test_step_counter_is_not_compared() -> Result<()> {
        let mut rng = SmallRng::seed_from_u64(0);
        let space = DiscreteActionSpace::from_indices(2, &Device::Cpu)?;
        let values = array![[0.0, 1.0]];
        let mut m1 = EGreedyExploration::new(0.1);
        let mut m2 = EGreedyExploration::new(0.1);
        m1.act(&ExplorationInput::new(&space).values(&values), &mut rng)?;
        assert!(m1.compare(&m2).is_empty());

        m2.set_end_epsilon(0.1);
        assert_eq!(m1.compare(&m2).to_string(), "end_epsilon: None != Some(0.1)");
        Ok(())
    }
}
