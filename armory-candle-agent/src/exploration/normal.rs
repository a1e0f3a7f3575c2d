use super::{argmax, ExplorationInput, ExplorationModule};
use anyhow::Result;
use armory_core::{CompareFields, Comparison};
use candle_core::{DType, Tensor};
use rand::{rngs::SmallRng, Rng};
use rand_distr::Normal;

/// Gaussian noise exploration.
///
/// For continuous actions, [`NormalDistributionExploration::perturb`] adds
/// noise to an action and clips it to the action bounds. For discrete actions,
/// noise is added to the values before taking the argmax.
#[derive(Debug, Clone)]
pub struct NormalDistributionExploration {
    mean: f64,
    std_dev: f64,
}

impl NormalDistributionExploration {
    /// Noise drawn from `N(mean, std_dev^2)`.
    pub fn new(mean: f64, std_dev: f64) -> Self {
        Self { mean, std_dev }
    }

    /// Mean of the noise.
    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Standard deviation of the noise.
    pub fn std_dev(&self) -> f64 {
        self.std_dev
    }

    /// Sets the standard deviation of the noise.
    pub fn set_std_dev(&mut self, std_dev: f64) {
        self.std_dev = std_dev;
    }

    fn noise(&self, n: usize, rng: &mut SmallRng) -> Result<Vec<f64>> {
        let dist = Normal::new(self.mean, self.std_dev)?;
        Ok((0..n).map(|_| rng.sample(dist)).collect())
    }

    /// Adds noise to continuous actions and clips them to `[low, high]`.
    pub fn perturb(
        &self,
        action: &Tensor,
        low: f64,
        high: f64,
        rng: &mut SmallRng,
    ) -> Result<Tensor> {
        let action = action.to_dtype(DType::F32)?;
        let noise = self
            .noise(action.elem_count(), rng)?
            .into_iter()
            .map(|v| v as f32)
            .collect::<Vec<_>>();
        let noise = Tensor::from_vec(noise, action.shape(), action.device())?;
        Ok((action + noise)?.clamp(low as f32, high as f32)?)
    }
}

impl ExplorationModule for NormalDistributionExploration {
    fn act(&mut self, input: &ExplorationInput, rng: &mut SmallRng) -> Result<Vec<usize>> {
        let values = input.require_values()?;
        values
            .rows()
            .into_iter()
            .map(|row| -> Result<usize> {
                let noise = ndarray::Array1::from(self.noise(row.len(), rng)?);
                Ok(argmax((&row + &noise).view()))
            })
            .collect()
    }
}

impl CompareFields for NormalDistributionExploration {
    const KIND: &'static str = "NormalDistributionExploration";

    fn compare_fields(&self, other: &Self, cmp: &mut Comparison) {
        cmp.field("mean", &self.mean, &other.mean)
            .field("std_dev", &self.std_dev, &other.std_dev);
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
    fn test_perturb_is_clipped() -> Result<()> {
        let mut rng = SmallRng::seed_from_u64(1);
        let m = NormalDistributionExploration::new(0.0, 10.0);
        let action = Tensor::zeros(100, DType::F32, &Device::Cpu)?;
        let perturbed = m.perturb(&action, -1.0, 1.0, &mut rng)?.to_vec1::<f32>()?;
        assert!(perturbed.iter().all(|v| (-1.0..=1.0).contains(v)));
        assert!(perturbed.iter().any(|v| *v != 0.0));
        Ok(())
    }

    #[test]
    fn test_small_noise_keeps_greedy_action() -> Result<()> {
        let mut rng = SmallRng::seed_from_u64(1);
        let space = DiscreteActionSpace::from_indices(3, &Device::Cpu)?;
        let values = array![[0.0, 10.0, 0.0]];
        let mut m = NormalDistributionExploration::new(0.0, 1e-3);
        let input = ExplorationInput::new(&space).values(&values);
        assert_eq!(m.act(&input, &mut rng)?, vec![1]);

        let mut m2 = m.clone();
        m2.set_std_dev(0.5);
        assert_eq!(m.compare(&m2).to_string(), "std_dev: 0.001 != 0.5");
        Ok(())
    }
}
