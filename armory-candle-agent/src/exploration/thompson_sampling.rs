//! Thompson sampling for linear models.
use super::{argmax_rows, ExplorationInput, ExplorationModule};
use crate::{
    network::LinearRegression,
    util::{append_ones, cholesky, inverse},
};
use anyhow::Result;
use armory_core::{ArmoryError, CompareFields, Comparison};
use ndarray::{Array1, Array2, Axis};
use rand::{rngs::SmallRng, Rng};
use rand_distr::StandardNormal;

fn standard_normal(n: usize, rng: &mut SmallRng) -> Array1<f64> {
    (0..n).map(|_| rng.sample::<f64, _>(StandardNormal)).collect()
}

/// Samples scores of the rows of `x` from the posterior of `lr`.
///
/// With efficient sampling, each score is drawn from its marginal
/// `N(prediction, sigma^2)`. Otherwise a single coefficient vector is drawn
/// from `N(coefs, A^-1)` and applied to every row.
fn sample_scores(
    lr: &LinearRegression,
    x: &Array2<f64>,
    efficient: bool,
    rng: &mut SmallRng,
) -> Result<Array1<f64>> {
    if efficient {
        let mu = lr.predict_arrays(x)?;
        let sigma = lr.calculate_sigma(x)?;
        let z = standard_normal(mu.len(), rng);
        Ok(mu + sigma * z)
    } else {
        let l = cholesky(&inverse(lr.a())?)?;
        let z = standard_normal(l.nrows(), rng);
        let coefs = lr.coefs() + &l.dot(&z);
        Ok(append_ones(x)?.dot(&coefs))
    }
}

/// Thompson sampling with one linear regression shared by all actions.
///
/// Reads `features` and the first of `regressions`.
#[derive(Debug, Clone)]
pub struct ThompsonSamplingExplorationLinear {
    enable_efficient_sampling: bool,
}

impl ThompsonSamplingExplorationLinear {
    /// If `enable_efficient_sampling` is `true`, only the predicted value is sampled.
    pub fn new(enable_efficient_sampling: bool) -> Self {
        Self {
            enable_efficient_sampling,
        }
    }

    /// Switches between sampling values and sampling coefficients.
    pub fn set_enable_efficient_sampling(&mut self, v: bool) {
        self.enable_efficient_sampling = v;
    }
}

impl ExplorationModule for ThompsonSamplingExplorationLinear {
    fn act(&mut self, input: &ExplorationInput, rng: &mut SmallRng) -> Result<Vec<usize>> {
        let features = input.require_features()?;
        let lr = input.require_regressions()?[0];
        let (batch_size, n) = (features.shape()[0], features.shape()[1]);

        let mut scores = Array2::<f64>::zeros((batch_size, n));
        for (row, x) in features.outer_iter().enumerate() {
            let s = sample_scores(lr, &x.to_owned(), self.enable_efficient_sampling, rng)?;
            scores.row_mut(row).assign(&s);
        }
        Ok(argmax_rows(&scores))
    }
}

impl CompareFields for ThompsonSamplingExplorationLinear {
    const KIND: &'static str = "ThompsonSamplingExplorationLinear";

    fn compare_fields(&self, other: &Self, cmp: &mut Comparison) {
        cmp.field(
            "enable_efficient_sampling",
            &self.enable_efficient_sampling,
            &other.enable_efficient_sampling,
        );
    }
}

/// Thompson sampling with one linear regression per action.
#[derive(Debug, Clone)]
pub struct ThompsonSamplingExplorationLinearDisjoint {
    enable_efficient_sampling: bool,
}

impl ThompsonSamplingExplorationLinearDisjoint {
    /// If `enable_efficient_sampling` is `true`, only the predicted value is sampled.
    pub fn new(enable_efficient_sampling: bool) -> Self {
        Self {
            enable_efficient_sampling,
        }
    }

    /// Switches between sampling values and sampling coefficients.
    pub fn set_enable_efficient_sampling(&mut self, v: bool) {
        self.enable_efficient_sampling = v;
    }
}

impl ExplorationModule for ThompsonSamplingExplorationLinearDisjoint {
    fn act(&mut self, input: &ExplorationInput, rng: &mut SmallRng) -> Result<Vec<usize>> {
        let features = input.require_features()?;
        let regressions = input.require_regressions()?;
        let (batch_size, n) = (features.shape()[0], features.shape()[1]);
        if regressions.len() != n {
            return Err(ArmoryError::DimensionMismatch {
                what: "regressions".to_string(),
                expected: n,
                actual: regressions.len(),
            }
            .into());
        }

        let mut scores = Array2::<f64>::zeros((batch_size, n));
        for (a, lr) in regressions.iter().enumerate() {
            let x = features.index_axis(Axis(1), a).to_owned();
            let s = sample_scores(lr, &x, self.enable_efficient_sampling, rng)?;
            scores.column_mut(a).assign(&s);
        }
        Ok(argmax_rows(&scores))
    }
}

impl CompareFields for ThompsonSamplingExplorationLinearDisjoint {
    const KIND: &'static str = "ThompsonSamplingExplorationLinearDisjoint";

    fn compare_fields(&self, other: &Self, cmp: &mut Comparison) {
        cmp.field(
            "enable_efficient_sampling",
            &self.enable_efficient_sampling,
            &other.enable_efficient_sampling,
        );
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::action_space::DiscreteActionSpace;
    use armory_core::Compare;
    use candle_core::Device;
    use ndarray::Array3;
    use rand::SeedableRng;

    // Regression fitted on many samples of y = 2 x.
    fn fitted() -> Result<LinearRegression> {
        let mut lr = LinearRegression::new(1, 1e-3, 1.0);
        let x = Array2::from_shape_fn((200, 1), |(i, _)| (i % 10) as f64);
        let y = x.column(0).mapv(|v| 2.0 * v);
        lr.learn_arrays(&x, &y, None)?;
        Ok(lr)
    }

    #[test]
    fn test_confident_model_is_greedy() -> Result<()> {
        let mut rng = SmallRng::seed_from_u64(3);
        let space = DiscreteActionSpace::from_indices(2, &Device::Cpu)?;
        let lr = fitted()?;
        let features = Array3::from_shape_vec((1, 2, 1), vec![1.0, 5.0])?;

        for efficient in [true, false] {
            let shared = [&lr];
            let input = ExplorationInput::new(&space)
                .features(&features)
                .regressions(&shared);
            let mut m = ThompsonSamplingExplorationLinear::new(efficient);
            assert_eq!(m.act(&input, &mut rng)?, vec![1]);

            let disjoint = [&lr, &lr];
            let input = ExplorationInput::new(&space)
                .features(&features)
                .regressions(&disjoint);
            let mut m = ThompsonSamplingExplorationLinearDisjoint::new(efficient);
            assert_eq!(m.act(&input, &mut rng)?, vec![1]);
        }
        Ok(())
    }

    #[test]
    fn test_compare() {
        let m1 = ThompsonSamplingExplorationLinear::new(true);
        let mut m2 = ThompsonSamplingExplorationLinear::new(true);
        assert!(m1.compare(&m2).is_empty());
        m2.set_enable_efficient_sampling(false);
        assert_eq!(
            m1.compare(&m2).to_string(),
            "enable_efficient_sampling: true != false"
        );

        let d1 = ThompsonSamplingExplorationLinearDisjoint::new(true);
        let mut d2 = ThompsonSamplingExplorationLinearDisjoint::new(true);
        d2.set_enable_efficient_sampling(false);
        assert!(d1.compare(&d2).mentions("enable_efficient_sampling"));
    }
}
