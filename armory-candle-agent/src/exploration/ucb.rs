use super::{argmax_rows, ExplorationInput, ExplorationModule};
use anyhow::Result;
use armory_core::{ArmoryError, CompareFields, Comparison};
use ndarray::{Array2, Axis};
use rand::rngs::SmallRng;

/// Upper confidence bound exploration: argmax of `values + alpha * uncertainty`.
#[derive(Debug, Clone)]
pub struct UcbExploration {
    alpha: f64,
}

impl UcbExploration {
    /// `alpha` scales the uncertainty bonus.
    pub fn new(alpha: f64) -> Self {
        Self { alpha }
    }

    /// Scale of the uncertainty bonus.
    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Sets the scale of the uncertainty bonus.
    pub fn set_alpha(&mut self, alpha: f64) {
        self.alpha = alpha;
    }
}

impl ExplorationModule for UcbExploration {
    fn act(&mut self, input: &ExplorationInput, _rng: &mut SmallRng) -> Result<Vec<usize>> {
        let values = input.require_values()?;
        let uncertainty = input
            .uncertainty
            .ok_or(ArmoryError::MissingExplorationInput("uncertainty"))?;
        if uncertainty.shape() != values.shape() {
            return Err(ArmoryError::DimensionMismatch {
                what: "uncertainty".to_string(),
                expected: values.len(),
                actual: uncertainty.len(),
            }
            .into());
        }
        Ok(argmax_rows(&(values + &(uncertainty * self.alpha))))
    }
}

impl CompareFields for UcbExploration {
    const KIND: &'static str = "UcbExploration";

    fn compare_fields(&self, other: &Self, cmp: &mut Comparison) {
        cmp.field("alpha", &self.alpha, &other.alpha);
    }
}

/// UCB over disjoint models, one linear regression per action.
///
/// The uncertainty of action `a` is the posterior standard deviation of
/// `regressions[a]` at the features of `a`.
#[derive(Debug, Clone)]
pub struct DisjointUcbExploration {
    alpha: f64,
}

impl DisjointUcbExploration {
    /// `alpha` scales the uncertainty bonus.
    pub fn new(alpha: f64) -> Self {
        Self { alpha }
    }

    /// Scale of the uncertainty bonus.
    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Sets the scale of the uncertainty bonus.
    pub fn set_alpha(&mut self, alpha: f64) {
        self.alpha = alpha;
    }
}

impl ExplorationModule for DisjointUcbExploration {
    fn act(&mut self, input: &ExplorationInput, _rng: &mut SmallRng) -> Result<Vec<usize>> {
        let values = input.require_values()?;
        let features = input.require_features()?;
        let regressions = input.require_regressions()?;
        let n = input.action_space.n();
        if regressions.len() != n {
            return Err(ArmoryError::DimensionMismatch {
                what: "regressions".to_string(),
                expected: n,
                actual: regressions.len(),
            }
            .into());
        }

        let mut sigma = Array2::<f64>::zeros((values.nrows(), n));
        for (a, lr) in regressions.iter().enumerate() {
            let x = features.index_axis(Axis(1), a).to_owned();
            sigma.column_mut(a).assign(&lr.calculate_sigma(&x)?);
        }
        Ok(argmax_rows(&(values + &(sigma * self.alpha))))
    }
}

impl CompareFields for DisjointUcbExploration {
    const KIND: &'static str = "DisjointUcbExploration";

    fn compare_fields(&self, other: &Self, cmp: &mut Comparison) {
        cmp.field("alpha", &self.alpha, &other.alpha);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{action_space::DiscreteActionSpace, network::LinearRegression};
    use armory_core::Compare;
    use candle_core::Device;
    use ndarray::{array, Array3};
    use rand::SeedableRng;

    #[test]
    fn test_ucb() -> Result<()> {
        let mut rng = SmallRng::seed_from_u64(0);
        let space = DiscreteActionSpace::from_indices(2, &Device::Cpu)?;
        let values = array![[1.0, 0.0]];
        let uncertainty = array![[0.0, 2.0]];
        let input = ExplorationInput::new(&space)
            .values(&values)
            .uncertainty(&uncertainty);

        assert_eq!(UcbExploration::new(0.1).act(&input, &mut rng)?, vec![0]);
        assert_eq!(UcbExploration::new(1.0).act(&input, &mut rng)?, vec![1]);
        assert!(UcbExploration::new(1.0)
            .act(&ExplorationInput::new(&space).values(&values), &mut rng)
            .is_err());
        Ok(())
    }

    #[test]
    fn test_disjoint_ucb_prefers_unexplored_arm() -> Result<()> {
        let mut rng = SmallRng::seed_from_u64(0);
        let space = DiscreteActionSpace::from_indices(2, &Device::Cpu)?;
        let mut lr0 = LinearRegression::new(1, 1.0, 1.0);
        let mut lr1 = LinearRegression::new(1, 1.0, 1.0);
        let x = Array2::<f64>::ones((50, 1));
        lr0.learn_arrays(&x, &ndarray::Array1::zeros(50), None)?;
        lr1.learn_arrays(&array![[1.0]], &array![0.0], None)?;

        let regressions = [&lr0, &lr1];
        let values = array![[0.0, 0.0]];
        let features = Array3::<f64>::ones((1, 2, 1));
        let input = ExplorationInput::new(&space)
            .values(&values)
            .features(&features)
            .regressions(&regressions);
        assert_eq!(DisjointUcbExploration::new(1.0).act(&input, &mut rng)?, vec![1]);
        Ok(())
    }

    #[test]
    fn test_compare() {
        let m1 = UcbExploration::new(1.0);
        let mut m2 = UcbExploration::new(1.0);
        assert!(m1.compare(&m1).is_empty());
        assert!(m1.compare(&m2).is_empty());
        m2.set_alpha(0.5);
        assert_eq!(m1.compare(&m2).to_string(), "alpha: 1.0 != 0.5");

        let d1 = DisjointUcbExploration::new(1.0);
        let mut d2 = DisjointUcbExploration::new(1.0);
        d2.set_alpha(0.5);
        assert!(d1.compare(&d2).mentions("alpha"));
        assert!(!d1.compare(&m1).is_empty());
    }
}
