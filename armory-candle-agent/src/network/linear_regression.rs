//! Bayesian linear regression with closed-form updates.
use crate::util::{append_ones, array1_to_tensor, inverse, tensor_to_array1, tensor_to_array2};
use anyhow::Result;
use armory_core::{ArmoryError, CompareFields, Comparison, ConfigFile};
use candle_core::Tensor;
use log::trace;
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
/// Configuration of [`LinearRegression`].
pub struct LinearRegressionConfig {
    /// Number of input features, excluding the intercept.
    pub feature_dim: usize,
    /// L2 regularization strength.
    pub l2_reg_lambda: f64,
    /// Discount factor.
    pub gamma: f64,
}

impl LinearRegressionConfig {
    /// Configuration with `l2_reg_lambda = 1` and no discounting.
    pub fn new(feature_dim: usize) -> Self {
        Self {
            feature_dim,
            l2_reg_lambda: 1.0,
            gamma: 1.0,
        }
    }

    /// Sets the L2 regularization strength.
    pub fn l2_reg_lambda(mut self, v: f64) -> Self {
        self.l2_reg_lambda = v;
        self
    }

    /// Sets the discount factor applied by [`LinearRegression::apply_discounting`].
    pub fn gamma(mut self, v: f64) -> Self {
        self.gamma = v;
        self
    }
}

impl ConfigFile for LinearRegressionConfig {}

/// Ridge regression `y = [1, x] . coefs` updated in closed form.
///
/// The sufficient statistics `A = l2_reg_lambda * I + sum w x x^T` and
/// `b = sum w y x` are accumulated over all batches, with `x` prefixed by an
/// intercept term. The inverse of `A` doubles as the posterior covariance used
/// by UCB and Thompson sampling.
#[derive(Debug, Clone)]
pub struct LinearRegression {
    feature_dim: usize,
    l2_reg_lambda: f64,
    gamma: f64,
    a: Array2<f64>,
    b: Array1<f64>,
    inv_a: Array2<f64>,
    coefs: Array1<f64>,
    sum_weight: f64,
}

impl LinearRegression {
    /// Creates a regression model with no data.
    pub fn new(feature_dim: usize, l2_reg_lambda: f64, gamma: f64) -> Self {
        let d = feature_dim + 1;
        Self {
            feature_dim,
            l2_reg_lambda,
            gamma,
            a: Array2::eye(d) * l2_reg_lambda,
            b: Array1::zeros(d),
            inv_a: Array2::zeros((d, d)),
            coefs: Array1::zeros(d),
            sum_weight: 0.0,
        }
    }

    /// Creates a regression model from its configuration.
    pub fn build(config: LinearRegressionConfig) -> Self {
        Self::new(config.feature_dim, config.l2_reg_lambda, config.gamma)
    }

    /// Number of input features, excluding the intercept.
    pub fn feature_dim(&self) -> usize {
        self.feature_dim
    }

    /// L2 regularization strength.
    pub fn l2_reg_lambda(&self) -> f64 {
        self.l2_reg_lambda
    }

    /// Discount factor.
    pub fn gamma(&self) -> f64 {
        self.gamma
    }

    /// Sets the discount factor.
    pub fn set_gamma(&mut self, gamma: f64) {
        self.gamma = gamma;
    }

    /// The matrix `A` of the sufficient statistics.
    pub fn a(&self) -> &Array2<f64> {
        &self.a
    }

    /// The vector `b` of the sufficient statistics.
    pub fn b(&self) -> &Array1<f64> {
        &self.b
    }

    /// Inverse of `A`, zero before the first update.
    pub fn inv_a(&self) -> &Array2<f64> {
        &self.inv_a
    }

    /// Coefficients, intercept first.
    pub fn coefs(&self) -> &Array1<f64> {
        &self.coefs
    }

    /// Accumulated (discounted) sample weight.
    pub fn sum_weight(&self) -> f64 {
        self.sum_weight
    }

    /// Updates the model with a batch of features `x` of shape `(batch, feature_dim)`
    /// and targets `y` of `batch` elements.
    pub fn learn_batch(&mut self, x: &Tensor, y: &Tensor, weight: Option<&Tensor>) -> Result<()> {
        let x = tensor_to_array2(x)?;
        let y = tensor_to_array1(y)?;
        let weight = match weight {
            Some(w) => Some(tensor_to_array1(w)?),
            None => None,
        };
        self.learn_arrays(&x, &y, weight.as_ref())
    }

    /// Same as [`LinearRegression::learn_batch`] on arrays.
    pub fn learn_arrays(
        &mut self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        weight: Option<&Array1<f64>>,
    ) -> Result<()> {
        self.check_features(x)?;
        let batch_size = x.nrows();
        if y.len() != batch_size {
            return Err(ArmoryError::DimensionMismatch {
                what: "regression targets".to_string(),
                expected: batch_size,
                actual: y.len(),
            }
            .into());
        }
        let weight = match weight {
            Some(w) => w.clone(),
            None => Array1::ones(batch_size),
        };

        let x = append_ones(x)?;
        let xw = &x * &weight.view().insert_axis(Axis(1));
        self.a = &self.a + &x.t().dot(&xw);
        self.b = &self.b + &xw.t().dot(y);
        self.sum_weight += weight.sum();
        trace!("LinearRegression: sum_weight = {}", self.sum_weight);

        self.calculate_coefs()
    }

    fn calculate_coefs(&mut self) -> Result<()> {
        self.inv_a = inverse(&self.a)?;
        self.coefs = self.inv_a.dot(&self.b);
        Ok(())
    }

    /// Discounts past observations by `gamma`.
    ///
    /// The regularization term of `A` is kept at full strength.
    pub fn apply_discounting(&mut self) -> Result<()> {
        let d = self.feature_dim + 1;
        let reg = Array2::<f64>::eye(d) * (self.l2_reg_lambda * (1.0 - self.gamma));
        self.a = &self.a * self.gamma + reg;
        self.b = &self.b * self.gamma;
        self.sum_weight *= self.gamma;
        self.calculate_coefs()
    }

    /// Predicts the targets of features `x` of shape `(batch, feature_dim)`.
    pub fn predict_arrays(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.check_features(x)?;
        Ok(append_ones(x)?.dot(&self.coefs))
    }

    /// Same as [`LinearRegression::predict_arrays`] on tensors; returns an `f32` tensor of shape `(batch,)`.
    pub fn predict(&self, x: &Tensor) -> Result<Tensor> {
        let y = self.predict_arrays(&tensor_to_array2(x)?)?;
        array1_to_tensor(&y, x.device())
    }

    /// Posterior standard deviation `sqrt([1, x] A^-1 [1, x]^T)` of each row of `x`.
    pub fn calculate_sigma(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.check_features(x)?;
        let x = append_ones(x)?;
        let xa = x.dot(&self.inv_a);
        Ok((xa * &x).sum_axis(Axis(1)).mapv(|v| v.max(0.0).sqrt()))
    }

    /// Forgets all data.
    pub fn reset(&mut self) {
        *self = Self::new(self.feature_dim, self.l2_reg_lambda, self.gamma);
    }

    fn check_features(&self, x: &Array2<f64>) -> Result<()> {
        if x.ncols() != self.feature_dim {
            return Err(ArmoryError::DimensionMismatch {
                what: "regression features".to_string(),
                expected: self.feature_dim,
                actual: x.ncols(),
            }
            .into());
        }
        Ok(())
    }
}

impl CompareFields for LinearRegression {
    const KIND: &'static str = "LinearRegression";

    fn compare_fields(&self, other: &Self, cmp: &mut Comparison) {
        cmp.field("feature_dim", &self.feature_dim, &other.feature_dim)
            .field("l2_reg_lambda", &self.l2_reg_lambda, &other.l2_reg_lambda)
            .field("gamma", &self.gamma, &other.gamma)
            .array("A", &self.a, &other.a)
            .array("b", &self.b, &other.b)
            .array("inv_A", &self.inv_a, &other.inv_a)
            .array("coefs", &self.coefs, &other.coefs)
            .field("sum_weight", &self.sum_weight, &other.sum_weight);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use armory_core::Compare;
    use candle_core::Device;
    use ndarray::array;

    #[test]
    fn test_recovers_coefficients() -> Result<()> {
        let mut lr = LinearRegression::new(2, 1e-6, 1.0);
        let x = array![[0.0, 1.0], [1.0, 0.0], [1.0, 1.0], [2.0, 3.0]];
        let y = x.map_axis(Axis(1), |r| 0.5 + 2.0 * r[0] - r[1]);
        lr.learn_arrays(&x, &y, None)?;

        let expected = [0.5, 2.0, -1.0];
        for (c, e) in lr.coefs().iter().zip(expected.iter()) {
            assert!((c - e).abs() < 1e-4, "{} != {}", c, e);
        }
        assert_eq!(lr.sum_weight(), 4.0);

        let pred = lr.predict_arrays(&array![[1.0, 2.0]])?;
        assert!((pred[0] - 0.5).abs() < 1e-4);
        Ok(())
    }

    #[test]
    fn test_sigma_shrinks_with_data() -> Result<()> {
        let mut lr = LinearRegression::new(1, 1.0, 1.0);
        let x = array![[1.0]];
        lr.learn_arrays(&x, &array![1.0], None)?;
        let s1 = lr.calculate_sigma(&x)?[0];
        lr.learn_arrays(&x, &array![1.0], None)?;
        let s2 = lr.calculate_sigma(&x)?[0];
        assert!(s2 < s1);
        Ok(())
    }

    #[test]
    fn test_discounting() -> Result<()> {
        let mut lr = LinearRegression::new(1, 0.5, 0.9);
        lr.learn_arrays(&array![[1.0], [2.0]], &array![1.0, 2.0], Some(&array![1.0, 3.0]))?;
        assert_eq!(lr.sum_weight(), 4.0);
        let b = lr.b().clone();

        lr.apply_discounting()?;
        assert!((lr.sum_weight() - 3.6).abs() < 1e-12);
        assert_eq!(lr.b(), &(b * 0.9));

        lr.reset();
        assert_eq!(lr.a(), &(Array2::<f64>::eye(2) * 0.5));
        assert_eq!(lr.sum_weight(), 0.0);
        Ok(())
    }

    #[test]
    fn test_tiny_regularization() -> Result<()> {
        let mut lr = LinearRegression::new(2, 1e-17, 1.0);
        let x = array![[1.0, 2.0]];
        lr.learn_arrays(&x, &array![3.0], Some(&array![0.0]))?;
        assert_eq!(lr.sum_weight(), 0.0);
        assert!((lr.inv_a()[[0, 0]] - 1e17).abs() < 1e5);
        assert_eq!(lr.coefs(), &Array1::<f64>::zeros(3));
        Ok(())
    }

    #[test]
    fn test_dimension_mismatch() {
        let mut lr = LinearRegression::new(3, 1.0, 1.0);
        assert!(lr.learn_arrays(&array![[1.0, 2.0]], &array![1.0], None).is_err());
        assert!(lr.learn_arrays(&array![[1.0, 2.0, 3.0]], &array![1.0, 2.0], None).is_err());
    }

    #[test]
    fn test_compare_after_learning() -> Result<()> {
        let mut m1 = LinearRegression::new(10, 0.1, 0.95);
        let mut m2 = LinearRegression::new(10, 0.1, 0.95);
        assert!(m1.compare(&m2).is_empty());

        let x = Tensor::randn(0f32, 1f32, (10, 10), &Device::Cpu)?;
        let y = Tensor::randn(0f32, 1f32, (10, 1), &Device::Cpu)?;
        m1.learn_batch(&x, &y, None)?;
        let diffs = m1.compare(&m2);
        for field in ["A", "b", "inv_A", "coefs", "sum_weight"] {
            assert!(diffs.mentions(field), "{} not in {}", field, diffs);
        }
        assert!(!diffs.mentions("gamma"));

        m2.learn_batch(&x, &y, None)?;
        assert!(m1.compare(&m2).is_empty());
        Ok(())
    }
}
