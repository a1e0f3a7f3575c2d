//! Value models used by bandit learners and exploration modules.
mod ensemble_q;
mod linear_regression;
mod neural_linear_regression;
pub use ensemble_q::{EnsembleQValueNetwork, EnsembleQValueNetworkConfig};
pub use linear_regression::{LinearRegression, LinearRegressionConfig};
pub use neural_linear_regression::{NeuralLinearRegression, NeuralLinearRegressionConfig};
