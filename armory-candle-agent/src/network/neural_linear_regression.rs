//! Linear regression on top of features learned by a neural network.
use super::LinearRegression;
use crate::{
    mlp::{Mlp, MlpConfig},
    model::SubModel1,
    util::{compare_varmaps, copy_params, LossType},
};
use anyhow::Result;
use armory_core::{ArmoryError, CompareFields, Comparison, ConfigFile};
use candle_core::{DType, Device, Module, Tensor, D};
use candle_nn::{linear, Linear, VarBuilder, VarMap};
use log::info;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
/// Configuration of [`NeuralLinearRegression`].
pub struct NeuralLinearRegressionConfig {
    /// Number of input features.
    pub feature_dim: usize,
    /// Sizes of the hidden layers; the last one is the input of the linear layer.
    pub hidden_dims: Vec<usize>,
    /// L2 regularization of the linear layer.
    pub l2_reg_lambda_linear: f64,
    /// Discount factor of the linear layer.
    pub gamma: f64,
    /// If `true`, the network is trained through the linear layer.
    pub nn_e2e: bool,
}

impl NeuralLinearRegressionConfig {
    /// Creates a configuration; the last hidden layer is the input of the linear regression.
    pub fn new(feature_dim: usize, hidden_dims: Vec<usize>) -> Self {
        Self {
            feature_dim,
            hidden_dims,
            l2_reg_lambda_linear: 1.0,
            gamma: 1.0,
            nn_e2e: true,
        }
    }

    /// Sets the L2 regularization strength of the linear regression.
    pub fn l2_reg_lambda_linear(mut self, v: f64) -> Self {
        self.l2_reg_lambda_linear = v;
        self
    }

    /// Sets the discount factor of the linear regression.
    pub fn gamma(mut self, v: f64) -> Self {
        self.gamma = v;
        self
    }

    /// If `true`, the network is trained through its own linear head; otherwise
    /// through the current coefficients of the linear regression.
    pub fn nn_e2e(mut self, v: bool) -> Self {
        self.nn_e2e = v;
        self
    }
}

impl ConfigFile for NeuralLinearRegressionConfig {}

/// A neural feature extractor followed by a [`LinearRegression`].
///
/// The network is trained by gradient descent, the regression in closed form
/// on the (detached) features of the network.
pub struct NeuralLinearRegression {
    feature_dim: usize,
    hidden_dims: Vec<usize>,
    l2_reg_lambda_linear: f64,
    gamma: f64,
    nn_e2e: bool,
    device: Device,
    varmap: VarMap,
    mlp: Mlp,
    head: Linear,
    linear_regression_layer: LinearRegression,
}

impl NeuralLinearRegression {
    /// Constructs the model with randomly initialized network parameters.
    pub fn build(config: NeuralLinearRegressionConfig, device: &Device) -> Result<Self> {
        let (last, units) = config.hidden_dims.split_last().ok_or_else(|| {
            ArmoryError::DimensionMismatch {
                what: "hidden_dims of NeuralLinearRegression".to_string(),
                expected: 1,
                actual: 0,
            }
        })?;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, device);
        let mlp = Mlp::build(
            vb.clone(),
            MlpConfig::new(config.feature_dim, units.to_vec(), *last, true),
        )?;
        let head = linear(*last, 1, vb.pp("e2e_head"))?;
        let linear_regression_layer =
            LinearRegression::new(*last, config.l2_reg_lambda_linear, config.gamma);

        Ok(Self {
            feature_dim: config.feature_dim,
            hidden_dims: config.hidden_dims,
            l2_reg_lambda_linear: config.l2_reg_lambda_linear,
            gamma: config.gamma,
            nn_e2e: config.nn_e2e,
            device: device.clone(),
            varmap,
            mlp,
            head,
            linear_regression_layer,
        })
    }

    /// Number of input features.
    pub fn feature_dim(&self) -> usize {
        self.feature_dim
    }

    /// Sizes of the hidden layers.
    pub fn hidden_dims(&self) -> &[usize] {
        &self.hidden_dims
    }

    /// Whether the network is trained through its own head.
    pub fn nn_e2e(&self) -> bool {
        self.nn_e2e
    }

    /// Switches the training target of the network.
    pub fn set_nn_e2e(&mut self, v: bool) {
        self.nn_e2e = v;
    }

    /// The regression on the network features.
    pub fn linear_regression_layer(&self) -> &LinearRegression {
        &self.linear_regression_layer
    }

    /// Mutable access to the regression on the network features.
    pub fn linear_regression_layer_mut(&mut self) -> &mut LinearRegression {
        &mut self.linear_regression_layer
    }

    /// Parameters of the network.
    pub fn varmap(&self) -> &VarMap {
        &self.varmap
    }

    /// Features of `x`, shape `(batch, hidden_dims.last())`.
    pub fn features(&self, x: &Tensor) -> Result<Tensor> {
        self.mlp.forward(&x.to_device(&self.device)?)
    }

    /// Predictions of the linear regression on the network features, shape `(batch,)`.
    pub fn predict(&self, x: &Tensor) -> Result<Tensor> {
        let features = self.features(x)?.detach();
        self.linear_regression_layer.predict(&features)
    }

    /// Differentiable predictions used to train the network, shape `(batch,)`.
    fn train_predict(&self, x: &Tensor) -> Result<Tensor> {
        let features = self.features(x)?;
        if self.nn_e2e {
            Ok(self.head.forward(&features)?.squeeze(D::Minus1)?)
        } else {
            let coefs = self.linear_regression_layer.coefs();
            let intercept = coefs[0];
            let w = coefs.slice(ndarray::s![1..]).to_owned();
            let w = crate::util::array1_to_tensor(&w, &self.device)?.unsqueeze(1)?;
            Ok((features.matmul(&w)?.squeeze(D::Minus1)? + intercept)?)
        }
    }

    /// Loss of the network on a batch.
    pub fn loss(
        &self,
        x: &Tensor,
        y: &Tensor,
        weight: Option<&Tensor>,
        loss_type: LossType,
    ) -> Result<Tensor> {
        let pred = self.train_predict(x)?;
        let y = y.to_device(&self.device)?.flatten_all()?.to_dtype(DType::F32)?;
        loss_type.loss(&pred, &y, weight)
    }

    /// Updates the linear regression with the current network features.
    pub fn learn_linear(&mut self, x: &Tensor, y: &Tensor, weight: Option<&Tensor>) -> Result<()> {
        let features = self.features(x)?.detach();
        self.linear_regression_layer.learn_batch(&features, y, weight)
    }

    /// Copies the learned state of `other`: network parameters and regression statistics.
    ///
    /// Configuration fields such as `nn_e2e` are left untouched.
    pub fn load_state_from(&mut self, other: &Self) -> Result<()> {
        copy_params(&self.varmap, &other.varmap)?;
        self.linear_regression_layer = other.linear_regression_layer.clone();
        Ok(())
    }

    /// Saves the network parameters.
    pub fn save<T: AsRef<Path>>(&self, path: T) -> Result<()> {
        self.varmap.save(&path)?;
        info!("Save neural linear regression to {:?}", path.as_ref());
        Ok(())
    }

    /// Loads the network parameters.
    pub fn load<T: AsRef<Path>>(&mut self, path: T) -> Result<()> {
        self.varmap.load(&path)?;
        info!("Load neural linear regression from {:?}", path.as_ref());
        Ok(())
    }
}

impl CompareFields for NeuralLinearRegression {
    const KIND: &'static str = "NeuralLinearRegression";

    fn compare_fields(&self, other: &Self, cmp: &mut Comparison) {
        cmp.field("feature_dim", &self.feature_dim, &other.feature_dim)
            .field("hidden_dims", &self.hidden_dims, &other.hidden_dims)
            .field(
                "l2_reg_lambda_linear",
                &self.l2_reg_lambda_linear,
                &other.l2_reg_lambda_linear,
            )
            .field("gamma", &self.gamma, &other.gamma)
            .field("nn_e2e", &self.nn_e2e, &other.nn_e2e);
        compare_varmaps(cmp, "parameters", &self.varmap, &other.varmap);
        cmp.nested(
            "linear_regression_layer",
            &self.linear_regression_layer,
            &other.linear_regression_layer,
        );
    }
}
