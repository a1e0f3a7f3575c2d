//! Ensemble of state-action value networks.
use crate::{
    mlp::{Mlp, MlpConfig},
    model::SubModel1,
    util::{compare_varmaps, copy_params},
};
use anyhow::Result;
use armory_core::{ArmoryError, CompareFields, Comparison, ConfigFile};
use candle_core::{DType, Device, Tensor, D};
use candle_nn::{VarBuilder, VarMap};
use log::info;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
/// Configuration of [`EnsembleQValueNetwork`].
pub struct EnsembleQValueNetworkConfig {
    /// Size of a state.
    pub state_dim: usize,
    /// Size of an action representation.
    pub action_dim: usize,
    /// Sizes of the hidden layers of each member.
    pub hidden_dims: Vec<usize>,
    /// Number of outputs of each member.
    pub output_dim: usize,
    /// Number of members.
    pub ensemble_size: usize,
}

impl ConfigFile for EnsembleQValueNetworkConfig {}

/// `ensemble_size` independent MLPs mapping `[state, action]` to a value.
pub struct EnsembleQValueNetwork {
    state_dim: usize,
    action_dim: usize,
    hidden_dims: Vec<usize>,
    output_dim: usize,
    ensemble_size: usize,
    device: Device,
    varmap: VarMap,
    members: Vec<Mlp>,
}

impl EnsembleQValueNetwork {
    /// Constructs the ensemble with randomly initialized members.
    pub fn build(config: EnsembleQValueNetworkConfig, device: &Device) -> Result<Self> {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, device);
        let members = (0..config.ensemble_size)
            .map(|z| {
                let mlp_config = MlpConfig::new(
                    config.state_dim + config.action_dim,
                    config.hidden_dims.clone(),
                    config.output_dim,
                    false,
                );
                Mlp::build(vb.pp(format!("member{}", z)), mlp_config)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            state_dim: config.state_dim,
            action_dim: config.action_dim,
            hidden_dims: config.hidden_dims,
            output_dim: config.output_dim,
            ensemble_size: config.ensemble_size,
            device: device.clone(),
            varmap,
            members,
        })
    }

    /// Number of members.
    pub fn ensemble_size(&self) -> usize {
        self.ensemble_size
    }

    /// Dimension of the action representation taken as input.
    pub fn action_dim(&self) -> usize {
        self.action_dim
    }

    /// Dimension of the state taken as input.
    pub fn state_dim(&self) -> usize {
        self.state_dim
    }

    /// Parameters of all members.
    pub fn varmap(&self) -> &VarMap {
        &self.varmap
    }

    /// Values of member `z` for rows of `state` (`(batch, state_dim)`) and
    /// `action` (`(batch, action_dim)`).
    ///
    /// Returns shape `(batch,)` if `output_dim == 1`, `(batch, output_dim)` otherwise.
    pub fn get_q_values(&self, state: &Tensor, action: &Tensor, z: usize) -> Result<Tensor> {
        let member = self.members.get(z).ok_or(ArmoryError::InvalidEnsembleMember {
            index: z,
            size: self.ensemble_size,
        })?;
        let input = Tensor::cat(
            &[
                state.to_device(&self.device)?.to_dtype(DType::F32)?,
                action.to_device(&self.device)?.to_dtype(DType::F32)?,
            ],
            D::Minus1,
        )?;
        let q = member.forward(&input)?;

        match self.output_dim {
            1 => Ok(q.squeeze(D::Minus1)?),
            _ => Ok(q),
        }
    }

    /// Overwrites the parameters of all members with those of `other`.
    pub fn copy_params_from(&mut self, other: &Self) -> Result<()> {
        copy_params(&self.varmap, &other.varmap)
    }

    /// Saves the parameters.
    pub fn save<T: AsRef<Path>>(&self, path: T) -> Result<()> {
        self.varmap.save(&path)?;
        info!("Save ensemble q-network to {:?}", path.as_ref());
        Ok(())
    }

    /// Loads the parameters.
    pub fn load<T: AsRef<Path>>(&mut self, path: T) -> Result<()> {
        self.varmap.load(&path)?;
        info!("Load ensemble q-network from {:?}", path.as_ref());
        Ok(())
    }
}

impl CompareFields for EnsembleQValueNetwork {
    const KIND: &'static str = "EnsembleQValueNetwork";

    fn compare_fields(&self, other: &Self, cmp: &mut Comparison) {
        cmp.field("state_dim", &self.state_dim, &other.state_dim)
            .field("action_dim", &self.action_dim, &other.action_dim)
            .field("hidden_dims", &self.hidden_dims, &other.hidden_dims)
            .field("output_dim", &self.output_dim, &other.output_dim)
            .field("ensemble_size", &self.ensemble_size, &other.ensemble_size);
        compare_varmaps(cmp, "model", &self.varmap, &other.varmap);
    }
}
