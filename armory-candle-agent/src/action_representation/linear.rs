use super::ActionRepresentationModule;
use crate::util::{compare_varmaps, copy_params};
use anyhow::Result;
use armory_core::{CompareFields, Comparison};
use candle_core::{DType, Device, Module, Tensor};
use candle_nn::{linear, Linear, VarBuilder, VarMap};

/// A trainable affine map from action vectors to representations.
pub struct LinearActionRepresentation {
    input_dim: usize,
    representation_dim: usize,
    device: Device,
    varmap: VarMap,
    linear: Linear,
}

impl LinearActionRepresentation {
    /// Constructs the map with randomly initialized weights.
    pub fn build(input_dim: usize, representation_dim: usize, device: &Device) -> Result<Self> {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, device);
        let linear = linear(input_dim, representation_dim, vb.pp("linear"))?;

        Ok(Self {
            input_dim,
            representation_dim,
            device: device.clone(),
            varmap,
            linear,
        })
    }

    /// Size of an input action.
    pub fn input_dim(&self) -> usize {
        self.input_dim
    }

    /// Overwrites the weights with those of `other`.
    pub fn copy_params_from(&mut self, other: &Self) -> Result<()> {
        copy_params(&self.varmap, &other.varmap)
    }
}

impl ActionRepresentationModule for LinearActionRepresentation {
    fn represent(&self, actions: &Tensor) -> Result<Tensor> {
        let xs = actions
            .to_device(&self.device)?
            .to_dtype(DType::F32)?
            .reshape(((), self.input_dim))?;
        Ok(self.linear.forward(&xs)?)
    }

    fn representation_dim(&self) -> usize {
        self.representation_dim
    }

    fn varmap(&self) -> Option<&VarMap> {
        Some(&self.varmap)
    }
}

impl CompareFields for LinearActionRepresentation {
    const KIND: &'static str = "LinearActionRepresentation";

    fn compare_fields(&self, other: &Self, cmp: &mut Comparison) {
        cmp.field("input_dim", &self.input_dim, &other.input_dim)
            .field(
                "representation_dim",
                &self.representation_dim,
                &other.representation_dim,
            );
        compare_varmaps(cmp, "parameters", &self.varmap, &other.varmap);
    }
}
