use super::ActionRepresentationModule;
use anyhow::Result;
use armory_core::{ArmoryError, CompareFields, Comparison};
use candle_core::{DType, Tensor};

/// Uses the action tensors as their own representation.
#[derive(Debug, Clone)]
pub struct IdentityActionRepresentation {
    max_number_actions: usize,
    representation_dim: usize,
}

impl IdentityActionRepresentation {
    /// Passes actions of `representation_dim` elements through unchanged.
    pub fn new(max_number_actions: usize, representation_dim: usize) -> Self {
        Self {
            max_number_actions,
            representation_dim,
        }
    }

    /// Number of actions.
    pub fn max_number_actions(&self) -> usize {
        self.max_number_actions
    }

    /// Sets the number of actions.
    pub fn set_max_number_actions(&mut self, max_number_actions: usize) {
        self.max_number_actions = max_number_actions;
    }
}

impl ActionRepresentationModule for IdentityActionRepresentation {
    fn represent(&self, actions: &Tensor) -> Result<Tensor> {
        let n = actions.elem_count();
        if n % self.representation_dim.max(1) != 0 {
            return Err(ArmoryError::DimensionMismatch {
                what: "action representation".to_string(),
                expected: self.representation_dim,
                actual: n,
            }
            .into());
        }
        let batch_size = n / self.representation_dim.max(1);
        Ok(actions
            .to_dtype(DType::F32)?
            .reshape((batch_size, self.representation_dim))?)
    }

    fn representation_dim(&self) -> usize {
        self.representation_dim
    }
}

impl CompareFields for IdentityActionRepresentation {
    const KIND: &'static str = "IdentityActionRepresentation";

    fn compare_fields(&self, other: &Self, cmp: &mut Comparison) {
        cmp.field(
            "max_number_actions",
            &self.max_number_actions,
            &other.max_number_actions,
        )
        .field(
            "representation_dim",
            &self.representation_dim,
            &other.representation_dim,
        );
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use armory_core::Compare;
    use candle_core::Device;

    #[test]
    fn test_identity() -> Result<()> {
        let m = IdentityActionRepresentation::new(4, 2);
        let actions = Tensor::new(&[[1f32, 2.], [3., 4.]], &Device::Cpu)?;
        assert_eq!(m.represent(&actions)?.dims(), &[2, 2]);
        assert!(m.represent(&Tensor::new(&[1f32, 2., 3.], &Device::Cpu)?).is_err());

        let mut m2 = m.clone();
        assert!(m.compare(&m2).is_empty());
        m2.set_max_number_actions(5);
        assert!(m.compare(&m2).mentions("max_number_actions"));
        Ok(())
    }
}
