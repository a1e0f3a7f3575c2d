use super::{action_indices, ActionRepresentationModule};
use anyhow::Result;
use armory_core::{CompareFields, Comparison};
use candle_core::Tensor;

/// One-hot vectors of length `max_number_actions`.
#[derive(Debug, Clone)]
pub struct OneHotActionRepresentation {
    max_number_actions: usize,
}

impl OneHotActionRepresentation {
    /// One-hot vectors for `max_number_actions` actions.
    pub fn new(max_number_actions: usize) -> Self {
        Self { max_number_actions }
    }

    /// Number of actions, and length of a representation.
    pub fn max_number_actions(&self) -> usize {
        self.max_number_actions
    }

    /// Sets the number of actions.
    pub fn set_max_number_actions(&mut self, max_number_actions: usize) {
        self.max_number_actions = max_number_actions;
    }
}

impl ActionRepresentationModule for OneHotActionRepresentation {
    fn represent(&self, actions: &Tensor) -> Result<Tensor> {
        let n = self.max_number_actions;
        let ixs = action_indices(actions, n)?;
        let mut v = vec![0f32; ixs.len() * n];
        for (row, a) in ixs.iter().enumerate() {
            v[row * n + a] = 1.0;
        }
        Ok(Tensor::from_vec(v, (ixs.len(), n), actions.device())?)
    }

    fn representation_dim(&self) -> usize {
        self.max_number_actions
    }
}

impl CompareFields for OneHotActionRepresentation {
    const KIND: &'static str = "OneHotActionRepresentation";

    fn compare_fields(&self, other: &Self, cmp: &mut Comparison) {
        cmp.field(
            "max_number_actions",
            &self.max_number_actions,
            &other.max_number_actions,
        );
    }
}
