use super::{action_indices, ActionRepresentationModule};
use anyhow::Result;
use armory_core::{ArmoryError, CompareFields, Comparison};
use candle_core::Tensor;

/// Binary encoding of the action index on `bits_num` bits, most significant first.
#[derive(Debug, Clone)]
pub struct BinaryActionRepresentation {
    bits_num: usize,
}

impl BinaryActionRepresentation {
    /// Encodes actions on `bits_num` bits.
    pub fn new(bits_num: usize) -> Self {
        Self { bits_num }
    }

    /// Number of bits.
    pub fn bits_num(&self) -> usize {
        self.bits_num
    }

    /// Sets the number of bits.
    pub fn set_bits_num(&mut self, bits_num: usize) {
        self.bits_num = bits_num;
    }

    /// Number of actions that can be encoded.
    ///
    /// Fails when the count does not fit in a `usize`.
    pub fn max_number_actions(&self) -> Result<usize> {
        u32::try_from(self.bits_num)
            .ok()
            .and_then(|bits| 1usize.checked_shl(bits))
            .ok_or_else(|| ArmoryError::TooManyBits(self.bits_num).into())
    }
}

impl ActionRepresentationModule for BinaryActionRepresentation {
    fn represent(&self, actions: &Tensor) -> Result<Tensor> {
        let ixs = action_indices(actions, self.max_number_actions()?)?;
        let v = ixs
            .iter()
            .flat_map(|a| {
                (0..self.bits_num)
                    .rev()
                    .map(move |bit| ((a >> bit) & 1) as f32)
            })
            .collect::<Vec<_>>();
        Ok(Tensor::from_vec(
            v,
            (ixs.len(), self.bits_num),
            actions.device(),
        )?)
    }

    fn representation_dim(&self) -> usize {
        self.bits_num
    }
}

impl CompareFields for BinaryActionRepresentation {
    const KIND: &'static str = "BinaryActionRepresentation";

    fn compare_fields(&self, other: &Self, cmp: &mut Comparison) {
        cmp.field("bits_num", &self.bits_num, &other.bits_num);
    }
}
