use crate::util::batch_size;
use anyhow::Result;
use armory_core::ArmoryError;
use candle_core::{Device, Tensor};

/// A batch of contextual bandit interactions.
///
/// Row `i` holds the state observed, the index of the action played and the
/// reward received, optionally weighted.
#[derive(Clone, Debug)]
pub struct TransitionBatch {
    /// States of shape `(batch, state_dim)`.
    pub state: Tensor,

    /// Indices of the actions played.
    pub action: Vec<usize>,

    /// Rewards of shape `(batch,)`.
    pub reward: Tensor,

    /// Sample weights of shape `(batch,)`.
    pub weight: Option<Tensor>,
}

impl TransitionBatch {
    /// Creates a batch, checking that all parts have the same number of rows.
    pub fn new(state: Tensor, action: Vec<usize>, reward: Tensor) -> Result<Self> {
        let batch_size = batch_size(&state, "state")?;
        for (what, n) in [("action", action.len()), ("reward", reward.elem_count())] {
            if n != batch_size {
                return Err(ArmoryError::DimensionMismatch {
                    what: what.to_string(),
                    expected: batch_size,
                    actual: n,
                }
                .into());
            }
        }

        Ok(Self {
            state,
            action,
            reward: reward.flatten_all()?,
            weight: None,
        })
    }

    /// Sets sample weights.
    pub fn weight(mut self, weight: Tensor) -> Result<Self> {
        if weight.elem_count() != self.len() {
            return Err(ArmoryError::DimensionMismatch {
                what: "weight".to_string(),
                expected: self.len(),
                actual: weight.elem_count(),
            }
            .into());
        }
        self.weight = Some(weight.flatten_all()?);
        Ok(self)
    }

    /// Number of interactions in the batch.
    pub fn len(&self) -> usize {
        self.action.len()
    }

    /// Returns `true` if the batch has no interaction.
    pub fn is_empty(&self) -> bool {
        self.action.is_empty()
    }

    /// Returns the rows of the batch where `action` was played.
    pub fn select_action(&self, action: usize) -> Result<Option<Self>> {
        let rows = self
            .action
            .iter()
            .enumerate()
            .filter(|(_, a)| **a == action)
            .map(|(i, _)| i as u32)
            .collect::<Vec<_>>();
        if rows.is_empty() {
            return Ok(None);
        }

        let ixs = Tensor::new(rows.as_slice(), self.state.device())?;
        Ok(Some(Self {
            state: self.state.index_select(&ixs, 0)?,
            action: rows.iter().map(|_| action).collect(),
            reward: self.reward.index_select(&ixs, 0)?,
            weight: match &self.weight {
                Some(w) => Some(w.index_select(&ixs, 0)?),
                None => None,
            },
        }))
    }

    /// Moves the tensors of the batch to a device.
    pub fn to(&mut self, device: &Device) -> Result<()> {
        self.state = self.state.to_device(device)?;
        self.reward = self.reward.to_device(device)?;
        if let Some(w) = &self.weight {
            self.weight = Some(w.to_device(device)?);
        }
        Ok(())
    }
}
