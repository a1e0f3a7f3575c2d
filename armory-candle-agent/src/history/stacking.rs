use super::HistorySummarizationModule;
use anyhow::Result;
use armory_core::{ArmoryError, CompareFields, Comparison};
use candle_core::{DType, Tensor};
use std::collections::VecDeque;

/// Concatenates the latest `history_length` pairs of observation and action.
///
/// Slots not yet filled in an episode are zeros. The output has
/// `history_length * (observation_dim + action_dim)` elements, the latest
/// pair last.
#[derive(Debug, Clone)]
pub struct StackingHistorySummarization {
    observation_dim: usize,
    action_dim: usize,
    history_length: usize,
    history: VecDeque<Tensor>,
}

impl StackingHistorySummarization {
    /// Creates a module with an empty history.
    pub fn new(observation_dim: usize, action_dim: usize, history_length: usize) -> Self {
        Self {
            observation_dim,
            action_dim,
            history_length,
            history: VecDeque::with_capacity(history_length + 1),
        }
    }

    /// Number of past interactions kept.
    pub fn history_length(&self) -> usize {
        self.history_length
    }

    /// Changes the number of stacked pairs and forgets the history.
    pub fn set_history_length(&mut self, history_length: usize) {
        self.history_length = history_length;
        self.reset();
    }

    fn entry(&self, observation: &Tensor, action: Option<&Tensor>) -> Result<Tensor> {
        let observation = observation.flatten_all()?.to_dtype(DType::F32)?;
        let action = match action {
            Some(a) => a.flatten_all()?.to_dtype(DType::F32)?,
            None => Tensor::zeros(self.action_dim, DType::F32, observation.device())?,
        };
        for (what, expected, actual) in [
            ("observation", self.observation_dim, observation.elem_count()),
            ("action", self.action_dim, action.elem_count()),
        ] {
            if expected != actual {
                return Err(ArmoryError::DimensionMismatch {
                    what: what.to_string(),
                    expected,
                    actual,
                }
                .into());
            }
        }
        Ok(Tensor::cat(&[observation, action], 0)?)
    }
}

impl HistorySummarizationModule for StackingHistorySummarization {
    fn summarize_history(
        &mut self,
        observation: &Tensor,
        action: Option<&Tensor>,
    ) -> Result<Tensor> {
        let entry = self.entry(observation, action)?;
        let device = entry.device().clone();
        self.history.push_back(entry);
        while self.history.len() > self.history_length {
            self.history.pop_front();
        }

        let pad = self.history_length - self.history.len();
        let mut parts = Vec::with_capacity(self.history_length);
        if pad > 0 {
            let dim = pad * (self.observation_dim + self.action_dim);
            parts.push(Tensor::zeros(dim, DType::F32, &device)?);
        }
        parts.extend(self.history.iter().cloned());
        Ok(Tensor::cat(&parts, 0)?)
    }

    fn reset(&mut self) {
        self.history.clear();
    }
}

impl CompareFields for StackingHistorySummarization {
    const KIND: &'static str = "StackingHistorySummarization";

    fn compare_fields(&self, other: &Self, cmp: &mut Comparison) {
        cmp.field(
            "observation_dim",
            &self.observation_dim,
            &other.observation_dim,
        )
        .field("action_dim", &self.action_dim, &other.action_dim)
        .field("history_length", &self.history_length, &other.history_length);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use armory_core::Compare;
    use candle_core::Device;

    #[test]
    fn test_stacking() -> Result<()> {
        let mut m = StackingHistorySummarization::new(2, 1, 3);
        let o1 = Tensor::new(&[1f32, 2.0], &Device::Cpu)?;
        let o2 = Tensor::new(&[3f32, 4.0], &Device::Cpu)?;
        let a = Tensor::new(&[5f32], &Device::Cpu)?;

        let s = m.summarize_history(&o1, None)?.to_vec1::<f32>()?;
        assert_eq!(s, vec![0., 0., 0., 0., 0., 0., 1., 2., 0.]);
        let s = m.summarize_history(&o2, Some(&a))?.to_vec1::<f32>()?;
        assert_eq!(s, vec![0., 0., 0., 1., 2., 0., 3., 4., 5.]);
        m.summarize_history(&o2, Some(&a))?;
        let s = m.summarize_history(&o1, Some(&a))?.to_vec1::<f32>()?;
        assert_eq!(s, vec![3., 4., 5., 3., 4., 5., 1., 2., 5.]);

        assert!(m.summarize_history(&a, None).is_err());
        Ok(())
    }

    #[test]
    fn test_history_is_not_compared() -> Result<()> {
        let mut m1 = StackingHistorySummarization::new(2, 1, 3);
        let mut m2 = StackingHistorySummarization::new(2, 1, 3);
        m1.summarize_history(&Tensor::new(&[1f32, 2.0], &Device::Cpu)?, None)?;
        assert!(m1.compare(&m2).is_empty());

        m2.set_history_length(4);
        assert_eq!(m1.compare(&m2).to_string(), "history_length: 3 != 4");
        Ok(())
    }
}
