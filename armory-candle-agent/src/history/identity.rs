use super::HistorySummarizationModule;
use anyhow::Result;
use armory_core::{CompareFields, Comparison};
use candle_core::Tensor;

/// Uses the latest observation as the state.
#[derive(Debug, Clone, Default)]
pub struct IdentityHistorySummarization;

impl IdentityHistorySummarization {
    /// Creates the module.
    pub fn new() -> Self {
        Self
    }
}

impl HistorySummarizationModule for IdentityHistorySummarization {
    fn summarize_history(
        &mut self,
        observation: &Tensor,
        _action: Option<&Tensor>,
    ) -> Result<Tensor> {
        Ok(observation.clone())
    }

    fn reset(&mut self) {}
}

impl CompareFields for IdentityHistorySummarization {
    const KIND: &'static str = "IdentityHistorySummarization";

    fn compare_fields(&self, _other: &Self, _cmp: &mut Comparison) {}
}
