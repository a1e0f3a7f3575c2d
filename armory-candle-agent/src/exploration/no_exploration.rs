use super::{ExplorationInput, ExplorationModule};
use anyhow::Result;
use armory_core::{CompareFields, Comparison};
use rand::rngs::SmallRng;

/// Always takes the greedy action.
#[derive(Debug, Clone, Default)]
pub struct NoExploration;

impl NoExploration {
    /// Creates the module.
    pub fn new() -> Self {
        Self
    }
}

impl ExplorationModule for NoExploration {
    fn act(&mut self, input: &ExplorationInput, _rng: &mut SmallRng) -> Result<Vec<usize>> {
        input.greedy_actions()
    }
}

impl CompareFields for NoExploration {
    const KIND: &'static str = "NoExploration";

    fn compare_fields(&self, _other: &Self, _cmp: &mut Comparison) {}
}
