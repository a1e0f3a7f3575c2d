use super::{argmax_rows, ExplorationInput, ExplorationModule};
use anyhow::Result;
use armory_core::{CompareFields, Comparison};
use rand::rngs::SmallRng;
use std::collections::BTreeMap;

/// UCB1 from action counts: argmax of `value + sqrt(2 ln t / n_a)`.
///
/// `n_a` is the number of times action `a` was chosen by this module and `t`
/// the total count. Actions never chosen come first.
#[derive(Debug, Clone, Default)]
pub struct VanillaUcbExploration {
    action_execution_count: BTreeMap<usize, usize>,
}

impl VanillaUcbExploration {
    /// Creates the module with no action executed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of times each action was chosen.
    pub fn action_execution_count(&self) -> &BTreeMap<usize, usize> {
        &self.action_execution_count
    }

    /// Replaces the execution counts.
    pub fn set_action_execution_count(&mut self, counts: BTreeMap<usize, usize>) {
        self.action_execution_count = counts;
    }
}

impl ExplorationModule for VanillaUcbExploration {
    fn act(&mut self, input: &ExplorationInput, _rng: &mut SmallRng) -> Result<Vec<usize>> {
        let values = input.require_values()?;
        let total = self.action_execution_count.values().sum::<usize>().max(1) as f64;
        let mut scores = values.clone();
        for ((_, a), v) in scores.indexed_iter_mut() {
            *v += match self.action_execution_count.get(&a) {
                Some(&n) if n > 0 => (2.0 * total.ln() / n as f64).sqrt(),
                _ => f64::INFINITY,
            };
        }

        let actions = argmax_rows(&scores);
        for a in actions.iter() {
            *self.action_execution_count.entry(*a).or_insert(0) += 1;
        }
        Ok(actions)
    }
}

impl CompareFields for VanillaUcbExploration {
    const KIND: &'static str = "VanillaUcbExploration";

    fn compare_fields(&self, other: &Self, cmp: &mut Comparison) {
        cmp.field(
            "action_execution_count",
            &self.action_execution_count,
            &other.action_execution_count,
        );
    }
}
