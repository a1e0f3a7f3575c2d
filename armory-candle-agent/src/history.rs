//! History summarization modules.
//!
//! A history summarization module turns the stream of observations and actions
//! of an episode into the state given to a policy learner.
mod identity;
mod lstm;
mod stacking;
use anyhow::Result;
use armory_core::Compare;
use candle_core::Tensor;
pub use identity::IdentityHistorySummarization;
pub use lstm::{LstmHistorySummarization, LstmHistorySummarizationConfig};
pub use stacking::StackingHistorySummarization;

/// Summarizes the interaction history.
pub trait HistorySummarizationModule: Compare {
    /// Appends an observation and the action taken before it, then returns the
    /// summarized history.
    ///
    /// `action` is `None` at the beginning of an episode.
    fn summarize_history(&mut self, observation: &Tensor, action: Option<&Tensor>)
        -> Result<Tensor>;

    /// Forgets the history.
    fn reset(&mut self);
}
