#![warn(missing_docs)]
//! Contextual bandit agent modules implemented with [candle](https://crates.io/crates/candle-core).
//!
//! Every module kind implements [`armory_core::CompareFields`], so two
//! instances can be checked for structural equivalence:
//!
//! ```rust
//! use armory_candle_agent::exploration::{UcbExploration, Warmup};
//! use armory_core::Compare;
//!
//! let m1 = Warmup::new(Box::new(UcbExploration::new(1.0)), 1000);
//! let m2 = Warmup::new(Box::new(UcbExploration::new(0.5)), 1000);
//! assert_eq!(
//!     m1.compare(&m2).to_string(),
//!     "exploration_module.alpha: 1.0 != 0.5"
//! );
//! ```
pub mod action_representation;
pub mod action_space;
pub mod bandit;
mod batch;
pub mod exploration;
pub mod history;
pub mod mlp;
pub mod model;
pub mod network;
pub mod opt;
pub mod util;
pub use batch::TransitionBatch;
