#![warn(missing_docs)]
//! Core of the armory contextual bandit library.
//!
//! Every agent sub-module (history summarizers, regression models, bandit policy
//! learners, exploration strategies, action representations) implements
//! [`CompareFields`], which gives it the object-safe [`Compare`] capability.
//! Comparing two modules yields [`Differences`], one human-readable line per
//! discrepancy, empty when the modules are equivalent.
pub mod compare;
pub mod config;
pub mod error;
pub mod record;

pub use compare::{Compare, CompareFields, Comparison, Differences};
pub use config::ConfigFile;
pub use error::ArmoryError;
