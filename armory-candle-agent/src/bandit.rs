//! Contextual bandit policy learners.
//!
//! A policy learner scores every action of a [`DiscreteActionSpace`] in the
//! current state, hands the scores to its exploration module to pick an
//! action, and learns from batches of (state, action, reward) interactions.
//!
//! [`DiscreteActionSpace`]: crate::action_space::DiscreteActionSpace
mod base;
mod disjoint;
mod disjoint_linear;
mod linear;
mod neural;
mod neural_linear;
pub use base::{all_action_features, played_features, ContextualBandit, Scores};
pub use disjoint::DisjointBanditContainer;
pub use disjoint_linear::{DisjointLinearBandit, DisjointLinearBanditConfig};
pub use linear::{LinearBandit, LinearBanditConfig};
pub use neural::{NeuralBandit, NeuralBanditConfig};
pub use neural_linear::{NeuralLinearBandit, NeuralLinearBanditConfig};
