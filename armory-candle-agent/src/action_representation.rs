//! Action representation modules.
//!
//! These modules map the actions of a batch to the vectors fed to value
//! models alongside the state.
mod binary;
mod identity;
mod linear;
mod one_hot;
use anyhow::Result;
use armory_core::{ArmoryError, Compare};
use candle_core::{DType, Tensor};
use candle_nn::VarMap;
pub use binary::BinaryActionRepresentation;
pub use identity::IdentityActionRepresentation;
pub use linear::LinearActionRepresentation;
pub use one_hot::OneHotActionRepresentation;

/// Maps actions to their vector representations.
pub trait ActionRepresentationModule: Compare {
    /// Represents a batch of actions.
    ///
    /// `actions` has one row per action; the result has shape
    /// `(batch, representation_dim)` and dtype `f32`.
    fn represent(&self, actions: &Tensor) -> Result<Tensor>;

    /// Number of elements of a representation.
    fn representation_dim(&self) -> usize;

    /// Trainable parameters, if any.
    fn varmap(&self) -> Option<&VarMap> {
        None
    }
}

/// Reads a batch of action indices, each smaller than `n`.
fn action_indices(actions: &Tensor, n: usize) -> Result<Vec<usize>> {
    let ixs = actions
        .flatten_all()?
        .to_dtype(DType::F64)?
        .to_vec1::<f64>()?
        .into_iter()
        .map(|a| {
            if a.is_finite() && a >= 0.0 && a.fract() == 0.0 {
                Ok(a as usize)
            } else {
                Err(ArmoryError::NonIndexAction(a))
            }
        })
        .collect::<Result<Vec<_>, _>>()?;
    match ixs.iter().find(|&&a| a >= n) {
        Some(&action) => Err(ArmoryError::InvalidAction { action, n }.into()),
        None => Ok(ixs),
    }
}
