//! Utilities.
mod linalg;
mod named_tensors;
use anyhow::Result;
use armory_core::{ArmoryError, Comparison};
use candle_core::{DType, Device, Tensor, WithDType};
use candle_nn::VarMap;
pub use linalg::{append_ones, cholesky, inverse};
pub use named_tensors::NamedTensors;
use ndarray::{Array1, Array2, Array3, ArrayD};
use num_traits::AsPrimitive;
use serde::{Deserialize, Serialize};
use std::{convert::TryFrom, str::FromStr};

/// Loss used to train neural bandit models.
#[derive(Debug, Deserialize, Serialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum LossType {
    /// Mean squared error.
    Mse,

    /// Mean absolute error.
    Mae,

    /// Binary cross entropy on logits, for rewards in `[0, 1]`.
    CrossEntropy,
}

impl FromStr for LossType {
    type Err = ArmoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mse" => Ok(Self::Mse),
            "mae" => Ok(Self::Mae),
            "cross_entropy" => Ok(Self::CrossEntropy),
            _ => Err(ArmoryError::UnknownLossType(s.to_string())),
        }
    }
}

impl LossType {
    /// Computes the loss of predictions `pred` against targets `target`.
    ///
    /// If `weight` is given, the per-sample losses are averaged with it.
    pub fn loss(&self, pred: &Tensor, target: &Tensor, weight: Option<&Tensor>) -> Result<Tensor> {
        let per_sample = match self {
            Self::Mse => (pred - target)?.sqr()?,
            Self::Mae => (pred - target)?.abs()?,
            Self::CrossEntropy => {
                // max(x, 0) - x * y + log(1 + exp(-|x|))
                let softplus = (pred.abs()?.neg()?.exp()? + 1.0)?.log()?;
                ((pred.relu()? - (pred * target)?)? + softplus)?
            }
        };

        match weight {
            None => Ok(per_sample.mean_all()?),
            Some(w) => {
                let w = w.to_dtype(per_sample.dtype())?;
                Ok(((per_sample * &w)?.sum_all()? / w.sum_all()?.to_scalar::<f32>()? as f64)?)
            }
        }
    }
}

/// Size of the first axis of `t`.
///
/// Fails on a 0-dimensional tensor, which has no batch axis.
pub fn batch_size(t: &Tensor, what: &str) -> Result<usize> {
    match t.dims().first() {
        Some(n) => Ok(*n),
        None => Err(ArmoryError::DimensionMismatch {
            what: format!("rank of {}", what),
            expected: 1,
            actual: 0,
        }
        .into()),
    }
}

/// Converts a tensor into a dynamic-dimensional array.
pub fn tensor_to_arrayd<T>(t: Tensor, delete_batch_dim: bool) -> Result<ArrayD<T>>
where
    T: WithDType,
{
    let shape = match delete_batch_dim {
        false => t.dims().to_vec(),
        true => {
            batch_size(&t, "tensor with a batch axis")?;
            t.dims()[1..].to_vec()
        }
    };
    let v: Vec<T> = t.flatten_all()?.to_vec1()?;

    Ok(ndarray::Array1::<T>::from(v).into_shape(ndarray::IxDyn(&shape))?)
}

/// Converts a dynamic-dimensional array into a tensor.
pub fn arrayd_to_tensor<T1, T2>(a: ArrayD<T1>, add_batch_dim: bool) -> Result<Tensor>
where
    T1: AsPrimitive<T2>,
    T2: WithDType,
{
    let shape = a.shape().to_vec();
    let v = a.iter().map(|e| e.as_()).collect::<Vec<_>>();
    let t: Tensor = TryFrom::<Vec<T2>>::try_from(v)?;
    let t = t.reshape(shape)?;

    match add_batch_dim {
        true => Ok(t.unsqueeze(0)?),
        false => Ok(t),
    }
}

/// Flattens a tensor into a vector of `f64`.
pub fn tensor_to_array1(t: &Tensor) -> Result<Array1<f64>> {
    let v = t.to_dtype(DType::F64)?.flatten_all()?.to_vec1::<f64>()?;
    Ok(Array1::from(v))
}

/// Converts a tensor of shape `(rows, cols)` into an `f64` matrix.
pub fn tensor_to_array2(t: &Tensor) -> Result<Array2<f64>> {
    let (rows, cols) = t.dims2()?;
    let v = t.to_dtype(DType::F64)?.flatten_all()?.to_vec1::<f64>()?;
    Ok(Array2::from_shape_vec((rows, cols), v)?)
}

/// Converts a tensor of shape `(batch, n_actions, dim)` into an `f64` array.
pub fn tensor_to_array3(t: &Tensor) -> Result<Array3<f64>> {
    let dims = t.dims3()?;
    let v = t.to_dtype(DType::F64)?.flatten_all()?.to_vec1::<f64>()?;
    Ok(Array3::from_shape_vec(dims, v)?)
}

/// Converts an `f64` vector into an `f32` tensor of shape `(len,)`.
pub fn array1_to_tensor(a: &Array1<f64>, device: &Device) -> Result<Tensor> {
    let t = arrayd_to_tensor::<f64, f32>(a.clone().into_dyn(), false)?;
    Ok(t.to_device(device)?)
}

/// Compares two tensors element-wise as `f32` arrays.
///
/// Conversion failures are recorded as discrepancies.
pub fn compare_tensors(cmp: &mut Comparison, name: &str, lhs: &Tensor, rhs: &Tensor) {
    let to_array = |t: &Tensor| -> Result<ArrayD<f32>> {
        tensor_to_arrayd(t.to_dtype(DType::F32)?, false)
    };

    match (to_array(lhs), to_array(rhs)) {
        (Ok(lhs), Ok(rhs)) => {
            cmp.array(name, &lhs, &rhs);
        }
        (Err(e), _) | (_, Err(e)) => {
            cmp.failure(name, e);
        }
    }
}

/// Compares the parameters of two [`VarMap`]s by name.
///
/// Names are visited in sorted order. A parameter present in only one of the
/// maps is a discrepancy.
pub fn compare_varmaps(cmp: &mut Comparison, name: &str, lhs: &VarMap, rhs: &VarMap) {
    if std::ptr::eq(lhs.data(), rhs.data()) {
        return;
    }

    let (lhs, rhs) = match (NamedTensors::copy_from(lhs), NamedTensors::copy_from(rhs)) {
        (Ok(lhs), Ok(rhs)) => (lhs, rhs),
        (Err(e), _) | (_, Err(e)) => {
            cmp.failure(name, e);
            return;
        }
    };

    for (k, l) in lhs.named_tensors.iter() {
        let path = format!("{}.{}", name, k);
        match rhs.named_tensors.get(k) {
            Some(r) => compare_tensors(cmp, &path, l, r),
            None => {
                cmp.push(format!("{}: present != missing", path));
            }
        }
    }
    for k in rhs.named_tensors.keys() {
        if !lhs.named_tensors.contains_key(k) {
            cmp.push(format!("{}.{}: missing != present", name, k));
        }
    }
}

/// Overwrites the parameters of `dest` with those of `src`, matching them by name.
pub fn copy_params(dest: &VarMap, src: &VarMap) -> Result<()> {
    if std::ptr::eq(dest.data(), src.data()) {
        return Ok(());
    }
    NamedTensors::copy_from(src)?.copy_to(dest)
}
