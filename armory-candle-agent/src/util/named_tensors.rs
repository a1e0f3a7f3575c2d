use anyhow::Result;
use armory_core::ArmoryError;
use candle_core::Tensor;
use candle_nn::VarMap;
use std::collections::BTreeMap;

/// Snapshot of the parameters of a [`VarMap`], ordered by name.
pub struct NamedTensors {
    /// Parameters keyed by name.
    pub named_tensors: BTreeMap<String, Tensor>,
}

impl NamedTensors {
    /// Builds a snapshot from name-tensor pairs.
    pub fn from_pairs(pairs: Vec<(String, Tensor)>) -> Self {
        Self {
            named_tensors: pairs.into_iter().collect(),
        }
    }

    /// Copies the data of [`VarMap`].
    ///
    /// The tensors do not share storage with the variables, so later updates
    /// of the variables are not reflected in the snapshot.
    pub fn copy_from(vs: &VarMap) -> Result<Self> {
        let data = vs
            .data()
            .lock()
            .map_err(|e| ArmoryError::PoisonedVarMap(e.to_string()))?;
        let mut named_tensors = BTreeMap::new();
        for (k, v) in data.iter() {
            named_tensors.insert(k.clone(), v.as_tensor().copy()?);
        }

        Ok(Self { named_tensors })
    }

    /// Copies the named tensors to the variables of [`VarMap`] with the same names.
    ///
    /// Every variable of `vs` must have a counterpart of the same shape.
    pub fn copy_to(&self, vs: &VarMap) -> Result<()> {
        let dest = vs
            .data()
            .lock()
            .map_err(|e| ArmoryError::PoisonedVarMap(e.to_string()))?;

        for (name, var) in dest.iter() {
            let src = self
                .named_tensors
                .get(name)
                .ok_or_else(|| ArmoryError::MissingParameter(name.clone()))?;
            var.set(src)?;
        }

        Ok(())
    }
}

impl Clone for NamedTensors {
    fn clone(&self) -> Self {
        Self {
            named_tensors: self.named_tensors.clone(),
        }
    }
}
