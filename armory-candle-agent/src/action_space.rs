//! Discrete action spaces.
use crate::util::compare_tensors;
use anyhow::Result;
use armory_core::{ArmoryError, CompareFields, Comparison};
use candle_core::{DType, Device, Tensor};

/// A finite set of actions, each represented by a tensor.
///
/// Actions are referred to by their index in the space. Every action tensor
/// has the same number of elements, [`DiscreteActionSpace::action_dim`].
#[derive(Debug, Clone)]
pub struct DiscreteActionSpace {
    actions: Vec<Tensor>,
    action_dim: usize,
}

impl DiscreteActionSpace {
    /// Creates an action space from action tensors.
    pub fn new(actions: Vec<Tensor>) -> Result<Self> {
        let action_dim = actions
            .first()
            .ok_or(ArmoryError::EmptyActionSpace)?
            .elem_count();
        for a in actions.iter() {
            if a.elem_count() != action_dim {
                return Err(ArmoryError::DimensionMismatch {
                    what: "action tensor".to_string(),
                    expected: action_dim,
                    actual: a.elem_count(),
                }
                .into());
            }
        }

        Ok(Self {
            actions,
            action_dim,
        })
    }

    /// Creates the space `{0, 1, ..., n - 1}` of scalar actions.
    pub fn from_indices(n: usize, device: &Device) -> Result<Self> {
        let actions = (0..n)
            .map(|i| Tensor::new(i as f32, device))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(actions)
    }

    /// Number of actions.
    pub fn n(&self) -> usize {
        self.actions.len()
    }

    /// Number of elements of each action tensor.
    pub fn action_dim(&self) -> usize {
        self.action_dim
    }

    /// The action tensors.
    pub fn actions(&self) -> &[Tensor] {
        &self.actions
    }

    /// Returns the action with the given index.
    pub fn get(&self, i: usize) -> Result<&Tensor> {
        self.actions.get(i).ok_or_else(|| {
            ArmoryError::InvalidAction {
                action: i,
                n: self.n(),
            }
            .into()
        })
    }

    /// Stacks the actions into an `f32` tensor of shape `(n, action_dim)`.
    pub fn to_tensor(&self) -> Result<Tensor> {
        let rows = self
            .actions
            .iter()
            .map(|a| a.flatten_all()?.to_dtype(DType::F32))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Tensor::stack(&rows, 0)?)
    }

    /// Checks that every index refers to an action of this space.
    pub fn check_actions(&self, actions: &[usize]) -> Result<()> {
        match actions.iter().find(|&&a| a >= self.n()) {
            Some(&action) => Err(ArmoryError::InvalidAction {
                action,
                n: self.n(),
            }
            .into()),
            None => Ok(()),
        }
    }
}

impl CompareFields for DiscreteActionSpace {
    const KIND: &'static str = "DiscreteActionSpace";

    fn compare_fields(&self, other: &Self, cmp: &mut Comparison) {
        cmp.field("n", &self.n(), &other.n())
            .field("action_dim", &self.action_dim, &other.action_dim);
        // a length mismatch still compares the common prefix
        for (i, (l, r)) in self.actions.iter().zip(other.actions.iter()).enumerate() {
            compare_tensors(cmp, &format!("actions[{}]", i), l, r);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use armory_core::Compare;

    #[test]
    fn test_from_indices() -> Result<()> {
        let space = DiscreteActionSpace::from_indices(3, &Device::Cpu)?;
        assert_eq!(space.n(), 3);
        assert_eq!(space.action_dim(), 1);
        assert_eq!(
            space.to_tensor()?.to_vec2::<f32>()?,
            vec![vec![0.0], vec![1.0], vec![2.0]]
        );
        assert!(space.check_actions(&[0, 2]).is_ok());
        assert!(space.check_actions(&[3]).is_err());
        Ok(())
    }

    #[test]
    fn test_invalid_spaces() -> Result<()> {
        assert!(DiscreteActionSpace::new(vec![]).is_err());
        let a = Tensor::zeros(2, DType::F32, &Device::Cpu)?;
        let b = Tensor::zeros(3, DType::F32, &Device::Cpu)?;
        assert!(DiscreteActionSpace::new(vec![a, b]).is_err());
        Ok(())
    }

    #[test]
    fn test_compare() -> Result<()> {
        let s1 = DiscreteActionSpace::from_indices(3, &Device::Cpu)?;
        let s2 = DiscreteActionSpace::from_indices(3, &Device::Cpu)?;
        assert!(s1.compare(&s1).is_empty());
        assert!(s1.compare(&s2).is_empty());

        let s3 = DiscreteActionSpace::new(vec![
            Tensor::new(0f32, &Device::Cpu)?,
            Tensor::new(1f32, &Device::Cpu)?,
            Tensor::new(5f32, &Device::Cpu)?,
        ])?;
        let diffs = s1.compare(&s3);
        assert_eq!(diffs.len(), 1);
        assert!(diffs.mentions("actions[2]"));

        let s4 = DiscreteActionSpace::from_indices(4, &Device::Cpu)?;
        assert_eq!(s1.compare(&s4).to_string(), "n: 3 != 4");

        let s5 = DiscreteActionSpace::new(vec![
            Tensor::new(0f32, &Device::Cpu)?,
            Tensor::new(7f32, &Device::Cpu)?,
        ])?;
        let diffs = s1.compare(&s5);
        assert_eq!(diffs.len(), 2);
        assert_eq!(diffs.lines()[0], "n: 3 != 2");
        assert!(diffs.mentions("actions[1]"));
        assert!(!diffs.mentions("actions[0]"));
        assert!(!diffs.mentions("actions[2]"));
        Ok(())
    }
}
