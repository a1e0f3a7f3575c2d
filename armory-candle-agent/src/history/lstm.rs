use super::HistorySummarizationModule;
use crate::util::{compare_varmaps, copy_params};
use anyhow::Result;
use armory_core::{ArmoryError, CompareFields, Comparison, ConfigFile};
use candle_core::{DType, Device, Tensor};
use candle_nn::{
    rnn::{lstm, LSTMConfig, LSTM, RNN},
    VarBuilder, VarMap,
};
use log::trace;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
/// Configuration of [`LstmHistorySummarization`].
pub struct LstmHistorySummarizationConfig {
    /// Number of past interactions kept.
    pub history_length: usize,
    /// Size of the hidden state.
    pub hidden_dim: usize,
    /// Number of stacked LSTM layers.
    pub num_layers: usize,
    /// Size of an observation.
    pub observation_dim: usize,
    /// Size of an action.
    pub action_dim: usize,
}

impl ConfigFile for LstmHistorySummarizationConfig {}

/// Runs a stacked LSTM over the latest `history_length` pairs of observation
/// and action, and returns the final hidden state of the top layer.
pub struct LstmHistorySummarization {
    history_length: usize,
    hidden_dim: usize,
    num_layers: usize,
    observation_dim: usize,
    action_dim: usize,
    device: Device,
    varmap: VarMap,
    layers: Vec<LSTM>,
    history: VecDeque<Tensor>,
}

impl LstmHistorySummarization {
    /// Constructs the module with randomly initialized LSTM weights.
    pub fn build(config: LstmHistorySummarizationConfig, device: &Device) -> Result<Self> {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, device);
        let in_dim = config.observation_dim + config.action_dim;
        let layers = (0..config.num_layers)
            .map(|i| {
                let d = if i == 0 { in_dim } else { config.hidden_dim };
                let vb = vb.pp(format!("layer{}", i));
                Ok(lstm(d, config.hidden_dim, LSTMConfig::default(), vb)?)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            history_length: config.history_length,
            hidden_dim: config.hidden_dim,
            num_layers: config.num_layers,
            observation_dim: config.observation_dim,
            action_dim: config.action_dim,
            device: device.clone(),
            varmap,
            layers,
            history: VecDeque::with_capacity(config.history_length + 1),
        })
    }

    /// Size of the hidden state, which is also the output size.
    pub fn hidden_dim(&self) -> usize {
        self.hidden_dim
    }

    /// Parameters of the LSTM.
    pub fn varmap(&self) -> &VarMap {
        &self.varmap
    }

    /// Overwrites the LSTM weights with those of `other`.
    pub fn copy_params_from(&mut self, other: &Self) -> Result<()> {
        copy_params(&self.varmap, &other.varmap)
    }

    fn entry(&self, observation: &Tensor, action: Option<&Tensor>) -> Result<Tensor> {
        let observation = observation
            .to_device(&self.device)?
            .flatten_all()?
            .to_dtype(DType::F32)?;
        let action = match action {
            Some(a) => a.to_device(&self.device)?.flatten_all()?.to_dtype(DType::F32)?,
            None => Tensor::zeros(self.action_dim, DType::F32, &self.device)?,
        };
        let entry = Tensor::cat(&[observation, action], 0)?;
        let expected = self.observation_dim + self.action_dim;
        if entry.elem_count() != expected {
            return Err(ArmoryError::DimensionMismatch {
                what: "observation and action".to_string(),
                expected,
                actual: entry.elem_count(),
            }
            .into());
        }
        Ok(entry)
    }
}

impl HistorySummarizationModule for LstmHistorySummarization {
    fn summarize_history(
        &mut self,
        observation: &Tensor,
        action: Option<&Tensor>,
    ) -> Result<Tensor> {
        let entry = self.entry(observation, action)?;
        self.history.push_back(entry);
        while self.history.len() > self.history_length {
            self.history.pop_front();
        }

        // (1, history_length, observation_dim + action_dim), zero padded at the front
        let in_dim = self.observation_dim + self.action_dim;
        let mut steps = Vec::with_capacity(self.history_length);
        for _ in self.history.len()..self.history_length {
            steps.push(Tensor::zeros(in_dim, DType::F32, &self.device)?);
        }
        steps.extend(self.history.iter().cloned());
        let mut xs = Tensor::stack(&steps, 0)?.unsqueeze(0)?;

        let mut h = Tensor::zeros((1, self.hidden_dim), DType::F32, &self.device)?;
        for layer in self.layers.iter() {
            let states = layer.seq(&xs)?;
            if let Some(last) = states.last() {
                h = last.h().clone();
            }
            xs = layer.states_to_tensor(&states)?;
        }
        trace!("LstmHistorySummarization: {} steps", steps.len());

        Ok(h.squeeze(0)?)
    }

    fn reset(&mut self) {
        self.history.clear();
    }
}

impl CompareFields for LstmHistorySummarization {
    const KIND: &'static str = "LstmHistorySummarization";

    fn compare_fields(&self, other: &Self, cmp: &mut Comparison) {
        cmp.field("history_length", &self.history_length, &other.history_length)
            .field("hidden_dim", &self.hidden_dim, &other.hidden_dim)
            .field("num_layers", &self.num_layers, &other.num_layers)
            .field(
                "observation_dim",
                &self.observation_dim,
                &other.observation_dim,
            )
            .field("action_dim", &self.action_dim, &other.action_dim);
        compare_varmaps(cmp, "lstm", &self.varmap, &other.varmap);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use armory_core::Compare;

    fn config() -> LstmHistorySummarizationConfig {
        LstmHistorySummarizationConfig {
            history_length: 10,
            hidden_dim: 32,
            num_layers: 2,
            observation_dim: 6,
            action_dim: 4,
        }
    }

    #[test]
    fn test_summarize_history() -> Result<()> {
        let mut m = LstmHistorySummarization::build(config(), &Device::Cpu)?;
        let obs = Tensor::randn(0f32, 1f32, 6, &Device::Cpu)?;
        let act = Tensor::randn(0f32, 1f32, 4, &Device::Cpu)?;
        assert_eq!(m.summarize_history(&obs, None)?.dims(), &[32]);
        assert_eq!(m.summarize_history(&obs, Some(&act))?.dims(), &[32]);
        assert!(m.summarize_history(&act, None).is_err());
        Ok(())
    }

    #[test]
    fn test_copy_params_from() -> Result<()> {
        let m1 = LstmHistorySummarization::build(config(), &Device::Cpu)?;
        let mut m2 = LstmHistorySummarization::build(config(), &Device::Cpu)?;
        assert!(m1.compare(&m1).is_empty());
        assert!(m1.compare(&m2).mentions("lstm.layer0"));

        m2.copy_params_from(&m1)?;
        assert!(m1.compare(&m2).is_empty());

        let obs = Tensor::randn(0f32, 1f32, 6, &Device::Cpu)?;
        m2.summarize_history(&obs, None)?;
        assert!(m1.compare(&m2).is_empty());
        Ok(())
    }
}
