// ============================================================
// Layer 4 — Masked-LM Dataset
// ============================================================
// One sample = one window of token ids as it comes out of the
// static pre-masker:
//
//   src_tokens  input seen by the model, some ids replaced
//               by [MASK]
//   target      original id at pre-masked positions, [PAD]
//               everywhere else
//
// Both vectors always have the same length. Padding to a
// common batch length is the batcher's job.

use burn::data::dataset::Dataset;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MlmSample {
    pub src_tokens: Vec<u32>,
    pub target:     Vec<u32>,
}

impl MlmSample {
    /// A sample with no pre-masking: every target slot is `pad_id`.
    pub fn unmasked(tokens: Vec<u32>, pad_id: u32) -> Self {
        let target = vec![pad_id; tokens.len()];
        Self { src_tokens: tokens, target }
    }

    pub fn len(&self) -> usize {
        self.src_tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.src_tokens.is_empty()
    }
}

#[cfg(test)]
impl MlmSample {
    pub fn num_supervised(&self, pad_id: u32) -> usize {
        self.target.iter().filter(|&&t| t != pad_id).count()
    }
}

pub struct MlmDataset {
    samples: Vec<MlmSample>,
}

impl MlmDataset {
    pub fn new(samples: Vec<MlmSample>) -> Self { Self { samples } }
}

impl Dataset<MlmSample> for MlmDataset {
    fn get(&self, index: usize) -> Option<MlmSample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}
