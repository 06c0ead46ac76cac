// ============================================================
// Layer 2 — Mask Use Case
// ============================================================
// Shows which tokens of a sentence a trained masker would
// choose:
//
//   1. Load train_config.json, tokenizer and vocabulary
//   2. Rebuild the model and load the latest checkpoint
//   3. Clean + tokenize the sentence
//   4. Run the masker, take the top num_mask positions
//
// Rendering is left to the CLI; this layer returns symbols
// alongside the raw report.

use anyhow::Result;
use burn::prelude::*;
use tokenizers::Tokenizer;

use crate::data::preprocessor::Preprocessor;
use crate::domain::vocabulary::Vocabulary;
use crate::infra::{
    checkpoint::CheckpointManager,
    tokenizer_store::{encode, TokenizerStore},
};
use crate::ml::inferencer::{MaskReport, MaskerInferencer};

pub type InferBackend = burn::backend::Wgpu;

pub struct MaskInspection {
    pub symbols: Vec<String>,
    pub report:  MaskReport,
}

pub struct MaskUseCase<B: Backend> {
    tokenizer:  Tokenizer,
    vocab:      Vocabulary,
    inferencer: MaskerInferencer<B>,
}

impl MaskUseCase<InferBackend> {
    pub fn open(checkpoint_dir: &str) -> Result<Self> {
        Self::with_device(checkpoint_dir, burn::backend::wgpu::WgpuDevice::default())
    }
}

impl<B: Backend> MaskUseCase<B> {
    pub fn with_device(checkpoint_dir: &str, device: B::Device) -> Result<Self> {
        let (tokenizer, vocab) = TokenizerStore::new(checkpoint_dir).load()?;
        let ckpt = CheckpointManager::new(checkpoint_dir)?;
        let inferencer = MaskerInferencer::from_checkpoint(&ckpt, vocab.len(), vocab.pad_id(), device)?;
        Ok(Self { tokenizer, vocab, inferencer })
    }

    pub fn inspect(&self, sentence: &str) -> Result<MaskInspection> {
        let text = Preprocessor::new().clean(sentence);
        let ids  = encode(&self.tokenizer, &text)?;
        let report = self.inferencer.inspect(&ids)?;

        let symbols = report
            .token_ids
            .iter()
            .map(|&id| self.vocab.symbol(id).unwrap_or("[UNK]").to_string())
            .collect();

        Ok(MaskInspection { symbols, report })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::train_use_case::TrainConfig;
    use burn::backend::NdArray;

    #[test]
    fn test_inspect_from_saved_run() {
        let dir = std::env::temp_dir().join(format!("mask_co_learner_mask_uc_{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        let dir_str = dir.to_string_lossy().to_string();

        let texts = vec!["the masker picks hard tokens for the learner".to_string()];
        let (_, vocab) = TokenizerStore::new(&dir).build_and_save(&texts, 64).unwrap();

        let cfg = TrainConfig {
            max_seq_len: 16, d_model: 8, num_heads: 2, num_layers: 1, d_ff: 16,
            ..TrainConfig::default()
        };
        let ckpt = CheckpointManager::new(&dir).unwrap();
        ckpt.save_config(&cfg).unwrap();
        let device = Default::default();
        let model = cfg.model_config(&vocab).init::<NdArray>(&device);
        ckpt.save_model(&model, 1).unwrap();

        let use_case = MaskUseCase::<NdArray>::with_device(&dir_str, device).unwrap();
        let out = use_case.inspect("The  masker picks tokens").unwrap();

        assert_eq!(out.symbols, vec!["the", "masker", "picks", "tokens"]);
        assert_eq!(out.report.selected.len(), 1);

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
