// ============================================================
// Layer 5 — Masker Inferencer
// ============================================================
// Runs a trained masker over one tokenized sentence and
// reports what it would mask:
//
//   ids [1, S] → masker → probabilities [S]
//             → top num_mask(S) positions (deterministic)
//             → entropy / top-gap diagnostics
//
// The input is truncated to max_seq_len; no padding is added,
// so every position is a real token.

use anyhow::Result;
use burn::prelude::*;
use serde::Serialize;

use crate::domain::{
    diagnostics::MaskerDiagnostics,
    masking::{num_mask, select_top_k},
};
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::criterion::float_rows;
use crate::ml::model::{CoLearnerConfig, CoLearnerModel, Masker};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaskedPosition {
    pub position:    usize,
    pub token_id:    u32,
    pub probability: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct MaskReport {
    pub token_ids:     Vec<u32>,
    pub probabilities: Vec<f32>,
    /// Highest probability first
    pub selected:      Vec<MaskedPosition>,
    pub diagnostics:   MaskerDiagnostics,
}

pub struct MaskerInferencer<B: Backend> {
    model:       CoLearnerModel<B>,
    max_seq_len: usize,
    device:      B::Device,
}

impl<B: Backend> MaskerInferencer<B> {
    pub fn new(model: CoLearnerModel<B>, max_seq_len: usize, device: B::Device) -> Self {
        Self { model, max_seq_len, device }
    }

    /// Rebuild the architecture from the saved config, then load the
    /// latest weights. Dropout is disabled for inspection.
    pub fn from_checkpoint(
        ckpt_manager: &CheckpointManager,
        vocab_size:   usize,
        pad_id:       u32,
        device:       B::Device,
    ) -> Result<Self> {
        let cfg = ckpt_manager.load_config()?;
        let model_cfg = CoLearnerConfig::new(
            vocab_size, cfg.max_seq_len, cfg.d_model,
            cfg.num_heads, cfg.num_layers, cfg.d_ff, 0.0, pad_id,
        );
        let model = ckpt_manager.load_model(model_cfg.init::<B>(&device), &device)?;
        tracing::info!("Masker loaded from checkpoint");
        Ok(Self::new(model, cfg.max_seq_len, device))
    }

    pub fn inspect(&self, token_ids: &[u32]) -> Result<MaskReport> {
        let ids: Vec<u32> = token_ids.iter().copied().take(self.max_seq_len).collect();
        anyhow::ensure!(!ids.is_empty(), "Nothing to inspect: the sentence has no tokens");

        let flat: Vec<i64> = ids.iter().map(|&t| t as i64).collect();
        let input = Tensor::<B, 2, Int>::from_data(TensorData::new(flat, [1, ids.len()]), &self.device);

        let rows          = float_rows(self.model.masking_probabilities(input));
        let diagnostics   = MaskerDiagnostics::from_rows(&rows);
        let probabilities = rows.into_iter().next().unwrap_or_default();

        let selected = select_top_k(&probabilities, num_mask(ids.len()))
            .into_iter()
            .map(|position| MaskedPosition {
                position,
                token_id:    ids[position],
                probability: probabilities[position],
            })
            .collect();

        tracing::debug!("inspected {} tokens, entropy={:.4}", ids.len(), diagnostics.entropy);
        Ok(MaskReport { token_ids: ids, probabilities, selected, diagnostics })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn inferencer(max_seq_len: usize) -> MaskerInferencer<TestBackend> {
        let device = Default::default();
        let model  = CoLearnerConfig::new(30, 16, 8, 2, 1, 16, 0.0, 1).init(&device);
        MaskerInferencer::new(model, max_seq_len, device)
    }

    #[test]
    fn test_report_selects_num_mask_highest_positions() {
        let ids: Vec<u32> = (5..25).collect();
        let report = inferencer(16).inspect(&ids).unwrap();

        // truncated to 16 → floor(16 · 0.15) = 2
        assert_eq!(report.token_ids.len(), 16);
        assert_eq!(report.selected.len(), 2);

        let sum: f32 = report.probabilities.iter().sum();
        assert!((sum - 1.0).abs() < 1e-4);

        let best = report.probabilities.iter().cloned().fold(f32::MIN, f32::max);
        assert_eq!(report.selected[0].probability, best);
        assert!(report.selected[0].probability >= report.selected[1].probability);
        assert_eq!(report.selected[0].token_id, report.token_ids[report.selected[0].position]);
    }

    #[test]
    fn test_short_sentence_still_masks_one() {
        let report = inferencer(16).inspect(&[7, 8]).unwrap();
        assert_eq!(report.selected.len(), 1);
        assert!(report.diagnostics.entropy > 0.0);
    }

    #[test]
    fn test_empty_sentence_is_an_error() {
        assert!(inferencer(16).inspect(&[]).is_err());
    }
}
