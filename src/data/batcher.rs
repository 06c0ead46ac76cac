// ============================================================
// Layer 4 — Masked-LM Batcher
// ============================================================
// Stacks MlmSamples into [batch, seq_len] Int tensors.
//
// Windows can differ in length (the last window of a document
// is usually short), so every row is right-padded with [PAD]
// up to the longest row in the batch:
//
//   src    [5 9 4 7]      target [1 1 8 1]
//          [6 4 1 1]             [1 3 1 1]
//
// ntokens counts the non-pad source tokens, nsentences the
// rows. The criterion rewrites src_tokens/target in place.
//
// Reference: Burn Book §4 (Batcher)

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::data::dataset::MlmSample;

// ─── MlmBatch ─────────────────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct MlmBatch<B: Backend> {
    /// [batch_size, seq_len]
    pub src_tokens: Tensor<B, 2, Int>,
    /// [batch_size, seq_len], pad id where there is nothing to predict
    pub target:     Tensor<B, 2, Int>,
    pub ntokens:    usize,
    pub nsentences: usize,
}

// ─── MlmBatcher ───────────────────────────────────────────────────────────────
#[derive(Clone, Debug)]
pub struct MlmBatcher {
    pad_id: u32,
}

impl MlmBatcher {
    pub fn new(pad_id: u32) -> Self {
        Self { pad_id }
    }
}

impl<B: Backend> Batcher<B, MlmSample, MlmBatch<B>> for MlmBatcher {
    fn batch(&self, items: Vec<MlmSample>, device: &B::Device) -> MlmBatch<B> {
        let batch_size = items.len();
        let seq_len    = items.iter().map(MlmSample::len).max().unwrap_or(0);

        let pad = self.pad_id as i64;
        let src_flat = pad_rows(items.iter().map(|s| s.src_tokens.as_slice()), seq_len, pad);
        let tgt_flat = pad_rows(items.iter().map(|s| s.target.as_slice()), seq_len, pad);

        let ntokens = src_flat.iter().filter(|&&t| t != pad).count();

        MlmBatch {
            src_tokens: Tensor::from_data(TensorData::new(src_flat, [batch_size, seq_len]), device),
            target:     Tensor::from_data(TensorData::new(tgt_flat, [batch_size, seq_len]), device),
            ntokens,
            nsentences: batch_size,
        }
    }
}

fn pad_rows<'a>(rows: impl Iterator<Item = &'a [u32]>, seq_len: usize, pad: i64) -> Vec<i64> {
    let mut flat = Vec::new();
    for row in rows {
        flat.extend(row.iter().map(|&t| t as i64));
        flat.extend(std::iter::repeat(pad).take(seq_len - row.len()));
    }
    flat
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_rows_are_right_padded_to_longest() {
        let device  = Default::default();
        let batcher = MlmBatcher::new(1);
        let items = vec![
            MlmSample { src_tokens: vec![5, 9, 4, 7], target: vec![1, 1, 8, 1] },
            MlmSample { src_tokens: vec![6, 4],       target: vec![1, 3] },
        ];

        let batch: MlmBatch<TestBackend> = batcher.batch(items, &device);
        assert_eq!(batch.src_tokens.dims(), [2, 4]);
        assert_eq!(batch.nsentences, 2);
        assert_eq!(batch.ntokens, 6);

        let src: Vec<i64> = batch.src_tokens.into_data().iter::<i64>().collect();
        let tgt: Vec<i64> = batch.target.into_data().iter::<i64>().collect();
        assert_eq!(src, vec![5, 9, 4, 7, 6, 4, 1, 1]);
        assert_eq!(tgt, vec![1, 1, 8, 1, 1, 3, 1, 1]);
    }
}
