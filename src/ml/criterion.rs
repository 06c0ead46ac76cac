// ============================================================
// Layer 5 — Masked Co-Learning Loss
// ============================================================
// The training criterion that couples the masker and the
// learner. Called once per batch:
//
//   1. Undo upstream static masking → clean token rows
//   2. Masker → per-position probabilities            [B,S]
//   3. Select num_mask positions per row (top-k or weighted
//      draw without replacement) and corrupt them
//      (mask / keep / random); rewrite batch in place
//   4. Learner → logits at masked positions           [N,V]
//      prediction loss = Σ -log p(target)
//   5. Reward = p(target), DETACHED and mean-centred;
//      masker loss = Σ reward · p_masker(position)
//   6. total = λ · masker loss + prediction loss
//
// Step 5 is a REINFORCE surrogate: gradient reaches the masker
// through its own probabilities only. Positions the learner
// found harder than average get negative reward, so minimising
// the surrogate raises the masker's probability there.
//
// Reference: Williams (1992) REINFORCE
//            Devlin et al. (2019) BERT

use anyhow::Result;
use burn::{
    prelude::*,
    tensor::activation,
};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::f64::consts::LN_2;

use crate::data::batcher::MlmBatch;
use crate::domain::{
    diagnostics::MaskerDiagnostics,
    masking::{
        corrupt_sequence, num_mask, restore_clean_sequence, select_positions,
        ReplacementSampler, TokenCorruption,
    },
    traits::{MeterView, MetricsSink},
    vocabulary::Vocabulary,
};
use crate::ml::model::{Masker, Predictor};

// ─── Configuration ────────────────────────────────────────────────────────────
#[derive(Config, Debug)]
pub struct MaskCoLearnerLossConfig {
    /// Fraction masked by upstream static masking. The criterion itself
    /// always selects 15% of positions per row.
    #[config(default = 0.15)]
    pub mask_probability: f64,
    #[config(default = 0.1)]
    pub leave_unmasked_probability: f64,
    #[config(default = 0.1)]
    pub random_token_probability: f64,
    #[config(default = false)]
    pub mask_whole_words: bool,
    #[config(default = false)]
    pub freq_weighted_replacement: bool,
    /// Weight of the masker surrogate in the total loss
    #[config(default = 0.5)]
    pub masker_lambda: f64,
    /// Top-k selection instead of sampling
    #[config(default = false)]
    pub deterministic: bool,
}

impl MaskCoLearnerLossConfig {
    pub fn init(&self, vocab: &Vocabulary) -> Result<MaskCoLearnerLoss> {
        anyhow::ensure!(
            (0.0..=1.0).contains(&self.mask_probability),
            "mask_probability must be in [0, 1], got {}",
            self.mask_probability
        );

        let corruption = TokenCorruption::new(
            self.leave_unmasked_probability,
            self.random_token_probability,
            vocab.pad_id(),
            vocab.mask_id(),
        )?;

        let sampler = ReplacementSampler::build(vocab, self.freq_weighted_replacement);
        if self.random_token_probability > 0.0 && sampler.total_mass() <= 0.0 {
            anyhow::bail!(
                "random_token_probability is {} but no vocabulary symbol is eligible \
                 for random replacement ({} symbols, {} reserved)",
                self.random_token_probability,
                vocab.len(),
                vocab.nspecial()
            );
        }

        if self.mask_whole_words {
            tracing::warn!("mask_whole_words is not supported; masking individual tokens");
        }

        tracing::debug!(
            "Criterion ready: keep-mask p={:.3}, masker_lambda={}, deterministic={}",
            corruption.keep_mask_probability(),
            self.masker_lambda,
            self.deterministic,
        );

        Ok(MaskCoLearnerLoss {
            corruption,
            sampler,
            masker_lambda: self.masker_lambda,
            deterministic: self.deterministic,
        })
    }
}

// ─── Outputs ──────────────────────────────────────────────────────────────────
/// Scalar statistics of one criterion call, summed across workers
/// before `reduce_metrics`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoggingOutput {
    pub loss:           f64,
    pub ntokens:        usize,
    pub nsentences:     usize,
    pub sample_size:    usize,
    pub masker_loss:    f64,
    pub total_loss:     f64,
    pub masker_entropy: f64,
    pub top2_dist:      f64,
    pub top5_dist:      f64,
}

pub struct CriterionOutput<B: Backend> {
    /// λ · masker loss + prediction loss, shape [1]
    pub loss: Tensor<B, 1>,
    /// Number of supervised positions; the gradient normaliser
    pub sample_size: usize,
    pub logging_output: LoggingOutput,
}

// ─── Criterion ────────────────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct MaskCoLearnerLoss {
    corruption:    TokenCorruption,
    sampler:       ReplacementSampler,
    masker_lambda: f64,
    deterministic: bool,
}

impl MaskCoLearnerLoss {
    /// Compute the loss for `batch`, rewriting its `src_tokens` and
    /// `target` with the corrupted input and the new labels.
    pub fn forward<B, M>(&self, model: &M, batch: &mut MlmBatch<B>) -> CriterionOutput<B>
    where
        B: Backend,
        M: Masker<B> + Predictor<B>,
    {
        self.forward_with_rng(model, batch, &mut rand::thread_rng())
    }

    pub fn forward_with_rng<B, M, R>(
        &self,
        model: &M,
        batch: &mut MlmBatch<B>,
        rng:   &mut R,
    ) -> CriterionOutput<B>
    where
        B: Backend,
        M: Masker<B> + Predictor<B>,
        R: Rng + ?Sized,
    {
        let pad_id = self.corruption.pad_id();
        let device = batch.src_tokens.device();
        let [bsz, sz] = batch.src_tokens.dims();

        // ── 1. Clean rows ─────────────────────────────────────────────────────
        let src_rows = int_rows(batch.src_tokens.clone());
        let tgt_rows = int_rows(batch.target.clone());
        let clean: Vec<Vec<u32>> = src_rows
            .iter()
            .zip(&tgt_rows)
            .map(|(s, t)| restore_clean_sequence(s, t, pad_id))
            .collect();

        // ── 2. Masker distribution ────────────────────────────────────────────
        let masker_out = model.masking_probabilities(rows_to_tensor::<B>(&clean, sz, &device));
        let prob_rows  = float_rows(masker_out.clone().detach());
        let diagnostics = MaskerDiagnostics::from_rows(&prob_rows);

        // ── 3. Select and corrupt ─────────────────────────────────────────────
        let k = num_mask(sz);
        let mut inputs = Vec::with_capacity(bsz);
        let mut labels = Vec::with_capacity(bsz);
        for (tokens, probs) in clean.iter().zip(&prob_rows) {
            let selected  = select_positions(probs, k, self.deterministic, rng);
            let corrupted = corrupt_sequence(tokens, &selected, &self.corruption, &self.sampler, rng);
            inputs.push(corrupted.input);
            labels.push(corrupted.labels);
        }
        batch.src_tokens = rows_to_tensor::<B>(&inputs, sz, &device);
        batch.target     = rows_to_tensor::<B>(&labels, sz, &device);

        let masked_flat: Vec<i64> = labels
            .iter()
            .flatten()
            .enumerate()
            .filter(|(_, &t)| t != pad_id)
            .map(|(i, _)| i as i64)
            .collect();
        let sample_size = masked_flat.len();

        // an empty index would send zero-row tensors through the learner
        let masked_index = (sample_size > 0).then(|| {
            Tensor::<B, 1, Int>::from_data(TensorData::new(masked_flat, [sample_size]), &device)
        });

        // ── 4. Prediction loss ────────────────────────────────────────────────
        let logits  = model.masked_logits(batch.src_tokens.clone(), masked_index.clone());
        let targets = model.get_targets(batch).reshape([bsz * sz]);
        let targets = match &masked_index {
            Some(index) => targets.select(0, index.clone()),
            None        => targets,
        };
        let loss = masked_nll(logits.clone(), targets.clone(), pad_id);

        // ── 5. Masker credit assignment ───────────────────────────────────────
        let masker_loss = match masked_index {
            Some(index) => {
                let selected_probs = masker_out.reshape([bsz * sz]).select(0, index);
                reinforce_surrogate(logits, targets, selected_probs)
            }
            None => Tensor::<B, 1>::zeros([1], &device),
        };

        // ── 6. Combine ────────────────────────────────────────────────────────
        let total_loss = masker_loss.clone().mul_scalar(self.masker_lambda) + loss.clone();

        let logging_output = LoggingOutput {
            loss:           scalar(loss),
            ntokens:        batch.ntokens,
            nsentences:     batch.nsentences,
            sample_size,
            masker_loss:    scalar(masker_loss),
            total_loss:     scalar(total_loss.clone()),
            masker_entropy: diagnostics.entropy,
            top2_dist:      diagnostics.top2_gap,
            top5_dist:      diagnostics.top5_gap,
        };

        tracing::debug!(
            "criterion: sample_size={} loss={:.4} masker_loss={:.4} entropy={:.4}",
            sample_size,
            logging_output.loss,
            logging_output.masker_loss,
            logging_output.masker_entropy,
        );

        CriterionOutput { loss: total_loss, sample_size, logging_output }
    }

    /// Aggregate logging outputs from one or more workers.
    ///
    /// Sums are normalised by the total sample size and converted to
    /// bits; the top-k gaps are averaged over outputs.
    pub fn reduce_metrics(logging_outputs: &[LoggingOutput], sink: &mut dyn MetricsSink) {
        if logging_outputs.is_empty() {
            return;
        }

        let sum = |f: fn(&LoggingOutput) -> f64| logging_outputs.iter().map(f).sum::<f64>();
        let n_outputs = logging_outputs.len() as f64;

        let loss_sum        = sum(|l| l.loss);
        let masker_loss_sum = sum(|l| l.masker_loss);
        let total_loss_sum  = sum(|l| l.total_loss);
        let masker_entropy  = sum(|l| l.masker_entropy);
        let top2_dist       = sum(|l| l.top2_dist) / n_outputs;
        let top5_dist       = sum(|l| l.top5_dist) / n_outputs;
        let sample_size: usize = logging_outputs.iter().map(|l| l.sample_size).sum();

        // nothing was supervised: report zeros instead of dividing by zero
        let per_token_bits = |v: f64| {
            if sample_size == 0 { 0.0 } else { v / sample_size as f64 / LN_2 }
        };
        let weight = sample_size as f64;

        sink.log_scalar("loss",           per_token_bits(loss_sum),        weight, 3);
        sink.log_scalar("masker_entropy", per_token_bits(masker_entropy),  weight, 3);
        sink.log_scalar("top2_dist",      top2_dist,                       weight, 5);
        sink.log_scalar("top5_dist",      top5_dist,                       weight, 5);
        sink.log_scalar("masker_loss",    per_token_bits(masker_loss_sum), weight, 5);
        sink.log_scalar("total_loss",     per_token_bits(total_loss_sum),  weight, 3);
        sink.log_derived("ppl", perplexity);
    }

    /// Logging outputs may be summed across workers before reduction.
    pub fn logging_outputs_can_be_summed() -> bool {
        true
    }
}

fn perplexity(meters: &dyn MeterView) -> f64 {
    let bits = meters.average("loss").unwrap_or(0.0);
    (2f64.powf(bits) * 1000.0).round() / 1000.0
}

// ─── Loss pieces ──────────────────────────────────────────────────────────────
/// Σ -log_softmax(logits)[target] over targets that are not `pad_id`.
fn masked_nll<B: Backend>(logits: Tensor<B, 2>, targets: Tensor<B, 1, Int>, pad_id: u32) -> Tensor<B, 1> {
    let [n] = targets.dims();
    let keep = targets.clone().not_equal_elem(pad_id as i64).float();

    let log_probs = activation::log_softmax(logits, 1);
    let picked    = log_probs.gather(1, targets.reshape([n, 1])).reshape([n]);

    (picked * keep).sum().neg()
}

/// Σ (score - mean score) · p_masker, with the score cut off from the graph.
fn reinforce_surrogate<B: Backend>(
    logits:         Tensor<B, 2>,
    targets:        Tensor<B, 1, Int>,
    selected_probs: Tensor<B, 1>,
) -> Tensor<B, 1> {
    let [n] = targets.dims();
    let target_score = activation::softmax(logits, 1)
        .gather(1, targets.reshape([n, 1]))
        .reshape([n])
        .detach();

    let baseline: f64 = target_score.clone().mean().into_scalar().elem();
    let reward = target_score.sub_scalar(baseline);

    (reward * selected_probs).sum()
}

// ─── Host conversions ─────────────────────────────────────────────────────────
fn scalar<B: Backend>(t: Tensor<B, 1>) -> f64 {
    t.into_scalar().elem::<f64>()
}

/// [rows, cols] Int tensor → row vectors of token ids.
pub(crate) fn int_rows<B: Backend>(t: Tensor<B, 2, Int>) -> Vec<Vec<u32>> {
    let [rows, cols] = t.dims();
    let flat: Vec<u32> = t.into_data().iter::<i64>().map(|v| v as u32).collect();
    split_rows(flat, rows, cols)
}

/// [rows, cols] float tensor → row vectors.
pub(crate) fn float_rows<B: Backend>(t: Tensor<B, 2>) -> Vec<Vec<f32>> {
    let [rows, cols] = t.dims();
    let flat: Vec<f32> = t.into_data().iter::<f32>().collect();
    split_rows(flat, rows, cols)
}

fn split_rows<T: Clone>(flat: Vec<T>, rows: usize, cols: usize) -> Vec<Vec<T>> {
    if cols == 0 {
        return vec![Vec::new(); rows];
    }
    flat.chunks(cols).map(|c| c.to_vec()).collect()
}

pub(crate) fn rows_to_tensor<B: Backend>(
    rows:   &[Vec<u32>],
    cols:   usize,
    device: &B::Device,
) -> Tensor<B, 2, Int> {
    let flat: Vec<i64> = rows.iter().flatten().map(|&t| t as i64).collect();
    Tensor::from_data(TensorData::new(flat, [rows.len(), cols]), device)
}
