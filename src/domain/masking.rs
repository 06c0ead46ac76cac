// ============================================================
// Layer 3 — Masking Rules
// ============================================================
// Framework-free rules for deciding which tokens the learner
// must predict and how each chosen token is corrupted.
//
// Flow for one sequence:
//
//   clean tokens ──► select positions (top-k or weighted draw)
//                        │
//                        ▼
//                 corrupt_sequence
//                   ├─ kept as [MASK]       (1 - p_rand - p_unmask)
//                   ├─ left unmasked        (p_unmask)
//                   └─ random replacement   (p_rand)
//
// Every function here works on one sequence plus a random
// source, so sequences of a batch never share mutable state.
//
// Reference: Devlin et al. (2019) BERT §3.1 (80/10/10 rule)

use anyhow::Result;
use rand::{seq::index, Rng};
use std::cmp::Ordering;

use crate::domain::vocabulary::Vocabulary;

/// Fraction of positions chosen per sequence by the masker.
pub const MASK_FRACTION: f64 = 0.15;

/// Number of positions selected in a sequence of `seq_len` tokens.
/// Always at least one.
pub fn num_mask(seq_len: usize) -> usize {
    ((seq_len as f64 * MASK_FRACTION) as usize).max(1)
}

// ─── Reconstruction ───────────────────────────────────────────────────────────
/// Undo upstream static masking: wherever `target` carries a real token
/// it is the true token at that position, otherwise `src` already is.
pub fn restore_clean_sequence(src: &[u32], target: &[u32], pad_id: u32) -> Vec<u32> {
    src.iter()
        .zip(target)
        .map(|(&s, &t)| if t != pad_id { t } else { s })
        .collect()
}

// ─── Position selection ───────────────────────────────────────────────────────
/// The `k` most probable positions, highest first.
/// Equal probabilities are ordered by position, lowest index first.
pub fn select_top_k(probs: &[f32], k: usize) -> Vec<usize> {
    let mut order: Vec<usize> = (0..probs.len()).collect();
    // stable sort keeps ascending index order among ties
    order.sort_by(|&a, &b| probs[b].partial_cmp(&probs[a]).unwrap_or(Ordering::Equal));
    order.truncate(k.min(probs.len()));
    order
}

/// Draw `k` distinct positions with probability proportional to `probs`.
///
/// Falls back to a uniform draw when the row carries no usable mass
/// (all zero or non-finite), so a degenerate masker never stalls training.
pub fn sample_without_replacement<R: Rng + ?Sized>(
    probs: &[f32],
    k:     usize,
    rng:   &mut R,
) -> Vec<usize> {
    let k = k.min(probs.len());
    if k == 0 {
        return Vec::new();
    }
    let has_mass = probs.iter().any(|&p| p.is_finite() && p > 0.0);

    if has_mass {
        let weight = |i: usize| {
            let p = probs[i];
            if p.is_finite() && p > 0.0 { p as f64 } else { 0.0 }
        };
        if let Ok(picked) = index::sample_weighted(rng, probs.len(), weight, k) {
            return picked.into_vec();
        }
    }

    tracing::warn!("Masker row has no usable probability mass; sampling positions uniformly");
    index::sample(rng, probs.len(), k).into_vec()
}

/// Pick the positions to mask in one sequence.
pub fn select_positions<R: Rng + ?Sized>(
    probs:         &[f32],
    k:             usize,
    deterministic: bool,
    rng:           &mut R,
) -> Vec<usize> {
    if deterministic {
        select_top_k(probs, k)
    } else {
        sample_without_replacement(probs, k, rng)
    }
}

// ─── Replacement sampler ──────────────────────────────────────────────────────
/// Distribution over the vocabulary used for random-token replacement.
///
/// Reserved symbols always carry zero mass. Built once, never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplacementSampler {
    weights:  Vec<f64>,
    eligible: Vec<u32>,
}

impl ReplacementSampler {
    /// Frequency-proportional when `frequency_weighted`, otherwise uniform
    /// over the non-special symbols. L1-normalised when any mass remains.
    pub fn build(vocab: &Vocabulary, frequency_weighted: bool) -> Self {
        let mut weights: Vec<f64> = if frequency_weighted {
            vocab.counts().iter().map(|&c| c as f64).collect()
        } else {
            vec![1.0; vocab.len()]
        };
        for w in weights.iter_mut().take(vocab.nspecial()) {
            *w = 0.0;
        }

        let total: f64 = weights.iter().sum();
        if total > 0.0 {
            for w in weights.iter_mut() {
                *w /= total;
            }
        }

        let eligible = weights
            .iter()
            .enumerate()
            .filter(|(_, &w)| w > 0.0)
            .map(|(id, _)| id as u32)
            .collect();

        Self { weights, eligible }
    }

    pub fn total_mass(&self) -> f64 { self.weights.iter().sum() }

    /// Draw `amount` token ids by weight, without replacement while the
    /// eligible pool lasts. Returns fewer ids only when the pool is empty.
    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R, amount: usize) -> Vec<u32> {
        let mut out = Vec::with_capacity(amount);
        if self.eligible.is_empty() {
            return out;
        }

        while out.len() < amount {
            let take = (amount - out.len()).min(self.eligible.len());
            let weight = |i: usize| self.weights[self.eligible[i] as usize];
            let picked = match index::sample_weighted(rng, self.eligible.len(), weight, take) {
                Ok(p)  => p.into_vec(),
                Err(_) => index::sample(rng, self.eligible.len(), take).into_vec(),
            };
            out.extend(picked.into_iter().map(|i| self.eligible[i]));
        }
        out
    }
}

// ─── Corruption ───────────────────────────────────────────────────────────────
/// How a selected position was rewritten in the learner's input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenOutcome {
    /// Replaced by the mask symbol
    Masked,
    /// Left as the original token
    Unmasked,
    /// Replaced by a token drawn from the replacement sampler
    Randomized,
}

/// Probabilities and symbols that drive [`corrupt_sequence`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TokenCorruption {
    leave_unmasked_probability: f64,
    random_token_probability:   f64,
    pad_id:                     u32,
    mask_id:                    u32,
}

impl TokenCorruption {
    pub fn new(
        leave_unmasked_probability: f64,
        random_token_probability:   f64,
        pad_id:                     u32,
        mask_id:                    u32,
    ) -> Result<Self> {
        anyhow::ensure!(
            (0.0..=1.0).contains(&leave_unmasked_probability),
            "leave_unmasked_probability must be in [0, 1], got {leave_unmasked_probability}"
        );
        anyhow::ensure!(
            (0.0..=1.0).contains(&random_token_probability),
            "random_token_probability must be in [0, 1], got {random_token_probability}"
        );
        anyhow::ensure!(
            leave_unmasked_probability + random_token_probability <= 1.0,
            "random_token_probability + leave_unmasked_probability must be <= 1, got {}",
            leave_unmasked_probability + random_token_probability
        );
        Ok(Self { leave_unmasked_probability, random_token_probability, pad_id, mask_id })
    }

    pub fn rand_or_unmask_probability(&self) -> f64 {
        self.leave_unmasked_probability + self.random_token_probability
    }

    /// Probability that a selected position shows the mask symbol.
    pub fn keep_mask_probability(&self) -> f64 {
        1.0 - self.rand_or_unmask_probability()
    }

    pub fn pad_id(&self) -> u32 { self.pad_id }

    pub fn mask_id(&self) -> u32 { self.mask_id }
}

/// Result of corrupting one sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct CorruptedSequence {
    /// Learner input: original, mask symbol, or random token per position
    pub input: Vec<u32>,
    /// Original token at selected positions, padding id elsewhere
    pub labels: Vec<u32>,
    /// `Some` exactly at selected positions
    pub outcomes: Vec<Option<TokenOutcome>>,
}

/// Corrupt the `selected` positions of one clean sequence.
///
/// Random draws mirror a whole-sequence Bernoulli: one draw per position
/// for "randomise or unmask", and, when both are enabled, a second draw per
/// position splitting them with `p_unmask / (p_rand + p_unmask)`.
pub fn corrupt_sequence<R: Rng + ?Sized>(
    tokens:     &[u32],
    selected:   &[usize],
    corruption: &TokenCorruption,
    sampler:    &ReplacementSampler,
    rng:        &mut R,
) -> CorruptedSequence {
    let len = tokens.len();

    let mut mask   = vec![false; len];
    let mut labels = vec![corruption.pad_id; len];
    for &pos in selected.iter().filter(|&&p| p < len) {
        mask[pos]   = true;
        labels[pos] = tokens[pos];
    }

    let mut unmask    = vec![false; len];
    let mut rand_mask = vec![false; len];

    let rand_or_unmask_prob = corruption.rand_or_unmask_probability();
    if rand_or_unmask_prob > 0.0 {
        let rand_or_unmask: Vec<bool> = mask
            .iter()
            .map(|&m| rng.gen_bool(rand_or_unmask_prob) && m)
            .collect();

        if corruption.random_token_probability == 0.0 {
            unmask = rand_or_unmask;
        } else if corruption.leave_unmasked_probability == 0.0 {
            rand_mask = rand_or_unmask;
        } else {
            let unmask_prob = corruption.leave_unmasked_probability / rand_or_unmask_prob;
            for (i, &candidate) in rand_or_unmask.iter().enumerate() {
                let decision = rng.gen_bool(unmask_prob);
                unmask[i]    = candidate && decision;
                rand_mask[i] = candidate && !decision;
            }
        }
    }

    // unmasked positions keep their token but still carry a label
    for (m, &u) in mask.iter_mut().zip(&unmask) {
        if u {
            *m = false;
        }
    }

    let mut input: Vec<u32> = tokens
        .iter()
        .zip(&mask)
        .map(|(&t, &m)| if m { corruption.mask_id } else { t })
        .collect();

    let rand_positions: Vec<usize> = (0..len).filter(|&i| rand_mask[i]).collect();
    let mut randomized = vec![false; len];
    if !rand_positions.is_empty() {
        let draws = sampler.draw(rng, rand_positions.len());
        for (&pos, token) in rand_positions.iter().zip(draws) {
            input[pos]      = token;
            randomized[pos] = true;
        }
    }

    let outcomes = (0..len)
        .map(|i| {
            if unmask[i] {
                Some(TokenOutcome::Unmasked)
            } else if randomized[i] {
                Some(TokenOutcome::Randomized)
            } else if mask[i] {
                Some(TokenOutcome::Masked)
            } else {
                None
            }
        })
        .collect();

    CorruptedSequence { input, labels, outcomes }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
impl ReplacementSampler {
    pub fn weights(&self) -> &[f64] { &self.weights }

    pub fn is_degenerate(&self) -> bool { self.eligible.is_empty() }
}

#[cfg(test)]
impl CorruptedSequence {
    pub fn count(&self, outcome: TokenOutcome) -> usize {
        self.outcomes.iter().filter(|o| **o == Some(outcome)).count()
    }

    pub fn selected_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_some()).count()
    }
}
