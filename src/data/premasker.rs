// ============================================================
// Layer 4 — Static Pre-Masker
// ============================================================
// Dataset-time masking applied once, when windows are turned
// into samples. Each window gets
//
//   max(1, floor(mask_probability · n + U[0,1)))
//
// uniformly chosen non-pad positions (n = non-pad count).
// Chosen positions show [MASK] in src_tokens and keep their
// original id in target; every other target slot is [PAD]:
//
//   window  [12 40  7 33  9]
//   src     [12  4  7 33  4]
//   target  [ 1 40  1  1  9]
//
// The criterion recovers the clean window from that pair
// before the masker re-selects. With mask_probability = 0 the
// windows pass through untouched.

use anyhow::Result;
use rand::{seq::index, Rng};

use crate::data::dataset::MlmSample;

#[derive(Debug, Clone, Copy)]
pub struct StaticMasker {
    mask_probability: f64,
    pad_id:           u32,
    mask_id:          u32,
}

impl StaticMasker {
    pub fn new(mask_probability: f64, pad_id: u32, mask_id: u32) -> Result<Self> {
        anyhow::ensure!(
            (0.0..=1.0).contains(&mask_probability),
            "mask_probability must be in [0, 1], got {mask_probability}"
        );
        Ok(Self { mask_probability, pad_id, mask_id })
    }

    pub fn apply<R: Rng + ?Sized>(&self, tokens: Vec<u32>, rng: &mut R) -> MlmSample {
        let candidates: Vec<usize> = tokens
            .iter()
            .enumerate()
            .filter(|(_, &t)| t != self.pad_id)
            .map(|(i, _)| i)
            .collect();

        if self.mask_probability == 0.0 || candidates.is_empty() {
            return MlmSample::unmasked(tokens, self.pad_id);
        }

        let wanted = (self.mask_probability * candidates.len() as f64 + rng.gen::<f64>()) as usize;
        let amount = wanted.clamp(1, candidates.len());

        let mut src    = tokens;
        let mut target = vec![self.pad_id; src.len()];
        for i in index::sample(rng, candidates.len(), amount).into_vec() {
            let pos     = candidates[i];
            target[pos] = src[pos];
            src[pos]    = self.mask_id;
        }

        MlmSample { src_tokens: src, target }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::masking::restore_clean_sequence;
    use rand::{rngs::StdRng, SeedableRng};

    const PAD: u32  = 1;
    const MASK: u32 = 4;

    #[test]
    fn test_zero_probability_passes_through() {
        let mut rng = StdRng::seed_from_u64(0);
        let tokens  = vec![5, 6, 7, 8];
        let sample  = StaticMasker::new(0.0, PAD, MASK).unwrap().apply(tokens.clone(), &mut rng);
        assert_eq!(sample.src_tokens, tokens);
        assert_eq!(sample.target, vec![PAD; 4]);
    }

    #[test]
    fn test_masked_positions_show_mask_and_keep_label() {
        let mut rng = StdRng::seed_from_u64(11);
        let m = StaticMasker::new(0.3, PAD, MASK).unwrap();
        for _ in 0..50 {
            let tokens: Vec<u32> = (5..25).collect();
            let sample = m.apply(tokens.clone(), &mut rng);
            for i in 0..tokens.len() {
                if sample.target[i] != PAD {
                    assert_eq!(sample.src_tokens[i], MASK);
                    assert_eq!(sample.target[i], tokens[i]);
                } else {
                    assert_eq!(sample.src_tokens[i], tokens[i]);
                }
            }
            assert_eq!(restore_clean_sequence(&sample.src_tokens, &sample.target, PAD), tokens);
        }
    }

    #[test]
    fn test_masked_count_tracks_probability() {
        let mut rng = StdRng::seed_from_u64(5);
        let m = StaticMasker::new(0.5, PAD, MASK).unwrap();
        for _ in 0..100 {
            // floor(0.5 · 20 + U) is always 10
            assert_eq!(m.apply((5..25).collect(), &mut rng).num_supervised(PAD), 10);
        }
    }

    #[test]
    fn test_at_least_one_position_and_never_padding() {
        let mut rng = StdRng::seed_from_u64(3);
        let m = StaticMasker::new(0.01, PAD, MASK).unwrap();
        for _ in 0..20 {
            let sample = m.apply(vec![5, 6, PAD, PAD], &mut rng);
            assert_eq!(sample.num_supervised(PAD), 1);
            assert_eq!(&sample.src_tokens[2..], &[PAD, PAD]);
        }
    }

    #[test]
    fn test_rejects_bad_probability() {
        assert!(StaticMasker::new(1.5, PAD, MASK).is_err());
        assert!(StaticMasker::new(-0.1, PAD, MASK).is_err());
    }
}
