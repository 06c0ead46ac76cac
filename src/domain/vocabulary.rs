// ============================================================
// Layer 3 — Vocabulary Domain Type
// ============================================================
// The ordered symbol table the learner predicts over.
//
// Layout contract:
//   ids 0..nspecial   → reserved symbols ([CLS], [PAD], [SEP],
//                       [UNK], [MASK]); never eligible for random
//                       replacement during corruption
//   ids nspecial..    → corpus words, most frequent first
//
// `counts` holds the corpus frequency of every id so the
// replacement sampler can draw frequency-weighted tokens.

use serde::{Deserialize, Serialize};

pub const CLS_TOKEN:  &str = "[CLS]";
pub const PAD_TOKEN:  &str = "[PAD]";
pub const SEP_TOKEN:  &str = "[SEP]";
pub const UNK_TOKEN:  &str = "[UNK]";
pub const MASK_TOKEN: &str = "[MASK]";

/// Reserved symbols in id order. Their position in this array is their id.
pub const SPECIAL_TOKENS: [&str; 5] = [CLS_TOKEN, PAD_TOKEN, SEP_TOKEN, UNK_TOKEN, MASK_TOKEN];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vocabulary {
    symbols:  Vec<String>,
    counts:   Vec<u64>,
    nspecial: usize,
    pad_id:   u32,
    mask_id:  u32,
}

impl Vocabulary {
    /// Build a vocabulary from explicit parts.
    ///
    /// `symbols` and `counts` must have the same length and both the
    /// padding and mask ids must fall inside the special prefix.
    pub fn new(
        symbols:  Vec<String>,
        counts:   Vec<u64>,
        nspecial: usize,
        pad_id:   u32,
        mask_id:  u32,
    ) -> anyhow::Result<Self> {
        anyhow::ensure!(
            symbols.len() == counts.len(),
            "vocabulary has {} symbols but {} counts",
            symbols.len(),
            counts.len()
        );
        anyhow::ensure!(
            nspecial <= symbols.len(),
            "nspecial ({nspecial}) exceeds vocabulary size ({})",
            symbols.len()
        );
        anyhow::ensure!(
            (pad_id as usize) < nspecial && (mask_id as usize) < nspecial,
            "pad id {pad_id} and mask id {mask_id} must be special tokens (< {nspecial})"
        );
        Ok(Self { symbols, counts, nspecial, pad_id, mask_id })
    }

    /// Build the standard layout from `(word, frequency)` pairs.
    /// Words are appended after the reserved symbols in the given order;
    /// duplicates of reserved symbols are skipped.
    pub fn from_word_counts(words: &[(String, u64)]) -> Self {
        let mut symbols: Vec<String> = SPECIAL_TOKENS.iter().map(|s| s.to_string()).collect();
        let mut counts:  Vec<u64>    = vec![0; SPECIAL_TOKENS.len()];

        for (word, count) in words {
            if SPECIAL_TOKENS.contains(&word.as_str()) {
                continue;
            }
            symbols.push(word.clone());
            counts.push(*count);
        }

        Self {
            symbols,
            counts,
            nspecial: SPECIAL_TOKENS.len(),
            pad_id:   1,
            mask_id:  4,
        }
    }

    pub fn len(&self) -> usize { self.symbols.len() }

    pub fn is_empty(&self) -> bool { self.symbols.is_empty() }

    pub fn nspecial(&self) -> usize { self.nspecial }

    pub fn pad_id(&self) -> u32 { self.pad_id }

    pub fn mask_id(&self) -> u32 { self.mask_id }

    pub fn counts(&self) -> &[u64] { &self.counts }

    pub fn symbols(&self) -> &[String] { &self.symbols }

    pub fn symbol(&self, id: u32) -> Option<&str> {
        self.symbols.get(id as usize).map(String::as_str)
    }
}

#[cfg(test)]
impl Vocabulary {
    pub fn is_special(&self, id: u32) -> bool {
        (id as usize) < self.nspecial
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_layout_reserves_prefix() {
        let vocab = Vocabulary::from_word_counts(&[
            ("the".to_string(), 10),
            ("cat".to_string(), 3),
        ]);
        assert_eq!(vocab.len(), 7);
        assert_eq!(vocab.nspecial(), 5);
        assert_eq!(vocab.symbol(vocab.pad_id()), Some(PAD_TOKEN));
        assert_eq!(vocab.symbol(vocab.mask_id()), Some(MASK_TOKEN));
        assert_eq!(vocab.symbol(5), Some("the"));
        assert_eq!(vocab.counts()[6], 3);
        assert!(vocab.is_special(4));
        assert!(!vocab.is_special(5));
    }

    #[test]
    fn test_reserved_words_are_not_duplicated() {
        let vocab = Vocabulary::from_word_counts(&[
            ("[MASK]".to_string(), 4),
            ("dog".to_string(), 2),
        ]);
        assert_eq!(vocab.len(), 6);
    }

    #[test]
    fn test_new_rejects_mismatched_counts() {
        let err = Vocabulary::new(vec!["a".into(), "b".into()], vec![1], 1, 0, 0);
        assert!(err.is_err());
    }

    #[test]
    fn test_new_rejects_pad_outside_special_prefix() {
        let err = Vocabulary::new(vec!["a".into(), "b".into()], vec![1, 1], 1, 1, 0);
        assert!(err.is_err());
    }
}
