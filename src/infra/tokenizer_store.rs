// ============================================================
// Layer 6 — Tokenizer Store
// ============================================================
// Builds, saves and reloads the word-level tokenizer together
// with the Vocabulary the loss engine needs (symbol counts for
// frequency-weighted replacement, special-symbol prefix).
//
// Id layout, shared by both files:
//
//   0 [CLS]  1 [PAD]  2 [SEP]  3 [UNK]  4 [MASK]  5.. words
//
// Words are ordered by corpus frequency, ties alphabetically,
// so the same corpus always yields the same ids.
//
// The tokenizer JSON is written by hand in the HuggingFace
// format and loaded back with Tokenizer::from_file, which
// avoids the trainer / ModelWrapper type mismatch of
// tokenizers 0.15.
//
// Files:
//   {dir}/tokenizer.json
//   {dir}/vocabulary.json

use anyhow::{Context, Result};
use std::{collections::HashMap, fs, path::PathBuf};
use tokenizers::Tokenizer;

use crate::domain::vocabulary::{Vocabulary, SPECIAL_TOKENS};

const TOKENIZER_FILE:  &str = "tokenizer.json";
const VOCABULARY_FILE: &str = "vocabulary.json";

pub struct TokenizerStore {
    dir: PathBuf,
}

impl TokenizerStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn load_or_build(&self, texts: &[String], vocab_size: usize) -> Result<(Tokenizer, Vocabulary)> {
        if self.dir.join(TOKENIZER_FILE).exists() && self.dir.join(VOCABULARY_FILE).exists() {
            tracing::info!("Loading existing tokenizer from '{}'", self.dir.display());
            self.load()
        } else {
            tracing::info!("Building new tokenizer (vocab_size={vocab_size})");
            self.build_and_save(texts, vocab_size)
        }
    }

    pub fn load(&self) -> Result<(Tokenizer, Vocabulary)> {
        let tok_path = self.dir.join(TOKENIZER_FILE);
        let tokenizer = Tokenizer::from_file(&tok_path)
            .map_err(|e| anyhow::anyhow!("Cannot load tokenizer from '{}': {e}", tok_path.display()))?;

        let vocab_path = self.dir.join(VOCABULARY_FILE);
        let json = fs::read_to_string(&vocab_path)
            .with_context(|| format!("Cannot read '{}'", vocab_path.display()))?;
        let vocab: Vocabulary = serde_json::from_str(&json)
            .with_context(|| format!("Invalid vocabulary file '{}'", vocab_path.display()))?;

        Ok((tokenizer, vocab))
    }

    pub fn build_and_save(&self, texts: &[String], vocab_size: usize) -> Result<(Tokenizer, Vocabulary)> {
        anyhow::ensure!(
            vocab_size > SPECIAL_TOKENS.len(),
            "vocab_size ({vocab_size}) must exceed the {} reserved symbols",
            SPECIAL_TOKENS.len()
        );
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create '{}'", self.dir.display()))?;

        let mut words = count_words(texts);
        words.truncate(vocab_size - SPECIAL_TOKENS.len());
        let vocab = Vocabulary::from_word_counts(&words);

        let ids: serde_json::Map<String, serde_json::Value> = vocab
            .symbols()
            .iter()
            .enumerate()
            .map(|(id, sym)| (sym.clone(), serde_json::json!(id)))
            .collect();

        let added_tokens: Vec<serde_json::Value> = SPECIAL_TOKENS
            .iter()
            .enumerate()
            .map(|(id, content)| serde_json::json!({
                "id": id, "content": content, "single_word": false,
                "lstrip": false, "rstrip": false, "normalized": false, "special": true
            }))
            .collect();

        let tokenizer_json = serde_json::json!({
            "version": "1.0",
            "truncation": null,
            "padding": null,
            "added_tokens": added_tokens,
            "normalizer": {
                "type": "BertNormalizer",
                "clean_text": true,
                "handle_chinese_chars": true,
                "strip_accents": null,
                "lowercase": true
            },
            "pre_tokenizer": { "type": "Whitespace" },
            "post_processor": null,
            "decoder": null,
            "model": {
                "type": "WordLevel",
                "vocab": ids,
                "unk_token": "[UNK]"
            }
        });

        let tok_path = self.dir.join(TOKENIZER_FILE);
        fs::write(&tok_path, serde_json::to_string_pretty(&tokenizer_json)?)
            .with_context(|| format!("Cannot write '{}'", tok_path.display()))?;

        let vocab_path = self.dir.join(VOCABULARY_FILE);
        fs::write(&vocab_path, serde_json::to_string_pretty(&vocab)?)
            .with_context(|| format!("Cannot write '{}'", vocab_path.display()))?;

        tracing::info!("Tokenizer built with {} symbols, saved to '{}'", vocab.len(), self.dir.display());

        let tokenizer = Tokenizer::from_file(&tok_path)
            .map_err(|e| anyhow::anyhow!("Cannot reload tokenizer: {e}"))?;
        Ok((tokenizer, vocab))
    }
}

/// Token ids for `text`, without special tokens.
pub fn encode(tokenizer: &Tokenizer, text: &str) -> Result<Vec<u32>> {
    let encoding = tokenizer
        .encode(text, false)
        .map_err(|e| anyhow::anyhow!("Tokenization failed: {e}"))?;
    Ok(encoding.get_ids().to_vec())
}

/// Lowercased word frequencies, most frequent first.
/// Splits the same way the Whitespace pre-tokenizer does for words;
/// punctuation is left to [UNK].
fn count_words(texts: &[String]) -> Vec<(String, u64)> {
    let mut freq: HashMap<String, u64> = HashMap::new();
    for text in texts {
        for word in text.split(|c: char| !(c.is_alphanumeric() || c == '_')) {
            if !word.is_empty() {
                *freq.entry(word.to_lowercase()).or_insert(0) += 1;
            }
        }
    }

    let mut words: Vec<(String, u64)> = freq.into_iter().collect();
    words.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    words
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("mask_co_learner_tok_{name}_{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn test_count_words_orders_by_frequency_then_name() {
        let words = count_words(&["The cat, the dog. A cat!".to_string()]);
        assert_eq!(words[0], ("cat".to_string(), 2));
        assert_eq!(words[1], ("the".to_string(), 2));
        assert_eq!(words[2], ("a".to_string(), 1));
        assert_eq!(words[3], ("dog".to_string(), 1));
    }

    #[test]
    fn test_build_then_load_gives_same_ids() {
        let dir   = scratch_dir("roundtrip");
        let store = TokenizerStore::new(&dir);
        let texts = vec!["the cat sat on the mat".to_string()];

        let (tok, vocab) = store.build_and_save(&texts, 64).unwrap();
        assert_eq!(vocab.pad_id(), 1);
        assert_eq!(vocab.mask_id(), 4);
        assert_eq!(vocab.symbol(5), Some("the"));

        let ids = encode(&tok, "The mat").unwrap();
        assert_eq!(ids.len(), 2);
        assert_eq!(ids[0], 5);
        assert_eq!(vocab.symbol(ids[1]), Some("mat"));

        let unknown = encode(&tok, "zebra").unwrap();
        assert_eq!(unknown, vec![3]);

        let (tok2, vocab2) = store.load().unwrap();
        assert_eq!(vocab2, vocab);
        assert_eq!(encode(&tok2, "The mat").unwrap(), ids);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_vocab_size_caps_words() {
        let dir   = scratch_dir("cap");
        let store = TokenizerStore::new(&dir);
        let (_, vocab) = store
            .build_and_save(&["a b c d e f g".to_string()], 8)
            .unwrap();
        assert_eq!(vocab.len(), 8);
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_vocab_size_must_leave_room_for_words() {
        let store = TokenizerStore::new(scratch_dir("tiny"));
        assert!(store.build_and_save(&[], 5).is_err());
    }
}
