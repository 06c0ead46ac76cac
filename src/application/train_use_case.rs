// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates a training run:
//
//   Step 1: Load .txt / .docx documents   (Layer 4 - data)
//   Step 2: Clean the text                (Layer 4 - data)
//   Step 3: Build / load tokenizer        (Layer 6 - infra)
//   Step 4: Tokenize + chunk into windows (Layer 4 - data)
//   Step 5: Static pre-masking            (Layer 4 - data)
//   Step 6: Split train/validation        (Layer 4 - data)
//   Step 7: Build criterion and model cfg (Layer 5 - ml)
//   Step 8: Save config                   (Layer 6 - infra)
//   Step 9: Run training loop             (Layer 5 - ml)
//
// Reference: Burn Book §5 (Training)

use anyhow::Result;
use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};
use tokenizers::Tokenizer;

use crate::data::{
    chunker::Chunker,
    dataset::{MlmDataset, MlmSample},
    loader::CorpusLoader,
    premasker::StaticMasker,
    preprocessor::Preprocessor,
    splitter::split_train_val,
};
use crate::domain::{document::Document, traits::DocumentSource, vocabulary::Vocabulary};
use crate::infra::{
    checkpoint::CheckpointManager,
    metrics::{EpochMetrics, MetricsLogger},
    tokenizer_store::{encode, TokenizerStore},
};
use crate::ml::{
    criterion::MaskCoLearnerLossConfig,
    model::CoLearnerConfig,
    trainer::{run_training, TrainingSetup},
};

// ─── Training Configuration ──────────────────────────────────────────────────
// Serialisable so `mask` can rebuild the exact architecture.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub docs_dir:       String,
    pub checkpoint_dir: String,

    // corpus
    pub max_seq_len:    usize,
    pub chunk_overlap:  usize,
    pub vocab_size:     usize,
    pub train_fraction: f64,

    // model
    pub d_model:        usize,
    pub num_heads:      usize,
    pub num_layers:     usize,
    pub d_ff:           usize,
    pub dropout:        f64,

    // optimiser
    pub batch_size:     usize,
    pub epochs:         usize,
    pub lr:             f64,
    pub seed:           u64,

    // masking
    pub mask_probability:           f64,
    pub leave_unmasked_probability: f64,
    pub random_token_probability:   f64,
    pub mask_whole_words:           bool,
    pub freq_weighted_replacement:  bool,
    pub masker_lambda:              f64,
    pub deterministic:              bool,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            docs_dir:       "data/corpus".to_string(),
            checkpoint_dir: "checkpoints".to_string(),
            max_seq_len:    128,
            chunk_overlap:  16,
            vocab_size:     30000,
            train_fraction: 0.9,
            d_model:        256,
            num_heads:      8,
            num_layers:     4,
            d_ff:           1024,
            dropout:        0.1,
            batch_size:     16,
            epochs:         10,
            lr:             2e-4,
            seed:           42,
            mask_probability:           0.15,
            leave_unmasked_probability: 0.1,
            random_token_probability:   0.1,
            mask_whole_words:           false,
            freq_weighted_replacement:  false,
            masker_lambda:              0.5,
            deterministic:              false,
        }
    }
}

impl TrainConfig {
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(self.max_seq_len > 0, "max_seq_len must be positive");
        anyhow::ensure!(
            self.chunk_overlap < self.max_seq_len,
            "chunk_overlap ({}) must be less than max_seq_len ({})",
            self.chunk_overlap, self.max_seq_len
        );
        anyhow::ensure!(
            self.d_model % self.num_heads.max(1) == 0 && self.num_heads > 0,
            "d_model ({}) must be divisible by num_heads ({})",
            self.d_model, self.num_heads
        );
        anyhow::ensure!(
            (0.0..=1.0).contains(&self.train_fraction),
            "train_fraction must be in [0, 1], got {}", self.train_fraction
        );
        anyhow::ensure!(self.batch_size > 0, "batch_size must be positive");
        Ok(())
    }

    pub fn criterion_config(&self) -> MaskCoLearnerLossConfig {
        MaskCoLearnerLossConfig::new()
            .with_mask_probability(self.mask_probability)
            .with_leave_unmasked_probability(self.leave_unmasked_probability)
            .with_random_token_probability(self.random_token_probability)
            .with_mask_whole_words(self.mask_whole_words)
            .with_freq_weighted_replacement(self.freq_weighted_replacement)
            .with_masker_lambda(self.masker_lambda)
            .with_deterministic(self.deterministic)
    }

    /// Network shape for a vocabulary of the given layout.
    pub fn model_config(&self, vocab: &Vocabulary) -> CoLearnerConfig {
        CoLearnerConfig::new(
            vocab.len(), self.max_seq_len, self.d_model,
            self.num_heads, self.num_layers, self.d_ff, self.dropout, vocab.pad_id(),
        )
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<Vec<EpochMetrics>> {
        let cfg = &self.config;
        cfg.validate()?;

        // ── Steps 1-2: documents ──────────────────────────────────────────────
        let docs = CorpusLoader::new(&cfg.docs_dir).load_all()?;
        anyhow::ensure!(!docs.is_empty(), "No .txt or .docx documents found in '{}'", cfg.docs_dir);
        tracing::info!(
            "Corpus: {} documents, {} words",
            docs.len(),
            docs.iter().map(Document::word_count).sum::<usize>(),
        );
        let texts = clean_documents(&docs);

        // ── Step 3: tokenizer + vocabulary ────────────────────────────────────
        let (tokenizer, vocab) = TokenizerStore::new(&cfg.checkpoint_dir)
            .load_or_build(&texts, cfg.vocab_size)?;
        tracing::info!("Vocabulary: {} symbols ({} reserved)", vocab.len(), vocab.nspecial());

        // ── Steps 4-5: windows and samples ────────────────────────────────────
        let mut rng = StdRng::seed_from_u64(cfg.seed);
        let static_masker = StaticMasker::new(cfg.mask_probability, vocab.pad_id(), vocab.mask_id())?;
        let samples = build_samples(&texts, &tokenizer, &static_masker, cfg, &mut rng)?;
        anyhow::ensure!(!samples.is_empty(), "The corpus produced no training windows");
        tracing::info!("Built {} training windows", samples.len());

        // ── Step 6: split ─────────────────────────────────────────────────────
        let (train_samples, val_samples) = split_train_val(samples, cfg.train_fraction, &mut rng);
        tracing::info!("Split: {} train, {} validation", train_samples.len(), val_samples.len());

        // ── Step 7: criterion + model shape ───────────────────────────────────
        let criterion = cfg.criterion_config().init(&vocab)?;
        let model_cfg = cfg.model_config(&vocab);

        // ── Step 8: persist config ────────────────────────────────────────────
        let ckpt_manager = CheckpointManager::new(&cfg.checkpoint_dir)?;
        ckpt_manager.save_config(cfg)?;
        let logger = MetricsLogger::new(&cfg.checkpoint_dir)?;

        // ── Step 9: train ─────────────────────────────────────────────────────
        let setup = TrainingSetup { cfg, model_cfg, criterion, ckpt_manager, logger };
        run_training(setup, MlmDataset::new(train_samples), MlmDataset::new(val_samples))
    }
}

pub(crate) fn clean_documents(docs: &[Document]) -> Vec<String> {
    let preprocessor = Preprocessor::new();
    docs.iter()
        .map(|d| preprocessor.clean(&d.text))
        .filter(|t| !t.is_empty())
        .collect()
}

/// Tokenize each document, cut it into overlapping windows of at most
/// `max_seq_len` ids and pre-mask every window.
fn build_samples(
    texts:     &[String],
    tokenizer: &Tokenizer,
    masker:    &StaticMasker,
    cfg:       &TrainConfig,
    rng:       &mut StdRng,
) -> Result<Vec<MlmSample>> {
    let chunker = Chunker::new(cfg.max_seq_len, cfg.chunk_overlap);
    let mut samples = Vec::new();
    for text in texts {
        let ids = encode(tokenizer, text)?;
        for window in chunker.chunk(&ids) {
            samples.push(masker.apply(window, rng));
        }
    }
    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::vocabulary::Vocabulary;

    #[test]
    fn test_defaults_match_loss_defaults() {
        let cfg  = TrainConfig::default();
        let loss = MaskCoLearnerLossConfig::new();
        let from = cfg.criterion_config();
        assert_eq!(from.mask_probability, loss.mask_probability);
        assert_eq!(from.leave_unmasked_probability, loss.leave_unmasked_probability);
        assert_eq!(from.random_token_probability, loss.random_token_probability);
        assert_eq!(from.masker_lambda, loss.masker_lambda);
        assert_eq!(from.deterministic, loss.deterministic);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_shapes() {
        let overlap = TrainConfig { chunk_overlap: 128, ..TrainConfig::default() };
        assert!(overlap.validate().is_err());
        let heads = TrainConfig { d_model: 100, num_heads: 8, ..TrainConfig::default() };
        assert!(heads.validate().is_err());
    }

    #[test]
    fn test_model_config_uses_vocabulary_layout() {
        let vocab = Vocabulary::from_word_counts(&[("a".to_string(), 1), ("b".to_string(), 1)]);
        let model = TrainConfig::default().model_config(&vocab);
        assert_eq!(model.vocab_size, 7);
        assert_eq!(model.pad_id, 1);
    }

    #[test]
    fn test_build_samples_windows_the_corpus() {
        let dir = std::env::temp_dir().join(format!("mask_co_learner_samples_{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);

        let texts = vec!["one two three four five six seven eight nine ten".to_string()];
        let (tokenizer, vocab) = TokenizerStore::new(&dir).build_and_save(&texts, 64).unwrap();

        let cfg    = TrainConfig { max_seq_len: 4, chunk_overlap: 1, ..TrainConfig::default() };
        let masker = StaticMasker::new(0.25, vocab.pad_id(), vocab.mask_id()).unwrap();
        let mut rng = StdRng::seed_from_u64(0);

        let samples = build_samples(&texts, &tokenizer, &masker, &cfg, &mut rng).unwrap();
        // 10 ids, stride 3 → windows at 0, 3, 6
        assert_eq!(samples.len(), 3);
        assert_eq!(samples[2].len(), 4);
        for s in &samples {
            assert!(s.num_supervised(vocab.pad_id()) >= 1);
        }
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
