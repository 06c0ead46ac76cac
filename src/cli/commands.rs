// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Two subcommands: `train` and `mask`.
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand};
use crate::application::train_use_case::TrainConfig;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train the masker and learner together on a text corpus
    Train(TrainArgs),

    /// Show which tokens a trained masker would mask in a sentence
    Mask(MaskArgs),
}

#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Directory containing .txt and .docx files
    #[arg(long, default_value = "data/corpus")]
    pub docs_dir: String,

    /// Directory for checkpoints, tokenizer, config and metrics
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// Tokens per training window
    #[arg(long, default_value_t = 128)]
    pub max_seq_len: usize,

    /// Tokens shared by consecutive windows of one document
    #[arg(long, default_value_t = 16)]
    pub chunk_overlap: usize,

    /// Upper bound on vocabulary size, reserved symbols included
    #[arg(long, default_value_t = 30000)]
    pub vocab_size: usize,

    /// Share of windows used for training, the rest validate
    #[arg(long, default_value_t = 0.9)]
    pub train_fraction: f64,

    #[arg(long, default_value_t = 256)]
    pub d_model: usize,

    /// d_model must be divisible by num_heads
    #[arg(long, default_value_t = 8)]
    pub num_heads: usize,

    /// Encoder layers in each of the two networks
    #[arg(long, default_value_t = 4)]
    pub num_layers: usize,

    #[arg(long, default_value_t = 1024)]
    pub d_ff: usize,

    #[arg(long, default_value_t = 0.1)]
    pub dropout: f64,

    #[arg(long, default_value_t = 16)]
    pub batch_size: usize,

    #[arg(long, default_value_t = 10)]
    pub epochs: usize,

    #[arg(long, default_value_t = 2e-4)]
    pub lr: f64,

    /// Seeds shuffling, pre-masking and mask sampling
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Fraction of tokens masked when windows are built
    #[arg(long, default_value_t = 0.15)]
    pub mask_probability: f64,

    /// Probability that a selected token is left unchanged
    #[arg(long, default_value_t = 0.1)]
    pub leave_unmasked_probability: f64,

    /// Probability that a selected token is replaced by a random one
    #[arg(long, default_value_t = 0.1)]
    pub random_token_probability: f64,

    /// Accepted for compatibility; tokens are always masked individually
    #[arg(long)]
    pub mask_whole_words: bool,

    /// Draw random replacements by corpus frequency instead of uniformly
    #[arg(long)]
    pub freq_weighted_replacement: bool,

    /// Weight of the masker loss in the total loss
    #[arg(long, default_value_t = 0.5)]
    pub masker_lambda: f64,

    /// Mask the most probable positions instead of sampling them
    #[arg(long)]
    pub deterministic: bool,
}

impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            docs_dir:       a.docs_dir,
            checkpoint_dir: a.checkpoint_dir,
            max_seq_len:    a.max_seq_len,
            chunk_overlap:  a.chunk_overlap,
            vocab_size:     a.vocab_size,
            train_fraction: a.train_fraction,
            d_model:        a.d_model,
            num_heads:      a.num_heads,
            num_layers:     a.num_layers,
            d_ff:           a.d_ff,
            dropout:        a.dropout,
            batch_size:     a.batch_size,
            epochs:         a.epochs,
            lr:             a.lr,
            seed:           a.seed,
            mask_probability:           a.mask_probability,
            leave_unmasked_probability: a.leave_unmasked_probability,
            random_token_probability:   a.random_token_probability,
            mask_whole_words:           a.mask_whole_words,
            freq_weighted_replacement:  a.freq_weighted_replacement,
            masker_lambda:              a.masker_lambda,
            deterministic:              a.deterministic,
        }
    }
}

#[derive(Args, Debug)]
pub struct MaskArgs {
    /// Sentence to run the masker on
    #[arg(long)]
    pub sentence: String,

    /// Directory written by `train`
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}
