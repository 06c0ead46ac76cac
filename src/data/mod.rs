// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// From a directory of raw documents to tensor batches:
//
//   .txt / .docx files
//       │
//       ▼
//   CorpusLoader      → raw text per document
//       │
//       ▼
//   Preprocessor      → whitespace and control-char cleanup
//       │
//       ▼
//   Tokenizer         → token ids (infra::tokenizer_store)
//       │
//       ▼
//   Chunker           → overlapping windows of ≤ max_seq_len ids
//       │
//       ▼
//   StaticMasker      → (src_tokens, target) samples
//       │
//       ▼
//   split_train_val   → shuffled train / validation sets
//       │
//       ▼
//   MlmDataset + MlmBatcher → padded [batch, seq_len] tensors
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

pub mod loader;
pub mod preprocessor;
pub mod chunker;
pub mod premasker;
pub mod dataset;
pub mod batcher;
pub mod splitter;
