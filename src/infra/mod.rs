// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Persistence and bookkeeping shared by training and the
// `mask` command:
//
//   checkpoint.rs      — model weights (CompactRecorder) and
//                        TrainConfig as JSON
//   tokenizer_store.rs — word-level tokenizer + Vocabulary,
//                        built once per corpus and reloaded
//   metrics.rs         — MetricsAggregator (criterion sink)
//                        and the per-epoch CSV log
//
// Reference: Rust Book §7 (Modules)
//            Burn Book §5 (Checkpointing)

pub mod checkpoint;
pub mod tokenizer_store;
pub mod metrics;
