// ============================================================
// Layer 5 — ML Layer (Burn)
// ============================================================
// All tensor code lives here:
//
//   model.rs      — MaskerNet + LearnerNet sharing one encoder
//                   design, behind the Masker / Predictor traits
//   criterion.rs  — the masked co-learning loss and its
//                   metric reduction
//   trainer.rs    — epoch loop: Adam, validation, CSV,
//                   checkpoints
//   inferencer.rs — load a checkpoint and show which tokens
//                   the masker would pick
//
// Reference: Burn Book §3 (Building Blocks), §5 (Training)

pub mod model;
pub mod criterion;
pub mod trainer;
pub mod inferencer;
