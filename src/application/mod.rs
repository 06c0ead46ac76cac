// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Workflow coordination only: no tensor math, no printing.
//
//   train_use_case — corpus → samples → training run
//   mask_use_case  — checkpoint → masker picks for a sentence
//
// Reference: Clean Architecture pattern

pub mod train_use_case;
pub mod mask_use_case;
