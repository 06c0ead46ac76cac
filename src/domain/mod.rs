// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Pure Rust structs, functions and traits that define what
// masked co-learning IS, independent of any tensor library.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O or network calls
//   - Randomness only through a caller-supplied `Rng`
//
// Everything the loss engine decides on the host side lives
// here: which positions to mask, how each masked token is
// corrupted, and what the masker's distribution looks like.
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

// A loaded document from disk
pub mod document;

// Symbol table with reserved prefix and frequency counts
pub mod vocabulary;

// Position selection, replacement sampling and token corruption
pub mod masking;

// Entropy and top-k gap statistics of the masker distribution
pub mod diagnostics;

// Core abstractions (traits) that other layers implement
pub mod traits;
