// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// Seams between the domain and the layers that implement it:
//
//   DocumentSource → anything that yields raw training text
//                    (CorpusLoader reads .txt and .docx)
//   MetricsSink    → anything that records aggregated training
//                    statistics (MetricsAggregator in infra)
//
// The loss engine only talks to a MetricsSink, so the same
// reduction code drives console logging, CSV files or tests.
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use anyhow::Result;
use crate::domain::document::Document;

// ─── DocumentSource ───────────────────────────────────────────────────────────
/// Any component that can load documents from a source.
pub trait DocumentSource {
    /// Load all available documents from this source.
    fn load_all(&self) -> Result<Vec<Document>>;
}

// ─── MetricsSink ──────────────────────────────────────────────────────────────
/// Read access to already-logged meters, used by derived metrics.
pub trait MeterView {
    /// Weighted average of the named meter, if it has been logged.
    fn average(&self, name: &str) -> Option<f64>;
}

/// Receives reduced training statistics.
pub trait MetricsSink {
    /// Record `value` under `name` with the given averaging weight,
    /// rounded to `round` decimal places when displayed.
    fn log_scalar(&mut self, name: &str, value: f64, weight: f64, round: u32);

    /// Register a metric computed from other meters on demand.
    fn log_derived(&mut self, name: &str, derive: fn(&dyn MeterView) -> f64);
}
