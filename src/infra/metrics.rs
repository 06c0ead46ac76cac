// ============================================================
// Layer 6 — Metrics
// ============================================================
// Two pieces:
//
//   MetricsAggregator  in-memory sink for the criterion's
//                      reduced statistics. Each scalar is a
//                      weighted running average; derived
//                      metrics (ppl) are computed from the
//                      averages when read.
//
//   MetricsLogger      appends one CSV row per epoch:
//
//     epoch,train_loss,val_loss,masker_loss,masker_entropy,ppl
//     1,9.812000,9.640000,-0.000310,5.112000,797.915
//
// Losses are in bits per supervised token, as reduced by the
// criterion.
//
// Reference: Rust Book §12 (I/O and File Handling)

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

use crate::domain::traits::{MeterView, MetricsSink};

// ─── Aggregator ───────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Default)]
struct AverageMeter {
    sum:    f64,
    weight: f64,
    last:   f64,
    round:  u32,
}

impl AverageMeter {
    fn update(&mut self, value: f64, weight: f64) {
        self.last    = value;
        self.sum    += value * weight;
        self.weight += weight;
    }

    /// Falls back to the last value while no weight has been seen.
    fn average(&self) -> f64 {
        if self.weight > 0.0 { self.sum / self.weight } else { self.last }
    }
}

fn round_to(value: f64, places: u32) -> f64 {
    let scale = 10f64.powi(places as i32);
    (value * scale).round() / scale
}

/// Meters keep the order in which they were first logged.
#[derive(Default)]
pub struct MetricsAggregator {
    meters:  Vec<(String, AverageMeter)>,
    derived: Vec<(String, fn(&dyn MeterView) -> f64)>,
}

impl MetricsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value of a plain or derived metric, unrounded.
    pub fn get(&self, name: &str) -> Option<f64> {
        if let Some(avg) = self.average(name) {
            return Some(avg);
        }
        self.derived
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, derive)| derive(self))
    }

    /// All metrics with display rounding applied, derived ones last.
    pub fn smoothed(&self) -> Vec<(String, f64)> {
        let mut out: Vec<(String, f64)> = self
            .meters
            .iter()
            .map(|(name, m)| (name.clone(), round_to(m.average(), m.round)))
            .collect();
        out.extend(self.derived.iter().map(|(name, derive)| (name.clone(), derive(self))));
        out
    }

    /// `name=value` pairs separated by " | ", for log lines.
    pub fn summary(&self) -> String {
        self.smoothed()
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join(" | ")
    }
}

impl MeterView for MetricsAggregator {
    fn average(&self, name: &str) -> Option<f64> {
        self.meters
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, m)| m.average())
    }
}

impl MetricsSink for MetricsAggregator {
    fn log_scalar(&mut self, name: &str, value: f64, weight: f64, round: u32) {
        match self.meters.iter_mut().find(|(n, _)| n == name) {
            Some((_, meter)) => meter.update(value, weight),
            None => {
                let mut meter = AverageMeter { round, ..AverageMeter::default() };
                meter.update(value, weight);
                self.meters.push((name.to_string(), meter));
            }
        }
    }

    fn log_derived(&mut self, name: &str, derive: fn(&dyn MeterView) -> f64) {
        if !self.derived.iter().any(|(n, _)| n == name) {
            self.derived.push((name.to_string(), derive));
        }
    }
}

// ─── CSV logger ───────────────────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
    pub epoch:          usize,
    pub train_loss:     f64,
    pub val_loss:       f64,
    pub masker_loss:    f64,
    pub masker_entropy: f64,
    pub ppl:            f64,
}

impl EpochMetrics {
    /// Pull the epoch row out of the training and validation aggregators.
    /// Masker statistics come from training, ppl from validation.
    pub fn from_aggregators(epoch: usize, train: &MetricsAggregator, valid: &MetricsAggregator) -> Self {
        Self {
            epoch,
            train_loss:     train.get("loss").unwrap_or(0.0),
            val_loss:       valid.get("loss").unwrap_or(0.0),
            masker_loss:    train.get("masker_loss").unwrap_or(0.0),
            masker_entropy: train.get("masker_entropy").unwrap_or(0.0),
            ppl:            valid.get("ppl").unwrap_or(0.0),
        }
    }
}

pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Writes the header when the file does not exist yet, so
    /// repeated runs append to the same log.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let csv_path = dir.join("metrics.csv");
        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)?;
            writeln!(f, "epoch,train_loss,val_loss,masker_loss,masker_entropy,ppl")?;
        }
        Ok(Self { csv_path })
    }

    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        let mut f = OpenOptions::new().append(true).open(&self.csv_path)?;
        writeln!(
            f,
            "{},{:.6},{:.6},{:.6},{:.6},{:.3}",
            m.epoch, m.train_loss, m.val_loss, m.masker_loss, m.masker_entropy, m.ppl,
        )?;
        Ok(())
    }
}
