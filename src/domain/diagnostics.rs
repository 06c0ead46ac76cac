// ============================================================
// Layer 3 — Masker Diagnostics
// ============================================================
// Monitoring statistics over the masker's per-position
// distribution. Computed from plain probability rows, so they
// never participate in gradient computation.
//
//   entropy  = -Σ_rows Σ_pos p · ln(p + ε)     (nats, summed)
//   top2_gap = mean_rows( p_(1) - p_(min(2, len)) )
//   top5_gap = mean_rows( p_(1) - p_(min(5, len)) )
//
// A sharp masker has a low entropy and large gaps; a masker
// that still spreads its mass evenly has gaps near zero.

use serde::{Deserialize, Serialize};

/// Added inside the logarithm so zero-probability positions stay finite.
pub const ENTROPY_EPSILON: f64 = 1e-5;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MaskerDiagnostics {
    pub entropy:  f64,
    pub top2_gap: f64,
    pub top5_gap: f64,
}

impl MaskerDiagnostics {
    pub fn from_rows(rows: &[Vec<f32>]) -> Self {
        let mut entropy   = 0.0f64;
        let mut top2_sum  = 0.0f64;
        let mut top5_sum  = 0.0f64;
        let mut n_rows    = 0usize;

        for row in rows {
            entropy += row
                .iter()
                .map(|&p| {
                    let p = p as f64;
                    -p * (p + ENTROPY_EPSILON).ln()
                })
                .sum::<f64>();

            if row.is_empty() {
                continue;
            }

            let mut sorted: Vec<f64> = row.iter().map(|&p| p as f64).collect();
            sorted.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));

            let len    = sorted.len();
            let index2 = if len > 2 { 2 } else { len };
            let index5 = if len > 4 { 5 } else { len };

            top2_sum += sorted[0] - sorted[index2 - 1];
            top5_sum += sorted[0] - sorted[index5 - 1];
            n_rows   += 1;
        }

        let denom = n_rows.max(1) as f64;
        Self {
            entropy,
            top2_gap: top2_sum / denom,
            top5_gap: top5_sum / denom,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_row_has_log_n_entropy_and_no_gap() {
        let row = vec![0.25f32; 4];
        let d   = MaskerDiagnostics::from_rows(&[row]);
        assert!((d.entropy - 4.0f64.ln()).abs() < 1e-3);
        assert!(d.top2_gap.abs() < 1e-9);
        assert!(d.top5_gap.abs() < 1e-9);
    }

    #[test]
    fn test_one_hot_row_is_near_zero_entropy() {
        let d = MaskerDiagnostics::from_rows(&[vec![0.0, 1.0, 0.0]]);
        assert!(d.entropy.abs() < 1e-4);
        // len 3 → rank 2 for top2, rank 3 for top5
        assert!((d.top2_gap - 1.0).abs() < 1e-9);
        assert!((d.top5_gap - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_entropy_sums_and_gaps_average_over_rows() {
        let a = vec![0.5f32, 0.3, 0.1, 0.05, 0.03, 0.02];
        let b = vec![0.2f32; 5];
        let one = MaskerDiagnostics::from_rows(&[a.clone()]);
        let two = MaskerDiagnostics::from_rows(&[a, b]);

        assert!((one.top2_gap - 0.2).abs() < 1e-6);
        assert!((one.top5_gap - 0.47).abs() < 1e-6);
        assert!((two.top2_gap - 0.1).abs() < 1e-6);
        assert!((two.top5_gap - 0.235).abs() < 1e-6);
        assert!(two.entropy > one.entropy);
    }

    #[test]
    fn test_empty_batch_is_all_zero() {
        assert_eq!(MaskerDiagnostics::from_rows(&[]), MaskerDiagnostics::default());
    }
}
