//! Order-independent aggregation of per-pass metrics.
//!
//! Accumulation is commutative (plain sums and sorts over complete
//! value sets), so sweep variants may finish in any order; determinism
//! comes from sorting the assembled tables afterwards.

use hazard_model::{HazardParameters, PassMetrics};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Summary statistics over one metric across all passes of a variant.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SummaryStats {
    pub mean: f64,
    pub std_dev: f64,
    pub p10: f64,
    pub p50: f64,
    pub p90: f64,
}

impl SummaryStats {
    pub fn from_values(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self {
                mean: 0.0,
                std_dev: 0.0,
                p10: 0.0,
                p50: 0.0,
                p90: 0.0,
            };
        }
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;

        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));

        Self {
            mean,
            std_dev: var.sqrt(),
            p10: percentile(&sorted, 0.10),
            p50: percentile(&sorted, 0.50),
            p90: percentile(&sorted, 0.90),
        }
    }
}

/// Linear-interpolated percentile on a pre-sorted slice.
fn percentile(sorted: &[f64], q: f64) -> f64 {
    if sorted.len() == 1 {
        return sorted[0];
    }
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + frac * (sorted[hi] - sorted[lo])
}

/// One sensitivity-table row: a parameter set and the aggregated
/// pass-metric statistics it produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitivityRun {
    pub parameter_set_id: String,
    pub parameters: HazardParameters,
    pub pass_count: usize,
    pub degraded_count: usize,
    pub eust_s: SummaryStats,
    pub utility: SummaryStats,
    pub mean_survival_at_end: f64,
}

impl SensitivityRun {
    pub fn summarize(
        parameter_set_id: String,
        parameters: HazardParameters,
        metrics: &[PassMetrics],
    ) -> Self {
        let eust: Vec<f64> = metrics.iter().map(|m| m.eust_s).collect();
        let utility: Vec<f64> = metrics.iter().map(|m| m.risk_adjusted_utility).collect();
        let mean_survival_at_end = if metrics.is_empty() {
            0.0
        } else {
            metrics.iter().map(|m| m.survival_at_end).sum::<f64>() / metrics.len() as f64
        };

        Self {
            parameter_set_id,
            parameters,
            pass_count: metrics.len(),
            degraded_count: metrics.iter().filter(|m| m.degraded).count(),
            eust_s: SummaryStats::from_values(&eust),
            utility: SummaryStats::from_values(&utility),
            mean_survival_at_end,
        }
    }
}

/// Per-satellite rollup of one variant's pass metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SatelliteSummary {
    pub satellite_id: String,
    pub pass_count: usize,
    pub total_duration_s: f64,
    pub mean_eust_s: f64,
    pub mean_utility: f64,
    pub mean_survival_at_end: f64,
}

/// Roll pass metrics up per satellite, sorted by satellite id.
pub fn summarize_by_satellite(metrics: &[PassMetrics]) -> Vec<SatelliteSummary> {
    let mut groups: BTreeMap<&str, Vec<&PassMetrics>> = BTreeMap::new();
    for m in metrics {
        groups.entry(m.satellite_id.as_str()).or_default().push(m);
    }

    groups
        .into_iter()
        .map(|(satellite_id, passes)| {
            let n = passes.len() as f64;
            SatelliteSummary {
                satellite_id: satellite_id.to_string(),
                pass_count: passes.len(),
                total_duration_s: passes.iter().map(|m| m.duration_s).sum(),
                mean_eust_s: passes.iter().map(|m| m.eust_s).sum::<f64>() / n,
                mean_utility: passes.iter().map(|m| m.risk_adjusted_utility).sum::<f64>() / n,
                mean_survival_at_end: passes.iter().map(|m| m.survival_at_end).sum::<f64>() / n,
            }
        })
        .collect()
}

/// Whole-run evaluation of how much the risk adjustment changes the
/// geometric picture.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunEvaluation {
    /// Mean of (duration − EUST) / duration, percent.
    pub mean_overestimation_pct: f64,
    pub median_overestimation_pct: f64,
    /// Mean 1 − S(end): probability a pass drops before completion.
    pub mean_drop_probability: f64,
    /// Spearman correlation between duration ranking and utility
    /// ranking of passes. Near 1 means risk adjustment barely reorders
    /// the geometric ranking.
    pub duration_utility_rank_correlation: f64,
}

impl RunEvaluation {
    pub fn from_metrics(metrics: &[PassMetrics]) -> Option<Self> {
        if metrics.is_empty() {
            return None;
        }
        let over: Vec<f64> = metrics
            .iter()
            .map(|m| {
                if m.duration_s > 0.0 {
                    (m.duration_s - m.eust_s) / m.duration_s * 100.0
                } else {
                    0.0
                }
            })
            .collect();
        let mut sorted = over.clone();
        sorted.sort_by(|a, b| a.total_cmp(b));

        let durations: Vec<f64> = metrics.iter().map(|m| m.duration_s).collect();
        let utilities: Vec<f64> = metrics.iter().map(|m| m.risk_adjusted_utility).collect();

        Some(Self {
            mean_overestimation_pct: over.iter().sum::<f64>() / over.len() as f64,
            median_overestimation_pct: percentile(&sorted, 0.5),
            mean_drop_probability: metrics
                .iter()
                .map(|m| 1.0 - m.survival_at_end)
                .sum::<f64>()
                / metrics.len() as f64,
            duration_utility_rank_correlation: spearman(&durations, &utilities),
        })
    }
}

/// Spearman rank correlation with average ranks for ties.
pub fn spearman(a: &[f64], b: &[f64]) -> f64 {
    let ra = average_ranks(a);
    let rb = average_ranks(b);
    pearson(&ra, &rb)
}

fn average_ranks(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&i, &j| values[i].total_cmp(&values[j]));

    let mut ranks = vec![0.0; values.len()];
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && values[order[j + 1]] == values[order[i]] {
            j += 1;
        }
        // Tied block [i, j] shares the average rank.
        let rank = (i + j) as f64 / 2.0 + 1.0;
        for &idx in &order[i..=j] {
            ranks[idx] = rank;
        }
        i = j + 1;
    }
    ranks
}

fn pearson(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len() as f64;
    if n < 2.0 {
        return 1.0;
    }
    let ma = a.iter().sum::<f64>() / n;
    let mb = b.iter().sum::<f64>() / n;
    let mut cov = 0.0;
    let mut va = 0.0;
    let mut vb = 0.0;
    for (x, y) in a.iter().zip(b) {
        cov += (x - ma) * (y - mb);
        va += (x - ma).powi(2);
        vb += (y - mb).powi(2);
    }
    if va == 0.0 || vb == 0.0 {
        return 1.0;
    }
    cov / (va.sqrt() * vb.sqrt())
}
