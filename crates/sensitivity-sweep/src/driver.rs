//! Parallel sweep execution.
//!
//! Evaluates the baseline plus every expanded variant over the shared,
//! immutable pass set. Variants run on the rayon pool; each reads only
//! its own `HazardParameters` and writes exactly one result bundle, so
//! no locking is needed. Cancellation is cooperative and checked at
//! variant boundaries: rows already computed are kept.

use std::sync::atomic::{AtomicBool, Ordering};

use hazard_model::{evaluate_pass, HazardParameters, PassMetrics};
use pass_geometry::Pass;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{NamedVariant, Result, SensitivityRun, VariantSpec};

pub const BASELINE_ID: &str = "baseline";

/// One exported per-pass row: metrics tagged with the parameter set
/// that produced them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PassRow {
    pub parameter_set_id: String,
    #[serde(flatten)]
    pub metrics: PassMetrics,
}

/// A variant whose evaluation failed; the rest of the sweep completes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariantFailure {
    pub parameter_set_id: String,
    pub reason: String,
}

/// Complete sweep output, deterministically sorted.
#[derive(Debug, Clone)]
pub struct SweepOutcome {
    pub runs: Vec<SensitivityRun>,
    pub pass_rows: Vec<PassRow>,
    pub failures: Vec<VariantFailure>,
    pub cancelled: bool,
}

enum VariantResult {
    Completed(SensitivityRun, Vec<PassRow>),
    Failed(VariantFailure),
    Cancelled,
}

/// Run the baseline and, if a spec is given, every variant it expands
/// to. `cancel` is polled at each variant boundary.
pub fn run_sweep(
    passes: &[Pass],
    base: &HazardParameters,
    spec: Option<&VariantSpec>,
    cancel: &AtomicBool,
) -> Result<SweepOutcome> {
    let mut variants = vec![NamedVariant {
        parameter_set_id: BASELINE_ID.to_string(),
        parameters: base.clone(),
    }];
    if let Some(spec) = spec {
        variants.extend(spec.expand(base)?);
    }

    info!(
        variants = variants.len(),
        passes = passes.len(),
        "starting sensitivity sweep"
    );

    let results: Vec<VariantResult> = variants
        .into_par_iter()
        .map(|variant| evaluate_variant(passes, variant, cancel))
        .collect();

    let mut runs = Vec::new();
    let mut pass_rows = Vec::new();
    let mut failures = Vec::new();
    let mut cancelled = false;
    for result in results {
        match result {
            VariantResult::Completed(run, rows) => {
                runs.push(run);
                pass_rows.extend(rows);
            }
            VariantResult::Failed(failure) => failures.push(failure),
            VariantResult::Cancelled => cancelled = true,
        }
    }

    // Rows may have completed in any order; the exported tables are
    // sorted deterministically.
    runs.sort_by(|a, b| a.parameter_set_id.cmp(&b.parameter_set_id));
    pass_rows.sort_by(|a, b| {
        (
            &a.parameter_set_id,
            &a.metrics.satellite_id,
            a.metrics.pass_start,
        )
            .cmp(&(
                &b.parameter_set_id,
                &b.metrics.satellite_id,
                b.metrics.pass_start,
            ))
    });
    failures.sort_by(|a, b| a.parameter_set_id.cmp(&b.parameter_set_id));

    if cancelled {
        warn!(completed = runs.len(), "sweep cancelled; partial results kept");
    }

    Ok(SweepOutcome {
        runs,
        pass_rows,
        failures,
        cancelled,
    })
}

fn evaluate_variant(passes: &[Pass], variant: NamedVariant, cancel: &AtomicBool) -> VariantResult {
    if cancel.load(Ordering::Relaxed) {
        return VariantResult::Cancelled;
    }

    if let Err(e) = variant.parameters.validate() {
        return VariantResult::Failed(VariantFailure {
            parameter_set_id: variant.parameter_set_id,
            reason: e.to_string(),
        });
    }

    let metrics: Vec<PassMetrics> = passes
        .iter()
        .map(|pass| evaluate_pass(pass, &variant.parameters))
        .collect();

    debug!(
        parameter_set = %variant.parameter_set_id,
        passes = metrics.len(),
        "variant evaluated"
    );

    let rows = metrics
        .iter()
        .map(|m| PassRow {
            parameter_set_id: variant.parameter_set_id.clone(),
            metrics: m.clone(),
        })
        .collect();
    let run = SensitivityRun::summarize(variant.parameter_set_id, variant.parameters, &metrics);
    VariantResult::Completed(run, rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AxisValues, ParameterAxis};
    use chrono::{Duration, TimeZone, Utc};
    use pass_geometry::{PassId, Sample};

    fn synthetic_pass(satellite: &str, peak_elevation: f64) -> Pass {
        let t0 = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let elevations = [10.0, peak_elevation / 2.0, peak_elevation, peak_elevation / 2.0, 10.0];
        let samples: Vec<Sample> = elevations
            .iter()
            .enumerate()
            .map(|(i, &e)| Sample {
                time: t0 + Duration::seconds(i as i64 * 60),
                elevation_deg: e,
                azimuth_deg: 0.0,
                range_km: 900.0,
            })
            .collect();
        let end = samples.last().unwrap().time;
        Pass {
            id: PassId {
                satellite_id: satellite.to_string(),
                station_id: "GS-1".to_string(),
                start: t0,
            },
            start: t0,
            end,
            samples,
        }
    }

    fn passes() -> Vec<Pass> {
        vec![
            synthetic_pass("SAT-B", 60.0),
            synthetic_pass("SAT-A", 80.0),
        ]
    }

    #[test]
    fn test_baseline_only() {
        let out = run_sweep(
            &passes(),
            &HazardParameters::default(),
            None,
            &AtomicBool::new(false),
        )
        .unwrap();
        assert_eq!(out.runs.len(), 1);
        assert_eq!(out.runs[0].parameter_set_id, BASELINE_ID);
        assert_eq!(out.runs[0].pass_count, 2);
        assert_eq!(out.pass_rows.len(), 2);
        assert!(out.failures.is_empty());
        assert!(!out.cancelled);
    }

    #[test]
    fn test_rows_sorted_deterministically() {
        let spec = VariantSpec::OneAtATime {
            axes: vec![AxisValues {
                axis: ParameterAxis::AlphaAtmospheric,
                values: vec![0.003, 0.008],
            }],
        };
        let out = run_sweep(
            &passes(),
            &HazardParameters::default(),
            Some(&spec),
            &AtomicBool::new(false),
        )
        .unwrap();
        assert_eq!(out.pass_rows.len(), 6);
        let keys: Vec<(String, String)> = out
            .pass_rows
            .iter()
            .map(|r| (r.parameter_set_id.clone(), r.metrics.satellite_id.clone()))
            .collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
    }

    #[test]
    fn test_partial_failure_retention() {
        // One variant carries an invalid (negative) rate; it is reported
        // as failed while the others complete.
        let spec = VariantSpec::Explicit {
            variants: vec![
                NamedVariant {
                    parameter_set_id: "good".to_string(),
                    parameters: HazardParameters::default(),
                },
                NamedVariant {
                    parameter_set_id: "bad".to_string(),
                    parameters: HazardParameters {
                        alpha_geo: -1.0,
                        ..HazardParameters::default()
                    },
                },
            ],
        };
        let out = run_sweep(
            &passes(),
            &HazardParameters::default(),
            Some(&spec),
            &AtomicBool::new(false),
        )
        .unwrap();
        assert_eq!(out.failures.len(), 1);
        assert_eq!(out.failures[0].parameter_set_id, "bad");
        // Baseline + good variant both present.
        assert_eq!(out.runs.len(), 2);
    }

    #[test]
    fn test_cancellation_preserves_nothing_but_reports() {
        let cancel = AtomicBool::new(true);
        let out = run_sweep(&passes(), &HazardParameters::default(), None, &cancel).unwrap();
        assert!(out.cancelled);
        assert!(out.runs.is_empty());
    }

    #[test]
    fn test_sweep_deterministic_across_runs() {
        let spec = VariantSpec::Grid {
            axes: vec![
                AxisValues {
                    axis: ParameterAxis::AlphaGeo,
                    values: vec![0.0005, 0.002],
                },
                AxisValues {
                    axis: ParameterAxis::HandoverEdge,
                    values: vec![0.001, 0.004],
                },
            ],
        };
        let base = HazardParameters::default();
        let a = run_sweep(&passes(), &base, Some(&spec), &AtomicBool::new(false)).unwrap();
        let b = run_sweep(&passes(), &base, Some(&spec), &AtomicBool::new(false)).unwrap();
        assert_eq!(a.pass_rows.len(), b.pass_rows.len());
        for (ra, rb) in a.pass_rows.iter().zip(&b.pass_rows) {
            assert_eq!(ra.parameter_set_id, rb.parameter_set_id);
            assert_eq!(ra.metrics.eust_s.to_bits(), rb.metrics.eust_s.to_bits());
        }
    }

    #[test]
    fn test_variant_monotonicity_in_aggregate() {
        // Doubling the atmospheric rate must not raise mean EUST.
        let spec = VariantSpec::OneAtATime {
            axes: vec![AxisValues {
                axis: ParameterAxis::AlphaAtmospheric,
                values: vec![0.010],
            }],
        };
        let base = HazardParameters::default();
        let out = run_sweep(&passes(), &base, Some(&spec), &AtomicBool::new(false)).unwrap();
        let baseline = out
            .runs
            .iter()
            .find(|r| r.parameter_set_id == BASELINE_ID)
            .unwrap();
        let bumped = out
            .runs
            .iter()
            .find(|r| r.parameter_set_id == "alpha_atmospheric=0.01")
            .unwrap();
        assert!(bumped.eust_s.mean <= baseline.eust_s.mean);
    }
}
