//! Per-pass hazard-rate evaluation.
//!
//! Component forms (chosen to satisfy the required monotonicity: risk
//! rises toward the elevation threshold, toward the pass boundaries, and
//! at low elevation):
//!
//! - geometric:   min(α_geo / (e − θ_min + ε), ceiling)
//! - handover:    base + edge · (e^(−Δt_aos/τ) + e^(−Δt_los/τ))
//! - atmospheric: α_atm · severity / sin(max(e, floor))
//!
//! The atmospheric term is a cosecant slant-path proxy normalized to
//! α_atm · severity at zenith.

use pass_geometry::Pass;
use tracing::warn;

use crate::HazardParameters;

/// Margin added below the threshold denominator so the geometric term is
/// finite everywhere; the ceiling does the actual bounding.
const GEOMETRIC_MARGIN_EPS_DEG: f64 = 1e-3;

/// Elevation floor for the slant-path term. Below this the cosecant
/// model stops being meaningful anyway.
const ATMOSPHERIC_FLOOR_DEG: f64 = 1.0;

/// Instantaneous hazard-rate series aligned to a pass's sample grid.
/// Component series are retained for diagnostics; `total` drives the
/// survival integration.
#[derive(Debug, Clone)]
pub struct HazardProfile {
    /// Sample offsets from the refined pass start, seconds.
    pub times_s: Vec<f64>,
    pub geometric: Vec<f64>,
    pub handover: Vec<f64>,
    pub atmospheric: Vec<f64>,
    pub total: Vec<f64>,
    /// Set when any component evaluated to NaN or negative and was
    /// clamped to zero instead of propagating downstream.
    pub degraded: bool,
}

impl HazardProfile {
    /// Evaluate all components over the pass grid.
    pub fn evaluate(pass: &Pass, params: &HazardParameters) -> Self {
        let times_s = pass.offsets_s();
        let duration_s = pass.duration_s();

        let mut degraded = false;
        let mut geometric = Vec::with_capacity(times_s.len());
        let mut handover = Vec::with_capacity(times_s.len());
        let mut atmospheric = Vec::with_capacity(times_s.len());
        let mut total = Vec::with_capacity(times_s.len());

        for (sample, &t) in pass.samples.iter().zip(&times_s) {
            let e = sample.elevation_deg;
            let g = guard(geometric_rate(e, params), &mut degraded);
            let h = guard(handover_rate(t, duration_s - t, params), &mut degraded);
            let a = guard(atmospheric_rate(e, params), &mut degraded);
            geometric.push(g);
            handover.push(h);
            atmospheric.push(a);
            total.push(g + h + a);
        }

        if degraded {
            warn!(
                satellite = %pass.id.satellite_id,
                station = %pass.id.station_id,
                "hazard component clamped; pass flagged degraded"
            );
        }

        Self {
            times_s,
            geometric,
            handover,
            atmospheric,
            total,
            degraded,
        }
    }

    /// True when the total hazard is identically zero over the pass.
    pub fn is_zero(&self) -> bool {
        self.total.iter().all(|&h| h == 0.0)
    }
}

/// Clamp a non-finite or negative rate to zero, flagging degradation.
fn guard(rate: f64, degraded: &mut bool) -> f64 {
    if !rate.is_finite() || rate < 0.0 {
        *degraded = true;
        0.0
    } else {
        rate
    }
}

/// Lock-loss risk near the horizon. Grows as elevation approaches the
/// threshold, bounded by the configured ceiling.
fn geometric_rate(elevation_deg: f64, params: &HazardParameters) -> f64 {
    let margin = elevation_deg - params.elevation_threshold_deg + GEOMETRIC_MARGIN_EPS_DEG;
    if margin <= 0.0 {
        return params.geometric_ceiling;
    }
    (params.alpha_geo / margin).min(params.geometric_ceiling)
}

/// Constant-rate handover failures, elevated near acquisition and loss
/// of signal where handovers concentrate.
fn handover_rate(since_start_s: f64, until_end_s: f64, params: &HazardParameters) -> f64 {
    let tau = params.handover_edge_decay_s;
    let edge = (-since_start_s / tau).exp() + (-until_end_s / tau).exp();
    params.handover_base + params.handover_edge * edge
}

/// Slant-path attenuation proxy: cosecant growth at low elevation,
/// scaled by the configured weather severity.
fn atmospheric_rate(elevation_deg: f64, params: &HazardParameters) -> f64 {
    let e = elevation_deg.clamp(ATMOSPHERIC_FLOOR_DEG, 90.0).to_radians();
    params.alpha_atmospheric * params.atmospheric_severity / e.sin()
}
