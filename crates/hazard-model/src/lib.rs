//! Hazard Model Library
//!
//! Additive competing-risks hazard evaluation over visibility passes and
//! trapezoidal survival integration producing Expected Usable Service
//! Time (EUST) and risk-adjusted utility.
//!
//! Three independent failure processes act simultaneously on a pass:
//! geometric lock loss near the elevation threshold, handover failures
//! concentrated at pass boundaries, and atmospheric attenuation growing
//! with slant path at low elevation. Total hazard is their sum.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod hazard;
pub mod survival;

pub use hazard::HazardProfile;
pub use survival::{evaluate_pass, PassMetrics, SurvivalCurve};

#[derive(Error, Debug)]
pub enum HazardError {
    /// Configuration rejected before any pass is processed.
    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

pub type Result<T> = std::result::Result<T, HazardError>;

/// How EUST is converted into risk-adjusted utility.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum ValuePolicy {
    /// utility = EUST.
    Identity,
    /// Service time beyond the cap carries no value.
    Capped { max_useful_s: f64 },
    /// utility = EUST − λ · Var, with Var = ∫ S(1−S) dt. Penalizes
    /// passes whose usable time is long but uncertain.
    RiskAverse { lambda: f64 },
}

impl Default for ValuePolicy {
    fn default() -> Self {
        ValuePolicy::Identity
    }
}

/// Immutable hazard and extraction configuration. Constructed once from
/// run configuration, shared read-only across all passes of one
/// evaluation; sensitivity sweeps build distinct instances per variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HazardParameters {
    /// Visibility threshold θ_min, degrees.
    pub elevation_threshold_deg: f64,
    /// Refined passes shorter than this are dropped before evaluation.
    pub min_pass_duration_s: f64,
    /// Mean-elevation floor for pass retention; 0 disables.
    pub min_avg_elevation_deg: f64,

    /// Geometric hazard scale (deg/s of rate per degree of margin).
    pub alpha_geo: f64,
    /// Ceiling on the geometric component, s⁻¹. Bounds the rate exactly
    /// at the threshold where the margin term blows up.
    pub geometric_ceiling: f64,

    /// Constant per-second handover failure rate, s⁻¹.
    pub handover_base: f64,
    /// Extra handover rate at the pass boundaries, s⁻¹.
    pub handover_edge: f64,
    /// e-folding time of the boundary elevation, seconds.
    pub handover_edge_decay_s: f64,

    /// Atmospheric hazard scale, s⁻¹ at zenith-normalized slant path.
    pub alpha_atmospheric: f64,
    /// Weather-severity multiplier standing in for real weather data.
    pub atmospheric_severity: f64,

    pub value_policy: ValuePolicy,
}

impl Default for HazardParameters {
    fn default() -> Self {
        Self {
            elevation_threshold_deg: 10.0,
            min_pass_duration_s: 180.0,
            min_avg_elevation_deg: 0.0,
            alpha_geo: 0.001,
            geometric_ceiling: 0.05,
            handover_base: 0.0005,
            handover_edge: 0.002,
            handover_edge_decay_s: 30.0,
            alpha_atmospheric: 0.005,
            atmospheric_severity: 1.0,
            value_policy: ValuePolicy::Identity,
        }
    }
}

impl HazardParameters {
    /// Fail-fast validation; runs before any pass is touched.
    pub fn validate(&self) -> Result<()> {
        fn range(name: &'static str, v: f64, lo: f64, hi: f64) -> Result<()> {
            if !v.is_finite() || v < lo || v > hi {
                return Err(HazardError::InvalidParameter {
                    name,
                    reason: format!("{v} outside [{lo}, {hi}]"),
                });
            }
            Ok(())
        }
        fn non_negative(name: &'static str, v: f64) -> Result<()> {
            if !v.is_finite() || v < 0.0 {
                return Err(HazardError::InvalidParameter {
                    name,
                    reason: format!("{v} must be a finite non-negative number"),
                });
            }
            Ok(())
        }
        fn positive(name: &'static str, v: f64) -> Result<()> {
            if !v.is_finite() || v <= 0.0 {
                return Err(HazardError::InvalidParameter {
                    name,
                    reason: format!("{v} must be a finite positive number"),
                });
            }
            Ok(())
        }

        range("elevation_threshold_deg", self.elevation_threshold_deg, 0.0, 90.0)?;
        non_negative("min_pass_duration_s", self.min_pass_duration_s)?;
        range("min_avg_elevation_deg", self.min_avg_elevation_deg, 0.0, 90.0)?;
        non_negative("alpha_geo", self.alpha_geo)?;
        positive("geometric_ceiling", self.geometric_ceiling)?;
        non_negative("handover_base", self.handover_base)?;
        non_negative("handover_edge", self.handover_edge)?;
        positive("handover_edge_decay_s", self.handover_edge_decay_s)?;
        non_negative("alpha_atmospheric", self.alpha_atmospheric)?;
        non_negative("atmospheric_severity", self.atmospheric_severity)?;

        match self.value_policy {
            ValuePolicy::Identity => {}
            ValuePolicy::Capped { max_useful_s } => positive("max_useful_s", max_useful_s)?,
            ValuePolicy::RiskAverse { lambda } => non_negative("lambda", lambda)?,
        }
        Ok(())
    }
}
