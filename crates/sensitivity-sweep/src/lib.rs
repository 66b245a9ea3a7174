//! Sensitivity Sweep Library
//!
//! Re-evaluates the hazard/survival stage across hazard-parameter
//! variants. Each variant is a pure function of the immutable pass set
//! and one `HazardParameters` instance, which makes the sweep
//! embarrassingly parallel; variants run on a rayon pool with
//! cooperative cancellation and partial-result retention.

use hazard_model::HazardParameters;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod aggregate;
pub mod driver;
pub mod export;

pub use aggregate::{RunEvaluation, SatelliteSummary, SensitivityRun, SummaryStats};
pub use driver::{run_sweep, PassRow, SweepOutcome, VariantFailure};

#[derive(Error, Debug)]
pub enum SweepError {
    #[error("invalid sweep specification: {0}")]
    InvalidSpec(String),
    #[error(transparent)]
    Hazard(#[from] hazard_model::HazardError),
    #[error("export failed: {0}")]
    Export(#[from] csv::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SweepError>;

/// Hazard parameter an axis can vary. Pass extraction settings are not
/// sweepable: the pass set is fixed upstream and shared across variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterAxis {
    AlphaGeo,
    GeometricCeiling,
    HandoverBase,
    HandoverEdge,
    HandoverEdgeDecayS,
    AlphaAtmospheric,
    AtmosphericSeverity,
}

impl ParameterAxis {
    pub fn name(&self) -> &'static str {
        match self {
            Self::AlphaGeo => "alpha_geo",
            Self::GeometricCeiling => "geometric_ceiling",
            Self::HandoverBase => "handover_base",
            Self::HandoverEdge => "handover_edge",
            Self::HandoverEdgeDecayS => "handover_edge_decay_s",
            Self::AlphaAtmospheric => "alpha_atmospheric",
            Self::AtmosphericSeverity => "atmospheric_severity",
        }
    }

    pub fn apply(&self, params: &mut HazardParameters, value: f64) {
        match self {
            Self::AlphaGeo => params.alpha_geo = value,
            Self::GeometricCeiling => params.geometric_ceiling = value,
            Self::HandoverBase => params.handover_base = value,
            Self::HandoverEdge => params.handover_edge = value,
            Self::HandoverEdgeDecayS => params.handover_edge_decay_s = value,
            Self::AlphaAtmospheric => params.alpha_atmospheric = value,
            Self::AtmosphericSeverity => params.atmospheric_severity = value,
        }
    }
}

/// One axis of variation and the values to test on it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AxisValues {
    pub axis: ParameterAxis,
    pub values: Vec<f64>,
}

/// One fully specified parameter set for the sweep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamedVariant {
    pub parameter_set_id: String,
    pub parameters: HazardParameters,
}

/// How sweep variants are generated from the base parameter set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum VariantSpec {
    /// Explicit parameter sets, evaluated as given.
    Explicit { variants: Vec<NamedVariant> },
    /// Vary one axis at a time off the base parameters.
    OneAtATime { axes: Vec<AxisValues> },
    /// Full Cartesian product over the axes.
    Grid { axes: Vec<AxisValues> },
}

impl VariantSpec {
    /// Expand into concrete variants with stable, human-readable ids.
    /// Structural problems (no axes, no values) fail here; per-variant
    /// parameter validity is checked during the sweep so one bad value
    /// does not abort the other variants.
    pub fn expand(&self, base: &HazardParameters) -> Result<Vec<NamedVariant>> {
        match self {
            VariantSpec::Explicit { variants } => {
                if variants.is_empty() {
                    return Err(SweepError::InvalidSpec("empty explicit variant list".into()));
                }
                Ok(variants.clone())
            }
            VariantSpec::OneAtATime { axes } => {
                check_axes(axes)?;
                let mut out = Vec::new();
                for axis in axes {
                    for &value in &axis.values {
                        let mut parameters = base.clone();
                        axis.axis.apply(&mut parameters, value);
                        out.push(NamedVariant {
                            parameter_set_id: format!("{}={}", axis.axis.name(), value),
                            parameters,
                        });
                    }
                }
                Ok(out)
            }
            VariantSpec::Grid { axes } => {
                check_axes(axes)?;
                let mut out = vec![NamedVariant {
                    parameter_set_id: String::new(),
                    parameters: base.clone(),
                }];
                for axis in axes {
                    let mut next = Vec::with_capacity(out.len() * axis.values.len());
                    for variant in &out {
                        for &value in &axis.values {
                            let mut parameters = variant.parameters.clone();
                            axis.axis.apply(&mut parameters, value);
                            let label = format!("{}={}", axis.axis.name(), value);
                            let parameter_set_id = if variant.parameter_set_id.is_empty() {
                                label
                            } else {
                                format!("{}|{}", variant.parameter_set_id, label)
                            };
                            next.push(NamedVariant {
                                parameter_set_id,
                                parameters,
                            });
                        }
                    }
                    out = next;
                }
                Ok(out)
            }
        }
    }
}

fn check_axes(axes: &[AxisValues]) -> Result<()> {
    if axes.is_empty() {
        return Err(SweepError::InvalidSpec("no sweep axes given".into()));
    }
    for axis in axes {
        if axis.values.is_empty() {
            return Err(SweepError::InvalidSpec(format!(
                "axis {} has no values",
                axis.axis.name()
            )));
        }
    }
    Ok(())
}
