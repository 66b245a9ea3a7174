//! Run configuration.
//!
//! A single JSON document carries everything a run needs; nothing is
//! read from globals, so concurrent evaluations cannot observe each
//! other's settings. Validation fails fast, before any ephemeris fetch
//! or pass evaluation.

use chrono::{DateTime, Utc};
use hazard_model::HazardParameters;
use pass_geometry::StationPosition;
use sensitivity_sweep::VariantSpec;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },
    #[error(transparent)]
    Hazard(#[from] hazard_model::HazardError),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub station: StationPosition,
    /// Defaults to the wall clock at startup when omitted.
    #[serde(default)]
    pub window_start: Option<DateTime<Utc>>,
    pub window_duration_s: f64,
    pub sampling_cadence_s: f64,
    #[serde(default)]
    pub hazard: HazardParameters,
    /// Optional sensitivity sweep; baseline alone when omitted.
    #[serde(default)]
    pub sweep: Option<VariantSpec>,
}

impl RunConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        fn check(name: &'static str, ok: bool, reason: String) -> Result<(), ConfigError> {
            if ok {
                Ok(())
            } else {
                Err(ConfigError::InvalidParameter { name, reason })
            }
        }

        let lat = self.station.latitude_deg;
        let lon = self.station.longitude_deg;
        check(
            "station.latitude_deg",
            lat.is_finite() && (-90.0..=90.0).contains(&lat),
            format!("{lat} outside [-90, 90]"),
        )?;
        check(
            "station.longitude_deg",
            lon.is_finite() && (-180.0..=180.0).contains(&lon),
            format!("{lon} outside [-180, 180]"),
        )?;
        check(
            "window_duration_s",
            self.window_duration_s.is_finite() && self.window_duration_s > 0.0,
            format!("{} must be positive", self.window_duration_s),
        )?;
        check(
            "sampling_cadence_s",
            self.sampling_cadence_s.is_finite() && self.sampling_cadence_s > 0.0,
            format!("{} must be positive", self.sampling_cadence_s),
        )?;
        self.hazard.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> RunConfig {
        RunConfig {
            station: StationPosition {
                id: "GS-1".to_string(),
                latitude_deg: 16.5062,
                longitude_deg: 80.648,
                altitude_m: 20.0,
            },
            window_start: None,
            window_duration_s: 7200.0,
            sampling_cadence_s: 15.0,
            hazard: HazardParameters::default(),
            sweep: None,
        }
    }

    #[test]
    fn test_valid_config() {
        assert!(config().validate().is_ok());
    }

    #[test]
    fn test_bad_cadence_rejected() {
        let mut c = config();
        c.sampling_cadence_s = 0.0;
        assert!(c.validate().is_err());
    }

    #[test]
    fn test_bad_station_rejected() {
        let mut c = config();
        c.station.latitude_deg = 120.0;
        assert!(c.validate().is_err());
    }

    #[test]
    fn test_hazard_validation_flows_through() {
        let mut c = config();
        c.hazard.elevation_threshold_deg = -5.0;
        assert!(c.validate().is_err());
    }

    #[test]
    fn test_parse_minimal_json() {
        let json = r#"{
            "station": {
                "id": "GS-VJA",
                "latitude_deg": 16.5062,
                "longitude_deg": 80.648,
                "altitude_m": 0.0
            },
            "window_duration_s": 7200.0,
            "sampling_cadence_s": 15.0
        }"#;
        let config: RunConfig = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.hazard.elevation_threshold_deg, 10.0);
        assert!(config.sweep.is_none());
    }

    #[test]
    fn test_parse_sweep_spec() {
        let json = r#"{
            "station": {
                "id": "GS-VJA",
                "latitude_deg": 16.5062,
                "longitude_deg": 80.648,
                "altitude_m": 0.0
            },
            "window_duration_s": 7200.0,
            "sampling_cadence_s": 15.0,
            "sweep": {
                "mode": "one_at_a_time",
                "axes": [
                    { "axis": "alpha_geo", "values": [0.0005, 0.002] },
                    { "axis": "alpha_atmospheric", "values": [0.003, 0.008] }
                ]
            }
        }"#;
        let config: RunConfig = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_ok());
        assert!(matches!(config.sweep, Some(VariantSpec::OneAtATime { .. })));
    }
}
