//! Pass Geometry Library
//!
//! Station-relative look-angle computation, fixed-cadence elevation
//! sampling, and segmentation of elevation traces into visibility passes
//! with sub-sample boundary refinement.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod propagation;
pub mod sampler;
pub mod segmenter;

pub use propagation::TleEphemeris;
pub use sampler::ElevationSampler;
pub use segmenter::PassSegmenter;

#[derive(Error, Debug)]
pub enum GeometryError {
    /// The ephemeris source cannot supply positions for the requested
    /// satellite and window. Retry policy belongs to the provider; this
    /// is surfaced verbatim and the satellite is skipped upstream.
    #[error("ephemeris data unavailable for {satellite_id}: {reason}")]
    DataUnavailable {
        satellite_id: String,
        reason: String,
    },
    #[error("invalid time window: {0}")]
    InvalidWindow(String),
}

pub type Result<T> = std::result::Result<T, GeometryError>;

const EARTH_RADIUS_KM: f64 = 6378.137;

/// Ground station identity and geodetic position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StationPosition {
    pub id: String,
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    pub altitude_m: f64,
}

/// Inclusive observation window [start, end].
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn duration_s(&self) -> f64 {
        (self.end - self.start).num_milliseconds() as f64 / 1000.0
    }
}

/// Geodetic satellite position (sub-satellite point + altitude).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GeodeticPosition {
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    pub altitude_km: f64,
}

/// Station-relative pointing at one instant.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LookAngles {
    pub azimuth_deg: f64,
    pub elevation_deg: f64,
    pub range_km: f64,
}

/// One fixed-cadence observation of a satellite from a station.
/// Immutable once produced by the sampler.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Sample {
    pub time: DateTime<Utc>,
    pub elevation_deg: f64,
    pub azimuth_deg: f64,
    pub range_km: f64,
}

/// Stable pass identity: (satellite, station, refined start time).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassId {
    pub satellite_id: String,
    pub station_id: String,
    pub start: DateTime<Utc>,
}

/// A contiguous above-threshold visibility interval.
///
/// Invariants: sample timestamps strictly increasing; every sample at or
/// above the segmentation threshold; `start`/`end` are the interpolated
/// threshold crossings and bound the first/last sample times.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pass {
    pub id: PassId,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub samples: Vec<Sample>,
}

impl Pass {
    pub fn duration_s(&self) -> f64 {
        (self.end - self.start).num_milliseconds() as f64 / 1000.0
    }

    pub fn mean_elevation_deg(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.samples.iter().map(|s| s.elevation_deg).sum();
        sum / self.samples.len() as f64
    }

    pub fn max_elevation_deg(&self) -> f64 {
        self.samples
            .iter()
            .map(|s| s.elevation_deg)
            .fold(f64::NEG_INFINITY, f64::max)
    }

    /// Sample times as offsets in seconds from the refined pass start.
    pub fn offsets_s(&self) -> Vec<f64> {
        self.samples
            .iter()
            .map(|s| (s.time - self.start).num_milliseconds() as f64 / 1000.0)
            .collect()
    }
}

/// Source of satellite positions. Implementations own caching and retry;
/// the pipeline treats a failed query as `DataUnavailable` and moves on
/// to the next satellite.
pub trait EphemerisProvider {
    fn position_at(&self, satellite_id: &str, time: DateTime<Utc>) -> Result<GeodeticPosition>;
}

/// Look angles from a ground station to a satellite's geodetic position.
///
/// Spherical-Earth ECEF with a topocentric ENU rotation. Adequate for
/// elevation-threshold pass extraction; not survey-grade pointing.
pub fn look_angles(station: &StationPosition, sat: &GeodeticPosition) -> LookAngles {
    let (gx, gy, gz) = geodetic_to_ecef(
        station.latitude_deg,
        station.longitude_deg,
        station.altitude_m / 1000.0,
    );
    let (sx, sy, sz) = geodetic_to_ecef(sat.latitude_deg, sat.longitude_deg, sat.altitude_km);

    let (dx, dy, dz) = (sx - gx, sy - gy, sz - gz);
    let range_km = (dx * dx + dy * dy + dz * dz).sqrt();

    let lat = station.latitude_deg.to_radians();
    let lon = station.longitude_deg.to_radians();
    let east = -lon.sin() * dx + lon.cos() * dy;
    let north = -lat.sin() * lon.cos() * dx - lat.sin() * lon.sin() * dy + lat.cos() * dz;
    let up = lat.cos() * lon.cos() * dx + lat.cos() * lon.sin() * dy + lat.sin() * dz;

    let mut azimuth_deg = east.atan2(north).to_degrees();
    if azimuth_deg < 0.0 {
        azimuth_deg += 360.0;
    }
    let elevation_deg = up.atan2((east * east + north * north).sqrt()).to_degrees();

    LookAngles {
        azimuth_deg,
        elevation_deg,
        range_km,
    }
}

fn geodetic_to_ecef(lat_deg: f64, lon_deg: f64, alt_km: f64) -> (f64, f64, f64) {
    let lat = lat_deg.to_radians();
    let lon = lon_deg.to_radians();
    let r = EARTH_RADIUS_KM + alt_km;
    (
        r * lat.cos() * lon.cos(),
        r * lat.cos() * lon.sin(),
        r * lat.sin(),
    )
}
