//! TLE-backed ephemeris provider.
//!
//! Parses two-line element sets with the `sgp4` crate and serves
//! geodetic sub-satellite positions. Any parse or propagation failure
//! surfaces as `DataUnavailable` for that satellite; the rest of the
//! constellation is unaffected.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::{EphemerisProvider, GeodeticPosition, GeometryError, Result, EARTH_RADIUS_KM};

struct TleEntry {
    constants: sgp4::Constants,
    epoch: DateTime<Utc>,
}

/// Ephemeris provider backed by a fixed set of TLEs, loaded once per run.
pub struct TleEphemeris {
    satellites: HashMap<String, TleEntry>,
}

impl TleEphemeris {
    /// Parse name/line1/line2 groups. Malformed entries are logged and
    /// skipped so one bad TLE does not sink the whole catalog.
    pub fn from_tle_text(text: &str) -> Self {
        let lines: Vec<&str> = text.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
        let mut satellites = HashMap::new();

        let mut i = 0;
        while i + 3 <= lines.len() {
            let name = lines[i].to_string();
            let (l1, l2) = (lines[i + 1], lines[i + 2]);
            match parse_entry(l1, l2) {
                Ok(entry) => {
                    satellites.insert(name, entry);
                }
                Err(reason) => {
                    warn!(satellite = %name, %reason, "skipping malformed TLE");
                }
            }
            i += 3;
        }

        debug!(count = satellites.len(), "loaded TLE catalog");
        Self { satellites }
    }

    /// Satellite names in deterministic order.
    pub fn satellite_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.satellites.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.satellites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.satellites.is_empty()
    }
}

fn parse_entry(line1: &str, line2: &str) -> std::result::Result<TleEntry, String> {
    let elements = sgp4::Elements::from_tle(None, line1.as_bytes(), line2.as_bytes())
        .map_err(|e| format!("{:?}", e))?;
    let constants = sgp4::Constants::from_elements(&elements).map_err(|e| format!("{:?}", e))?;
    let epoch = DateTime::<Utc>::from_naive_utc_and_offset(elements.datetime, Utc);
    Ok(TleEntry { constants, epoch })
}

impl EphemerisProvider for TleEphemeris {
    fn position_at(&self, satellite_id: &str, time: DateTime<Utc>) -> Result<GeodeticPosition> {
        let entry =
            self.satellites
                .get(satellite_id)
                .ok_or_else(|| GeometryError::DataUnavailable {
                    satellite_id: satellite_id.to_string(),
                    reason: "satellite not in TLE catalog".to_string(),
                })?;

        let minutes = time.signed_duration_since(entry.epoch).num_seconds() as f64 / 60.0;
        let prediction =
            entry
                .constants
                .propagate(minutes)
                .map_err(|e| GeometryError::DataUnavailable {
                    satellite_id: satellite_id.to_string(),
                    reason: format!("propagation failed: {:?}", e),
                })?;

        let [x, y, z] = prediction.position;
        Ok(eci_to_geodetic(x, y, z, time))
    }
}

/// Convert an ECI position (km) to a geodetic sub-satellite point,
/// rotating by Greenwich sidereal time so station longitudes line up.
fn eci_to_geodetic(x: f64, y: f64, z: f64, time: DateTime<Utc>) -> GeodeticPosition {
    let r_xy = (x * x + y * y).sqrt();
    let latitude_deg = z.atan2(r_xy).to_degrees();

    let mut longitude_deg = y.atan2(x).to_degrees() - gmst_deg(time);
    longitude_deg = longitude_deg.rem_euclid(360.0);
    if longitude_deg > 180.0 {
        longitude_deg -= 360.0;
    }

    let altitude_km = (x * x + y * y + z * z).sqrt() - EARTH_RADIUS_KM;
    GeodeticPosition {
        latitude_deg,
        longitude_deg,
        altitude_km,
    }
}

/// Greenwich mean sidereal time, degrees. Linear IAU 1982 approximation,
/// plenty for threshold-crossing geometry at 15 s cadence.
fn gmst_deg(time: DateTime<Utc>) -> f64 {
    let unix_s = time.timestamp() as f64 + time.timestamp_subsec_nanos() as f64 * 1e-9;
    let days_since_j2000 = unix_s / 86400.0 + 2440587.5 - 2451545.0;
    (280.46061837 + 360.98564736629 * days_since_j2000).rem_euclid(360.0)
}
