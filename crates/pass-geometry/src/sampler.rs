//! Fixed-cadence elevation sampling.
//!
//! Walks a time window at cadence Δt, querying the ephemeris provider
//! and converting each position to station-relative look angles. Lazy in
//! spirit but materialized: a fresh request re-queries the provider.

use chrono::Duration;
use tracing::debug;

use crate::{
    look_angles, EphemerisProvider, GeometryError, Result, Sample, StationPosition, TimeWindow,
};

/// Samples one satellite's elevation trace over a window.
pub struct ElevationSampler {
    station: StationPosition,
    cadence_s: f64,
}

impl ElevationSampler {
    /// Cadence must be positive; validated here because the sampler is
    /// the first consumer that would otherwise loop forever.
    pub fn new(station: StationPosition, cadence_s: f64) -> Result<Self> {
        if !(cadence_s > 0.0) || !cadence_s.is_finite() {
            return Err(GeometryError::InvalidWindow(format!(
                "sampling cadence must be positive, got {cadence_s}"
            )));
        }
        Ok(Self { station, cadence_s })
    }

    pub fn station(&self) -> &StationPosition {
        &self.station
    }

    pub fn cadence_s(&self) -> f64 {
        self.cadence_s
    }

    /// Produce the ordered sample sequence for `window`, inclusive of
    /// both endpoints. An all-below-horizon trace is a valid, non-empty
    /// result; an empty window is rejected. Provider failures propagate
    /// verbatim — no internal retry.
    pub fn sample<P: EphemerisProvider>(
        &self,
        provider: &P,
        satellite_id: &str,
        window: &TimeWindow,
    ) -> Result<Vec<Sample>> {
        if window.end <= window.start {
            return Err(GeometryError::InvalidWindow(format!(
                "window end {} not after start {}",
                window.end, window.start
            )));
        }

        // Millisecond resolution; sub-millisecond cadences degenerate.
        let step = Duration::milliseconds(((self.cadence_s * 1000.0).round() as i64).max(1));
        let mut samples = Vec::new();
        let mut t = window.start;
        while t <= window.end {
            let pos = provider.position_at(satellite_id, t)?;
            let angles = look_angles(&self.station, &pos);
            samples.push(Sample {
                time: t,
                elevation_deg: angles.elevation_deg,
                azimuth_deg: angles.azimuth_deg,
                range_km: angles.range_km,
            });
            t = t + step;
        }

        debug!(
            satellite = satellite_id,
            station = %self.station.id,
            count = samples.len(),
            "sampled elevation trace"
        );
        Ok(samples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GeodeticPosition;
    use chrono::{DateTime, TimeZone, Utc};

    /// Provider that parks the satellite over a fixed point.
    struct FixedProvider {
        pos: GeodeticPosition,
    }

    impl EphemerisProvider for FixedProvider {
        fn position_at(&self, _id: &str, _t: DateTime<Utc>) -> Result<GeodeticPosition> {
            Ok(self.pos)
        }
    }

    struct FailingProvider;

    impl EphemerisProvider for FailingProvider {
        fn position_at(&self, id: &str, _t: DateTime<Utc>) -> Result<GeodeticPosition> {
            Err(GeometryError::DataUnavailable {
                satellite_id: id.to_string(),
                reason: "offline".to_string(),
            })
        }
    }

    fn station() -> StationPosition {
        StationPosition {
            id: "GS-1".to_string(),
            latitude_deg: 16.5,
            longitude_deg: 80.6,
            altitude_m: 0.0,
        }
    }

    fn window(seconds: i64) -> TimeWindow {
        let start = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        TimeWindow {
            start,
            end: start + chrono::Duration::seconds(seconds),
        }
    }

    #[test]
    fn test_sample_count_and_ordering() {
        let sampler = ElevationSampler::new(station(), 15.0).unwrap();
        let provider = FixedProvider {
            pos: GeodeticPosition {
                latitude_deg: 16.5,
                longitude_deg: 80.6,
                altitude_km: 550.0,
            },
        };
        let samples = sampler.sample(&provider, "SAT-1", &window(600)).unwrap();
        // Inclusive of both endpoints: 600 / 15 + 1.
        assert_eq!(samples.len(), 41);
        assert!(samples.windows(2).all(|w| w[0].time < w[1].time));
        // Parked overhead: high elevation throughout.
        assert!(samples.iter().all(|s| s.elevation_deg > 80.0));
    }

    #[test]
    fn test_zero_cadence_rejected() {
        assert!(ElevationSampler::new(station(), 0.0).is_err());
        assert!(ElevationSampler::new(station(), -5.0).is_err());
    }

    #[test]
    fn test_empty_window_rejected() {
        let sampler = ElevationSampler::new(station(), 15.0).unwrap();
        let provider = FailingProvider;
        let w = window(0);
        assert!(matches!(
            sampler.sample(&provider, "SAT-1", &w),
            Err(GeometryError::InvalidWindow(_))
        ));
    }

    #[test]
    fn test_provider_failure_propagates() {
        let sampler = ElevationSampler::new(station(), 15.0).unwrap();
        let err = sampler
            .sample(&FailingProvider, "SAT-1", &window(60))
            .unwrap_err();
        assert!(matches!(err, GeometryError::DataUnavailable { .. }));
    }
}
