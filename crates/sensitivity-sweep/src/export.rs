//! CSV export of sweep results.
//!
//! Column order and naming are part of the interface: identical
//! configuration must produce byte-identical headers across runs, so
//! records are written field by field rather than via serde, which
//! would tie the layout to struct definition order.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::SecondsFormat;
use tracing::info;

use crate::{PassRow, Result, SensitivityRun};

const PASS_HEADERS: [&str; 10] = [
    "satellite_id",
    "station_id",
    "pass_start",
    "pass_end",
    "duration_s",
    "eust_s",
    "risk_adjusted_utility",
    "survival_at_end",
    "degraded",
    "parameter_set_id",
];

const SENSITIVITY_HEADERS: [&str; 14] = [
    "parameter_set_id",
    "pass_count",
    "degraded_count",
    "eust_mean_s",
    "eust_std_s",
    "eust_p10_s",
    "eust_p50_s",
    "eust_p90_s",
    "utility_mean",
    "utility_std",
    "utility_p10",
    "utility_p50",
    "utility_p90",
    "mean_survival_at_end",
];

/// Write the per-pass metrics table.
pub fn write_pass_rows<W: Write>(writer: W, rows: &[PassRow]) -> Result<()> {
    let mut w = csv::Writer::from_writer(writer);
    w.write_record(PASS_HEADERS)?;
    for row in rows {
        let m = &row.metrics;
        w.write_record(&[
            m.satellite_id.clone(),
            m.station_id.clone(),
            m.pass_start.to_rfc3339_opts(SecondsFormat::Millis, true),
            m.pass_end.to_rfc3339_opts(SecondsFormat::Millis, true),
            m.duration_s.to_string(),
            m.eust_s.to_string(),
            m.risk_adjusted_utility.to_string(),
            m.survival_at_end.to_string(),
            m.degraded.to_string(),
            row.parameter_set_id.clone(),
        ])?;
    }
    w.flush().map_err(crate::SweepError::Io)?;
    Ok(())
}

/// Write the one-row-per-parameter-set sensitivity table.
pub fn write_sensitivity<W: Write>(writer: W, runs: &[SensitivityRun]) -> Result<()> {
    let mut w = csv::Writer::from_writer(writer);
    w.write_record(SENSITIVITY_HEADERS)?;
    for run in runs {
        w.write_record(&[
            run.parameter_set_id.clone(),
            run.pass_count.to_string(),
            run.degraded_count.to_string(),
            run.eust_s.mean.to_string(),
            run.eust_s.std_dev.to_string(),
            run.eust_s.p10.to_string(),
            run.eust_s.p50.to_string(),
            run.eust_s.p90.to_string(),
            run.utility.mean.to_string(),
            run.utility.std_dev.to_string(),
            run.utility.p10.to_string(),
            run.utility.p50.to_string(),
            run.utility.p90.to_string(),
            run.mean_survival_at_end.to_string(),
        ])?;
    }
    w.flush().map_err(crate::SweepError::Io)?;
    Ok(())
}

pub fn write_pass_rows_to_path(path: &Path, rows: &[PassRow]) -> Result<()> {
    let file = BufWriter::new(File::create(path)?);
    write_pass_rows(file, rows)?;
    info!(path = %path.display(), rows = rows.len(), "wrote pass metrics table");
    Ok(())
}

pub fn write_sensitivity_to_path(path: &Path, runs: &[SensitivityRun]) -> Result<()> {
    let file = BufWriter::new(File::create(path)?);
    write_sensitivity(file, runs)?;
    info!(path = %path.display(), rows = runs.len(), "wrote sensitivity table");
    Ok(())
}
