//! Risk-adjusted visibility evaluation CLI.
//!
//! Loads a run configuration and a TLE catalog, extracts visibility
//! passes for every satellite, evaluates the competing-risks survival
//! model, and writes the per-pass and sensitivity CSV tables.
//!
//! Usage:
//!   visibility-eval --config run.json --tle starlink.tle --output-dir results/

use std::fs;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;

use anyhow::{bail, Context, Result};
use chrono::{Duration, Utc};
use clap::Parser;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use hazard_model::PassMetrics;
use pass_geometry::{ElevationSampler, GeometryError, Pass, PassSegmenter, TimeWindow, TleEphemeris};
use sensitivity_sweep::{driver::BASELINE_ID, export, run_sweep, RunEvaluation};

mod config;

use config::RunConfig;

#[derive(Parser, Debug)]
#[command(
    name = "visibility-eval",
    about = "Risk-adjusted usable-time evaluation for LEO visibility passes"
)]
struct Args {
    /// Path to the JSON run configuration
    #[arg(short, long, default_value = "run_config.json")]
    config: PathBuf,

    /// Path to the TLE catalog (name/line1/line2 groups)
    #[arg(short, long, default_value = "catalog.tle")]
    tle: PathBuf,

    /// Directory for the exported CSV tables
    #[arg(short, long, default_value = "results")]
    output_dir: PathBuf,

    /// Show the top N passes by risk-adjusted utility in the summary
    #[arg(long, default_value_t = 8)]
    top: usize,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // Configuration is validated in full before anything is computed.
    let config_text = fs::read_to_string(&args.config)
        .with_context(|| format!("reading config {:?}", args.config))?;
    let config: RunConfig =
        serde_json::from_str(&config_text).with_context(|| "parsing run configuration")?;
    config.validate().context("invalid run configuration")?;

    let tle_text =
        fs::read_to_string(&args.tle).with_context(|| format!("reading TLE file {:?}", args.tle))?;
    let ephemeris = TleEphemeris::from_tle_text(&tle_text);
    if ephemeris.is_empty() {
        bail!("no usable TLEs in {:?}", args.tle);
    }
    info!(satellites = ephemeris.len(), "loaded TLE catalog");

    let passes = extract_passes(&config, &ephemeris)?;
    info!(passes = passes.len(), "extracted visibility passes");

    // The sweep supports cooperative cancellation at variant
    // boundaries; the CLI runs to completion, so the flag stays unset.
    let cancel = AtomicBool::new(false);
    let outcome = run_sweep(&passes, &config.hazard, config.sweep.as_ref(), &cancel)?;

    for failure in &outcome.failures {
        warn!(
            parameter_set = %failure.parameter_set_id,
            reason = %failure.reason,
            "variant failed"
        );
    }

    fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("creating output dir {:?}", args.output_dir))?;
    export::write_pass_rows_to_path(&args.output_dir.join("pass_metrics.csv"), &outcome.pass_rows)?;
    export::write_sensitivity_to_path(&args.output_dir.join("sensitivity.csv"), &outcome.runs)?;

    summarize(&outcome.pass_rows, args.top);
    Ok(())
}

/// Fetch and segment passes for every satellite in the catalog.
/// Ephemeris failures are tolerated at satellite granularity: the
/// affected satellite is skipped and the run continues.
fn extract_passes(config: &RunConfig, ephemeris: &TleEphemeris) -> Result<Vec<Pass>> {
    let start = config.window_start.unwrap_or_else(Utc::now);
    let window = TimeWindow {
        start,
        end: start + Duration::milliseconds((config.window_duration_s * 1000.0) as i64),
    };

    let sampler = ElevationSampler::new(config.station.clone(), config.sampling_cadence_s)?;
    let segmenter = PassSegmenter::new(
        config.hazard.elevation_threshold_deg,
        config.hazard.min_pass_duration_s,
        config.hazard.min_avg_elevation_deg,
    );

    let mut passes = Vec::new();
    for satellite_id in ephemeris.satellite_ids() {
        match sampler.sample(ephemeris, &satellite_id, &window) {
            Ok(samples) => {
                passes.extend(segmenter.segment(&satellite_id, &config.station.id, &samples));
            }
            Err(GeometryError::DataUnavailable { reason, .. }) => {
                warn!(satellite = %satellite_id, %reason, "ephemeris unavailable; skipping");
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(passes)
}

fn summarize(rows: &[sensitivity_sweep::PassRow], top: usize) {
    let baseline: Vec<PassMetrics> = rows
        .iter()
        .filter(|r| r.parameter_set_id == BASELINE_ID)
        .map(|r| r.metrics.clone())
        .collect();

    if baseline.is_empty() {
        info!("no passes in window; tables written with headers only");
        return;
    }

    let mut ranked = baseline.clone();
    ranked.sort_by(|a, b| b.risk_adjusted_utility.total_cmp(&a.risk_adjusted_utility));
    info!("top {} passes by risk-adjusted utility:", top.min(ranked.len()));
    for m in ranked.iter().take(top) {
        info!(
            "  {:24} {:>8.1}s of {:>8.1}s  S(end)={:.4}{}",
            m.satellite_id,
            m.eust_s,
            m.duration_s,
            m.survival_at_end,
            if m.degraded { "  [degraded]" } else { "" }
        );
    }

    for sat in sensitivity_sweep::aggregate::summarize_by_satellite(&baseline) {
        info!(
            satellite = %sat.satellite_id,
            passes = sat.pass_count,
            mean_eust_s = format!("{:.1}", sat.mean_eust_s),
            mean_utility = format!("{:.1}", sat.mean_utility),
            "satellite summary"
        );
    }

    if let Some(eval) = RunEvaluation::from_metrics(&baseline) {
        info!(
            mean_overestimation_pct = format!("{:.2}", eval.mean_overestimation_pct),
            median_overestimation_pct = format!("{:.2}", eval.median_overestimation_pct),
            mean_drop_probability = format!("{:.4}", eval.mean_drop_probability),
            rank_correlation = format!("{:.4}", eval.duration_utility_rank_correlation),
            "geometric vs risk-aware comparison"
        );
    }
}
