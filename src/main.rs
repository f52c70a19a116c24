use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::Context;
use clap::Parser;
use serde_json::json;

use step_tracker_rs::analysis::{annotate_steps, SessionSummary};
use step_tracker_rs::config::PipelineConfig;
use step_tracker_rs::events::{EventLog, EventSink, PipelineEvent};
use step_tracker_rs::recording::{is_recording_file, load_recording};
use step_tracker_rs::session::Session;
use step_tracker_rs::status::StatusBoard;

#[derive(Parser, Debug)]
#[command(name = "step_tracker")]
#[command(about = "Replay accelerometer recordings through the step detector", long_about = None)]
struct Args {
    /// Recording to replay (.csv, .json or .json.gz)
    #[arg(long, conflicts_with = "golden_dir")]
    log: Option<PathBuf>,

    /// Directory of recordings to batch replay
    #[arg(long)]
    golden_dir: Option<PathBuf>,

    /// JSON file with pipeline overrides
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the absolute peak floor (m/s²)
    #[arg(long)]
    min_step_threshold: Option<f64>,

    /// Override the smoothing factor α
    #[arg(long)]
    smoothing_factor: Option<f64>,

    /// Override the look-ahead window (seconds)
    #[arg(long)]
    future_window: Option<f64>,

    /// Write the final live status snapshot here
    #[arg(long)]
    status_out: Option<PathBuf>,
}

fn build_config(args: &Args) -> anyhow::Result<PipelineConfig> {
    let mut config = match args.config.as_ref() {
        Some(path) => PipelineConfig::from_json_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    if let Some(v) = args.min_step_threshold {
        config.min_step_threshold = v;
    }
    if let Some(v) = args.smoothing_factor {
        config.smoothing_factor = v;
    }
    if let Some(v) = args.future_window {
        config.future_window = v;
    }
    config.validate()?;
    Ok(config)
}

fn run_once(
    path: &Path,
    config: &PipelineConfig,
    args: &Args,
) -> anyhow::Result<serde_json::Value> {
    let samples = load_recording(path)?;
    log::info!("Replaying {} ({} samples)", path.display(), samples.len());

    let session = Session::new(config.clone())?;
    let event_log = Arc::new(Mutex::new(EventLog::new()));
    let board = StatusBoard::new();

    let log_handle = Arc::clone(&event_log);
    session.register_sink(move |event: &PipelineEvent| {
        if let Ok(mut recorded) = log_handle.lock() {
            recorded.on_event(event);
        }
    })?;
    session.register_sink(board.clone())?;

    session.start_recording()?;
    for sample in samples {
        if let Err(e) = session.push_sample(sample) {
            if !e.is_sample_rejection() {
                return Err(e.into());
            }
        }
    }
    session.stop_recording()?;

    let metadata = session.get_metadata()?;
    let status = board.snapshot();
    if let Some(out) = args.status_out.as_ref() {
        status
            .save(&out.to_string_lossy())
            .with_context(|| format!("writing status to {}", out.display()))?;
    }

    let recorded = event_log
        .lock()
        .map_err(|_| anyhow::anyhow!("event log lock poisoned"))?;
    let annotations = annotate_steps(&recorded.smoothed, &recorded.steps, config);
    let summary = SessionSummary::from_annotations(&annotations);
    let disagreements = recorded
        .steps
        .iter()
        .filter(|s| s.classification.strategies_disagree())
        .count();

    Ok(json!({
        "log": path.display().to_string(),
        "session_id": metadata.session_id,
        "samples_received": metadata.samples_received,
        "samples_rejected": metadata.samples_rejected,
        "smoothed_samples": metadata.smoothed_count,
        "steps": metadata.step_count,
        "strides": metadata.stride_count,
        "distance_m": metadata.distance_meters,
        "peak_velocity_ms": metadata.peak_velocity_ms,
        "slow_alerts": status.slow_alerts,
        "fast_alerts": status.fast_alerts,
        "strategy_disagreements": disagreements,
        "summary": summary,
    }))
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = build_config(&args)?;
    let mut results = Vec::new();

    if let Some(dir) = args.golden_dir.as_ref() {
        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && is_recording_file(p))
            .collect();
        paths.sort();
        for path in paths {
            match run_once(&path, &config, &args) {
                Ok(res) => results.push(res),
                Err(e) => log::error!("Failed {}: {:#}", path.display(), e),
            }
        }
    } else if let Some(path) = args.log.as_ref() {
        results.push(run_once(path, &config, &args)?);
    } else {
        anyhow::bail!("Provide --log or --golden-dir");
    }

    println!("{}", serde_json::to_string_pretty(&results)?);
    Ok(())
}
