//! monoscan command-line interface.
//!
//! Runs scans against a simulated instrument, estimates run times and
//! fits saved scan logs.
#![allow(
    clippy::uninlined_format_args,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss,
    clippy::too_many_lines
)]

use clap::{Args, Parser, Subcommand};
use log::{info, warn};
use monoscan::{
    make_estimator, make_scan, DefaultsBuilder, Error, Fit, FnDefaults, MeasureParams,
    MonoidKind, MonoidValue, Motion, PointSpec, ScanConfig, ScanPath, Scanner, SharedMotion,
    VirtualMotion,
};
use monoscan_core::Count;
use monoscan_fit::models::{builtin, MODEL_NAMES};
use monoscan_fit::{best_fit, by_name, compare_fits};
use monoscan_io::{LogFileNamer, ScanLogReader};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// Result type for CLI operations.
type Result<T> = std::result::Result<T, CliError>;

/// CLI error types.
#[derive(Error, Debug)]
enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Log error: {0}")]
    Log(#[from] monoscan_io::Error),

    #[error("Scan error: {0}")]
    Scan(#[from] Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unknown model `{0}`, expected one of {1}")]
    UnknownModel(String, String),
}

/// Instrument scanning with monoid measurements.
#[derive(Parser)]
#[command(name = "monoscan")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log every point and fit attempt
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Axis range shared by `scan` and `estimate`.
#[derive(Args, Debug, Clone)]
struct RangeArgs {
    /// First axis position
    start: f64,

    /// Last axis position
    stop: f64,

    /// Number of points, both ends included
    #[arg(long, conflicts_with_all = ["step", "stride"])]
    count: Option<usize>,

    /// Spacing between points, stop excluded
    #[arg(long, conflicts_with = "stride")]
    step: Option<f64>,

    /// Approximate spacing, both ends included
    #[arg(long)]
    stride: Option<f64>,

    /// Name of the scanned axis
    #[arg(long, default_value = "theta")]
    axis: String,
}

impl RangeArgs {
    fn spec(&self) -> PointSpec {
        let mut spec = PointSpec::range(self.start, self.stop);
        if let Some(count) = self.count {
            spec = spec.with_count(count);
        }
        if let Some(step) = self.step {
            spec = spec.with_step(step);
        }
        if let Some(stride) = self.stride {
            spec = spec.with_stride(stride);
        }
        spec
    }
}

/// Counting time per detector read.
#[derive(Args, Debug, Clone)]
struct TimeArgs {
    /// Count for a number of seconds
    #[arg(long)]
    seconds: Option<f64>,

    /// Count for a number of minutes
    #[arg(long)]
    minutes: Option<f64>,

    /// Count for a number of frames
    #[arg(long)]
    frames: Option<u64>,

    /// Count for an integrated proton current (µA·h)
    #[arg(long)]
    uamps: Option<f64>,

    /// Count until the monitor reaches a total
    #[arg(long)]
    monitor: Option<f64>,

    /// Monitor flux used for time estimates (counts per second)
    #[arg(long, default_value = "1.0")]
    flux: f64,
}

impl TimeArgs {
    fn params(&self) -> MeasureParams {
        let mut params = MeasureParams::new();
        if let Some(seconds) = self.seconds {
            params = params.with_seconds(seconds);
        }
        if let Some(minutes) = self.minutes {
            params = params.with_minutes(minutes);
        }
        if let Some(frames) = self.frames {
            params = params.with_frames(frames);
        }
        if let Some(uamps) = self.uamps {
            params = params.with_uamps(uamps);
        }
        if let Some(monitor) = self.monitor {
            params = params.with_monitor(monitor);
        }
        params
    }
}

/// Peak the simulated detector sees.
#[derive(Args, Debug, Clone)]
struct PeakArgs {
    /// Axis position of the simulated peak
    #[arg(long, default_value = "0.0")]
    center: f64,

    /// Standard deviation of the simulated peak
    #[arg(long, default_value = "1.0")]
    width: f64,

    /// Peak count rate above background (counts per second)
    #[arg(long, default_value = "100.0")]
    height: f64,

    /// Background count rate (counts per second)
    #[arg(long, default_value = "5.0")]
    background: f64,
}

impl PeakArgs {
    fn rate(&self, x: f64) -> f64 {
        let z = (x - self.center) / self.width;
        self.background + self.height * (-0.5 * z * z).exp()
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Scan an axis of the simulated instrument
    Scan {
        #[command(flatten)]
        range: RangeArgs,

        #[command(flatten)]
        time: TimeArgs,

        #[command(flatten)]
        peak: PeakArgs,

        /// Detector reads folded into each point
        #[arg(short, long, default_value = "1")]
        repeats: usize,

        /// Model fitted to the result
        #[arg(long)]
        fit: Option<String>,

        /// Log file (.csv or .jsonl); defaults to a timestamped file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Directory for timestamped logs
        #[arg(long, default_value = "scans")]
        log_dir: PathBuf,

        /// Do not write a log
        #[arg(long, conflicts_with = "output")]
        no_save: bool,
    },

    /// Estimate how long a scan would take
    Estimate {
        #[command(flatten)]
        range: RangeArgs,

        #[command(flatten)]
        time: TimeArgs,

        /// Seconds of overhead per point
        #[arg(long, default_value = "0.0")]
        pad: f64,
    },

    /// Fit a model to a saved scan log
    Fit {
        /// Scan log (.csv or .jsonl)
        input: PathBuf,

        /// Model to fit
        #[arg(short, long, default_value = "gaussian")]
        model: String,

        /// Fit every built-in model and rank them
        #[arg(long, conflicts_with = "model")]
        compare: bool,
    },

    /// Show the contents of a saved scan log
    Info {
        /// Scan log (.csv or .jsonl)
        input: PathBuf,

        /// Print the points as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Builds the simulated instrument around `motion`.
fn simulated_instrument(
    motion: SharedMotion,
    peak: PeakArgs,
    flux: f64,
    log_dir: PathBuf,
) -> Result<Scanner<FnDefaults>> {
    let namer = LogFileNamer::new(log_dir, "simulated").with_extension("jsonl");
    let seconds_for = make_estimator(flux);

    let defaults = DefaultsBuilder::new("simulated")
        .measure(|title, position, _| {
            info!("simulated run \"{title}\" at {position}");
            Ok(())
        })
        .detector(move |params| {
            let seconds = seconds_for(params)?;
            let x = motion.position()?;
            let counts = (peak.rate(x) * seconds).round().max(0.0) as u64;
            Ok(MonoidValue::from(Count(counts)))
        })
        .detector_kind(MonoidKind::Count)
        .flux(flux)
        .log_file(move |_| {
            std::fs::create_dir_all(namer.directory())?;
            Ok(namer.next_path())
        })
        .build()?
        .into_inner();

    Ok(make_scan(defaults)?)
}

fn lookup_model(name: &str) -> Result<Box<dyn Fit>> {
    by_name(name).ok_or_else(|| {
        CliError::UnknownModel(name.to_string(), format!("{}, polyN", MODEL_NAMES.join(", ")))
    })
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();

    match cli.command {
        Commands::Scan {
            range,
            time,
            peak,
            repeats,
            fit,
            output,
            log_dir,
            no_save,
        } => {
            let motion = VirtualMotion::new(range.axis.clone(), range.start).shared();
            let path = ScanPath::from_spec(Arc::clone(&motion), &range.spec())?;
            let scanner = simulated_instrument(Arc::clone(&motion), peak, time.flux, log_dir)?;

            let mut config = ScanConfig::new()
                .with_params(time.params())
                .with_repeats(repeats)
                .with_display(cli.verbose)
                .with_save(!no_save);
            if let Some(output) = output {
                config = config.with_log_path(output);
            }
            if let Some(name) = fit {
                config = config.with_fit(Arc::from(lookup_model(&name)?));
            }

            let outcome = scanner.run(&path, &config)?;

            println!("{:<24} | {:>12} | {:>12}", "Position", "Value", "Error");
            println!("{:-<54}", "");
            for point in &outcome.series {
                let value = point
                    .value
                    .value()
                    .map_or_else(|| "-".to_string(), |v| format!("{:.3}", v));
                let error = point
                    .value
                    .uncertainty()
                    .map_or_else(|| "-".to_string(), |e| format!("{:.3}", e));
                println!(
                    "{:<24} | {:>12} | {:>12}",
                    point.position.to_string(),
                    value,
                    error
                );
            }

            println!("Points: {} ({:?})", outcome.series.len(), outcome.status);
            if let Some(seconds) = outcome.estimated_seconds {
                println!("Counting time: {:.1} s", seconds);
            }
            if let Some(path) = &outcome.log_path {
                println!("Log: {}", path.display());
            }
            match outcome.fit {
                Some(Ok(report)) => println!("Fit: {}", report),
                Some(Err(err)) => println!("Fit failed: {}", err),
                None => {}
            }
        }

        Commands::Estimate { range, time, pad } => {
            let motion = VirtualMotion::new(range.axis.clone(), range.start).shared();
            let path = ScanPath::from_spec(Arc::clone(&motion), &range.spec())?;
            let scanner = simulated_instrument(
                motion,
                PeakArgs {
                    center: 0.0,
                    width: 1.0,
                    height: 0.0,
                    background: 0.0,
                },
                time.flux,
                PathBuf::from("scans"),
            )?;

            let estimate = scanner.calculate(&path, &time.params(), pad)?;
            println!("Points: {}", path.len());
            println!("Estimate: {}", estimate);
        }

        Commands::Fit {
            input,
            model,
            compare,
        } => {
            let series = ScanLogReader::open(&input)?.read_series()?;
            println!("Log: {} ({} points)", input.display(), series.len());

            if compare {
                let comparisons = compare_fits(&builtin(), &series);
                println!("{:<10} | {:>12} | Parameters", "Model", "RMS");
                println!("{:-<65}", "");
                for comparison in &comparisons {
                    match &comparison.result {
                        Ok(report) => {
                            let params: Vec<String> = report
                                .readable
                                .iter()
                                .map(|(k, v)| format!("{}={:.4}", k, v))
                                .collect();
                            println!(
                                "{:<10} | {:>12.4} | {}",
                                comparison.model,
                                report.rms,
                                params.join(", ")
                            );
                        }
                        Err(err) => println!("{:<10} | {:>12} | {}", comparison.model, "-", err),
                    }
                }
                match best_fit(&comparisons) {
                    Some(report) => println!("Best: {}", report.model),
                    None => warn!("no model fitted {}", input.display()),
                }
            } else {
                let fit = lookup_model(&model)?;
                let report = fit.fit_series(&series)?;
                println!("Fit: {}", report);
            }
        }

        Commands::Info { input, json } => {
            let reader = ScanLogReader::open(&input)?;
            let series = reader.read_series()?;

            if json {
                println!("{}", serde_json::to_string_pretty(&series)?);
                return Ok(());
            }

            println!("File: {}", input.display());
            println!("Format: {:?}", reader.format());
            println!("Points: {}", series.len());
            println!("Axes: {}", series.axes().join(", "));

            let data = series.xy();
            if !data.x.is_empty() {
                let (min_x, max_x) = bounds(&data.x);
                let (min_y, max_y) = bounds(&data.y);
                println!("Axis range: {} - {}", min_x, max_x);
                println!("Value range: {} - {}", min_y, max_y);
            }
            if !data.skipped.is_empty() {
                println!("Points without a value: {}", data.skipped.len());
            }
        }
    }

    Ok(())
}

fn bounds(values: &[f64]) -> (f64, f64) {
    values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        })
}
