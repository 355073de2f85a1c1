//! Scan factory and driver.

use crate::config::ScanConfig;
use crate::observer::ScanObserver;
use crate::path::ScanPath;
use chrono::{DateTime, Duration, Local};
use log::{debug, info, warn};
use monoscan_core::{
    Defaults, Error, LogContext, MeasureParams, Position, Result, ResultSeries, ValidatedDefaults,
};
use monoscan_fit::FitReport;
use monoscan_io::ScanLogWriter;
use std::fmt;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError, TryLockError};

/// How the scan loop ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScanStatus {
    /// Every position was measured.
    Completed,
    /// The cancel token stopped the scan early.
    Cancelled,
}

/// Everything a scan produced.
#[derive(Debug)]
pub struct ScanOutcome {
    /// Measured points in visiting order.
    pub series: ResultSeries,
    /// How the loop ended.
    pub status: ScanStatus,
    /// Fit of the series, when one was requested.
    pub fit: Option<Result<FitReport>>,
    /// Log written, when saving was enabled.
    pub log_path: Option<PathBuf>,
    /// Advisory duration estimate in seconds, when the estimator succeeded.
    pub estimated_seconds: Option<f64>,
}

/// Expected duration of a scan.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TimeEstimate {
    /// Total seconds including padding.
    pub seconds: f64,
    /// Local time the scan would finish if started now.
    pub finish: DateTime<Local>,
}

impl TimeEstimate {
    fn from_now(seconds: f64) -> Self {
        #[allow(clippy::cast_possible_truncation)]
        let millis = (seconds * 1000.0).round() as i64;
        let finish = Duration::try_milliseconds(millis)
            .and_then(|delta| Local::now().checked_add_signed(delta))
            .unwrap_or_else(Local::now);
        Self { seconds, finish }
    }
}

impl fmt::Display for TimeEstimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.1} s, finishing at {}",
            self.seconds,
            self.finish.format("%Y-%m-%d %H:%M:%S")
        )
    }
}

/// Builds the scan entry point for an instrument.
///
/// The defaults are validated once here; a missing capability fails with
/// [`Error::ContractViolation`] before any scan can start.
///
/// # Errors
/// Returns [`Error::ContractViolation`] naming the first missing capability.
pub fn make_scan<D: Defaults>(defaults: D) -> Result<Scanner<D>> {
    Ok(Scanner::new(ValidatedDefaults::new(defaults)?))
}

/// Drives scans on one instrument.
///
/// The instrument is held behind a lock for the whole of each scan, so two
/// scans never drive the same hardware at once; a second caller gets
/// [`Error::Busy`].
pub struct Scanner<D> {
    name: String,
    defaults: Mutex<ValidatedDefaults<D>>,
}

impl<D: Defaults> Scanner<D> {
    /// Wraps already validated defaults.
    pub fn new(defaults: ValidatedDefaults<D>) -> Self {
        Self {
            name: defaults.get().name().to_string(),
            defaults: Mutex::new(defaults),
        }
    }

    /// Instrument name.
    pub fn name(&self) -> &str {
        &self.name
    }

    fn lock(&self) -> Result<MutexGuard<'_, ValidatedDefaults<D>>> {
        match self.defaults.try_lock() {
            Ok(guard) => Ok(guard),
            Err(TryLockError::Poisoned(poisoned)) => Ok(poisoned.into_inner()),
            Err(TryLockError::WouldBlock) => Err(Error::Busy(self.name.clone())),
        }
    }

    /// Runs `f` with exclusive access to the instrument defaults.
    ///
    /// # Errors
    /// Returns [`Error::Busy`] while a scan is running.
    pub fn with_defaults<R>(&self, f: impl FnOnce(&mut D) -> R) -> Result<R> {
        let mut guard = self.lock()?;
        Ok(f(guard.get_mut()))
    }

    /// Unwraps the instrument defaults.
    pub fn into_defaults(self) -> D {
        self.defaults
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
            .into_inner()
    }

    /// Runs a scan without a live observer.
    ///
    /// # Errors
    /// See [`Scanner::run_with`].
    pub fn run(&self, path: &ScanPath, config: &ScanConfig) -> Result<ScanOutcome> {
        self.run_with(path, config, &mut ())
    }

    /// Runs a scan, reporting each point to `observer`.
    ///
    /// At each position every axis is moved, the detector is read
    /// `config.repeats` times and the reads are folded starting from the
    /// zero of the instrument's detector kind. Each point is logged and
    /// flushed before the next position.
    ///
    /// # Errors
    /// - [`Error::InvalidConfig`] / [`Error::InvalidParameter`] for an
    ///   empty path or bad durations
    /// - [`Error::Busy`] if another scan holds the instrument
    /// - [`Error::MeasurementFailure`] if a move or detector read fails;
    ///   points already logged stay on disk
    /// - [`Error::TypeMismatch`] if a read is not of the declared kind
    ///
    /// A failed fit does not fail the scan; it is reported in
    /// [`ScanOutcome::fit`].
    pub fn run_with(
        &self,
        path: &ScanPath,
        config: &ScanConfig,
        observer: &mut dyn ScanObserver,
    ) -> Result<ScanOutcome> {
        path.validate()?;
        config.validate()?;

        let mut guard = self.lock()?;
        let defaults = guard.get_mut();
        let steps = path.steps();
        let axes = path.axes();
        let total = steps.len();

        let estimated_seconds = match defaults.time_estimator(&config.params) {
            Ok(per_read) => {
                let estimate = TimeEstimate::from_now(scan_seconds(
                    total,
                    per_read,
                    config.repeats,
                    config.pad,
                ));
                info!(
                    "{}: scanning {total} position(s) over [{}], expected {estimate}",
                    self.name,
                    axes.join(", ")
                );
                Some(estimate.seconds)
            }
            Err(err) => {
                warn!("{}: no time estimate available: {err}", self.name);
                None
            }
        };

        let mut log_writer = if config.save {
            let log_path = match &config.log_path {
                Some(p) => p.clone(),
                None => defaults.log_file(&LogContext {
                    instrument: self.name.clone(),
                    axes: axes.clone(),
                    points: total,
                })?,
            };
            let writer = ScanLogWriter::create(&log_path, &axes)?;
            info!("{}: logging to {}", self.name, log_path.display());
            Some(writer)
        } else {
            None
        };

        let kind = defaults.detector_kind();
        let mut series = ResultSeries::with_capacity(total);
        let mut status = ScanStatus::Completed;
        observer.on_start(total);

        'positions: for (index, step) in steps.iter().enumerate() {
            if config.cancel.is_cancelled() {
                status = ScanStatus::Cancelled;
                break;
            }

            let position = step.position();
            step.apply()
                .map_err(|err| measurement_failure(&position, &err))?;

            let mut value = kind.zero();
            for _ in 0..config.repeats {
                if config.cancel.is_cancelled() {
                    status = ScanStatus::Cancelled;
                    break 'positions;
                }
                let reading = defaults
                    .detector(&config.params)
                    .map_err(|err| measurement_failure(&position, &err))?;
                value = value.try_combine(reading)?;
            }

            if let Some(writer) = log_writer.as_mut() {
                writer.write_point(index, &position, &value)?;
            }
            if config.display {
                info!("[{}/{total}] {position}: {value}", index + 1);
            } else {
                debug!("[{}/{total}] {position}: {value}", index + 1);
            }

            series.push(position, value);
            if let Some(point) = series.last() {
                observer.on_point(index, point, &series);
            }
        }

        if status == ScanStatus::Cancelled {
            info!(
                "{}: scan cancelled after {} of {total} position(s)",
                self.name,
                series.len()
            );
        }
        observer.on_finish(&series, status);

        let log_path = log_writer.take().map(|writer| writer.path().to_path_buf());
        drop(guard);

        let fit = config.fit.as_ref().map(|fit| {
            let result = fit.fit_series(&series);
            match &result {
                Ok(report) => info!("{}: {report}", self.name),
                Err(err) => warn!("{}: {err}", self.name),
            }
            result
        });

        Ok(ScanOutcome {
            series,
            status,
            fit,
            log_path,
            estimated_seconds,
        })
    }

    /// Performs a full titled measurement at every position.
    ///
    /// `{axis}` fields in `title` are replaced with the position's values.
    /// Returns the number of measurements made.
    ///
    /// # Errors
    /// Returns [`Error::MeasurementFailure`] naming the position where a
    /// move or measurement failed, or [`Error::Busy`].
    pub fn measure(&self, path: &ScanPath, title: &str, params: &MeasureParams) -> Result<usize> {
        path.validate()?;
        params.validate()?;
        let mut guard = self.lock()?;
        let defaults = guard.get_mut();

        let mut count = 0;
        for step in path.steps() {
            let position = step.position();
            step.apply()
                .map_err(|err| measurement_failure(&position, &err))?;
            let run_title = position.format_title(title);
            info!("{}: measuring \"{run_title}\" at {position}", self.name);
            defaults
                .measure(&run_title, &position, params)
                .map_err(|err| measurement_failure(&position, &err))?;
            count += 1;
        }
        Ok(count)
    }

    /// Expected duration of a scan without moving anything.
    ///
    /// `pad` is added per position for motion and overheads.
    ///
    /// # Errors
    /// Propagates estimator errors, e.g. [`Error::AmbiguousEstimate`].
    pub fn calculate(
        &self,
        path: &ScanPath,
        params: &MeasureParams,
        pad: f64,
    ) -> Result<TimeEstimate> {
        if !pad.is_finite() || pad < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "pad must be finite and non-negative, got {pad}"
            )));
        }
        let per_read = self.lock()?.get().time_estimator(params)?;
        let estimate = TimeEstimate::from_now(scan_seconds(path.len(), per_read, 1, pad));
        info!("{}: the run would take {estimate}", self.name);
        Ok(estimate)
    }
}

impl<D> fmt::Debug for Scanner<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scanner").field("name", &self.name).finish_non_exhaustive()
    }
}

#[allow(clippy::cast_precision_loss)]
fn scan_seconds(points: usize, per_read: f64, repeats: usize, pad: f64) -> f64 {
    points as f64 * (pad + per_read * repeats as f64)
}

fn measurement_failure(position: &Position, err: &Error) -> Error {
    Error::MeasurementFailure {
        position: position.clone(),
        reason: err.to_string(),
    }
}
