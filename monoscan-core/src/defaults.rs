//! Instrument defaults contract.
//!
//! An instrument exposes scanning by implementing [`Defaults`], either
//! directly or by handing closures to [`DefaultsBuilder`]. Both paths end in
//! a [`ValidatedDefaults`], which the scan factory accepts and which has
//! checked once that every capability is present.

use crate::error::{Error, Result};
use crate::estimator::make_estimator;
use crate::position::Position;
use crate::value::{MonoidKind, MonoidValue};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Counting parameters passed to the detector and time estimator.
///
/// Exactly one of the time-defining fields is expected per measurement;
/// `extra` carries instrument-specific options through untouched.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MeasureParams {
    /// Count for a fixed number of seconds.
    pub seconds: Option<f64>,
    /// Count for a fixed number of minutes.
    pub minutes: Option<f64>,
    /// Count for a fixed number of hours.
    pub hours: Option<f64>,
    /// Count for a fixed number of accelerator frames.
    pub frames: Option<u64>,
    /// Count until a proton charge (µA·h) has been delivered.
    pub uamps: Option<f64>,
    /// Count until the monitor reaches this many counts.
    pub monitor: Option<f64>,
    /// Instrument-specific options.
    pub extra: BTreeMap<String, f64>,
}

impl MeasureParams {
    /// Creates empty parameters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Count for `seconds`.
    #[must_use]
    pub fn with_seconds(mut self, seconds: f64) -> Self {
        self.seconds = Some(seconds);
        self
    }

    /// Count for `minutes`.
    #[must_use]
    pub fn with_minutes(mut self, minutes: f64) -> Self {
        self.minutes = Some(minutes);
        self
    }

    /// Count for `hours`.
    #[must_use]
    pub fn with_hours(mut self, hours: f64) -> Self {
        self.hours = Some(hours);
        self
    }

    /// Count for `frames`.
    #[must_use]
    pub fn with_frames(mut self, frames: u64) -> Self {
        self.frames = Some(frames);
        self
    }

    /// Count for `uamps` of proton charge.
    #[must_use]
    pub fn with_uamps(mut self, uamps: f64) -> Self {
        self.uamps = Some(uamps);
        self
    }

    /// Count to a monitor target.
    #[must_use]
    pub fn with_monitor(mut self, monitor: f64) -> Self {
        self.monitor = Some(monitor);
        self
    }

    /// Adds an instrument-specific option.
    #[must_use]
    pub fn with_extra(mut self, key: impl Into<String>, value: f64) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// The time-defining fields that are set, as `(name, value)` pairs.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn time_fields(&self) -> Vec<(&'static str, f64)> {
        [
            ("seconds", self.seconds),
            ("minutes", self.minutes),
            ("hours", self.hours),
            ("frames", self.frames.map(|f| f as f64)),
            ("uamps", self.uamps),
            ("monitor", self.monitor),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.map(|v| (name, v)))
        .collect()
    }

    /// Checks that every time-defining field is finite and non-negative.
    ///
    /// # Errors
    /// Returns [`Error::InvalidParameter`] naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in self.time_fields() {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::InvalidParameter(format!(
                    "{name} must be finite and non-negative, got {value}"
                )));
            }
        }
        Ok(())
    }
}

/// The capabilities an instrument must provide.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Capability {
    /// Full measurement with a title.
    Measure,
    /// Single-valued measurement.
    Detector,
    /// Expected duration of a measurement.
    TimeEstimator,
    /// Unique log path for a scan.
    LogFile,
}

impl Capability {
    /// All capabilities, in the order they are checked.
    pub const ALL: [Capability; 4] = [
        Capability::Measure,
        Capability::Detector,
        Capability::TimeEstimator,
        Capability::LogFile,
    ];

    /// Snake-case name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Measure => "measure",
            Self::Detector => "detector",
            Self::TimeEstimator => "time_estimator",
            Self::LogFile => "log_file",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the scan tells the instrument when asking for a log path.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LogContext {
    /// Instrument name.
    pub instrument: String,
    /// Axes the scan moves, in position order.
    pub axes: Vec<String>,
    /// Number of positions the scan will visit.
    pub points: usize,
}

/// Measurement primitives of one instrument.
///
/// Implementations are long-lived and bound to one instrument. The scan
/// factory calls them sequentially while holding the instrument's lock.
pub trait Defaults: Send {
    /// Instrument name, used in logs and errors.
    fn name(&self) -> &str;

    /// Capabilities this implementation provides.
    fn capabilities(&self) -> Vec<Capability> {
        Capability::ALL.to_vec()
    }

    /// Performs a full titled measurement at `position`.
    ///
    /// # Errors
    /// Returns an instrument error if the measurement fails.
    fn measure(&mut self, title: &str, position: &Position, params: &MeasureParams)
        -> Result<()>;

    /// Performs one detector read.
    ///
    /// # Errors
    /// Returns an instrument error if the read fails.
    fn detector(&mut self, params: &MeasureParams) -> Result<MonoidValue>;

    /// Declared kind of [`Defaults::detector`] readings.
    fn detector_kind(&self) -> MonoidKind {
        MonoidKind::Sum
    }

    /// Expected duration of one detector read, in seconds.
    ///
    /// # Errors
    /// Returns an error if the parameters do not determine a duration.
    fn time_estimator(&self, params: &MeasureParams) -> Result<f64>;

    /// Path to log this scan to.
    ///
    /// # Errors
    /// Returns an error if no path can be produced.
    fn log_file(&self, context: &LogContext) -> Result<PathBuf>;
}

impl<T: Defaults + ?Sized> Defaults for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn capabilities(&self) -> Vec<Capability> {
        (**self).capabilities()
    }

    fn measure(
        &mut self,
        title: &str,
        position: &Position,
        params: &MeasureParams,
    ) -> Result<()> {
        (**self).measure(title, position, params)
    }

    fn detector(&mut self, params: &MeasureParams) -> Result<MonoidValue> {
        (**self).detector(params)
    }

    fn detector_kind(&self) -> MonoidKind {
        (**self).detector_kind()
    }

    fn time_estimator(&self, params: &MeasureParams) -> Result<f64> {
        (**self).time_estimator(params)
    }

    fn log_file(&self, context: &LogContext) -> Result<PathBuf> {
        (**self).log_file(context)
    }
}

/// Defaults whose capability set has been checked.
#[derive(Debug)]
pub struct ValidatedDefaults<D> {
    inner: D,
}

impl<D: Defaults> ValidatedDefaults<D> {
    /// Checks that `defaults` advertises every capability.
    ///
    /// # Errors
    /// Returns [`Error::ContractViolation`] naming the first missing
    /// capability.
    pub fn new(defaults: D) -> Result<Self> {
        let provided = defaults.capabilities();
        if let Some(missing) = Capability::ALL
            .into_iter()
            .find(|cap| !provided.contains(cap))
        {
            return Err(Error::ContractViolation {
                instrument: defaults.name().to_string(),
                capability: missing,
            });
        }
        Ok(Self { inner: defaults })
    }

    /// Borrows the underlying defaults.
    pub fn get(&self) -> &D {
        &self.inner
    }

    /// Mutably borrows the underlying defaults.
    pub fn get_mut(&mut self) -> &mut D {
        &mut self.inner
    }

    /// Unwraps the underlying defaults.
    pub fn into_inner(self) -> D {
        self.inner
    }
}

type MeasureFn = Box<dyn FnMut(&str, &Position, &MeasureParams) -> Result<()> + Send>;
type DetectorFn = Box<dyn FnMut(&MeasureParams) -> Result<MonoidValue> + Send>;
type EstimatorFn = Box<dyn Fn(&MeasureParams) -> Result<f64> + Send>;
type LogFileFn = Box<dyn Fn(&LogContext) -> Result<PathBuf> + Send>;

/// Builds [`Defaults`] from closures.
///
/// ```
/// use monoscan_core::{Defaults, DefaultsBuilder, MeasureParams, MonoidValue};
///
/// let defaults = DefaultsBuilder::new("demo")
///     .measure(|_, _, _| Ok(()))
///     .detector(|_| Ok(MonoidValue::from(3.0)))
///     .flux(1.0)
///     .log_file(|_| Ok("demo.csv".into()))
///     .build()
///     .unwrap();
/// assert_eq!(defaults.get().name(), "demo");
/// ```
pub struct DefaultsBuilder {
    name: String,
    kind: MonoidKind,
    measure: Option<MeasureFn>,
    detector: Option<DetectorFn>,
    estimator: Option<EstimatorFn>,
    log_file: Option<LogFileFn>,
}

impl DefaultsBuilder {
    /// Starts a builder for the named instrument.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: MonoidKind::Sum,
            measure: None,
            detector: None,
            estimator: None,
            log_file: None,
        }
    }

    /// Sets the full measurement capability.
    #[must_use]
    pub fn measure<F>(mut self, f: F) -> Self
    where
        F: FnMut(&str, &Position, &MeasureParams) -> Result<()> + Send + 'static,
    {
        self.measure = Some(Box::new(f));
        self
    }

    /// Sets the detector capability.
    #[must_use]
    pub fn detector<F>(mut self, f: F) -> Self
    where
        F: FnMut(&MeasureParams) -> Result<MonoidValue> + Send + 'static,
    {
        self.detector = Some(Box::new(f));
        self
    }

    /// Declares the kind of detector readings.
    #[must_use]
    pub fn detector_kind(mut self, kind: MonoidKind) -> Self {
        self.kind = kind;
        self
    }

    /// Sets the time estimator capability.
    #[must_use]
    pub fn time_estimator<F>(mut self, f: F) -> Self
    where
        F: Fn(&MeasureParams) -> Result<f64> + Send + 'static,
    {
        self.estimator = Some(Box::new(f));
        self
    }

    /// Sets the time estimator from a flux rate, see [`make_estimator`].
    #[must_use]
    pub fn flux(self, flux: f64) -> Self {
        self.time_estimator(make_estimator(flux))
    }

    /// Sets the log path capability.
    #[must_use]
    pub fn log_file<F>(mut self, f: F) -> Self
    where
        F: Fn(&LogContext) -> Result<PathBuf> + Send + 'static,
    {
        self.log_file = Some(Box::new(f));
        self
    }

    /// Finishes the builder.
    ///
    /// # Errors
    /// Returns [`Error::ContractViolation`] for the first capability that
    /// was never supplied.
    pub fn build(self) -> Result<ValidatedDefaults<FnDefaults>> {
        let violation = |capability| Error::ContractViolation {
            instrument: self.name.clone(),
            capability,
        };
        let measure = self.measure.ok_or_else(|| violation(Capability::Measure))?;
        let detector = self
            .detector
            .ok_or_else(|| violation(Capability::Detector))?;
        let estimator = self
            .estimator
            .ok_or_else(|| violation(Capability::TimeEstimator))?;
        let log_file = self
            .log_file
            .ok_or_else(|| violation(Capability::LogFile))?;

        ValidatedDefaults::new(FnDefaults {
            name: self.name,
            kind: self.kind,
            measure,
            detector,
            estimator,
            log_file,
        })
    }
}

impl fmt::Debug for DefaultsBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultsBuilder")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("measure", &self.measure.is_some())
            .field("detector", &self.detector.is_some())
            .field("time_estimator", &self.estimator.is_some())
            .field("log_file", &self.log_file.is_some())
            .finish()
    }
}

/// Closure-backed [`Defaults`] produced by [`DefaultsBuilder`].
pub struct FnDefaults {
    name: String,
    kind: MonoidKind,
    measure: MeasureFn,
    detector: DetectorFn,
    estimator: EstimatorFn,
    log_file: LogFileFn,
}

impl Defaults for FnDefaults {
    fn name(&self) -> &str {
        &self.name
    }

    fn measure(
        &mut self,
        title: &str,
        position: &Position,
        params: &MeasureParams,
    ) -> Result<()> {
        (self.measure)(title, position, params)
    }

    fn detector(&mut self, params: &MeasureParams) -> Result<MonoidValue> {
        (self.detector)(params)
    }

    fn detector_kind(&self) -> MonoidKind {
        self.kind.clone()
    }

    fn time_estimator(&self, params: &MeasureParams) -> Result<f64> {
        (self.estimator)(params)
    }

    fn log_file(&self, context: &LogContext) -> Result<PathBuf> {
        (self.log_file)(context)
    }
}

impl fmt::Debug for FnDefaults {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnDefaults")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}
