//! Time estimation from a flux rate.

use crate::defaults::MeasureParams;
use crate::error::{Error, Result};

/// Accelerator frame frequency, in Hz.
pub const FRAME_FREQUENCY_HZ: f64 = 10.0;

/// Nominal counting time per µA·h of proton charge, in seconds.
pub const SECONDS_PER_UAMP: f64 = 90.0;

/// Estimates measurement durations for an instrument with a fixed flux.
///
/// `flux` is the monitor count rate in counts per second and is only used
/// for `monitor` requests.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FluxEstimator {
    flux: f64,
}

impl FluxEstimator {
    /// Creates an estimator for the given monitor rate.
    #[must_use]
    pub fn new(flux: f64) -> Self {
        Self { flux }
    }

    /// Monitor rate in counts per second.
    #[must_use]
    pub fn flux(&self) -> f64 {
        self.flux
    }

    /// Expected duration of one measurement, in seconds.
    ///
    /// # Errors
    /// Returns [`Error::AmbiguousEstimate`] unless exactly one time-defining
    /// parameter is set, and [`Error::InvalidParameter`] for negative or
    /// non-finite values or a monitor request against a non-positive flux.
    pub fn estimate(&self, params: &MeasureParams) -> Result<f64> {
        let fields = params.time_fields();
        let (name, value) = match fields.as_slice() {
            [] => {
                return Err(Error::AmbiguousEstimate(
                    "no time parameter given; expected one of seconds, minutes, hours, frames, uamps or monitor"
                        .to_string(),
                ))
            }
            [single] => *single,
            many => {
                let names: Vec<&str> = many.iter().map(|(name, _)| *name).collect();
                return Err(Error::AmbiguousEstimate(format!(
                    "several time parameters given: {}",
                    names.join(", ")
                )));
            }
        };

        if !value.is_finite() || value < 0.0 {
            return Err(Error::InvalidParameter(format!(
                "{name} must be finite and non-negative, got {value}"
            )));
        }

        let seconds = match name {
            "minutes" => value * 60.0,
            "hours" => value * 3600.0,
            "frames" => value / FRAME_FREQUENCY_HZ,
            "uamps" => value * SECONDS_PER_UAMP,
            "monitor" => {
                if !(self.flux.is_finite() && self.flux > 0.0) {
                    return Err(Error::InvalidParameter(format!(
                        "cannot estimate a monitor count with flux {}",
                        self.flux
                    )));
                }
                value / self.flux
            }
            _ => value,
        };
        Ok(seconds)
    }
}

/// Builds a `time_estimator` capability from a flux rate.
///
/// ```
/// use monoscan_core::{make_estimator, MeasureParams};
///
/// let estimate = make_estimator(2.0);
/// let seconds = estimate(&MeasureParams::new().with_frames(50)).unwrap();
/// assert!((seconds - 5.0).abs() < 1e-12);
/// ```
pub fn make_estimator(flux: f64) -> impl Fn(&MeasureParams) -> Result<f64> + Send + Sync + 'static {
    let estimator = FluxEstimator::new(flux);
    move |params| estimator.estimate(params)
}
