//! Fit traits and reports.

use crate::solver::{levenberg_marquardt, SolverOptions};
use log::warn;
use monoscan_core::{Error, ResultSeries, Result};
use std::collections::BTreeMap;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A complete fitting procedure on `(x, y)` data.
pub trait Fit: Send + Sync {
    /// Short model name.
    fn name(&self) -> &str;

    /// Fewest points the fit can work with.
    fn min_points(&self) -> usize;

    /// Fits the data and returns model-specific parameters.
    ///
    /// # Errors
    /// Returns [`Error::FitDivergence`] if no usable parameters are found.
    fn fit(&self, x: &[f64], y: &[f64]) -> Result<Vec<f64>>;

    /// Evaluates the fitted curve at `x`.
    fn get_y(&self, x: &[f64], params: &[f64]) -> Vec<f64>;

    /// Human-readable named parameters.
    fn readable(&self, params: &[f64]) -> BTreeMap<String, f64>;

    /// Fits the scalar view of a series.
    ///
    /// Points without a scalar value are skipped. The report carries the
    /// root-mean-square residual of the fitted curve.
    ///
    /// # Errors
    /// Returns [`Error::FitDivergence`] if there are fewer than
    /// [`Fit::min_points`] usable points or the fit yields non-finite
    /// parameters.
    fn fit_series(&self, series: &ResultSeries) -> Result<FitReport> {
        let data = series.xy();
        if !data.skipped.is_empty() {
            warn!(
                "{} fit: skipped {} point(s) without a scalar value",
                self.name(),
                data.skipped.len()
            );
        }
        if data.len() < self.min_points() {
            return Err(Error::FitDivergence(format!(
                "{} fit needs at least {} points, got {}",
                self.name(),
                self.min_points(),
                data.len()
            )));
        }

        let params = self.fit(&data.x, &data.y)?;
        if params.iter().any(|p| !p.is_finite()) {
            return Err(Error::FitDivergence(format!(
                "{} fit produced non-finite parameters {params:?}",
                self.name()
            )));
        }

        let rms = rms_residual(&data.y, &self.get_y(&data.x, &params));
        Ok(FitReport {
            model: self.name().to_string(),
            readable: self.readable(&params),
            params,
            rms,
            points: data.len(),
            skipped: data.skipped.len(),
        })
    }
}

impl<T: Fit + ?Sized> Fit for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn min_points(&self) -> usize {
        (**self).min_points()
    }

    fn fit(&self, x: &[f64], y: &[f64]) -> Result<Vec<f64>> {
        (**self).fit(x, y)
    }

    fn get_y(&self, x: &[f64], params: &[f64]) -> Vec<f64> {
        (**self).get_y(x, params)
    }

    fn readable(&self, params: &[f64]) -> BTreeMap<String, f64> {
        (**self).readable(params)
    }
}

/// Outcome of fitting a series.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FitReport {
    /// Model name.
    pub model: String,
    /// Raw model parameters.
    pub params: Vec<f64>,
    /// Named parameters.
    pub readable: BTreeMap<String, f64>,
    /// Root-mean-square residual.
    pub rms: f64,
    /// Points used.
    pub points: usize,
    /// Points skipped for lacking a scalar value.
    pub skipped: usize,
}

impl FitReport {
    /// Looks up a named parameter.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<f64> {
        self.readable.get(name).copied()
    }
}

impl fmt::Display for FitReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.model)?;
        for (name, value) in &self.readable {
            write!(f, " {name}={value:.6}")?;
        }
        write!(f, " (rms {:.4e}, {} points)", self.rms, self.points)
    }
}

/// A curve model described by three pure functions.
///
/// [`CurveFitter`] turns any `CurveFit` into a [`Fit`] by nonlinear least
/// squares started from [`CurveFit::guess`].
pub trait CurveFit: Send + Sync {
    /// Short model name.
    fn name(&self) -> &str;

    /// Parameter names, in parameter order.
    fn param_names(&self) -> Vec<String>;

    /// Model value at `x`.
    fn model(&self, x: f64, params: &[f64]) -> f64;

    /// Starting parameters for the solver.
    ///
    /// # Errors
    /// Returns [`Error::FitDivergence`] if the data admits no guess.
    fn guess(&self, x: &[f64], y: &[f64]) -> Result<Vec<f64>>;

    /// Named parameters.
    fn readable(&self, params: &[f64]) -> BTreeMap<String, f64> {
        self.param_names().into_iter().zip(params.iter().copied()).collect()
    }

    /// Fewest points the model can be fitted to.
    fn min_points(&self) -> usize {
        self.param_names().len()
    }
}

/// Least-squares [`Fit`] for a [`CurveFit`] model.
#[derive(Clone, Debug, Default)]
pub struct CurveFitter<M> {
    model: M,
    options: SolverOptions,
}

impl<M: CurveFit> CurveFitter<M> {
    /// Wraps a model with default solver options.
    pub fn new(model: M) -> Self {
        Self {
            model,
            options: SolverOptions::default(),
        }
    }

    /// Set the solver options.
    #[must_use]
    pub fn with_options(mut self, options: SolverOptions) -> Self {
        self.options = options;
        self
    }

    /// The wrapped model.
    pub fn model(&self) -> &M {
        &self.model
    }
}

impl<M: CurveFit> Fit for CurveFitter<M> {
    fn name(&self) -> &str {
        self.model.name()
    }

    fn min_points(&self) -> usize {
        self.model.min_points()
    }

    fn fit(&self, x: &[f64], y: &[f64]) -> Result<Vec<f64>> {
        let initial = self.model.guess(x, y)?;
        let solution = levenberg_marquardt(
            |xi, params| self.model.model(xi, params),
            x,
            y,
            &initial,
            &self.options,
        )?;
        Ok(solution.params)
    }

    fn get_y(&self, x: &[f64], params: &[f64]) -> Vec<f64> {
        x.iter().map(|&xi| self.model.model(xi, params)).collect()
    }

    fn readable(&self, params: &[f64]) -> BTreeMap<String, f64> {
        self.model.readable(params)
    }
}

/// Root-mean-square difference between two equal-length slices.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn rms_residual(observed: &[f64], fitted: &[f64]) -> f64 {
    let n = observed.len().min(fitted.len());
    if n == 0 {
        return 0.0;
    }
    let ss: f64 = observed
        .iter()
        .zip(fitted)
        .map(|(o, f)| (o - f).powi(2))
        .sum();
    (ss / n as f64).sqrt()
}
