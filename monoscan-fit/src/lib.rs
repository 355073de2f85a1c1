//! monoscan-fit: Curve fitting for scan results.
//!
//! This crate provides the two-tier fitting interface used after a scan:
//! - [`Fit`] - a complete fitting procedure on `(x, y)` data
//! - [`CurveFit`] - a model given as `model`/`guess`/`readable`, fitted by
//!   [`CurveFitter`] with Levenberg–Marquardt least squares
//!
//! Built-in models are [`Polynomial`], [`Gaussian`], [`Trapezoid`] and
//! [`Step`].
//!
#![warn(missing_docs)]

mod compare;
mod fit;
pub mod models;
pub mod solver;

pub use compare::{best_fit, compare_fits, Comparison};
pub use fit::{rms_residual, CurveFit, CurveFitter, Fit, FitReport};
pub use models::{by_name, Gaussian, Polynomial, Step, Trapezoid};
pub use solver::{levenberg_marquardt, Solution, SolverOptions};
