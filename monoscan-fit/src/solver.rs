//! Damped least-squares solver.
//!
//! Levenberg–Marquardt with a central-difference Jacobian. Scan fits have a
//! handful of parameters and at most a few hundred points, so the normal
//! equations are formed densely and solved by Cholesky.
#![allow(clippy::cast_precision_loss)]

use monoscan_core::{Error, Result};
use nalgebra::{DMatrix, DVector};

/// Solver configuration.
#[derive(Clone, Debug)]
pub struct SolverOptions {
    /// Maximum number of accepted or rejected steps.
    pub max_iterations: usize,
    /// Relative tolerance on cost decrease, step size and gradient.
    pub tolerance: f64,
    /// Initial damping factor.
    pub initial_lambda: f64,
    /// Relative step for the numeric Jacobian.
    pub jacobian_step: f64,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            max_iterations: 200,
            tolerance: 1e-10,
            initial_lambda: 1e-3,
            jacobian_step: 1e-6,
        }
    }
}

impl SolverOptions {
    /// Set the iteration limit.
    #[must_use]
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Set the convergence tolerance.
    #[must_use]
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }
}

/// Result of a converged solve.
#[derive(Clone, Debug)]
pub struct Solution {
    /// Optimised parameters.
    pub params: Vec<f64>,
    /// Sum of squared residuals at `params`.
    pub cost: f64,
    /// Number of iterations used.
    pub iterations: usize,
}

const MAX_LAMBDA: f64 = 1e16;
const MIN_LAMBDA: f64 = 1e-15;

/// Minimises `sum((y - model(x, p))^2)` starting from `initial`.
///
/// # Errors
/// Returns [`Error::FitDivergence`] if the data is malformed, the start
/// point or any iterate is non-finite, or the iteration limit is reached
/// without convergence.
pub fn levenberg_marquardt<F>(
    model: F,
    x: &[f64],
    y: &[f64],
    initial: &[f64],
    options: &SolverOptions,
) -> Result<Solution>
where
    F: Fn(f64, &[f64]) -> f64,
{
    if x.len() != y.len() {
        return Err(Error::FitDivergence(format!(
            "x and y lengths differ ({} vs {})",
            x.len(),
            y.len()
        )));
    }
    if initial.iter().any(|p| !p.is_finite()) {
        return Err(Error::FitDivergence(format!(
            "initial guess is not finite: {initial:?}"
        )));
    }

    let n_params = initial.len();
    let mut params = DVector::from_column_slice(initial);
    let mut residuals = residual_vector(&model, x, y, params.as_slice());
    let mut cost = residuals.norm_squared();
    if !cost.is_finite() {
        return Err(Error::FitDivergence(
            "model is not finite at the initial guess".to_string(),
        ));
    }
    if n_params == 0 {
        return Ok(Solution {
            params: Vec::new(),
            cost,
            iterations: 0,
        });
    }

    let mut lambda = options.initial_lambda;
    for iteration in 0..options.max_iterations {
        let jacobian = numeric_jacobian(&model, x, params.as_slice(), options.jacobian_step);
        let jtj = jacobian.transpose() * &jacobian;
        let gradient = jacobian.transpose() * &residuals;

        if gradient.amax() <= options.tolerance * (1.0 + cost) {
            return Ok(Solution {
                params: params.as_slice().to_vec(),
                cost,
                iterations: iteration,
            });
        }

        let mut damped = jtj.clone();
        for i in 0..n_params {
            damped[(i, i)] += lambda * jtj[(i, i)].max(1e-12);
        }

        let Some(step) = damped.cholesky().map(|c| c.solve(&gradient)) else {
            lambda *= 10.0;
            if lambda > MAX_LAMBDA {
                return Err(Error::FitDivergence(
                    "normal equations are singular".to_string(),
                ));
            }
            continue;
        };

        let candidate = &params + &step;
        let candidate_residuals = residual_vector(&model, x, y, candidate.as_slice());
        let candidate_cost = candidate_residuals.norm_squared();

        if candidate_cost.is_finite() && candidate_cost <= cost {
            let decrease = cost - candidate_cost;
            let small_step =
                step.norm() <= options.tolerance * (params.norm() + options.tolerance);
            params = candidate;
            residuals = candidate_residuals;
            cost = candidate_cost;
            lambda = (lambda / 10.0).max(MIN_LAMBDA);

            if decrease <= options.tolerance * cost || small_step {
                return Ok(Solution {
                    params: params.as_slice().to_vec(),
                    cost,
                    iterations: iteration + 1,
                });
            }
        } else {
            lambda *= 10.0;
            if lambda > MAX_LAMBDA {
                // No damped step improves the cost: already at a minimum.
                return Ok(Solution {
                    params: params.as_slice().to_vec(),
                    cost,
                    iterations: iteration + 1,
                });
            }
        }
    }

    Err(Error::FitDivergence(format!(
        "no convergence after {} iterations (cost {cost:.6e})",
        options.max_iterations
    )))
}

fn residual_vector<F>(model: &F, x: &[f64], y: &[f64], params: &[f64]) -> DVector<f64>
where
    F: Fn(f64, &[f64]) -> f64,
{
    DVector::from_iterator(
        x.len(),
        x.iter().zip(y).map(|(&xi, &yi)| yi - model(xi, params)),
    )
}

fn numeric_jacobian<F>(model: &F, x: &[f64], params: &[f64], rel_step: f64) -> DMatrix<f64>
where
    F: Fn(f64, &[f64]) -> f64,
{
    let mut jac = DMatrix::<f64>::zeros(x.len(), params.len());
    let mut shifted = params.to_vec();
    for j in 0..params.len() {
        let h = rel_step * params[j].abs().max(1.0);
        shifted[j] = params[j] + h;
        let upper: Vec<f64> = x.iter().map(|&xi| model(xi, &shifted)).collect();
        shifted[j] = params[j] - h;
        for (i, &xi) in x.iter().enumerate() {
            jac[(i, j)] = (upper[i] - model(xi, &shifted)) / (2.0 * h);
        }
        shifted[j] = params[j];
    }
    jac
}
