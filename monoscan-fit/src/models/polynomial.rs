//! Polynomial model with an exact least-squares guess.

use crate::fit::CurveFit;
use monoscan_core::{Error, Result};
use nalgebra::{DMatrix, DVector};
use std::collections::BTreeMap;

/// Polynomial of fixed degree.
///
/// Parameters are coefficients from the constant term upwards, so
/// `params[k]` multiplies `x^k`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Polynomial {
    degree: usize,
    name: String,
}

impl Polynomial {
    /// Polynomial of the given degree.
    #[must_use]
    pub fn new(degree: usize) -> Self {
        let name = match degree {
            1 => "linear".to_string(),
            d => format!("poly{d}"),
        };
        Self { degree, name }
    }

    /// Straight line.
    #[must_use]
    pub fn linear() -> Self {
        Self::new(1)
    }

    /// Degree of the polynomial.
    #[must_use]
    pub fn degree(&self) -> usize {
        self.degree
    }

    /// Linear least-squares coefficients.
    ///
    /// # Errors
    /// Returns [`Error::FitDivergence`] when there are too few points or
    /// the design matrix is rank deficient.
    pub fn solve(&self, x: &[f64], y: &[f64]) -> Result<Vec<f64>> {
        let terms = self.degree + 1;
        if x.len() < terms || x.len() != y.len() {
            return Err(Error::FitDivergence(format!(
                "{} needs {terms} points, got {}",
                self.name,
                x.len()
            )));
        }

        let design = DMatrix::from_fn(x.len(), terms, |i, k| powi(x[i], k));
        let rhs = DVector::from_column_slice(y);
        let svd = design.svd(true, true);
        if svd.rank(1e-12 * svd.singular_values.max()) < terms {
            return Err(Error::FitDivergence(format!(
                "{}: singular system, positions do not span {terms} distinct values",
                self.name
            )));
        }
        let coeffs = svd
            .solve(&rhs, 1e-12)
            .map_err(|e| Error::FitDivergence(format!("{}: {e}", self.name)))?;
        Ok(coeffs.as_slice().to_vec())
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
fn powi(x: f64, k: usize) -> f64 {
    x.powi(k as i32)
}

impl CurveFit for Polynomial {
    fn name(&self) -> &str {
        &self.name
    }

    fn param_names(&self) -> Vec<String> {
        (0..=self.degree).map(|k| format!("c{k}")).collect()
    }

    fn model(&self, x: f64, params: &[f64]) -> f64 {
        params.iter().rev().fold(0.0, |acc, c| acc * x + c)
    }

    fn guess(&self, x: &[f64], y: &[f64]) -> Result<Vec<f64>> {
        self.solve(x, y)
    }

    fn readable(&self, params: &[f64]) -> BTreeMap<String, f64> {
        if self.degree == 1 && params.len() == 2 {
            return BTreeMap::from([
                ("intercept".to_string(), params[0]),
                ("slope".to_string(), params[1]),
            ]);
        }
        self.param_names().into_iter().zip(params.iter().copied()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_exact_line() {
        let x = [0.0, 1.0, 2.0, 3.0];
        let y = [1.0, 3.0, 5.0, 7.0];
        let line = Polynomial::linear();
        let params = line.solve(&x, &y).unwrap();
        let readable = line.readable(&params);
        assert_relative_eq!(readable["slope"], 2.0, epsilon = 1e-10);
        assert_relative_eq!(readable["intercept"], 1.0, epsilon = 1e-10);
        assert_relative_eq!(line.model(10.0, &params), 21.0, epsilon = 1e-9);
    }

    #[test]
    fn test_quadratic() {
        let x: Vec<f64> = (-3..=3).map(f64::from).collect();
        let y: Vec<f64> = x.iter().map(|v| 0.5 * v * v - v + 2.0).collect();
        let quad = Polynomial::new(2);
        let params = quad.solve(&x, &y).unwrap();
        assert_relative_eq!(params[0], 2.0, epsilon = 1e-10);
        assert_relative_eq!(params[1], -1.0, epsilon = 1e-10);
        assert_relative_eq!(params[2], 0.5, epsilon = 1e-10);
        assert_eq!(quad.name(), "poly2");
        assert!(quad.readable(&params).contains_key("c2"));
    }

    #[test]
    fn test_singular_positions() {
        let line = Polynomial::linear();
        let err = line.solve(&[1.0, 1.0, 1.0], &[1.0, 2.0, 3.0]).unwrap_err();
        assert!(matches!(err, Error::FitDivergence(_)));
    }
}
