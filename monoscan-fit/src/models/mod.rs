//! Built-in curve models.

mod gaussian;
mod polynomial;
mod step;
mod trapezoid;

pub use gaussian::{Gaussian, FWHM_PER_SIGMA};
pub use polynomial::Polynomial;
pub use step::Step;
pub use trapezoid::Trapezoid;

use crate::fit::{CurveFitter, Fit};
use std::cmp::Ordering;

/// Names accepted by [`by_name`], besides `polyN`.
pub const MODEL_NAMES: [&str; 4] = ["linear", "gaussian", "trapezoid", "step"];

/// Looks up a built-in model: `linear`, `polyN`, `gaussian`, `trapezoid`
/// or `step`.
#[must_use]
pub fn by_name(name: &str) -> Option<Box<dyn Fit>> {
    let name = name.trim().to_ascii_lowercase();
    match name.as_str() {
        "linear" | "line" => Some(Box::new(CurveFitter::new(Polynomial::linear()))),
        "gaussian" | "gauss" => Some(Box::new(CurveFitter::new(Gaussian))),
        "trapezoid" => Some(Box::new(CurveFitter::new(Trapezoid))),
        "step" => Some(Box::new(CurveFitter::new(Step))),
        other => other
            .strip_prefix("poly")
            .and_then(|degree| degree.parse::<usize>().ok())
            .filter(|&degree| degree >= 1)
            .map(|degree| Box::new(CurveFitter::new(Polynomial::new(degree))) as Box<dyn Fit>),
    }
}

/// Every built-in model, with a quadratic standing in for `polyN`.
#[must_use]
pub fn builtin() -> Vec<Box<dyn Fit>> {
    vec![
        Box::new(CurveFitter::new(Polynomial::linear())),
        Box::new(CurveFitter::new(Polynomial::new(2))),
        Box::new(CurveFitter::new(Gaussian)),
        Box::new(CurveFitter::new(Trapezoid)),
        Box::new(CurveFitter::new(Step)),
    ]
}

/// Sorts paired data by `x`, dropping nothing.
pub(crate) fn sorted_by_x(x: &[f64], y: &[f64]) -> (Vec<f64>, Vec<f64>) {
    let mut pairs: Vec<(f64, f64)> = x.iter().copied().zip(y.iter().copied()).collect();
    pairs.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));
    pairs.into_iter().unzip()
}

/// Index of the largest value.
pub(crate) fn argmax(values: &[f64]) -> Option<usize> {
    values
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(Ordering::Equal))
        .map(|(i, _)| i)
}

/// Width of the range covered by sorted `xs`.
pub(crate) fn span(xs: &[f64]) -> f64 {
    match (xs.first(), xs.last()) {
        (Some(first), Some(last)) => last - first,
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_by_name() {
        assert_eq!(by_name("Linear").unwrap().name(), "linear");
        assert_eq!(by_name("poly3").unwrap().name(), "poly3");
        assert_eq!(by_name("gauss").unwrap().name(), "gaussian");
        assert!(by_name("poly0").is_none());
        assert!(by_name("lorentzian").is_none());
        for name in MODEL_NAMES {
            assert!(by_name(name).is_some(), "{name}");
        }
    }

    #[test]
    fn test_helpers() {
        let (x, y) = sorted_by_x(&[3.0, 1.0, 2.0], &[30.0, 10.0, 20.0]);
        assert_eq!(x, vec![1.0, 2.0, 3.0]);
        assert_eq!(y, vec![10.0, 20.0, 30.0]);
        assert_eq!(argmax(&y), Some(2));
        assert_eq!(span(&x), 2.0);
        assert_eq!(argmax(&[]), None);
    }
}
