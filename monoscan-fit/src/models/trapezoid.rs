//! Symmetric trapezoid on a flat background.
#![allow(clippy::cast_precision_loss)]

use super::{argmax, sorted_by_x, span};
use crate::fit::CurveFit;
use monoscan_core::{Error, Result};

/// Flat top of width `top`, linear edges of width `edge` on either side.
///
/// Parameters: `[center, top, edge, height, background]`. Typical use is a
/// slit or beam profile scanned across a sample edge.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Trapezoid;

const MIN_EDGE: f64 = 1e-9;

impl CurveFit for Trapezoid {
    fn name(&self) -> &str {
        "trapezoid"
    }

    fn param_names(&self) -> Vec<String> {
        ["center", "top", "edge", "height", "background"]
            .map(String::from)
            .to_vec()
    }

    fn model(&self, x: f64, params: &[f64]) -> f64 {
        let center = params[0];
        let half_top = params[1].abs() / 2.0;
        let edge = params[2].abs().max(MIN_EDGE);
        let (height, background) = (params[3], params[4]);

        let d = (x - center).abs();
        if d <= half_top {
            background + height
        } else if d < half_top + edge {
            background + height * (1.0 - (d - half_top) / edge)
        } else {
            background
        }
    }

    fn guess(&self, x: &[f64], y: &[f64]) -> Result<Vec<f64>> {
        let (xs, ys) = sorted_by_x(x, y);
        let peak = argmax(&ys)
            .ok_or_else(|| Error::FitDivergence("trapezoid: no data".to_string()))?;
        let background = ys.iter().copied().fold(f64::INFINITY, f64::min);
        let height = ys[peak] - background;
        if height <= 0.0 || span(&xs) <= 0.0 {
            return Err(Error::FitDivergence(
                "trapezoid: data has no plateau to fit".to_string(),
            ));
        }

        let above = |fraction: f64| -> (f64, f64) {
            let threshold = background + fraction * height;
            let inside: Vec<f64> = xs
                .iter()
                .zip(&ys)
                .filter(|&(_, &yi)| yi >= threshold)
                .map(|(&xi, _)| xi)
                .collect();
            let low = inside.first().copied().unwrap_or(xs[peak]);
            let high = inside.last().copied().unwrap_or(xs[peak]);
            (low, high)
        };

        let (top_low, top_high) = above(0.9);
        let (base_low, base_high) = above(0.1);
        let center = (base_low + base_high) / 2.0;
        let top = top_high - top_low;
        let spacing = span(&xs) / (xs.len().max(2) - 1) as f64;
        let edge = ((base_high - base_low - top) / 2.0).max(spacing);

        Ok(vec![center, top, edge, height, background])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fit::{CurveFitter, Fit};
    use approx::assert_relative_eq;

    #[test]
    fn test_model_shape() {
        let p = [0.0, 2.0, 1.0, 10.0, 1.0];
        assert_relative_eq!(Trapezoid.model(0.0, &p), 11.0);
        assert_relative_eq!(Trapezoid.model(1.0, &p), 11.0);
        assert_relative_eq!(Trapezoid.model(1.5, &p), 6.0);
        assert_relative_eq!(Trapezoid.model(-1.5, &p), 6.0);
        assert_relative_eq!(Trapezoid.model(3.0, &p), 1.0);
    }

    #[test]
    fn test_guess_brackets_plateau() {
        let truth = [5.0, 4.0, 2.0, 100.0, 3.0];
        let x: Vec<f64> = (0..=40).map(|i| 0.25 * f64::from(i)).collect();
        let y: Vec<f64> = x.iter().map(|&xi| Trapezoid.model(xi, &truth)).collect();
        let guess = Trapezoid.guess(&x, &y).unwrap();
        assert_relative_eq!(guess[0], 5.0, epsilon = 0.3);
        assert_relative_eq!(guess[3], 100.0, epsilon = 1e-9);
        assert_relative_eq!(guess[4], 3.0, epsilon = 1e-9);
        assert!(guess[1] > 3.0 && guess[1] < 5.0);
    }

    #[test]
    fn test_recovers_plateau() {
        let truth = [5.0, 4.0, 2.0, 100.0, 3.0];
        let x: Vec<f64> = (0..=40).map(|i| 0.25 * f64::from(i)).collect();
        let y: Vec<f64> = x.iter().map(|&xi| Trapezoid.model(xi, &truth)).collect();

        let params = CurveFitter::new(Trapezoid).fit(&x, &y).unwrap();
        assert_relative_eq!(params[0], 5.0, epsilon = 1e-6);
        assert_relative_eq!(params[1].abs(), 4.0, epsilon = 1e-6);
        assert_relative_eq!(params[2].abs(), 2.0, epsilon = 1e-6);
        assert_relative_eq!(params[3], 100.0, epsilon = 1e-6);
        assert_relative_eq!(params[4], 3.0, epsilon = 1e-6);
    }
}
