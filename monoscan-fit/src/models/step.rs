//! Smoothed step edge.
#![allow(clippy::cast_precision_loss)]

use super::sorted_by_x;
use crate::fit::CurveFit;
use monoscan_core::{Error, Result};

/// Logistic edge: `background + height / (1 + exp(-(x - center) / width))`.
///
/// Parameters: `[center, width, height, background]`. A negative `height`
/// describes a falling edge.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Step;

impl CurveFit for Step {
    fn name(&self) -> &str {
        "step"
    }

    fn param_names(&self) -> Vec<String> {
        ["center", "width", "height", "background"]
            .map(String::from)
            .to_vec()
    }

    fn model(&self, x: f64, params: &[f64]) -> f64 {
        let [center, width, height, background] = [params[0], params[1], params[2], params[3]];
        let width = if width.abs() < f64::EPSILON {
            f64::EPSILON.copysign(width)
        } else {
            width
        };
        background + height / (1.0 + (-(x - center) / width).exp())
    }

    fn guess(&self, x: &[f64], y: &[f64]) -> Result<Vec<f64>> {
        let (xs, ys) = sorted_by_x(x, y);
        let n = xs.len();
        if n < 2 {
            return Err(Error::FitDivergence(
                "step: needs at least two points".to_string(),
            ));
        }

        let quarter = (n / 4).max(1);
        let low = ys[..quarter].iter().sum::<f64>() / quarter as f64;
        let high = ys[n - quarter..].iter().sum::<f64>() / quarter as f64;
        let height = high - low;
        if height == 0.0 {
            return Err(Error::FitDivergence(
                "step: data has no edge to fit".to_string(),
            ));
        }

        let midpoint = low + height / 2.0;
        let crossing = ys
            .windows(2)
            .position(|w| (w[0] - midpoint) * (w[1] - midpoint) <= 0.0)
            .unwrap_or(n / 2 - 1);
        let (x0, x1) = (xs[crossing], xs[crossing + 1]);
        let (y0, y1) = (ys[crossing], ys[crossing + 1]);
        let center = if (y1 - y0).abs() > f64::EPSILON {
            x0 + (midpoint - y0) * (x1 - x0) / (y1 - y0)
        } else {
            (x0 + x1) / 2.0
        };
        let width = ((xs[n - 1] - xs[0]) / 10.0).max(f64::EPSILON);

        Ok(vec![center, width, height, low])
    }
}
