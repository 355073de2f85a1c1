//! Single gaussian peak on a flat background.

use super::{argmax, sorted_by_x, span};
use crate::fit::CurveFit;
use monoscan_core::{Error, Result};
use std::collections::BTreeMap;

/// Conversion from standard deviation to full width at half maximum.
pub const FWHM_PER_SIGMA: f64 = 2.354_820_045_030_949;

/// `background + amplitude * exp(-(x - center)^2 / (2 sigma^2))`.
///
/// Parameters: `[center, sigma, amplitude, background]`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Gaussian;

impl CurveFit for Gaussian {
    fn name(&self) -> &str {
        "gaussian"
    }

    fn param_names(&self) -> Vec<String> {
        ["center", "sigma", "amplitude", "background"]
            .map(String::from)
            .to_vec()
    }

    fn model(&self, x: f64, params: &[f64]) -> f64 {
        let [center, sigma, amplitude, background] = [params[0], params[1], params[2], params[3]];
        let z = (x - center) / sigma;
        background + amplitude * (-0.5 * z * z).exp()
    }

    fn guess(&self, x: &[f64], y: &[f64]) -> Result<Vec<f64>> {
        let (xs, ys) = sorted_by_x(x, y);
        let peak = argmax(&ys)
            .ok_or_else(|| Error::FitDivergence("gaussian: no data".to_string()))?;
        let background = ys.iter().copied().fold(f64::INFINITY, f64::min);
        let amplitude = ys[peak] - background;
        let width = span(&xs);
        if amplitude <= 0.0 || width <= 0.0 {
            return Err(Error::FitDivergence(
                "gaussian: data has no peak to fit".to_string(),
            ));
        }

        // Area above background over peak height.
        let area: f64 = xs
            .windows(2)
            .zip(ys.windows(2))
            .map(|(xw, yw)| (xw[1] - xw[0]) * (yw[0] + yw[1] - 2.0 * background) / 2.0)
            .sum();
        let mut sigma = area / (amplitude * (2.0 * std::f64::consts::PI).sqrt());
        if !(sigma.is_finite() && sigma > 0.0) || sigma > width {
            sigma = width / 4.0;
        }

        Ok(vec![xs[peak], sigma, amplitude, background])
    }

    fn readable(&self, params: &[f64]) -> BTreeMap<String, f64> {
        let mut named: BTreeMap<String, f64> = self
            .param_names()
            .into_iter()
            .zip(params.iter().copied())
            .collect();
        if let Some(sigma) = params.get(1) {
            named.insert("sigma".to_string(), sigma.abs());
            named.insert("fwhm".to_string(), FWHM_PER_SIGMA * sigma.abs());
        }
        named
    }
}
