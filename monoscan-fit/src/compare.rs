//! Ranking several models on the same data.

use crate::fit::{Fit, FitReport};
use log::debug;
use monoscan_core::{ResultSeries, Result};
use rayon::prelude::*;
use std::cmp::Ordering;

/// One model's outcome in a comparison.
#[derive(Debug)]
pub struct Comparison {
    /// Model name.
    pub model: String,
    /// Fit report or the reason the model failed.
    pub result: Result<FitReport>,
}

/// Fits every model to `series` in parallel.
///
/// Results are ordered by residual RMS, best first, with failed fits last
/// in their original order.
pub fn compare_fits(fits: &[Box<dyn Fit>], series: &ResultSeries) -> Vec<Comparison> {
    let mut results: Vec<Comparison> = fits
        .par_iter()
        .map(|fit| {
            let result = fit.fit_series(series);
            debug!("compare: {} -> {:?}", fit.name(), result.as_ref().map(|r| r.rms));
            Comparison {
                model: fit.name().to_string(),
                result,
            }
        })
        .collect();

    results.sort_by(|a, b| match (&a.result, &b.result) {
        (Ok(ra), Ok(rb)) => ra.rms.partial_cmp(&rb.rms).unwrap_or(Ordering::Equal),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => Ordering::Equal,
    });
    results
}

/// The best successful fit, if any.
#[must_use]
pub fn best_fit(comparisons: &[Comparison]) -> Option<&FitReport> {
    comparisons.iter().find_map(|c| c.result.as_ref().ok())
}
