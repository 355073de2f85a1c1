//! Point generation for single-axis scans.
#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]

use crate::error::{Error, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Most positions a single axis may visit.
pub const MAX_POINTS: usize = 1_000_000;

/// Description of the points along one axis.
///
/// Ranges are given either absolutely (`begin`/`end`) or relative to the
/// axis's current position (`before`/`after`), and are divided by one of
/// `stride` (approximate spacing, end included), `count`/`gaps` (number of
/// points/intervals, end included) or `step` (exact spacing, end excluded).
/// A `begin` with `count` and a `step` or `stride` also describes a run.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PointSpec {
    /// Absolute start position.
    pub begin: Option<f64>,
    /// Absolute end position.
    pub end: Option<f64>,
    /// Exact spacing; the end point is excluded.
    pub step: Option<f64>,
    /// Approximate spacing; the end point is included.
    pub stride: Option<f64>,
    /// Number of points.
    pub count: Option<usize>,
    /// Number of intervals (`count - 1`).
    pub gaps: Option<usize>,
    /// Start as an offset from the current position.
    pub before: Option<f64>,
    /// End as an offset from the current position.
    pub after: Option<f64>,
}

impl PointSpec {
    /// Creates an empty point description.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Absolute range from `begin` to `end`.
    #[must_use]
    pub fn range(begin: f64, end: f64) -> Self {
        Self {
            begin: Some(begin),
            end: Some(end),
            ..Self::default()
        }
    }

    /// Range relative to the current position.
    #[must_use]
    pub fn relative(before: f64, after: f64) -> Self {
        Self {
            before: Some(before),
            after: Some(after),
            ..Self::default()
        }
    }

    /// Set the start position.
    #[must_use]
    pub fn with_begin(mut self, begin: f64) -> Self {
        self.begin = Some(begin);
        self
    }

    /// Set the end position.
    #[must_use]
    pub fn with_end(mut self, end: f64) -> Self {
        self.end = Some(end);
        self
    }

    /// Set an exact step.
    #[must_use]
    pub fn with_step(mut self, step: f64) -> Self {
        self.step = Some(step);
        self
    }

    /// Set an approximate stride.
    #[must_use]
    pub fn with_stride(mut self, stride: f64) -> Self {
        self.stride = Some(stride);
        self
    }

    /// Set the number of points.
    #[must_use]
    pub fn with_count(mut self, count: usize) -> Self {
        self.count = Some(count);
        self
    }

    /// Set the number of intervals.
    #[must_use]
    pub fn with_gaps(mut self, gaps: usize) -> Self {
        self.gaps = Some(gaps);
        self
    }

    /// Resolve the points to visit, given the axis's current position.
    ///
    /// # Errors
    /// Returns [`Error::InvalidConfig`] if the options do not describe a
    /// scan, a spacing is zero or non-finite, no point would be visited, or
    /// more than [`MAX_POINTS`] would be.
    pub fn points(&self, current: f64) -> Result<Vec<f64>> {
        let count = match self.gaps {
            Some(gaps) => Some(gaps.checked_add(1).ok_or_else(|| too_many(f64::INFINITY))?),
            None => self.count,
        };
        let count = count.map(bounded).transpose()?;
        let begin = self.before.map(|offset| current + offset).or(self.begin);
        let end = self.after.map(|offset| current + offset).or(self.end);
        let stride = nonzero(self.stride, "stride")?;
        let step = nonzero(self.step, "step")?;

        let points = match (begin, end) {
            (Some(begin), Some(end)) => {
                if let Some(stride) = stride {
                    let intervals = ((end - begin) / stride).abs().ceil();
                    linspace(begin, end, bounded_f64(intervals + 1.0)?)
                } else if let Some(count) = count {
                    linspace(begin, end, count)
                } else if let Some(step) = step {
                    bounded_f64(((end - begin) / step).ceil().max(0.0))?;
                    arange(begin, end, step)
                } else {
                    return Err(unbuildable());
                }
            }
            (Some(begin), None) => match (count, stride.or(step)) {
                (Some(count), Some(step)) => {
                    linspace(begin, begin + (count.saturating_sub(1)) as f64 * step, count)
                }
                _ => return Err(unbuildable()),
            },
            _ => return Err(unbuildable()),
        };

        if points.is_empty() {
            return Err(Error::InvalidConfig(
                "scan would not visit any position".to_string(),
            ));
        }
        if points.iter().any(|p| !p.is_finite()) {
            return Err(Error::InvalidConfig(
                "scan positions must be finite".to_string(),
            ));
        }
        Ok(points)
    }
}

fn too_many(n: f64) -> Error {
    Error::InvalidConfig(format!(
        "scan would visit {n} positions, more than the limit of {MAX_POINTS}"
    ))
}

fn bounded(count: usize) -> Result<usize> {
    if count > MAX_POINTS {
        return Err(too_many(count as f64));
    }
    Ok(count)
}

fn bounded_f64(n: f64) -> Result<usize> {
    if !n.is_finite() || n > MAX_POINTS as f64 {
        return Err(too_many(n));
    }
    Ok(n as usize)
}

fn unbuildable() -> Error {
    Error::InvalidConfig("unable to build a scan with that set of options".to_string())
}

fn nonzero(value: Option<f64>, name: &str) -> Result<Option<f64>> {
    match value {
        Some(v) if v == 0.0 || !v.is_finite() => Err(Error::InvalidConfig(format!(
            "{name} must be finite and non-zero, got {v}"
        ))),
        other => Ok(other),
    }
}

/// `count` evenly spaced points from `begin` to `end` inclusive.
#[must_use]
pub fn linspace(begin: f64, end: f64, count: usize) -> Vec<f64> {
    match count {
        0 => Vec::new(),
        1 => vec![begin],
        _ => {
            let delta = (end - begin) / (count - 1) as f64;
            (0..count)
                .map(|i| {
                    if i == count - 1 {
                        end
                    } else {
                        begin + delta * i as f64
                    }
                })
                .collect()
        }
    }
}

/// Points from `begin` towards `end` (exclusive) spaced by `step`.
///
/// A step pointing away from `end` yields no points.
#[must_use]
pub fn arange(begin: f64, end: f64, step: f64) -> Vec<f64> {
    let n = ((end - begin) / step).ceil();
    if !n.is_finite() || n <= 0.0 {
        return Vec::new();
    }
    (0..n as usize).map(|i| begin + step * i as f64).collect()
}
