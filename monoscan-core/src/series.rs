//! Accumulated scan results.

use crate::position::Position;
use crate::value::MonoidValue;
use log::warn;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// One visited position and the folded detector value measured there.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ScanPoint {
    /// Where the value was measured.
    pub position: Position,
    /// Fold of all repeats at this position.
    pub value: MonoidValue,
}

/// Points in the order they were visited.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ResultSeries {
    points: Vec<ScanPoint>,
}

/// Scalar `(x, y)` view of a series used for fitting.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct XyData {
    /// Primary-axis positions.
    pub x: Vec<f64>,
    /// Scalar values.
    pub y: Vec<f64>,
    /// Indices of points left out because they have no scalar view.
    pub skipped: Vec<usize>,
}

impl XyData {
    /// Number of usable points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.x.len()
    }

    /// Returns true if there are no usable points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }
}

impl ResultSeries {
    /// Creates an empty series.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty series with room for `capacity` points.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            points: Vec::with_capacity(capacity),
        }
    }

    /// Appends a point.
    pub fn push(&mut self, position: Position, value: MonoidValue) {
        self.points.push(ScanPoint { position, value });
    }

    /// Number of points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Returns true if no point has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Points in visitation order.
    #[must_use]
    pub fn points(&self) -> &[ScanPoint] {
        &self.points
    }

    /// Iterates over the points.
    pub fn iter(&self) -> std::slice::Iter<'_, ScanPoint> {
        self.points.iter()
    }

    /// Most recent point.
    #[must_use]
    pub fn last(&self) -> Option<&ScanPoint> {
        self.points.last()
    }

    /// Axis names of the first point.
    #[must_use]
    pub fn axes(&self) -> Vec<String> {
        self.points
            .first()
            .map(|p| p.position.axes().map(str::to_string).collect())
            .unwrap_or_default()
    }

    /// Scalar view for fitting: primary axis against each value's scalar.
    ///
    /// Multi-channel values reduce to the median of their channels. Points
    /// with no primary axis or no scalar are skipped with a warning.
    #[must_use]
    pub fn xy(&self) -> XyData {
        let mut data = XyData::default();
        for (index, point) in self.points.iter().enumerate() {
            match (point.position.primary(), point.value.value()) {
                (Some(x), Some(y)) if x.is_finite() && y.is_finite() => {
                    data.x.push(x);
                    data.y.push(y);
                }
                _ => {
                    warn!(
                        "skipping point {index} at {} ({}): no scalar value",
                        point.position, point.value
                    );
                    data.skipped.push(index);
                }
            }
        }
        data
    }
}

impl<'a> IntoIterator for &'a ResultSeries {
    type Item = &'a ScanPoint;
    type IntoIter = std::slice::Iter<'a, ScanPoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}

impl FromIterator<ScanPoint> for ResultSeries {
    fn from_iter<I: IntoIterator<Item = ScanPoint>>(iter: I) -> Self {
        Self {
            points: iter.into_iter().collect(),
        }
    }
}
