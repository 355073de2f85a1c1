//! Composable scan paths.
//!
//! A [`ScanPath`] is the ordered list of positions a scan visits. Single-axis
//! paths are combined with `+` (one after the other), `*` (every
//! combination, the left path outermost) and `&` (both in lock-step,
//! truncated to the shorter).

use monoscan_core::{Error, PointSpec, Position, Result, SharedMotion};
use std::fmt;
use std::ops::{Add, BitAnd, Mul};
use std::sync::Arc;

/// Positions to visit, together with the motions that reach them.
#[derive(Clone)]
pub enum ScanPath {
    /// One axis over a fixed list of values.
    Axis {
        /// Axis being moved.
        motion: SharedMotion,
        /// Values in visiting order.
        values: Vec<f64>,
    },
    /// The first path, then the second.
    Then(Box<ScanPath>, Box<ScanPath>),
    /// For each position of the outer path, every position of the inner.
    Product(Box<ScanPath>, Box<ScanPath>),
    /// Both paths side by side.
    Zip(Box<ScanPath>, Box<ScanPath>),
}

/// One visit: the moves to make and the resulting position.
#[derive(Clone)]
pub struct Step {
    moves: Vec<(SharedMotion, f64)>,
}

impl Step {
    fn single(motion: &SharedMotion, value: f64) -> Self {
        Self {
            moves: vec![(Arc::clone(motion), value)],
        }
    }

    fn merge(&self, other: &Step) -> Step {
        let mut moves = self.moves.clone();
        for (motion, value) in &other.moves {
            match moves.iter_mut().find(|(m, _)| m.name() == motion.name()) {
                Some(entry) => entry.1 = *value,
                None => moves.push((Arc::clone(motion), *value)),
            }
        }
        Step { moves }
    }

    /// Position reached once every move is made.
    #[must_use]
    pub fn position(&self) -> Position {
        self.moves
            .iter()
            .map(|(motion, value)| (motion.name().to_string(), *value))
            .collect()
    }

    /// Moves every axis in order.
    ///
    /// # Errors
    /// Returns the first motion error.
    pub fn apply(&self) -> Result<()> {
        for (motion, value) in &self.moves {
            motion.move_to(*value)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Step({})", self.position())
    }
}

impl ScanPath {
    /// Scan `motion` over explicit values.
    pub fn axis(motion: SharedMotion, values: impl Into<Vec<f64>>) -> Self {
        Self::Axis {
            motion,
            values: values.into(),
        }
    }

    /// Scan `motion` over the points described by `spec`.
    ///
    /// Relative ranges are resolved against the motion's current position.
    ///
    /// # Errors
    /// Returns [`Error::InvalidConfig`] if `spec` does not describe a scan
    /// and propagates errors reading the motion.
    pub fn from_spec(motion: SharedMotion, spec: &PointSpec) -> Result<Self> {
        let current = if spec.before.is_some() || spec.after.is_some() {
            motion.position()?
        } else {
            0.0
        };
        let values = spec.points(current)?;
        Ok(Self::axis(motion, values))
    }

    /// Number of positions visited.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Axis { values, .. } => values.len(),
            Self::Then(a, b) => a.len() + b.len(),
            Self::Product(a, b) => a.len() * b.len(),
            Self::Zip(a, b) => a.len().min(b.len()),
        }
    }

    /// Returns true if no position is visited.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reverses every component path.
    ///
    /// For sums, products and equal-length zips this visits the same
    /// positions in the opposite order, and the outer axis of a product still
    /// moves slowest. A zip of unequal lengths pairs the reversed paths from
    /// their new starts, so `[1, 2, 3] & [4, 5]` reversed visits `(3, 5)`
    /// then `(2, 4)`.
    #[must_use]
    pub fn reverse(&self) -> Self {
        match self {
            Self::Axis { motion, values } => Self::Axis {
                motion: Arc::clone(motion),
                values: values.iter().rev().copied().collect(),
            },
            Self::Then(a, b) => Self::Then(Box::new(b.reverse()), Box::new(a.reverse())),
            Self::Product(a, b) => Self::Product(Box::new(a.reverse()), Box::new(b.reverse())),
            Self::Zip(a, b) => Self::Zip(Box::new(a.reverse()), Box::new(b.reverse())),
        }
    }

    /// Transforms every axis value.
    #[must_use]
    pub fn map<F>(&self, f: F) -> Self
    where
        F: Fn(f64) -> f64 + Copy,
    {
        match self {
            Self::Axis { motion, values } => Self::Axis {
                motion: Arc::clone(motion),
                values: values.iter().map(|&v| f(v)).collect(),
            },
            Self::Then(a, b) => Self::Then(Box::new(a.map(f)), Box::new(b.map(f))),
            Self::Product(a, b) => Self::Product(Box::new(a.map(f)), Box::new(b.map(f))),
            Self::Zip(a, b) => Self::Zip(Box::new(a.map(f)), Box::new(b.map(f))),
        }
    }

    /// Axis names in position order, without duplicates.
    #[must_use]
    pub fn axes(&self) -> Vec<String> {
        let mut names = Vec::new();
        self.collect_axes(&mut names);
        names
    }

    fn collect_axes(&self, names: &mut Vec<String>) {
        match self {
            Self::Axis { motion, .. } => {
                if !names.iter().any(|n| n == motion.name()) {
                    names.push(motion.name().to_string());
                }
            }
            Self::Then(a, b) | Self::Product(a, b) | Self::Zip(a, b) => {
                a.collect_axes(names);
                b.collect_axes(names);
            }
        }
    }

    /// Every visit in order.
    #[must_use]
    pub fn steps(&self) -> Vec<Step> {
        match self {
            Self::Axis { motion, values } => {
                values.iter().map(|&v| Step::single(motion, v)).collect()
            }
            Self::Then(a, b) => {
                let mut steps = a.steps();
                steps.extend(b.steps());
                steps
            }
            Self::Product(outer, inner) => {
                let inner = inner.steps();
                outer
                    .steps()
                    .iter()
                    .flat_map(|o| inner.iter().map(move |i| o.merge(i)))
                    .collect()
            }
            Self::Zip(a, b) => a
                .steps()
                .iter()
                .zip(b.steps().iter())
                .map(|(x, y)| x.merge(y))
                .collect(),
        }
    }

    /// Every position in order.
    #[must_use]
    pub fn positions(&self) -> Vec<Position> {
        self.steps().iter().map(Step::position).collect()
    }

    /// Checks the path visits at least one position.
    ///
    /// # Errors
    /// Returns [`Error::InvalidConfig`] for an empty path.
    pub fn validate(&self) -> Result<()> {
        if self.is_empty() {
            return Err(Error::InvalidConfig(
                "scan path visits no positions".to_string(),
            ));
        }
        Ok(())
    }
}

impl fmt::Debug for ScanPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Axis { motion, values } => f
                .debug_struct("Axis")
                .field("motion", &motion.name())
                .field("values", values)
                .finish(),
            Self::Then(a, b) => f.debug_tuple("Then").field(a).field(b).finish(),
            Self::Product(a, b) => f.debug_tuple("Product").field(a).field(b).finish(),
            Self::Zip(a, b) => f.debug_tuple("Zip").field(a).field(b).finish(),
        }
    }
}

impl Add for ScanPath {
    type Output = ScanPath;

    fn add(self, other: ScanPath) -> ScanPath {
        ScanPath::Then(Box::new(self), Box::new(other))
    }
}

impl Mul for ScanPath {
    type Output = ScanPath;

    fn mul(self, other: ScanPath) -> ScanPath {
        ScanPath::Product(Box::new(self), Box::new(other))
    }
}

impl BitAnd for ScanPath {
    type Output = ScanPath;

    fn bitand(self, other: ScanPath) -> ScanPath {
        ScanPath::Zip(Box::new(self), Box::new(other))
    }
}
