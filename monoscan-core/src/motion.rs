//! Motion collaborators.
//!
//! A [`Motion`] is anything a scan can move: a motor axis, a temperature
//! controller set point, a magnet current. The scan only needs the axis name,
//! the current position, and a blocking move.

use crate::error::{Error, Result};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

/// A scannable axis.
///
/// `move_to` blocks until the axis has settled, so the detector is never read
/// while the axis is still moving.
pub trait Motion: Send + Sync {
    /// Axis name, used as the key in [`crate::Position`].
    fn name(&self) -> &str;

    /// Current position of the axis.
    ///
    /// # Errors
    /// Returns [`Error::Motion`] if the axis cannot be read.
    fn position(&self) -> Result<f64>;

    /// Moves the axis to an absolute position.
    ///
    /// # Errors
    /// Returns [`Error::Motion`] if the axis cannot be moved.
    fn move_to(&self, value: f64) -> Result<()>;

    /// Moves the axis relative to its current position.
    ///
    /// # Errors
    /// Propagates errors from [`Motion::position`] and [`Motion::move_to`].
    fn move_by(&self, delta: f64) -> Result<()> {
        let current = self.position()?;
        self.move_to(current + delta)
    }
}

/// Shared handle to a motion collaborator.
pub type SharedMotion = Arc<dyn Motion>;

type Getter = Box<dyn Fn() -> Result<f64> + Send + Sync>;
type Setter = Box<dyn Fn(f64) -> Result<()> + Send + Sync>;

/// A motion built from a getter and a setter closure.
pub struct FnMotion {
    name: String,
    getter: Getter,
    setter: Setter,
}

impl FnMotion {
    /// Creates a motion from closures.
    pub fn new<G, S>(name: impl Into<String>, getter: G, setter: S) -> Self
    where
        G: Fn() -> Result<f64> + Send + Sync + 'static,
        S: Fn(f64) -> Result<()> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            getter: Box::new(getter),
            setter: Box::new(setter),
        }
    }
}

impl Motion for FnMotion {
    fn name(&self) -> &str {
        &self.name
    }

    fn position(&self) -> Result<f64> {
        (self.getter)()
    }

    fn move_to(&self, value: f64) -> Result<()> {
        (self.setter)(value)
    }
}

impl fmt::Debug for FnMotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnMotion").field("name", &self.name).finish()
    }
}

/// An in-memory axis with optional soft limits.
#[derive(Debug)]
pub struct VirtualMotion {
    name: String,
    value: Mutex<f64>,
    limits: Option<(f64, f64)>,
}

impl VirtualMotion {
    /// Creates an axis at `initial`.
    pub fn new(name: impl Into<String>, initial: f64) -> Self {
        Self {
            name: name.into(),
            value: Mutex::new(initial),
            limits: None,
        }
    }

    /// Restrict moves to `[low, high]`.
    #[must_use]
    pub fn with_limits(mut self, low: f64, high: f64) -> Self {
        self.limits = Some((low.min(high), low.max(high)));
        self
    }

    /// Wraps the axis in a [`SharedMotion`].
    #[must_use]
    pub fn shared(self) -> SharedMotion {
        Arc::new(self)
    }
}

impl Motion for VirtualMotion {
    fn name(&self) -> &str {
        &self.name
    }

    fn position(&self) -> Result<f64> {
        Ok(*self.value.lock().unwrap_or_else(PoisonError::into_inner))
    }

    fn move_to(&self, value: f64) -> Result<()> {
        if !value.is_finite() {
            return Err(Error::Motion {
                axis: self.name.clone(),
                reason: format!("cannot move to {value}"),
            });
        }
        if let Some((low, high)) = self.limits {
            if value < low || value > high {
                return Err(Error::Motion {
                    axis: self.name.clone(),
                    reason: format!("{value} outside limits [{low}, {high}]"),
                });
            }
        }
        *self.value.lock().unwrap_or_else(PoisonError::into_inner) = value;
        Ok(())
    }
}
