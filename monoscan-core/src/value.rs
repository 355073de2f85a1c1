//! Dynamically tagged monoid values.
//!
//! Detectors report one of a closed set of monoid kinds. [`MonoidValue`]
//! carries the kind as a tag so values from different instruments can be
//! folded, logged and fitted uniformly, while combining two different
//! kinds is rejected instead of coerced.

use crate::error::{Error, Result};
use crate::monoid::{Any, Average, Count, Monoid, Polarisation, Product, Sum, Unit};
use crate::stats::median;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The kind tag of a [`MonoidValue`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum MonoidKind {
    /// Integer counts.
    Count,
    /// Real totals.
    Sum,
    /// Real products.
    Product,
    /// Boolean or.
    Any,
    /// Single-element kind.
    Unit,
    /// Running mean.
    Average,
    /// Up/down polarisation counts.
    Polarisation,
    /// Component-wise tuple of kinds.
    Tuple(Vec<MonoidKind>),
}

impl MonoidKind {
    /// Returns the zero value of this kind.
    #[must_use]
    pub fn zero(&self) -> MonoidValue {
        match self {
            Self::Count => MonoidValue::Count(Count::zero()),
            Self::Sum => MonoidValue::Sum(Sum::zero()),
            Self::Product => MonoidValue::Product(Product::zero()),
            Self::Any => MonoidValue::Any(Any::zero()),
            Self::Unit => MonoidValue::Unit(Unit),
            Self::Average => MonoidValue::Average(Average::zero()),
            Self::Polarisation => MonoidValue::Polarisation(Polarisation::zero()),
            Self::Tuple(kinds) => MonoidValue::Tuple(kinds.iter().map(Self::zero).collect()),
        }
    }
}

impl fmt::Display for MonoidKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Count => f.write_str("Count"),
            Self::Sum => f.write_str("Sum"),
            Self::Product => f.write_str("Product"),
            Self::Any => f.write_str("Any"),
            Self::Unit => f.write_str("Unit"),
            Self::Average => f.write_str("Average"),
            Self::Polarisation => f.write_str("Polarisation"),
            Self::Tuple(kinds) => {
                f.write_str("Tuple(")?;
                for (i, kind) in kinds.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{kind}")?;
                }
                f.write_str(")")
            }
        }
    }
}

/// A measurement value of one of the supported monoid kinds.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", content = "value"))]
pub enum MonoidValue {
    /// Integer counts.
    Count(Count),
    /// Real total.
    Sum(Sum),
    /// Real product.
    Product(Product),
    /// Boolean or.
    Any(Any),
    /// Nothing to report.
    Unit(Unit),
    /// Running mean.
    Average(Average),
    /// Polarisation counts.
    Polarisation(Polarisation),
    /// Multi-channel or multi-monitor value, combined component-wise.
    Tuple(Vec<MonoidValue>),
}

impl MonoidValue {
    /// Returns the kind tag of this value.
    #[must_use]
    pub fn kind(&self) -> MonoidKind {
        match self {
            Self::Count(_) => MonoidKind::Count,
            Self::Sum(_) => MonoidKind::Sum,
            Self::Product(_) => MonoidKind::Product,
            Self::Any(_) => MonoidKind::Any,
            Self::Unit(_) => MonoidKind::Unit,
            Self::Average(_) => MonoidKind::Average,
            Self::Polarisation(_) => MonoidKind::Polarisation,
            Self::Tuple(items) => MonoidKind::Tuple(items.iter().map(Self::kind).collect()),
        }
    }

    /// Combines two values of the same kind.
    ///
    /// # Errors
    /// Returns [`Error::TypeMismatch`] when the kinds differ, including
    /// tuples of different arity or with differing component kinds.
    pub fn try_combine(self, other: Self) -> Result<Self> {
        match (self, other) {
            (Self::Count(a), Self::Count(b)) => Ok(Self::Count(a.combine(b))),
            (Self::Sum(a), Self::Sum(b)) => Ok(Self::Sum(a.combine(b))),
            (Self::Product(a), Self::Product(b)) => Ok(Self::Product(a.combine(b))),
            (Self::Any(a), Self::Any(b)) => Ok(Self::Any(a.combine(b))),
            (Self::Unit(a), Self::Unit(b)) => Ok(Self::Unit(a.combine(b))),
            (Self::Average(a), Self::Average(b)) => Ok(Self::Average(a.combine(b))),
            (Self::Polarisation(a), Self::Polarisation(b)) => {
                Ok(Self::Polarisation(a.combine(b)))
            }
            (Self::Tuple(a), Self::Tuple(b)) if a.len() == b.len() => a
                .into_iter()
                .zip(b)
                .map(|(x, y)| x.try_combine(y))
                .collect::<Result<Vec<_>>>()
                .map(Self::Tuple),
            (a, b) => Err(Error::TypeMismatch {
                left: a.kind(),
                right: b.kind(),
            }),
        }
    }

    /// Folds `values` starting from the zero of `kind`.
    ///
    /// An empty iterator yields `kind.zero()`.
    ///
    /// # Errors
    /// Returns [`Error::TypeMismatch`] if any value is not of `kind`.
    pub fn concat<I>(kind: &MonoidKind, values: I) -> Result<Self>
    where
        I: IntoIterator<Item = MonoidValue>,
    {
        values
            .into_iter()
            .try_fold(kind.zero(), MonoidValue::try_combine)
    }

    /// Scalar view of the value used for reporting and fitting.
    ///
    /// Multi-channel tuples reduce to the median of their channels so a
    /// single hot channel does not drag the point.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn value(&self) -> Option<f64> {
        match self {
            Self::Count(c) => Some(c.0 as f64),
            Self::Sum(s) => Some(s.0),
            Self::Product(p) => Some(p.0),
            Self::Any(a) => Some(if a.0 { 1.0 } else { 0.0 }),
            Self::Unit(_) => None,
            Self::Average(avg) => avg.mean(),
            Self::Polarisation(pol) => pol.value(),
            Self::Tuple(items) => {
                let channels: Vec<f64> = items.iter().filter_map(Self::value).collect();
                median(&channels)
            }
        }
    }

    /// One-sigma uncertainty on [`MonoidValue::value`], where one is defined.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn uncertainty(&self) -> Option<f64> {
        match self {
            Self::Count(c) => Some((c.0 as f64).sqrt()),
            Self::Average(avg) => avg.std_error(),
            Self::Polarisation(pol) => pol.uncertainty(),
            _ => None,
        }
    }

    /// Scalar views of each channel; a non-tuple value is a single channel.
    #[must_use]
    pub fn channels(&self) -> Vec<Option<f64>> {
        match self {
            Self::Tuple(items) => items.iter().map(Self::value).collect(),
            other => vec![other.value()],
        }
    }
}

impl fmt::Display for MonoidValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Count(c) => write!(f, "Count({})", c.0),
            Self::Sum(s) => write!(f, "Sum({})", s.0),
            Self::Product(p) => write!(f, "Product({})", p.0),
            Self::Any(a) => write!(f, "Any({})", a.0),
            Self::Unit(_) => f.write_str("Unit"),
            Self::Average(avg) => match avg.mean() {
                Some(mean) => write!(f, "Average(mean={mean}, n={})", avg.count()),
                None => f.write_str("Average(empty)"),
            },
            Self::Polarisation(pol) => write!(f, "Polarisation(up={}, down={})", pol.up, pol.down),
            Self::Tuple(items) => {
                f.write_str("(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str(")")
            }
        }
    }
}

impl From<f64> for MonoidValue {
    fn from(value: f64) -> Self {
        Self::Sum(Sum(value))
    }
}

impl From<u64> for MonoidValue {
    fn from(value: u64) -> Self {
        Self::Count(Count(value))
    }
}

impl From<bool> for MonoidValue {
    fn from(value: bool) -> Self {
        Self::Any(Any(value))
    }
}

macro_rules! impl_from_monoid {
    ($($ty:ident),* $(,)?) => {
        $(
            impl From<$ty> for MonoidValue {
                fn from(value: $ty) -> Self {
                    Self::$ty(value)
                }
            }
        )*
    };
}

impl_from_monoid!(Count, Sum, Product, Any, Unit, Average, Polarisation);

impl From<Vec<MonoidValue>> for MonoidValue {
    fn from(items: Vec<MonoidValue>) -> Self {
        Self::Tuple(items)
    }
}
