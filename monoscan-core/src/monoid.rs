//! Monoid traits and concrete measurement monoids.
//!
//! A monoid is a type with a zero value and an associative `combine`, so
//! repeated detector reads can be folded into one result no matter how the
//! reads are grouped. Every type here defines `combine` for all of its
//! values, including the zero/zero and zero/non-zero cases.
#![allow(clippy::cast_precision_loss)]

use std::ops::Add;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Trait for values with an associative combine and an identity element.
///
/// Implementations must satisfy, for all `a`, `b`, `c`:
/// - `a.combine(b).combine(c) == a.combine(b.combine(c))`
/// - `a.combine(Self::zero()) == a == Self::zero().combine(a)`
pub trait Monoid: Sized {
    /// Returns the identity element.
    fn zero() -> Self;

    /// Combines two values.
    #[must_use]
    fn combine(self, other: Self) -> Self;

    /// Folds an iterator of values, starting from [`Monoid::zero`].
    fn concat<I>(items: I) -> Self
    where
        I: IntoIterator<Item = Self>,
    {
        items.into_iter().fold(Self::zero(), Self::combine)
    }
}

macro_rules! impl_add_via_combine {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Add for $ty {
                type Output = Self;

                #[inline]
                fn add(self, other: Self) -> Self {
                    self.combine(other)
                }
            }
        )*
    };
}

/// Integer event count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Count(pub u64);

impl Monoid for Count {
    #[inline]
    fn zero() -> Self {
        Self(0)
    }

    #[inline]
    fn combine(self, other: Self) -> Self {
        // Saturating addition of non-negative values stays associative.
        Self(self.0.saturating_add(other.0))
    }
}

/// Real-valued total.
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Sum(pub f64);

impl Monoid for Sum {
    #[inline]
    fn zero() -> Self {
        Self(0.0)
    }

    #[inline]
    fn combine(self, other: Self) -> Self {
        Self(self.0 + other.0)
    }
}

/// Real-valued product. Its identity is 1.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Product(pub f64);

impl Default for Product {
    fn default() -> Self {
        Self::zero()
    }
}

impl Monoid for Product {
    #[inline]
    fn zero() -> Self {
        Self(1.0)
    }

    #[inline]
    fn combine(self, other: Self) -> Self {
        Self(self.0 * other.0)
    }
}

/// Logical or of flags (e.g. "any read saturated").
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Any(pub bool);

impl Monoid for Any {
    #[inline]
    fn zero() -> Self {
        Self(false)
    }

    #[inline]
    fn combine(self, other: Self) -> Self {
        Self(self.0 || other.0)
    }
}

/// The single-element monoid, for detectors with nothing to report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Unit;

impl Monoid for Unit {
    #[inline]
    fn zero() -> Self {
        Unit
    }

    #[inline]
    fn combine(self, _other: Self) -> Self {
        Unit
    }
}

/// Running mean with enough state to combine independent averages.
///
/// Tracks the total, the sum of squares and the count (a weight, which may
/// be fractional when reads are normalised to a monitor). Two averages
/// combine by adding all three, which keeps both the mean and the standard
/// error exact under regrouping.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Average {
    total: f64,
    sum_sq: f64,
    count: f64,
}

impl Average {
    /// A single observation.
    #[must_use]
    pub fn new(x: f64) -> Self {
        Self {
            total: x,
            sum_sq: x * x,
            count: 1.0,
        }
    }

    /// A total accumulated over `count` units of weight, e.g. detector
    /// counts over a monitor sum.
    ///
    /// Treated as `count` observations of `total / count`. A zero count
    /// yields the zero average.
    #[must_use]
    pub fn with_count(total: f64, count: f64) -> Self {
        if count == 0.0 {
            return Self::zero();
        }
        Self {
            total,
            sum_sq: total * total / count,
            count,
        }
    }

    /// Builds an average from raw accumulator parts.
    #[must_use]
    pub fn from_parts(total: f64, sum_sq: f64, count: f64) -> Self {
        Self {
            total,
            sum_sq,
            count,
        }
    }

    /// Accumulated total.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.total
    }

    /// Accumulated sum of squares.
    #[must_use]
    pub fn sum_sq(&self) -> f64 {
        self.sum_sq
    }

    /// Accumulated count (weight).
    #[must_use]
    pub fn count(&self) -> f64 {
        self.count
    }

    /// Mean value, `None` for the zero average.
    #[must_use]
    pub fn mean(&self) -> Option<f64> {
        if self.count == 0.0 {
            None
        } else {
            Some(self.total / self.count)
        }
    }

    /// Unbiased sample variance; needs a count above one.
    #[must_use]
    pub fn variance(&self) -> Option<f64> {
        if self.count <= 1.0 {
            return None;
        }
        let spread = self.sum_sq - self.total * self.total / self.count;
        Some((spread / (self.count - 1.0)).max(0.0))
    }

    /// Standard error of the mean.
    #[must_use]
    pub fn std_error(&self) -> Option<f64> {
        self.variance().map(|var| (var / self.count).sqrt())
    }
}

impl Monoid for Average {
    #[inline]
    fn zero() -> Self {
        Self {
            total: 0.0,
            sum_sq: 0.0,
            count: 0.0,
        }
    }

    #[inline]
    fn combine(self, other: Self) -> Self {
        Self {
            total: self.total + other.total,
            sum_sq: self.sum_sq + other.sum_sq,
            count: self.count + other.count,
        }
    }
}

/// Up/down neutron counts of a polarised measurement.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Polarisation {
    /// Counts in the spin-up state.
    pub up: f64,
    /// Counts in the spin-down state.
    pub down: f64,
}

impl Polarisation {
    /// Creates a polarisation accumulator from up and down counts.
    #[must_use]
    pub fn new(up: f64, down: f64) -> Self {
        Self { up, down }
    }

    /// `(up - down) / (up + down)`, or `None` when no counts were taken.
    #[must_use]
    pub fn value(&self) -> Option<f64> {
        let total = self.up + self.down;
        if total == 0.0 {
            None
        } else {
            Some((self.up - self.down) / total)
        }
    }

    /// Counting-statistics error on [`Polarisation::value`].
    #[must_use]
    pub fn uncertainty(&self) -> Option<f64> {
        let total = self.up + self.down;
        if total <= 0.0 || self.up < 0.0 || self.down < 0.0 {
            return None;
        }
        Some(2.0 * (self.up * self.down / total.powi(3)).sqrt())
    }
}

impl Monoid for Polarisation {
    #[inline]
    fn zero() -> Self {
        Self {
            up: 0.0,
            down: 0.0,
        }
    }

    #[inline]
    fn combine(self, other: Self) -> Self {
        Self {
            up: self.up + other.up,
            down: self.down + other.down,
        }
    }
}

impl_add_via_combine!(Count, Sum, Product, Any, Unit, Average, Polarisation);

impl<A: Monoid, B: Monoid> Monoid for (A, B) {
    fn zero() -> Self {
        (A::zero(), B::zero())
    }

    fn combine(self, other: Self) -> Self {
        (self.0.combine(other.0), self.1.combine(other.1))
    }
}

impl<A: Monoid, B: Monoid, C: Monoid> Monoid for (A, B, C) {
    fn zero() -> Self {
        (A::zero(), B::zero(), C::zero())
    }

    fn combine(self, other: Self) -> Self {
        (
            self.0.combine(other.0),
            self.1.combine(other.1),
            self.2.combine(other.2),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn assert_laws<M>(samples: &[M])
    where
        M: Monoid + Copy + PartialEq + std::fmt::Debug,
    {
        for &a in samples {
            assert_eq!(a.combine(M::zero()), a);
            assert_eq!(M::zero().combine(a), a);
            for &b in samples {
                for &c in samples {
                    assert_eq!(a.combine(b).combine(c), a.combine(b.combine(c)));
                }
            }
        }
    }

    #[test]
    fn test_scalar_monoid_laws() {
        assert_laws(&[Count(0), Count(3), Count(17), Count(u64::MAX)]);
        assert_laws(&[Sum(0.0), Sum(1.5), Sum(-4.0), Sum(1024.0)]);
        assert_laws(&[Product(1.0), Product(2.0), Product(-0.5), Product(0.0)]);
        assert_laws(&[Any(false), Any(true)]);
        assert_laws(&[Unit]);
    }

    #[test]
    fn test_accumulator_monoid_laws() {
        assert_laws(&[
            Average::zero(),
            Average::new(2.0),
            Average::with_count(60.0, 10.0),
            Average::with_count(160.0, 40.0),
        ]);
        assert_laws(&[
            Polarisation::zero(),
            Polarisation::new(10.0, 4.0),
            Polarisation::new(0.0, 8.0),
            Polarisation::new(256.0, 0.0),
        ]);
    }

    #[test]
    fn test_tuple_monoid() {
        type Pair = (Count, Sum);
        assert_eq!(Pair::zero(), (Count(0), Sum(0.0)));

        let a: Pair = (Count(2), Sum(1.5));
        let b: Pair = (Count(3), Sum(2.0));
        assert_eq!(a.combine(b), (Count(5), Sum(3.5)));
        assert_laws(&[Pair::zero(), a, b]);

        let triple = (Any(false), Product(2.0), Unit).combine((Any(true), Product(4.0), Unit));
        assert_eq!(triple, (Any(true), Product(8.0), Unit));
    }

    #[test]
    fn test_average_combination() {
        let combined = Average::with_count(60.0, 10.0).combine(Average::with_count(160.0, 40.0));
        assert_relative_eq!(combined.total(), 220.0);
        assert_relative_eq!(combined.count(), 50.0);
        assert_relative_eq!(combined.mean().unwrap(), 4.4);
    }

    #[test]
    fn test_average_standard_error() {
        // Samples 1..=4: mean 2.5, sample variance 5/3.
        let avg = Average::concat([1.0, 2.0, 3.0, 4.0].map(Average::new));
        assert_relative_eq!(avg.mean().unwrap(), 2.5);
        assert_relative_eq!(avg.variance().unwrap(), 5.0 / 3.0, epsilon = 1e-12);
        assert_relative_eq!(
            avg.std_error().unwrap(),
            (5.0 / 3.0 / 4.0_f64).sqrt(),
            epsilon = 1e-12
        );

        // Regrouping the same samples gives the same error.
        let left = Average::new(1.0) + Average::new(2.0);
        let right = Average::new(3.0) + Average::new(4.0);
        assert_relative_eq!(
            (left + right).std_error().unwrap(),
            avg.std_error().unwrap(),
            epsilon = 1e-12
        );

        assert!(Average::zero().mean().is_none());
        assert!(Average::new(3.0).std_error().is_none());
    }

    #[test]
    fn test_polarisation_sign_and_empty() {
        assert_relative_eq!(Polarisation::new(30.0, 10.0).value().unwrap(), 0.5);
        assert_relative_eq!(Polarisation::new(10.0, 30.0).value().unwrap(), -0.5);
        assert!(Polarisation::zero().value().is_none());
        assert!(Polarisation::zero().uncertainty().is_none());

        let summed = Polarisation::new(30.0, 10.0) + Polarisation::new(0.0, 20.0);
        assert_relative_eq!(summed.value().unwrap(), 0.0);
    }

    #[test]
    fn test_count_saturates() {
        assert_eq!(Count(u64::MAX) + Count(1), Count(u64::MAX));
        assert_eq!(Count::concat((0..5).map(Count)), Count(10));
    }
}
