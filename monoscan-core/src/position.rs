//! Scan positions.

use std::fmt;
use std::fmt::Write as _;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A point in scan space: one value per named axis, in axis order.
///
/// The first axis is the primary axis; fits use it as the independent
/// variable.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Position {
    coords: Vec<(String, f64)>,
}

impl Position {
    /// Creates an empty position.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a single-axis position.
    #[must_use]
    pub fn single(axis: impl Into<String>, value: f64) -> Self {
        Self {
            coords: vec![(axis.into(), value)],
        }
    }

    /// Sets an axis value, replacing an existing entry for that axis.
    #[must_use]
    pub fn with(mut self, axis: impl Into<String>, value: f64) -> Self {
        self.set(axis, value);
        self
    }

    /// Sets an axis value in place.
    pub fn set(&mut self, axis: impl Into<String>, value: f64) {
        let axis = axis.into();
        match self.coords.iter_mut().find(|(name, _)| *name == axis) {
            Some(entry) => entry.1 = value,
            None => self.coords.push((axis, value)),
        }
    }

    /// Returns the value of `axis`, if present.
    #[must_use]
    pub fn get(&self, axis: &str) -> Option<f64> {
        self.coords
            .iter()
            .find(|(name, _)| name == axis)
            .map(|(_, value)| *value)
    }

    /// Value of the first axis.
    #[must_use]
    pub fn primary(&self) -> Option<f64> {
        self.coords.first().map(|(_, value)| *value)
    }

    /// Axis names in order.
    pub fn axes(&self) -> impl Iterator<Item = &str> {
        self.coords.iter().map(|(name, _)| name.as_str())
    }

    /// Iterates over `(axis, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.coords.iter().map(|(name, value)| (name.as_str(), *value))
    }

    /// Number of axes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.coords.len()
    }

    /// Returns true if no axis is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }

    /// Merges two positions; axes in `other` override axes in `self`.
    #[must_use]
    pub fn merge(&self, other: &Position) -> Position {
        let mut merged = self.clone();
        for (axis, value) in other.iter() {
            merged.set(axis, value);
        }
        merged
    }

    /// Interpolates `{axis}` fields of a run title.
    ///
    /// A field may carry a precision, e.g. `{theta:.2}`. Fields naming
    /// unknown axes are kept verbatim and `{{`/`}}` produce literal braces.
    #[must_use]
    pub fn format_title(&self, template: &str) -> String {
        let mut out = String::with_capacity(template.len());
        let mut chars = template.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    out.push('{');
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    out.push('}');
                }
                '{' => {
                    let mut field = String::new();
                    let mut closed = false;
                    for next in chars.by_ref() {
                        if next == '}' {
                            closed = true;
                            break;
                        }
                        field.push(next);
                    }
                    if !closed {
                        out.push('{');
                        out.push_str(&field);
                        continue;
                    }
                    self.write_field(&mut out, &field);
                }
                other => out.push(other),
            }
        }
        out
    }

    fn write_field(&self, out: &mut String, field: &str) {
        let (name, spec) = match field.split_once(':') {
            Some((name, spec)) => (name, Some(spec)),
            None => (field, None),
        };
        let precision = spec
            .and_then(|s| s.strip_prefix('.'))
            .and_then(|s| s.trim_end_matches('f').parse::<usize>().ok());

        match (self.get(name), precision) {
            (Some(value), Some(p)) => {
                let _ = write!(out, "{:.*}", p, value);
            }
            (Some(value), None) => {
                let _ = write!(out, "{value}");
            }
            (None, _) => {
                out.push('{');
                out.push_str(field);
                out.push('}');
            }
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.coords.is_empty() {
            return f.write_str("<origin>");
        }
        for (i, (axis, value)) in self.coords.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{axis}={value}")?;
        }
        Ok(())
    }
}

impl FromIterator<(String, f64)> for Position {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        let mut position = Position::new();
        for (axis, value) in iter {
            position.set(axis, value);
        }
        position
    }
}
