//! One-dimensional series: numeric values and their boolean classification.

use crate::{errors::EventError, stamp::Stamp, stamp::check_strictly_increasing};

/// An ordered sequence of `(stamp, value)` pairs for one
/// (model, scenario, country, technology) combination.
///
/// Stamps are strictly increasing. Gaps in the axis are kept as they are;
/// nothing is synthesized to fill them.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries<T> {
    times: Vec<T>,
    values: Vec<f64>,
}

impl<T: Stamp> TimeSeries<T> {
    /// Builds a series, validating lengths and stamp ordering.
    pub fn new(times: Vec<T>, values: Vec<f64>) -> Result<Self, EventError> {
        if times.len() != values.len() {
            return Err(EventError::LengthMismatch {
                times: times.len(),
                values: values.len(),
            });
        }
        check_strictly_increasing(&times)?;
        Ok(Self { times, values })
    }

    /// Time stamps.
    pub fn times(&self) -> &[T] {
        &self.times
    }

    /// Values, `NaN` where missing.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Number of positions.
    pub fn len(&self) -> usize {
        self.times.len()
    }

    /// `true` if the series has no positions.
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }
}

/// Boolean "condition met" flags on the same axis as their source series.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionSeries<T> {
    times: Vec<T>,
    flags: Vec<bool>,
}

impl<T: Stamp> ConditionSeries<T> {
    /// Builds a condition series, validating lengths and stamp ordering.
    pub fn new(times: Vec<T>, flags: Vec<bool>) -> Result<Self, EventError> {
        if times.len() != flags.len() {
            return Err(EventError::LengthMismatch {
                times: times.len(),
                values: flags.len(),
            });
        }
        check_strictly_increasing(&times)?;
        Ok(Self { times, flags })
    }

    // Only reachable from `classify`, whose input already holds the invariants.
    pub(crate) fn from_parts(times: Vec<T>, flags: Vec<bool>) -> Self {
        Self { times, flags }
    }

    /// Time stamps.
    pub fn times(&self) -> &[T] {
        &self.times
    }

    /// Per-position flags.
    pub fn flags(&self) -> &[bool] {
        &self.flags
    }

    /// Number of positions.
    pub fn len(&self) -> usize {
        self.flags.len()
    }

    /// `true` if the series has no positions.
    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }
}
