//! Threshold classification of numeric series.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{
    cube::LabeledArray,
    errors::EventError,
    series::{ConditionSeries, TimeSeries},
    stamp::Stamp,
};

/// Comparison applied as `value <op> threshold`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comparator {
    /// `<`
    #[serde(rename = "<")]
    Less,
    /// `<=`
    #[serde(rename = "<=")]
    LessEqual,
    /// `>`
    #[serde(rename = ">")]
    Greater,
    /// `>=`
    #[serde(rename = ">=")]
    GreaterEqual,
}

impl Comparator {
    /// Evaluates `value <op> threshold`. Any comparison involving `NaN` is false.
    pub fn holds(self, value: f64, threshold: f64) -> bool {
        match self {
            Self::Less => value < threshold,
            Self::LessEqual => value <= threshold,
            Self::Greater => value > threshold,
            Self::GreaterEqual => value >= threshold,
        }
    }

    /// The operator symbol.
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Less => "<",
            Self::LessEqual => "<=",
            Self::Greater => ">",
            Self::GreaterEqual => ">=",
        }
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Comparator {
    type Err = EventError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "<" => Ok(Self::Less),
            "<=" => Ok(Self::LessEqual),
            ">" => Ok(Self::Greater),
            ">=" => Ok(Self::GreaterEqual),
            other => Err(EventError::InvalidComparator(other.to_string())),
        }
    }
}

/// One classified cell of a condition array.
///
/// Plain `bool` cells are never missing. `Option<bool>` cells are `None`
/// where the source value was missing, which lets the extractor tell a series
/// with no data apart from one where the condition never held.
pub trait ConditionCell: Copy {
    /// Whether the condition holds. Missing cells never meet it.
    fn met(self) -> bool;

    /// Whether the source value was missing.
    fn is_missing(self) -> bool {
        false
    }
}

impl ConditionCell for bool {
    fn met(self) -> bool {
        self
    }
}

impl ConditionCell for Option<bool> {
    fn met(self) -> bool {
        self.unwrap_or(false)
    }

    fn is_missing(self) -> bool {
        self.is_none()
    }
}

/// Flags every position of `series` where `value <op> threshold` holds.
pub fn classify<T: Stamp>(
    series: &TimeSeries<T>,
    comparator: Comparator,
    threshold: f64,
) -> ConditionSeries<T> {
    let flags = series
        .values()
        .iter()
        .map(|v| comparator.holds(*v, threshold))
        .collect();
    ConditionSeries::from_parts(series.times().to_vec(), flags)
}

/// Classifies every cell of a numeric array, keeping its axes.
///
/// `NaN` cells become `None`.
pub fn classify_cube<T: Stamp>(
    cube: &LabeledArray<f64, T>,
    comparator: Comparator,
    threshold: f64,
) -> LabeledArray<Option<bool>, T> {
    cube.map(|v| (!v.is_nan()).then(|| comparator.holds(*v, threshold)))
}
