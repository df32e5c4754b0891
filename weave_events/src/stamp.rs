//! Time stamp abstraction for event boundaries.
//!
//! Events are detected over any strictly ordered axis. Calendar stamps
//! (`NaiveDateTime`, `NaiveDate`, `DateTime<Utc>`) carry a year and a day of
//! year; positional stamps (`i64`, `usize`) are synthetic and carry neither.

use std::fmt;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, TimeDelta, Utc};

/// A point on a time axis.
pub trait Stamp: Copy + PartialOrd + fmt::Debug {
    /// Difference between two stamps (`end - start`).
    type Span: Copy + fmt::Debug + PartialEq;

    /// `end - start`, with inclusive endpoints: equal stamps give a zero span.
    fn span(start: Self, end: Self) -> Self::Span;

    /// Calendar year, or `None` for non-temporal stamps.
    fn year(&self) -> Option<i32>;

    /// Day of year (1-based), or `None` for non-temporal stamps.
    fn ordinal(&self) -> Option<u32>;

    /// A span as a (fractional) number of days, or `None` for non-temporal
    /// stamps.
    fn span_days(_span: Self::Span) -> Option<f64> {
        None
    }
}

const MILLIS_PER_DAY: f64 = 86_400_000.0;

impl Stamp for NaiveDateTime {
    type Span = TimeDelta;

    fn span(start: Self, end: Self) -> TimeDelta {
        end - start
    }

    fn year(&self) -> Option<i32> {
        Some(Datelike::year(self))
    }

    fn ordinal(&self) -> Option<u32> {
        Some(Datelike::ordinal(self))
    }

    fn span_days(span: TimeDelta) -> Option<f64> {
        Some(span.num_milliseconds() as f64 / MILLIS_PER_DAY)
    }
}

impl Stamp for NaiveDate {
    type Span = TimeDelta;

    fn span(start: Self, end: Self) -> TimeDelta {
        end - start
    }

    fn year(&self) -> Option<i32> {
        Some(Datelike::year(self))
    }

    fn ordinal(&self) -> Option<u32> {
        Some(Datelike::ordinal(self))
    }

    fn span_days(span: TimeDelta) -> Option<f64> {
        Some(span.num_milliseconds() as f64 / MILLIS_PER_DAY)
    }
}

impl Stamp for DateTime<Utc> {
    type Span = TimeDelta;

    fn span(start: Self, end: Self) -> TimeDelta {
        end - start
    }

    fn year(&self) -> Option<i32> {
        Some(Datelike::year(self))
    }

    fn ordinal(&self) -> Option<u32> {
        Some(Datelike::ordinal(self))
    }

    fn span_days(span: TimeDelta) -> Option<f64> {
        Some(span.num_milliseconds() as f64 / MILLIS_PER_DAY)
    }
}

impl Stamp for i64 {
    type Span = i64;

    fn span(start: Self, end: Self) -> i64 {
        end - start
    }

    fn year(&self) -> Option<i32> {
        None
    }

    fn ordinal(&self) -> Option<u32> {
        None
    }
}

impl Stamp for usize {
    type Span = usize;

    fn span(start: Self, end: Self) -> usize {
        end.saturating_sub(start)
    }

    fn year(&self) -> Option<i32> {
        None
    }

    fn ordinal(&self) -> Option<u32> {
        None
    }
}

/// Checks that `times` is strictly increasing.
pub(crate) fn check_strictly_increasing<T: Stamp>(times: &[T]) -> Result<(), crate::EventError> {
    match times.windows(2).position(|w| w[0] >= w[1] || w[0].partial_cmp(&w[1]).is_none()) {
        Some(i) => Err(crate::EventError::NonMonotonicTime { index: i + 1 }),
        None => Ok(()),
    }
}
