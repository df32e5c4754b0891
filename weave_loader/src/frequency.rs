//! Time buckets and reducers for resampling.
//!
//! - One stable epoch: 1970-01-01T00:00:00.
//! - Hour/day buckets: second-based math.
//! - Month: linear (year, month) index relative to 1970-01.
//! - Year: the calendar year itself.
//!
//! Timestamps are naive; the source files carry no zone.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::errors::LoadError;

/// Number of seconds in an hour.
pub const SECS_PER_HOUR: i64 = 3600;
/// Number of seconds in a day.
pub const SECS_PER_DAY: i64 = 24 * SECS_PER_HOUR;

/// Resampling bucket width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Frequency {
    Hour,
    Day,
    /// calendar months
    Month,
    /// calendar years
    Year,
}

/// Compute the bucket id of a timestamp.
pub fn bucket_id(ts: NaiveDateTime, freq: Frequency) -> i64 {
    match freq {
        Frequency::Hour => id_fixed(ts, SECS_PER_HOUR),
        Frequency::Day => id_fixed(ts, SECS_PER_DAY),
        Frequency::Month => i64::from(ts.year() - 1970) * 12 + i64::from(ts.month0()),
        Frequency::Year => i64::from(ts.year()),
    }
}

/// Start instant of a bucket id; `None` outside chrono's range.
pub fn bucket_start(id: i64, freq: Frequency) -> Option<NaiveDateTime> {
    match freq {
        Frequency::Hour => start_fixed(id, SECS_PER_HOUR),
        Frequency::Day => start_fixed(id, SECS_PER_DAY),
        Frequency::Month => {
            let year = 1970 + id.div_euclid(12);
            let month = id.rem_euclid(12) + 1;
            NaiveDate::from_ymd_opt(i32::try_from(year).ok()?, u32::try_from(month).ok()?, 1)?
                .and_hms_opt(0, 0, 0)
        }
        Frequency::Year => NaiveDate::from_ymd_opt(i32::try_from(id).ok()?, 1, 1)?.and_hms_opt(0, 0, 0),
    }
}

/// Start of the bucket holding `ts`.
pub fn truncate(ts: NaiveDateTime, freq: Frequency) -> Option<NaiveDateTime> {
    match freq {
        // Fast path: no epoch round trip for sub-day widths.
        Frequency::Hour => ts.with_minute(0)?.with_second(0)?.with_nanosecond(0),
        _ => bucket_start(bucket_id(ts, freq), freq),
    }
}

fn id_fixed(ts: NaiveDateTime, bucket_secs: i64) -> i64 {
    ts.and_utc().timestamp().div_euclid(bucket_secs)
}

fn start_fixed(id: i64, bucket_secs: i64) -> Option<NaiveDateTime> {
    let secs = id.checked_mul(bucket_secs)?;
    DateTime::from_timestamp(secs, 0).map(|t| t.naive_utc())
}

/// Display/parse use the one-letter codes of the cache file names.
impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            Self::Hour => "H",
            Self::Day => "D",
            Self::Month => "M",
            Self::Year => "Y",
        };
        f.write_str(code)
    }
}

impl FromStr for Frequency {
    type Err = LoadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "H" | "h" | "hour" | "hourly" => Ok(Self::Hour),
            "D" | "d" | "day" | "daily" => Ok(Self::Day),
            "M" | "MS" | "month" | "monthly" => Ok(Self::Month),
            "Y" | "YS" | "A" | "year" | "yearly" => Ok(Self::Year),
            other => Err(LoadError::Configuration(format!(
                "unknown aggregation frequency '{other}' (expected H, D, M or Y)"
            ))),
        }
    }
}

/// Reducer applied to the values of one bucket. NaN values are skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Statistic {
    Mean,
    Sum,
    Min,
    Max,
    Median,
}

impl Statistic {
    /// Reduces `values`. With no non-NaN value the result is NaN, except for
    /// [`Statistic::Sum`] which gives `0`.
    pub fn reduce(self, values: &[f64]) -> f64 {
        let mut finite: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
        if finite.is_empty() {
            return if self == Self::Sum { 0.0 } else { f64::NAN };
        }
        match self {
            Self::Mean => finite.iter().sum::<f64>() / finite.len() as f64,
            Self::Sum => finite.iter().sum(),
            Self::Min => finite.iter().copied().fold(f64::INFINITY, f64::min),
            Self::Max => finite.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            Self::Median => {
                finite.sort_by(f64::total_cmp);
                let mid = finite.len() / 2;
                if finite.len() % 2 == 1 {
                    finite[mid]
                } else {
                    (finite[mid - 1] + finite[mid]) / 2.0
                }
            }
        }
    }
}

impl fmt::Display for Statistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Mean => "mean",
            Self::Sum => "sum",
            Self::Min => "min",
            Self::Max => "max",
            Self::Median => "median",
        };
        f.write_str(name)
    }
}

impl FromStr for Statistic {
    type Err = LoadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mean" => Ok(Self::Mean),
            "sum" => Ok(Self::Sum),
            "min" => Ok(Self::Min),
            "max" => Ok(Self::Max),
            "median" => Ok(Self::Median),
            other => Err(LoadError::Configuration(format!(
                "unknown aggregation function '{other}' (expected mean, sum, min, max or median)"
            ))),
        }
    }
}
