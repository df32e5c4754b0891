//! Threshold events over multi-model climate and energy time series.
//!
//! The pipeline is:
//! numeric [`LabeledArray`] → [`classify_cube`] → condition array →
//! [`extract_all`] (one [`segment`] scan per series) → [`EventTable`] →
//! [`count_by_year`] → dense [`EventCount`].

#![warn(missing_docs)]

pub mod classify;
pub mod count;
pub mod cube;
pub mod duration;
pub mod errors;
pub mod extract;
pub mod scenario;
pub mod segment;
pub mod series;
pub mod stamp;
pub mod table;

pub use classify::{Comparator, ConditionCell, classify, classify_cube};
pub use count::{
    EventCount, GroupMean, RollingMean, ScenarioMean, ScenarioRollingMean, YearCount, count_by_year,
};
pub use cube::{Dim, LabeledArray, period_bounds, period_length};
pub use duration::DurationHistogram;
pub use errors::EventError;
pub use extract::extract_all;
pub use scenario::{HISTORICAL, ScenarioOrder};
pub use segment::segment;
pub use series::{ConditionSeries, TimeSeries};
pub use stamp::Stamp;
pub use table::{Event, EventTable, SeriesLabels};
