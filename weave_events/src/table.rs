//! Event records and the flat table that collects them.

use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use crate::{scenario::ScenarioOrder, stamp::Stamp};

/// Identifies the series an event was detected in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SeriesLabels {
    /// Climate model, e.g. `"CMCC_CMR5"`.
    pub model: String,
    /// Scenario, e.g. `"SP245"` or `"historical"`.
    pub scenario: String,
    /// Country code, when the series is country-resolved.
    pub country: Option<String>,
}

impl SeriesLabels {
    /// Labels for a country-resolved series.
    pub fn new(
        model: impl Into<String>,
        scenario: impl Into<String>,
        country: impl Into<String>,
    ) -> Self {
        Self {
            model: model.into(),
            scenario: scenario.into(),
            country: Some(country.into()),
        }
    }

    /// Labels for a series without a country.
    pub fn without_country(model: impl Into<String>, scenario: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            scenario: scenario.into(),
            country: None,
        }
    }
}

/// A maximal run of consecutive positions where the condition holds.
#[derive(Debug, Clone, PartialEq)]
pub struct Event<T: Stamp> {
    /// Climate model.
    pub model: String,
    /// Scenario.
    pub scenario: String,
    /// Country, if the series had one.
    pub country: Option<String>,
    /// Sequence number within its series, from 0, in detection order.
    pub event_id: usize,
    /// First stamp of the run.
    pub start: T,
    /// Last stamp of the run (inclusive).
    pub end: T,
    /// `end - start`; zero for a single-stamp run.
    pub duration: T::Span,
    /// Calendar year of `start`, filled in once the table is assembled.
    /// `None` for non-temporal stamps.
    pub year: Option<i32>,
}

impl<T: Stamp> Event<T> {
    /// Day of year of the event start, for temporal stamps.
    pub fn start_ordinal(&self) -> Option<u32> {
        self.start.ordinal()
    }
}

/// All events detected across the series of one array.
#[derive(Debug, Clone, PartialEq)]
pub struct EventTable<T: Stamp> {
    events: Vec<Event<T>>,
    scenario_order: ScenarioOrder,
    series_scanned: usize,
    series_skipped: usize,
}

impl<T: Stamp> EventTable<T> {
    /// Column names of the tabular form, in order.
    pub const COLUMNS: [&'static str; 8] = [
        "model", "scenario", "country", "eventID", "start", "end", "duration", "year",
    ];

    /// Assembles a table, deriving `year` from each event's start.
    pub fn new(
        mut events: Vec<Event<T>>,
        scenario_order: ScenarioOrder,
        series_scanned: usize,
        series_skipped: usize,
    ) -> Self {
        for e in &mut events {
            e.year = e.start.year();
        }
        Self {
            events,
            scenario_order,
            series_scanned,
            series_skipped,
        }
    }

    /// Events in detection order.
    pub fn events(&self) -> &[Event<T>] {
        &self.events
    }

    /// Consumes the table, returning its events.
    pub fn into_events(self) -> Vec<Event<T>> {
        self.events
    }

    /// Categorical order of the `scenario` column.
    pub fn scenario_order(&self) -> &ScenarioOrder {
        &self.scenario_order
    }

    /// Number of series that were scanned.
    pub fn series_scanned(&self) -> usize {
        self.series_scanned
    }

    /// Number of series skipped because they had no data.
    pub fn series_skipped(&self) -> usize {
        self.series_skipped
    }

    /// Number of events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// `true` when no event was found. A successful scan of zero series and a
    /// scan that found nothing are told apart by [`Self::series_scanned`].
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Keeps events whose year falls in any of `periods` (e.g. a historical
    /// and a future window). Events without a year are dropped.
    pub fn within_periods(&self, periods: &[RangeInclusive<i32>]) -> Self {
        let events = self
            .events
            .iter()
            .filter(|e| e.year.is_some_and(|y| periods.iter().any(|p| p.contains(&y))))
            .cloned()
            .collect();
        Self {
            events,
            scenario_order: self.scenario_order.clone(),
            series_scanned: self.series_scanned,
            series_skipped: self.series_skipped,
        }
    }

    /// Events sorted by model, scenario category, country and event id.
    pub fn sorted(&self) -> Vec<&Event<T>> {
        let mut rows: Vec<&Event<T>> = self.events.iter().collect();
        rows.sort_by(|a, b| {
            a.model
                .cmp(&b.model)
                .then_with(|| self.scenario_order.compare(&a.scenario, &b.scenario))
                .then_with(|| a.country.cmp(&b.country))
                .then_with(|| a.event_id.cmp(&b.event_id))
        });
        rows
    }
}
