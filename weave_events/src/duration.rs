//! Distribution of event durations per scenario.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{stamp::Stamp, table::EventTable};

/// Lower edge of the first duration bin, in days.
pub const FIRST_EDGE_DAYS: f64 = 0.5;
/// Number of one-day duration bins.
pub const BIN_COUNT: usize = 29;

/// Share of the events of one scenario in each one-day duration bin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DurationHistogram {
    /// Scenario.
    pub scenario: String,
    /// Bin edges in days; bin `i` is `[edges[i], edges[i + 1])`, the last
    /// bin also holding its upper edge.
    pub edges: Vec<f64>,
    /// Proportion of the binned events in each bin; sums to one.
    pub proportions: Vec<f64>,
    /// Number of events that fell in a bin.
    pub binned: usize,
    /// Mean duration in days over every event of the scenario, binned or not.
    pub mean_days: f64,
}

fn bin_of(days: f64) -> Option<usize> {
    let last_edge = FIRST_EDGE_DAYS + BIN_COUNT as f64;
    if !(FIRST_EDGE_DAYS..=last_edge).contains(&days) {
        return None;
    }
    Some(((days - FIRST_EDGE_DAYS) as usize).min(BIN_COUNT - 1))
}

impl<T: Stamp> EventTable<T> {
    /// Duration histograms per scenario, ordered by scenario category.
    ///
    /// Durations are `end - start` in days, so a single-step event lasts zero
    /// days and falls below the first bin. Scenarios with no binned event,
    /// and tables over non-temporal stamps, give no histogram.
    pub fn duration_histograms(&self) -> Vec<DurationHistogram> {
        let mut by_scenario: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
        for e in self.events() {
            if let Some(days) = T::span_days(e.duration) {
                by_scenario.entry(e.scenario.as_str()).or_default().push(days);
            }
        }

        let edges: Vec<f64> = (0..=BIN_COUNT).map(|i| FIRST_EDGE_DAYS + i as f64).collect();
        let mut out = Vec::new();
        for (scenario, durations) in by_scenario {
            let mut counts = vec![0_usize; BIN_COUNT];
            for bin in durations.iter().filter_map(|d| bin_of(*d)) {
                counts[bin] += 1;
            }
            let binned: usize = counts.iter().sum();
            if binned == 0 {
                continue;
            }
            out.push(DurationHistogram {
                scenario: scenario.to_string(),
                edges: edges.clone(),
                proportions: counts.iter().map(|c| *c as f64 / binned as f64).collect(),
                binned,
                mean_days: durations.iter().sum::<f64>() / durations.len() as f64,
            });
        }
        out.sort_by(|a, b| self.scenario_order().compare(&a.scenario, &b.scenario));
        out
    }
}
