//! Per-year event counts, densified over each group's year range.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{scenario::ScenarioOrder, stamp::Stamp, table::EventTable};

/// Number of events that started in one year of one (model, scenario) group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearCount {
    /// Climate model.
    pub model: String,
    /// Scenario.
    pub scenario: String,
    /// Calendar year of the event starts.
    pub year: i32,
    /// Events starting in `year`; zero for years inside the range with none.
    pub n_events: usize,
}

/// Mean of `n_events` over the years of one group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupMean {
    /// Climate model.
    pub model: String,
    /// Scenario.
    pub scenario: String,
    /// Mean events per year over the group's year range.
    pub mean: f64,
}

/// Multi-model mean of the per-group means of one scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioMean {
    /// Scenario.
    pub scenario: String,
    /// Mean over models of their mean events per year.
    pub mean: f64,
    /// Number of models averaged.
    pub models: usize,
}

/// Centered rolling mean of `n_events` at one year of one group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollingMean {
    /// Climate model.
    pub model: String,
    /// Scenario.
    pub scenario: String,
    /// Center year of the window.
    pub year: i32,
    /// `None` where the window runs past either end of the group.
    pub mean: Option<f64>,
}

/// Multi-model mean of the rolling means of one scenario at one year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioRollingMean {
    /// Scenario.
    pub scenario: String,
    /// Center year of the window.
    pub year: i32,
    /// Mean over the models with a defined rolling mean that year.
    pub mean: Option<f64>,
    /// Number of models averaged.
    pub models: usize,
}

/// Dense per-year counts, one contiguous year run per (model, scenario).
///
/// Rows are ordered by model, then scenario category, then year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventCount {
    rows: Vec<YearCount>,
    scenario_order: ScenarioOrder,
}

/// Counts events per (model, scenario, year) and fills every year between
/// each group's first and last event year, zero where nothing happened.
///
/// Groups without any event produce no rows. Events without a year
/// (non-temporal stamps) cannot be placed and are ignored.
pub fn count_by_year<T: Stamp>(table: &EventTable<T>) -> EventCount {
    let mut sparse: BTreeMap<(&str, &str), BTreeMap<i32, usize>> = BTreeMap::new();
    let mut undated = 0_usize;
    for e in table.events() {
        match e.year {
            Some(year) => {
                *sparse
                    .entry((e.model.as_str(), e.scenario.as_str()))
                    .or_default()
                    .entry(year)
                    .or_default() += 1;
            }
            None => undated += 1,
        }
    }
    if undated > 0 {
        debug!(undated, "events without a year left out of the counts");
    }

    let order = table.scenario_order();
    let mut groups: Vec<_> = sparse.into_iter().collect();
    groups.sort_by(|((ma, sa), _), ((mb, sb), _)| ma.cmp(mb).then_with(|| order.compare(sa, sb)));

    let mut rows = Vec::new();
    for ((model, scenario), years) in groups {
        let (Some(first), Some(last)) = (years.keys().next(), years.keys().next_back()) else {
            continue;
        };
        for year in *first..=*last {
            rows.push(YearCount {
                model: model.to_string(),
                scenario: scenario.to_string(),
                year,
                n_events: years.get(&year).copied().unwrap_or(0),
            });
        }
    }

    EventCount {
        rows,
        scenario_order: order.clone(),
    }
}

impl EventCount {
    /// Column names of the tabular form, in order.
    pub const COLUMNS: [&'static str; 4] = ["model", "scenario", "year", "n_events"];

    /// All rows.
    pub fn rows(&self) -> &[YearCount] {
        &self.rows
    }

    /// Scenario categories inherited from the event table.
    pub fn scenario_order(&self) -> &ScenarioOrder {
        &self.scenario_order
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// `true` when no group had any dated event.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows of one (model, scenario) group, in year order.
    pub fn group(&self, model: &str, scenario: &str) -> Vec<&YearCount> {
        self.rows
            .iter()
            .filter(|r| r.model == model && r.scenario == scenario)
            .collect()
    }

    /// Consecutive runs of rows sharing (model, scenario).
    fn groups(&self) -> impl Iterator<Item = &[YearCount]> + '_ {
        self.rows
            .chunk_by(|a, b| a.model == b.model && a.scenario == b.scenario)
    }

    /// Mean `n_events` per (model, scenario), in row order.
    pub fn group_means(&self) -> Vec<GroupMean> {
        self.groups()
            .map(|rows| GroupMean {
                model: rows[0].model.clone(),
                scenario: rows[0].scenario.clone(),
                mean: mean(rows.iter().map(|r| r.n_events as f64)),
            })
            .collect()
    }

    /// Per scenario, the mean over models of their group means, ordered by
    /// the scenario categories.
    pub fn scenario_means(&self) -> Vec<ScenarioMean> {
        let mut by_scenario: BTreeMap<String, Vec<f64>> = BTreeMap::new();
        for g in self.group_means() {
            by_scenario.entry(g.scenario).or_default().push(g.mean);
        }
        let mut out: Vec<ScenarioMean> = by_scenario
            .into_iter()
            .map(|(scenario, means)| ScenarioMean {
                scenario,
                models: means.len(),
                mean: mean(means.into_iter()),
            })
            .collect();
        out.sort_by(|a, b| self.scenario_order.compare(&a.scenario, &b.scenario));
        out
    }

    /// Centered rolling mean of `n_events` over `window` years within each
    /// group. For an even window the extra year falls after the center.
    /// A `window` of zero is treated as one.
    pub fn rolling_mean(&self, window: usize) -> Vec<RollingMean> {
        let window = window.max(1);
        let ahead = window / 2;
        let mut out = Vec::with_capacity(self.rows.len());
        for rows in self.groups() {
            for (i, row) in rows.iter().enumerate() {
                let hi = i + ahead;
                let value = (hi < rows.len() && hi + 1 >= window).then(|| {
                    let lo = hi + 1 - window;
                    mean(rows[lo..=hi].iter().map(|r| r.n_events as f64))
                });
                out.push(RollingMean {
                    model: row.model.clone(),
                    scenario: row.scenario.clone(),
                    year: row.year,
                    mean: value,
                });
            }
        }
        out
    }

    /// Per (scenario, year), the mean over models of [`Self::rolling_mean`].
    ///
    /// Models whose window is incomplete that year are left out; a year with
    /// no defined value at all gets `None`. Rows are ordered by scenario
    /// category, then year.
    pub fn scenario_rolling_mean(&self, window: usize) -> Vec<ScenarioRollingMean> {
        let mut cells: BTreeMap<(String, i32), Vec<f64>> = BTreeMap::new();
        for r in self.rolling_mean(window) {
            let values = cells.entry((r.scenario, r.year)).or_default();
            values.extend(r.mean);
        }
        let mut out: Vec<ScenarioRollingMean> = cells
            .into_iter()
            .map(|((scenario, year), values)| ScenarioRollingMean {
                scenario,
                year,
                models: values.len(),
                mean: (!values.is_empty()).then(|| mean(values.into_iter())),
            })
            .collect();
        out.sort_by(|a, b| {
            self.scenario_order
                .compare(&a.scenario, &b.scenario)
                .then(a.year.cmp(&b.year))
        });
        out
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values.fold((0.0, 0_usize), |(s, n), v| (s + v, n + 1));
    if n == 0 { f64::NAN } else { sum / n as f64 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        classify::{Comparator, classify_cube},
        cube::{Dim, LabeledArray},
        extract::extract_all,
        table::Event,
    };
    use chrono::{NaiveDate, NaiveDateTime};
    use proptest::prelude::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn event(model: &str, scenario: &str, id: usize, year: i32) -> Event<NaiveDateTime> {
        let t = day(year, 6, 1);
        Event {
            model: model.into(),
            scenario: scenario.into(),
            country: None,
            event_id: id,
            start: t,
            end: t,
            duration: t - t,
            year: None,
        }
    }

    fn table(events: Vec<Event<NaiveDateTime>>) -> EventTable<NaiveDateTime> {
        let order = ScenarioOrder::from_labels(events.iter().map(|e| e.scenario.clone()));
        EventTable::new(events, order, 1, 0)
    }

    fn years_and_counts(c: &EventCount, model: &str, scenario: &str) -> Vec<(i32, usize)> {
        c.group(model, scenario)
            .into_iter()
            .map(|r| (r.year, r.n_events))
            .collect()
    }

    #[test]
    fn gaps_are_zero_filled() {
        let t = table(vec![
            event("A", "SP126", 0, 2030),
            event("A", "SP126", 1, 2030),
            event("A", "SP126", 2, 2033),
        ]);
        let c = count_by_year(&t);
        assert_eq!(
            years_and_counts(&c, "A", "SP126"),
            vec![(2030, 2), (2031, 0), (2032, 0), (2033, 1)]
        );
    }

    #[test]
    fn each_group_has_its_own_range() {
        let t = table(vec![
            event("A", "SP126", 0, 2030),
            event("A", "SP126", 1, 2031),
            event("B", "historical", 0, 1990),
        ]);
        let c = count_by_year(&t);
        assert_eq!(years_and_counts(&c, "A", "SP126"), vec![(2030, 1), (2031, 1)]);
        assert_eq!(years_and_counts(&c, "B", "historical"), vec![(1990, 1)]);
        assert!(c.group("A", "historical").is_empty());
    }

    #[test]
    fn rows_follow_model_then_scenario_category() {
        let t = table(vec![
            event("B", "SP126", 0, 2030),
            event("A", "SP585", 0, 2030),
            event("A", "historical", 0, 1990),
        ]);
        let c = count_by_year(&t);
        let keys: Vec<(&str, &str)> = c
            .rows()
            .iter()
            .map(|r| (r.model.as_str(), r.scenario.as_str()))
            .collect();
        assert_eq!(keys, vec![("A", "historical"), ("A", "SP585"), ("B", "SP126")]);
    }

    #[test]
    fn empty_table_gives_empty_counts() {
        let c = count_by_year(&table(vec![]));
        assert!(c.is_empty());
        assert!(c.group_means().is_empty());
        assert!(c.rolling_mean(3).is_empty());
    }

    #[test]
    fn undated_events_are_not_counted() {
        let e = Event {
            model: "A".into(),
            scenario: "SP126".into(),
            country: None,
            event_id: 0,
            start: 3_i64,
            end: 3,
            duration: 0,
            year: None,
        };
        let t = EventTable::new(vec![e], ScenarioOrder::from_labels(["SP126"]), 1, 0);
        assert!(count_by_year(&t).is_empty());
    }

    #[test]
    fn means_per_group_and_scenario() {
        let t = table(vec![
            event("A", "SP126", 0, 2030),
            event("A", "SP126", 1, 2030),
            event("A", "SP126", 2, 2031),
            event("B", "SP126", 0, 2030),
            event("A", "historical", 0, 1990),
        ]);
        let c = count_by_year(&t);
        let groups = c.group_means();
        assert_eq!(groups.len(), 3);
        assert_eq!((groups[1].model.as_str(), groups[1].scenario.as_str()), ("A", "SP126"));
        assert_eq!(groups[1].mean, 1.5);

        let scenarios = c.scenario_means();
        assert_eq!(scenarios[0].scenario, "historical");
        assert_eq!(scenarios[0].mean, 1.0);
        assert_eq!(scenarios[1].scenario, "SP126");
        assert_eq!(scenarios[1].models, 2);
        assert_eq!(scenarios[1].mean, 1.25);
    }

    #[test]
    fn rolling_mean_is_centered_and_undefined_at_edges() {
        let t = table(vec![
            event("A", "SP126", 0, 2030),
            event("A", "SP126", 1, 2030),
            event("A", "SP126", 2, 2031),
            event("A", "SP126", 3, 2033),
            event("A", "SP126", 4, 2034),
            event("A", "SP126", 5, 2034),
            event("A", "SP126", 6, 2034),
        ]);
        // counts: 2030:2 2031:1 2032:0 2033:1 2034:3
        let r = count_by_year(&t).rolling_mean(3);
        let got: Vec<(i32, Option<f64>)> = r.iter().map(|m| (m.year, m.mean)).collect();
        assert_eq!(
            got,
            vec![
                (2030, None),
                (2031, Some(1.0)),
                (2032, Some(2.0 / 3.0)),
                (2033, Some(4.0 / 3.0)),
                (2034, None),
            ]
        );

        let even = count_by_year(&t).rolling_mean(2);
        assert_eq!(even[0].mean, Some(1.5));
        assert_eq!(even[1].mean, Some(0.5));
        assert_eq!(even[4].mean, None);
    }

    #[test]
    fn scenario_rolling_mean_averages_defined_models() {
        let mut events = Vec::new();
        // A / SP126: 2030:1 2031:2 2032:3
        for (i, y) in [2030, 2031, 2031, 2032, 2032, 2032].into_iter().enumerate() {
            events.push(event("A", "SP126", i, y));
        }
        // B / SP126: 2031:1 2032:1 2033:4
        for (i, y) in [2031, 2032, 2033, 2033, 2033, 2033].into_iter().enumerate() {
            events.push(event("B", "SP126", i, y));
        }
        events.push(event("A", "historical", 0, 1990));
        let c = count_by_year(&table(events));

        let rolled = c.scenario_rolling_mean(3);
        let got: Vec<(&str, i32, Option<f64>, usize)> = rolled
            .iter()
            .map(|m| (m.scenario.as_str(), m.year, m.mean, m.models))
            .collect();
        assert_eq!(
            got,
            vec![
                ("historical", 1990, None, 0),
                ("SP126", 2030, None, 0),
                ("SP126", 2031, Some(2.0), 1),
                ("SP126", 2032, Some(2.0), 1),
                ("SP126", 2033, None, 0),
            ]
        );

        let wide = c.scenario_rolling_mean(1);
        let y2032: Vec<_> = wide.iter().filter(|m| m.scenario == "SP126" && m.year == 2032).collect();
        assert_eq!(y2032.len(), 1);
        assert_eq!(y2032[0].models, 2);
        assert_eq!(y2032[0].mean, Some(2.0));
    }

    #[test]
    fn threshold_run_counts_two_events_in_one_year() {
        let times: Vec<NaiveDateTime> = (1..=7).map(|d| day(2040, 3, d)).collect();
        let values = vec![5.0, 5.0, 2.0, 2.0, 2.0, 5.0, 1.0];
        let cube = LabeledArray::new(
            times,
            vec![Dim::new("model", ["A"]), Dim::new("scenario", ["SP126"])],
            values,
        )
        .unwrap();
        let events = extract_all(&classify_cube(&cube, Comparator::Less, 3.0)).unwrap();
        assert_eq!(events.len(), 2);

        let c = count_by_year(&events);
        assert_eq!(
            c.rows(),
            &[YearCount {
                model: "A".into(),
                scenario: "SP126".into(),
                year: 2040,
                n_events: 2,
            }]
        );
    }

    proptest! {
        #[test]
        fn year_ranges_have_no_gaps(
            raw in proptest::collection::vec((0usize..3, 0usize..2, 1950i32..2100), 0..40),
        ) {
            let models = ["A", "B", "C"];
            let scenarios = ["historical", "SP245"];
            let events: Vec<_> = raw
                .iter()
                .enumerate()
                .map(|(i, (m, s, y))| event(models[*m], scenarios[*s], i, *y))
                .collect();
            let total = events.len();
            let c = count_by_year(&table(events));

            prop_assert_eq!(c.rows().iter().map(|r| r.n_events).sum::<usize>(), total);
            for m in models {
                for s in scenarios {
                    let years: Vec<i32> = c.group(m, s).iter().map(|r| r.year).collect();
                    prop_assert!(years.windows(2).all(|w| w[1] == w[0] + 1));
                    let expected = raw
                        .iter()
                        .filter(|(mi, si, _)| models[*mi] == m && scenarios[*si] == s)
                        .map(|(_, _, y)| *y);
                    if let (Some(lo), Some(hi)) = (expected.clone().min(), expected.max()) {
                        prop_assert_eq!(years.first().copied(), Some(lo));
                        prop_assert_eq!(years.last().copied(), Some(hi));
                    } else {
                        prop_assert!(years.is_empty());
                    }
                }
            }
        }
    }
}
