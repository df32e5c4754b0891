//! Runs the segmenter over every series of a boolean array.

use tracing::{debug, info};

use crate::{
    classify::ConditionCell,
    cube::LabeledArray,
    errors::EventError,
    scenario::ScenarioOrder,
    segment::segment,
    stamp::Stamp,
    table::{EventTable, SeriesLabels},
};

const MODEL: &str = "model";
const SCENARIO: &str = "scenario";
const COUNTRY: &str = "country";

/// Where a series label comes from: an axis of the array or a scalar coordinate.
enum LabelSource<'a> {
    Axis(usize),
    Scalar(&'a str),
    Absent,
}

impl<'a> LabelSource<'a> {
    fn locate<V, T: Stamp>(cube: &'a LabeledArray<V, T>, name: &str) -> Self {
        if let Some(axis) = cube.dims().iter().position(|d| d.name == name) {
            Self::Axis(axis)
        } else if let Some(label) = cube.scalar(name) {
            Self::Scalar(label)
        } else {
            Self::Absent
        }
    }

    fn resolve<'b>(&self, labels: &[&'b str]) -> Option<&'b str>
    where
        'a: 'b,
    {
        match self {
            Self::Axis(axis) => Some(labels[*axis]),
            Self::Scalar(label) => Some(*label),
            Self::Absent => None,
        }
    }
}

/// Detects events in every (model × scenario × country) series of `cube`.
///
/// `model` and `scenario` must be dimensions or scalar coordinates;
/// `country` is optional. Any other dimension must have been squeezed (size
/// one); a larger one would merge distinct series under the same labels.
/// Series with no time positions, or whose every cell is missing (a label
/// combination absent from the source data), are skipped. The returned table carries the
/// scenario categories of the whole array, so scenarios without events still
/// take part in the ordering.
pub fn extract_all<C: ConditionCell, T: Stamp>(
    cube: &LabeledArray<C, T>,
) -> Result<EventTable<T>, EventError> {
    for d in cube.dims() {
        if ![MODEL, SCENARIO, COUNTRY].contains(&d.name.as_str()) && d.len() > 1 {
            return Err(EventError::UnexpectedDimension {
                name: d.name.clone(),
                size: d.len(),
            });
        }
    }

    let model = LabelSource::locate(cube, MODEL);
    let scenario = LabelSource::locate(cube, SCENARIO);
    let country = LabelSource::locate(cube, COUNTRY);
    if matches!(model, LabelSource::Absent) {
        return Err(EventError::MissingDimension(MODEL.into()));
    }
    if matches!(scenario, LabelSource::Absent) {
        return Err(EventError::MissingDimension(SCENARIO.into()));
    }

    let scenario_order = ScenarioOrder::from_labels(cube.labels_of(SCENARIO).unwrap_or_default());

    let mut events = Vec::new();
    let mut scanned = 0;
    let mut skipped = 0;
    for (labels, cells) in cube.combinations() {
        let series = SeriesLabels {
            model: model.resolve(&labels).unwrap_or_default().to_string(),
            scenario: scenario.resolve(&labels).unwrap_or_default().to_string(),
            country: country.resolve(&labels).map(str::to_string),
        };
        if cells.iter().all(|c| c.is_missing()) {
            debug!(model = %series.model, scenario = %series.scenario, "no data, skipping series");
            skipped += 1;
            continue;
        }
        let flags: Vec<bool> = cells.iter().map(|c| c.met()).collect();
        let found = segment(cube.time(), &flags, &series)?;
        debug!(
            model = %series.model,
            scenario = %series.scenario,
            country = series.country.as_deref().unwrap_or("-"),
            events = found.len(),
            "series scanned"
        );
        scanned += 1;
        events.extend(found);
    }

    info!(
        series = scanned,
        skipped,
        events = events.len(),
        "event extraction finished"
    );
    Ok(EventTable::new(events, scenario_order, scanned, skipped))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cube::Dim;
    use chrono::{NaiveDate, NaiveDateTime};

    fn day(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    #[test]
    fn scans_every_combination() {
        let flags = vec![
            true, false, true, // A / SP126
            false, false, false, // A / historical
            true, true, true, // B / SP126
            false, true, false, // B / historical
        ];
        let cube = LabeledArray::new(
            vec![day(2000, 1, 1), day(2000, 1, 2), day(2000, 1, 3)],
            vec![
                Dim::new("model", ["A", "B"]),
                Dim::new("scenario", ["SP126", "historical"]),
            ],
            flags,
        )
        .unwrap();

        let table = extract_all(&cube).unwrap();
        assert_eq!(table.series_scanned(), 4);
        assert_eq!(table.len(), 4);
        assert_eq!(
            table.scenario_order().categories(),
            &["historical".to_string(), "SP126".to_string()]
        );
        let ids: Vec<(&str, &str, usize)> = table
            .events()
            .iter()
            .map(|e| (e.model.as_str(), e.scenario.as_str(), e.event_id))
            .collect();
        assert_eq!(
            ids,
            vec![("A", "SP126", 0), ("A", "SP126", 1), ("B", "SP126", 0), ("B", "historical", 0)]
        );
        assert!(table.events().iter().all(|e| e.year == Some(2000)));
        assert!(table.events().iter().all(|e| e.country.is_none()));
    }

    #[test]
    fn squeezed_country_still_labels_events() {
        let cube = LabeledArray::new(
            vec![0_i64, 1],
            vec![
                Dim::new("country", ["FR"]),
                Dim::new("model", ["A"]),
                Dim::new("scenario", ["SP245"]),
            ],
            vec![true, false],
        )
        .unwrap()
        .squeeze();
        assert!(cube.dims().is_empty());

        let table = extract_all(&cube).unwrap();
        assert_eq!(table.len(), 1);
        let e = &table.events()[0];
        assert_eq!(e.country.as_deref(), Some("FR"));
        assert_eq!(e.model, "A");
        assert_eq!(e.scenario, "SP245");
        assert_eq!(e.year, None);
    }

    #[test]
    fn all_false_gives_empty_but_scanned_table() {
        let cube = LabeledArray::filled(
            vec![0_i64, 1, 2],
            vec![Dim::new("model", ["A"]), Dim::new("scenario", ["historical", "SP370"])],
            false,
        )
        .unwrap();
        let table = extract_all(&cube).unwrap();
        assert!(table.is_empty());
        assert_eq!(table.series_scanned(), 2);
        assert_eq!(table.scenario_order().len(), 2);
    }

    #[test]
    fn empty_time_axis_skips_series() {
        let cube = LabeledArray::<bool, i64>::new(
            vec![],
            vec![Dim::new("model", ["A"]), Dim::new("scenario", ["SP126"])],
            vec![],
        )
        .unwrap();
        let table = extract_all(&cube).unwrap();
        assert_eq!(table.series_scanned(), 0);
        assert_eq!(table.series_skipped(), 1);
    }

    #[test]
    fn all_missing_series_are_skipped() {
        let cells = vec![
            Some(true), Some(false), // A / historical
            None, None, // A / SP245: no such run
            None, Some(true), // B / historical
            Some(false), Some(false), // B / SP245
        ];
        let cube = LabeledArray::new(
            vec![0_i64, 1],
            vec![Dim::new("model", ["A", "B"]), Dim::new("scenario", ["historical", "SP245"])],
            cells,
        )
        .unwrap();
        let table = extract_all(&cube).unwrap();
        assert_eq!(table.series_scanned(), 3);
        assert_eq!(table.series_skipped(), 1);
        assert_eq!(table.len(), 2);
        assert!(table.events().iter().all(|e| e.scenario == "historical"));
    }

    #[test]
    fn missing_scenario_is_an_error() {
        let cube = LabeledArray::new(vec![0_i64], vec![Dim::new("model", ["A"])], vec![true]).unwrap();
        assert_eq!(
            extract_all(&cube).unwrap_err(),
            EventError::MissingDimension("scenario".into())
        );
    }

    #[test]
    fn unsqueezed_extra_dimension_is_rejected() {
        let cube = LabeledArray::filled(
            vec![0_i64],
            vec![
                Dim::new("model", ["A"]),
                Dim::new("scenario", ["SP126"]),
                Dim::new("tech", ["60", "61"]),
            ],
            true,
        )
        .unwrap();
        assert!(matches!(
            extract_all(&cube),
            Err(EventError::UnexpectedDimension { ref name, size: 2 }) if name == "tech"
        ));
    }
}
