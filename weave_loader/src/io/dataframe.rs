//! Conversions between cubes, event tables and polars DataFrames.

use std::{fs::File, path::Path};

use chrono::{DateTime, NaiveDateTime};
use indexmap::IndexSet;
use polars::prelude::*;
use polars_io::{SerWriter, csv::write::CsvWriter};
use weave_events::{Dim, EventCount, EventTable};

use crate::{
    errors::LoadError,
    pivot::{DIMS, DataCube},
};

/// Name of the time column.
pub const TIME_COLUMN: &str = "time";

fn datetime_column(name: &str, values: Vec<i64>) -> PolarsResult<Column> {
    Column::new(name.into(), values).cast(&DataType::Datetime(TimeUnit::Milliseconds, None))
}

fn millis(t: NaiveDateTime) -> i64 {
    t.and_utc().timestamp_millis()
}

/// Long layout of a cube: one row per (label combination, time), label
/// dimensions outermost, values in a column named `variable`.
pub fn cube_to_frame(cube: &DataCube, variable: &str) -> Result<DataFrame, LoadError> {
    let names: Vec<&str> = cube.dims().iter().map(|d| d.name.as_str()).collect();
    if names != DIMS {
        return Err(LoadError::Configuration(format!(
            "cube dimensions {names:?} are not {DIMS:?}"
        )));
    }
    let nt = cube.time().len();
    let rows = cube.data().len();
    let mut labels: Vec<Vec<&str>> = vec![Vec::with_capacity(rows); DIMS.len()];
    let mut time = Vec::with_capacity(rows);
    for (combo, _) in cube.combinations() {
        for (column, label) in labels.iter_mut().zip(&combo) {
            column.extend(std::iter::repeat_n(*label, nt));
        }
        time.extend(cube.time().iter().map(|t| millis(*t)));
    }

    let mut columns = vec![datetime_column(TIME_COLUMN, time)?];
    for (name, values) in DIMS.iter().zip(labels) {
        columns.push(Column::new((*name).into(), values));
    }
    columns.push(Column::new(variable.into(), cube.data().to_vec()));
    Ok(DataFrame::new(columns)?)
}

fn materialized<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Series, LoadError> {
    Ok(df.column(name)?.as_materialized_series())
}

/// Rebuilds a cube from [`cube_to_frame`]'s layout.
///
/// Axes are taken in order of first appearance, which for that layout is
/// the order they had in the cube.
pub fn frame_to_cube(df: &DataFrame, variable: &str) -> Result<DataCube, LoadError> {
    let corrupt = |reason: String| LoadError::CorruptCache {
        path: Default::default(),
        reason,
    };

    let time_ms = materialized(df, TIME_COLUMN)?.cast(&DataType::Int64)?;
    let mut time_axis: IndexSet<i64> = IndexSet::new();
    for t in time_ms.i64()?.into_iter() {
        time_axis.insert(t.ok_or_else(|| corrupt("null timestamp".into()))?);
    }
    let time = time_axis
        .iter()
        .map(|ms| {
            DateTime::from_timestamp_millis(*ms)
                .map(|t| t.naive_utc())
                .ok_or_else(|| corrupt(format!("timestamp {ms} out of range")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut dims = Vec::with_capacity(DIMS.len());
    for name in DIMS {
        let mut labels: IndexSet<&str> = IndexSet::new();
        for label in materialized(df, name)?.str()?.into_iter() {
            labels.insert(label.ok_or_else(|| corrupt(format!("null {name} label")))?);
        }
        dims.push(Dim::new(name, labels));
    }

    let data: Vec<f64> = materialized(df, variable)?
        .f64()?
        .into_iter()
        .map(|v| v.unwrap_or(f64::NAN))
        .collect();
    Ok(DataCube::new(time, dims, data)?)
}

/// One row per event, sorted by model, scenario category, country and id.
///
/// Columns: `model, scenario, scenario_rank, country, eventID, start, end,
/// duration` (seconds) and `year`.
pub fn events_frame(table: &EventTable<NaiveDateTime>) -> Result<DataFrame, LoadError> {
    let rows = table.sorted();
    let order = table.scenario_order();
    let rank = |s: &str| order.rank(s).map(|r| r as u32);

    let columns = vec![
        Column::new("model".into(), rows.iter().map(|e| e.model.as_str()).collect::<Vec<_>>()),
        Column::new("scenario".into(), rows.iter().map(|e| e.scenario.as_str()).collect::<Vec<_>>()),
        Column::new(
            "scenario_rank".into(),
            rows.iter().map(|e| rank(&e.scenario)).collect::<Vec<Option<u32>>>(),
        ),
        Column::new(
            "country".into(),
            rows.iter().map(|e| e.country.as_deref()).collect::<Vec<Option<&str>>>(),
        ),
        Column::new("eventID".into(), rows.iter().map(|e| e.event_id as u64).collect::<Vec<_>>()),
        datetime_column("start", rows.iter().map(|e| millis(e.start)).collect())?,
        datetime_column("end", rows.iter().map(|e| millis(e.end)).collect())?,
        Column::new("duration".into(), rows.iter().map(|e| e.duration.num_seconds()).collect::<Vec<i64>>()),
        Column::new("year".into(), rows.iter().map(|e| e.year).collect::<Vec<Option<i32>>>()),
    ];
    Ok(DataFrame::new(columns)?)
}

/// Dense per-year counts with a `scenario_rank` column.
pub fn counts_frame(counts: &EventCount) -> Result<DataFrame, LoadError> {
    let rows = counts.rows();
    let order = counts.scenario_order();
    let columns = vec![
        Column::new("model".into(), rows.iter().map(|r| r.model.as_str()).collect::<Vec<_>>()),
        Column::new("scenario".into(), rows.iter().map(|r| r.scenario.as_str()).collect::<Vec<_>>()),
        Column::new(
            "scenario_rank".into(),
            rows.iter()
                .map(|r| order.rank(&r.scenario).map(|x| x as u32))
                .collect::<Vec<Option<u32>>>(),
        ),
        Column::new("year".into(), rows.iter().map(|r| r.year).collect::<Vec<i32>>()),
        Column::new("n_events".into(), rows.iter().map(|r| r.n_events as u64).collect::<Vec<u64>>()),
    ];
    Ok(DataFrame::new(columns)?)
}

/// Writes `df` as CSV with a header row.
pub fn write_csv(df: &mut DataFrame, path: &Path) -> Result<(), LoadError> {
    let mut file = File::create(path).map_err(|source| LoadError::CacheWrite {
        path: path.to_path_buf(),
        source,
    })?;
    CsvWriter::new(&mut file).include_header(true).finish(df)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeDelta};
    use weave_events::{Event, ScenarioOrder, count_by_year};

    fn day(d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2030, 1, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn cube() -> DataCube {
        DataCube::new(
            vec![day(1), day(2)],
            vec![
                Dim::new("country", ["FR"]),
                Dim::new("scenario", ["SP126", "historical"]),
                Dim::new("model", ["A"]),
                Dim::new("tech", ["NA"]),
            ],
            vec![1.5, f64::NAN, -0.0, 2.25],
        )
        .unwrap()
    }

    #[test]
    fn long_layout_round_trips_bits() {
        let df = cube_to_frame(&cube(), "TA").unwrap();
        assert_eq!(df.height(), 4);
        let names: Vec<&str> = df.get_column_names().iter().map(|n| n.as_str()).collect();
        assert_eq!(names, vec!["time", "country", "scenario", "model", "tech", "TA"]);

        let back = frame_to_cube(&df, "TA").unwrap();
        assert_eq!(back.time(), cube().time());
        assert_eq!(back.dims(), cube().dims());
        let bits = |c: &DataCube| c.data().iter().map(|v| v.to_bits()).collect::<Vec<_>>();
        assert_eq!(bits(&back), bits(&cube()));
    }

    #[test]
    fn squeezed_cube_is_rejected() {
        let err = cube_to_frame(&cube().squeeze(), "TA").unwrap_err();
        assert!(matches!(err, LoadError::Configuration(_)));
    }

    fn table() -> EventTable<NaiveDateTime> {
        let e = |scenario: &str, id: usize, d: u32| Event {
            model: "A".into(),
            scenario: scenario.into(),
            country: Some("FR".into()),
            event_id: id,
            start: day(d),
            end: day(d + 1),
            duration: TimeDelta::days(1),
            year: None,
        };
        EventTable::new(
            vec![e("SP126", 0, 3), e("historical", 0, 1)],
            ScenarioOrder::from_labels(["SP126", "historical"]),
            2,
            0,
        )
    }

    #[test]
    fn events_frame_is_sorted_and_ranked() {
        let df = events_frame(&table()).unwrap();
        assert_eq!(df.height(), 2);
        let scen: Vec<Option<&str>> = df.column("scenario").unwrap().as_materialized_series().str().unwrap().into_iter().collect();
        assert_eq!(scen, vec![Some("historical"), Some("SP126")]);
        let rank: Vec<Option<u32>> = df.column("scenario_rank").unwrap().as_materialized_series().u32().unwrap().into_iter().collect();
        assert_eq!(rank, vec![Some(0), Some(1)]);
        let dur: Vec<Option<i64>> = df.column("duration").unwrap().as_materialized_series().i64().unwrap().into_iter().collect();
        assert_eq!(dur, vec![Some(86_400), Some(86_400)]);
    }

    #[test]
    fn empty_tables_keep_their_schema() {
        let empty = EventTable::<NaiveDateTime>::new(vec![], ScenarioOrder::default(), 0, 0);
        let df = events_frame(&empty).unwrap();
        assert_eq!(df.height(), 0);
        assert_eq!(df.width(), 9);
        let counts = counts_frame(&count_by_year(&empty)).unwrap();
        assert_eq!(counts.height(), 0);
        assert_eq!(counts.width(), 5);
    }

    #[test]
    fn csv_output_has_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("counts.csv");
        let mut df = counts_frame(&count_by_year(&table())).unwrap();
        write_csv(&mut df, &path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("model,scenario,scenario_rank,year,n_events"));
        assert_eq!(lines.next(), Some("A,historical,0,2030,1"));
        assert_eq!(lines.next(), Some("A,SP126,1,2030,1"));
    }
}
