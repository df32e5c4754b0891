use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use weave_events::{
    Comparator, Dim, EventError, LabeledArray, classify_cube, count_by_year, extract_all,
    period_length,
};

fn hourly(start: NaiveDateTime, n: usize) -> Vec<NaiveDateTime> {
    (0..n).map(|i| start + TimeDelta::hours(i as i64)).collect()
}

fn start() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2050, 12, 31)
        .unwrap()
        .and_hms_opt(20, 0, 0)
        .unwrap()
}

/// Two models × two scenarios × one squeezed country, six hours that cross
/// a year boundary.
fn wind_cube() -> LabeledArray<f64, NaiveDateTime> {
    let data = vec![
        // A / SP245
        1.0, 1.0, 9.0, 9.0, 1.0, 9.0,
        // A / historical
        9.0, 9.0, 9.0, 9.0, 9.0, 9.0,
        // B / SP245
        f64::NAN, 1.0, 1.0, 1.0, 1.0, 1.0,
        // B / historical
        1.0, 9.0, 1.0, 9.0, 1.0, 9.0,
    ];
    LabeledArray::new(
        hourly(start(), 6),
        vec![
            Dim::new("country", ["FR"]),
            Dim::new("model", ["A", "B"]),
            Dim::new("scenario", ["SP245", "historical"]),
        ],
        data,
    )
    .unwrap()
    .squeeze()
}

#[test]
fn low_wind_events_end_to_end() {
    let flags = classify_cube(&wind_cube(), Comparator::Less, 3.0);
    let table = extract_all(&flags).unwrap();

    assert_eq!(table.series_scanned(), 4);
    assert_eq!(table.scenario_order().categories(), &["historical", "SP245"]);
    assert!(table.events().iter().all(|e| e.country.as_deref() == Some("FR")));

    let a: Vec<_> = table
        .events()
        .iter()
        .filter(|e| e.model == "A" && e.scenario == "SP245")
        .map(|e| (e.event_id, e.start, e.duration, e.year))
        .collect();
    let t0 = start();
    assert_eq!(
        a,
        vec![
            (0, t0, TimeDelta::hours(1), Some(2050)),
            (1, t0 + TimeDelta::hours(4), TimeDelta::zero(), Some(2051)),
        ]
    );

    // The NaN hour breaks nothing: B / SP245 has one open run to the end.
    let b: Vec<_> = table
        .events()
        .iter()
        .filter(|e| e.model == "B" && e.scenario == "SP245")
        .collect();
    assert_eq!(b.len(), 1);
    assert_eq!(b[0].end, t0 + TimeDelta::hours(5));

    let counts = count_by_year(&table);
    let rows: Vec<_> = counts
        .rows()
        .iter()
        .map(|r| (r.model.as_str(), r.scenario.as_str(), r.year, r.n_events))
        .collect();
    assert_eq!(
        rows,
        vec![
            ("A", "SP245", 2050, 1),
            ("A", "SP245", 2051, 1),
            ("B", "historical", 2050, 2),
            ("B", "historical", 2051, 1),
            ("B", "SP245", 2050, 1),
        ]
    );
}

#[test]
fn period_of_a_model_spans_the_boundary() {
    assert_eq!(period_length(&wind_cube(), "A"), Some(2));
    assert_eq!(period_length(&wind_cube(), "Z"), None);
}

#[test]
fn serialized_counts_keep_column_names() {
    let table = extract_all(&classify_cube(&wind_cube(), Comparator::Less, 3.0)).unwrap();
    let counts = count_by_year(&table);
    let json = serde_json::to_value(&counts.rows()[0]).unwrap();
    assert_eq!(json["model"], "A");
    assert_eq!(json["n_events"], 1);
}

#[test]
fn bad_operator_is_reported() {
    assert_eq!(
        "=".parse::<Comparator>().unwrap_err(),
        EventError::InvalidComparator("=".into())
    );
}
