mod common;

use common::setup_db;
use weave_events::{Comparator, classify_cube, count_by_year, extract_all};
use weave_loader::{
    LoadRequest, Loader,
    io::{counts_frame, events_frame, write_csv},
};

fn column_i64(df: &polars::prelude::DataFrame, name: &str) -> Vec<Option<i64>> {
    df.column(name)
        .unwrap()
        .as_materialized_series()
        .i64()
        .unwrap()
        .into_iter()
        .collect()
}

#[test]
fn loaded_cube_feeds_the_event_pipeline() {
    let db = setup_db();
    let dataset = Loader::new(db.settings())
        .load(&LoadRequest::new(["TA"]).countries(["FR", "DE"]))
        .unwrap();
    let cube = dataset.get("TA").unwrap().select("tech", &["NA"]).unwrap().squeeze();
    assert_eq!(cube.scalar("tech"), Some("NA"));

    let flags = classify_cube(&cube, Comparator::Less, 5.0);
    let table = extract_all(&flags).unwrap();
    // ERA5/SP245 and CMCC_CMR5/historical have no source files.
    assert_eq!(table.series_scanned(), 4);
    assert_eq!(table.series_skipped(), 4);
    assert_eq!(table.len(), 4);

    let events = events_frame(&table).unwrap();
    let models: Vec<Option<&str>> = events
        .column("model")
        .unwrap()
        .as_materialized_series()
        .str()
        .unwrap()
        .into_iter()
        .collect();
    assert_eq!(
        models,
        vec![Some("CMCC_CMR5"), Some("CMCC_CMR5"), Some("ERA5"), Some("ERA5")]
    );
    assert_eq!(
        column_i64(&events, "duration"),
        vec![Some(0), Some(86_400), Some(0), Some(0)]
    );

    let counts = count_by_year(&table);
    assert_eq!(counts.len(), 2);
    assert!(counts.rows().iter().all(|r| r.year == 2015 && r.n_events == 2));

    let out = tempfile::tempdir().unwrap();
    let path = out.path().join("counts_TA_NA.csv");
    write_csv(&mut counts_frame(&counts).unwrap(), &path).unwrap();
    let text = std::fs::read_to_string(&path).unwrap();
    assert_eq!(
        text.lines().collect::<Vec<_>>(),
        vec![
            "model,scenario,scenario_rank,year,n_events",
            "CMCC_CMR5,SP245,1,2015,2",
            "ERA5,historical,0,2015,2",
        ]
    );
}

#[test]
fn threshold_nobody_meets_gives_empty_tables() {
    let db = setup_db();
    let dataset = Loader::new(db.settings())
        .load(&LoadRequest::new(["TA"]).countries(["FR"]))
        .unwrap();
    let cube = dataset.get("TA").unwrap().clone().squeeze();
    let table = extract_all(&classify_cube(&cube, Comparator::Greater, 100.0)).unwrap();
    assert!(table.is_empty());
    assert_eq!(table.series_scanned(), 2);
    assert_eq!(table.series_skipped(), 2);

    let events = events_frame(&table).unwrap();
    assert_eq!(events.height(), 0);
    assert_eq!(counts_frame(&count_by_year(&table)).unwrap().height(), 0);
}
