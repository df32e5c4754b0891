//! Turning per-file tables into one dense cube.

use std::collections::BTreeSet;

use chrono::NaiveDateTime;
use weave_events::{Dim, LabeledArray};

use crate::{errors::LoadError, reader::SourceTable};

/// A numeric cube on a calendar time axis.
pub type DataCube = LabeledArray<f64, NaiveDateTime>;

/// Label dimensions of every loaded cube, outermost first.
pub const DIMS: [&str; 4] = ["country", "scenario", "model", "tech"];

/// One resampled source file with the labels read from its name.
#[derive(Debug, Clone)]
pub struct Record {
    pub model: String,
    pub scenario: String,
    pub tech: String,
    pub table: SourceTable,
}

/// Lays `records` out on sorted `(country, scenario, model, tech)` axes and
/// a sorted time axis.
///
/// Cells covered by several records hold the mean of their non-NaN values;
/// cells no record covers are NaN.
pub fn pivot(records: &[Record]) -> Result<DataCube, LoadError> {
    let mut times = BTreeSet::new();
    let mut countries = BTreeSet::new();
    let mut scenarios = BTreeSet::new();
    let mut models = BTreeSet::new();
    let mut techs = BTreeSet::new();
    for r in records {
        times.extend(r.table.times.iter().copied());
        countries.extend(r.table.columns.iter().map(|(c, _)| c.as_str()));
        scenarios.insert(r.scenario.as_str());
        models.insert(r.model.as_str());
        techs.insert(r.tech.as_str());
    }
    let time: Vec<NaiveDateTime> = times.into_iter().collect();
    let dims = vec![
        Dim::new(DIMS[0], countries),
        Dim::new(DIMS[1], scenarios),
        Dim::new(DIMS[2], models),
        Dim::new(DIMS[3], techs),
    ];

    let mut sums = LabeledArray::filled(time, dims, (0.0_f64, 0_u32))?;
    for r in records {
        let (Some(s), Some(m), Some(t)) = (
            sums.dims()[1].position(&r.scenario),
            sums.dims()[2].position(&r.model),
            sums.dims()[3].position(&r.tech),
        ) else {
            continue;
        };
        let time_pos: Vec<usize> = r
            .table
            .times
            .iter()
            .map(|ts| sums.time().binary_search(ts).unwrap_or_default())
            .collect();
        for (country, values) in &r.table.columns {
            let Some(c) = sums.dims()[0].position(country) else {
                continue;
            };
            for (ti, v) in time_pos.iter().zip(values) {
                if v.is_nan() {
                    continue;
                }
                if let Some(cell) = sums.get_mut(&[c, s, m, t], *ti) {
                    cell.0 += v;
                    cell.1 += 1;
                }
            }
        }
    }

    Ok(sums.map(|(sum, n)| if *n == 0 { f64::NAN } else { sum / f64::from(*n) }))
}
