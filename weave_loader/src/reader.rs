//! Reading PECD CSV files and resampling them.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use chrono::{NaiveDate, NaiveDateTime};
use tracing::{debug, instrument};

use crate::{
    errors::LoadError,
    frequency::{Frequency, Statistic, truncate},
};

/// Name of the timestamp column.
pub const DATE_COLUMN: &str = "Date";

const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];
const DATE_FORMAT: &str = "%Y-%m-%d";

/// One series per country column, on a shared time axis.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceTable {
    pub times: Vec<NaiveDateTime>,
    /// `(column name, values)` in file order.
    pub columns: Vec<(String, Vec<f64>)>,
}

impl SourceTable {
    /// Aggregates every column into `frequency` buckets with `statistic`.
    ///
    /// Bucket labels are the bucket starts, in increasing order. Buckets
    /// without any row are not created.
    pub fn resample(&self, frequency: Frequency, statistic: Statistic) -> Result<SourceTable, LoadError> {
        let mut buckets: BTreeMap<NaiveDateTime, Vec<usize>> = BTreeMap::new();
        for (row, t) in self.times.iter().enumerate() {
            let start = truncate(*t, frequency).ok_or_else(|| {
                LoadError::Configuration(format!("{t} has no {frequency} bucket in range"))
            })?;
            buckets.entry(start).or_default().push(row);
        }
        let times: Vec<NaiveDateTime> = buckets.keys().copied().collect();

        let mut scratch = Vec::new();
        let columns = self
            .columns
            .iter()
            .map(|(name, values)| {
                let reduced = buckets
                    .values()
                    .map(|rows| {
                        scratch.clear();
                        scratch.extend(rows.iter().map(|r| values[*r]));
                        statistic.reduce(&scratch)
                    })
                    .collect();
                (name.clone(), reduced)
            })
            .collect();

        Ok(SourceTable { times, columns })
    }
}

/// Reads a source CSV file.
///
/// Lines starting with `#` are comments. The header must contain a
/// [`DATE_COLUMN`]; every other column is a country series. With
/// `countries`, only columns whose name starts with one of the codes are
/// kept. Empty and `nan` cells become NaN.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn read_source(path: &Path, countries: Option<&[String]>) -> Result<SourceTable, LoadError> {
    let file = std::fs::File::open(path).map_err(|source| LoadError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .comment(Some(b'#'))
        .trim(csv::Trim::All)
        .from_reader(file);

    let csv_err = |source: csv::Error| LoadError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let header = rdr.headers().map_err(csv_err)?.clone();
    let date_index = header
        .iter()
        .position(|h| h == DATE_COLUMN)
        .ok_or_else(|| LoadError::MissingDateColumn {
            path: path.to_path_buf(),
        })?;
    let keep: Vec<(usize, String)> = header
        .iter()
        .enumerate()
        .filter(|(i, name)| {
            *i != date_index
                && countries.is_none_or(|cs| cs.iter().any(|c| name.starts_with(c.as_str())))
        })
        .map(|(i, name)| (i, name.to_string()))
        .collect();
    debug!(columns = keep.len(), "read CSV header");

    let mut times = Vec::new();
    let mut values: Vec<Vec<f64>> = vec![Vec::new(); keep.len()];
    for (row, record) in rdr.records().enumerate() {
        let record = record.map_err(csv_err)?;
        let raw_date = record.get(date_index).unwrap_or_default();
        times.push(parse_timestamp(raw_date).ok_or_else(|| parse_error(path, row, format!("bad date '{raw_date}'")))?);
        for (slot, (col, _)) in values.iter_mut().zip(&keep) {
            let raw = record.get(*col).unwrap_or_default();
            let v = parse_value(raw).ok_or_else(|| parse_error(path, row, format!("bad number '{raw}'")))?;
            slot.push(v);
        }
    }
    debug!(rows = times.len(), "read CSV rows");

    Ok(SourceTable {
        times,
        columns: keep.into_iter().map(|(_, name)| name).zip(values).collect(),
    })
}

fn parse_error(path: &Path, row: usize, message: String) -> LoadError {
    LoadError::Parse {
        path: PathBuf::from(path),
        row,
        message,
    }
}

/// Parses a timestamp in any of the accepted layouts.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    DATETIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(raw, f).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, DATE_FORMAT)
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

fn parse_value(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case("nan") {
        return Some(f64::NAN);
    }
    raw.parse().ok()
}
