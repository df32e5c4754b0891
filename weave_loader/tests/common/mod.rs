#![allow(dead_code)]

use std::path::PathBuf;

use chrono::{NaiveDate, TimeDelta};
use tempfile::TempDir;
use weave_loader::Settings;

pub const VERSION: &str = "4.2";

pub struct TestDb {
    _dir: TempDir, // keep alive for the life of the test
    pub source_root: PathBuf,
    pub cache_root: PathBuf,
    pub trash_root: PathBuf,
}

impl TestDb {
    pub fn settings(&self) -> Settings {
        Settings {
            source_root: self.source_root.clone(),
            cache_root: self.cache_root.clone(),
            trash_root: self.trash_root.clone(),
            dataset_version: VERSION.to_string(),
        }
    }

    pub fn dataset_dir(&self) -> PathBuf {
        self.source_root.join(format!("PECD{VERSION}"))
    }

    pub fn write_source(&self, sub: &str, name: &str, contents: &str) -> PathBuf {
        let dir = self.dataset_dir().join(sub);
        std::fs::create_dir_all(&dir).expect("source dir");
        let path = dir.join(name);
        std::fs::write(&path, contents).expect("source file");
        path
    }
}

/// A PECD 4.x file name.
pub fn file_name(institute: &str, code: &str, var: &str, tech: &str, scen: &str) -> String {
    format!(
        "H_CMI6_{institute}_{code}_{var}_0000m_Pecd_NUT0_S201501010000_E201512312300_CFR_TIM_01d_NA-_noc_org_{tech}_{scen}_NA---_PhM01.csv"
    )
}

/// Hourly CSV from 2015-01-01; each column holds one constant level per day.
pub fn hourly_csv(columns: &[(&str, &[f64])]) -> String {
    let days = columns.iter().map(|(_, d)| d.len()).max().unwrap_or(0);
    let start = NaiveDate::from_ymd_opt(2015, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    let mut text = String::from("# PECD test fixture\nDate");
    for (name, _) in columns {
        text.push(',');
        text.push_str(name);
    }
    text.push('\n');
    for hour in 0..days * 24 {
        let t = start + TimeDelta::hours(hour as i64);
        text.push_str(&t.format("%Y-%m-%d %H:%M:%S").to_string());
        for (_, levels) in columns {
            text.push_str(&format!(",{}", levels[hour / 24]));
        }
        text.push('\n');
    }
    text
}

/// Two temperature runs (ERA5 historical, CMCC SP245) and two solar
/// technologies for ERA5.
pub fn setup_db() -> TestDb {
    let dir = TempDir::new().expect("tempdir");
    let db = TestDb {
        source_root: dir.path().join("raw"),
        cache_root: dir.path().join("cache"),
        trash_root: dir.path().join("trash"),
        _dir: dir,
    };
    db.write_source(
        "ERA5/TA",
        &file_name("ECMW", "T639", "TA", "NA", "NA---"),
        &hourly_csv(&[("FR", &[1.0, 10.0, 1.0]), ("DE", &[20.0, 20.0, 20.0])]),
    );
    db.write_source(
        "CMIP6/TA",
        &file_name("CMCC", "CMR5", "TA", "NA", "SP245"),
        &hourly_csv(&[("FR", &[10.0, 1.0, 1.0]), ("DE", &[20.0, 2.0, 20.0])]),
    );
    db.write_source(
        "ERA5/SPV",
        &file_name("ECMW", "T639", "SPV", "60", "NA---"),
        &hourly_csv(&[("FR", &[0.125, 0.25, 0.375])]),
    );
    db.write_source(
        "ERA5/SPV",
        &file_name("ECMW", "T639", "SPV", "61", "NA---"),
        &hourly_csv(&[("FR", &[0.5, 0.25, 0.75])]),
    );
    db
}
