//! Positional file-name fields of PECD source files.
//!
//! A source file stem is an underscore-separated list of fields, e.g.
//! `H_CMI6_CMCC_CMR5_TA_0000m_Pecd_NUT0_S201501010000_E201512312300_CFR_TIM_01d_NA-_noc_org_NA_SP245_NA---_PhM01`.
//! Which position holds which meaning is kept in one [`FilenameSchema`], so
//! a dataset version that moves fields only changes that table.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::errors::LoadError;

/// Field positions and label aliases of one file-naming convention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilenameSchema {
    pub institute: usize,
    pub model_code: usize,
    pub variable: usize,
    pub technology: usize,
    pub scenario: usize,
    /// Raw `{institute}_{model_code}` labels replaced by a display name.
    pub model_aliases: Vec<(String, String)>,
    /// Raw scenario fields replaced by a display name.
    pub scenario_aliases: Vec<(String, String)>,
}

impl Default for FilenameSchema {
    /// The PECD 4.x layout.
    fn default() -> Self {
        Self {
            institute: 2,
            model_code: 3,
            variable: 4,
            technology: 16,
            scenario: 17,
            model_aliases: vec![("ECMW_T639".into(), "ERA5".into())],
            scenario_aliases: vec![("NA---".into(), "historical".into())],
        }
    }
}

/// What a source file holds, read from its name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct SourceFile {
    pub path: PathBuf,
    pub variable: String,
    pub model: String,
    pub scenario: String,
    pub technology: String,
}

impl FilenameSchema {
    fn min_fields(&self) -> usize {
        [
            self.institute,
            self.model_code,
            self.variable,
            self.technology,
            self.scenario,
        ]
        .into_iter()
        .max()
        .unwrap_or_default()
            + 1
    }

    /// Reads the fields of `path`'s stem.
    pub fn parse(&self, path: &Path) -> Result<SourceFile, LoadError> {
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| LoadError::Filename {
                path: path.to_path_buf(),
                reason: "no UTF-8 file stem".into(),
            })?;
        let fields: Vec<&str> = stem.split('_').collect();
        if fields.len() < self.min_fields() {
            return Err(LoadError::Filename {
                path: path.to_path_buf(),
                reason: format!(
                    "{} fields, at least {} expected",
                    fields.len(),
                    self.min_fields()
                ),
            });
        }

        let raw_model = format!("{}_{}", fields[self.institute], fields[self.model_code]);
        Ok(SourceFile {
            path: path.to_path_buf(),
            variable: fields[self.variable].to_string(),
            model: alias(&self.model_aliases, &raw_model),
            scenario: alias(&self.scenario_aliases, fields[self.scenario]),
            technology: fields[self.technology].to_string(),
        })
    }
}

fn alias(table: &[(String, String)], raw: &str) -> String {
    table
        .iter()
        .find(|(from, _)| from == raw)
        .map_or_else(|| raw.to_string(), |(_, to)| to.clone())
}
