//! Finding source files under the dataset directory.

use std::{
    collections::BTreeSet,
    path::{Path, PathBuf},
};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{
    errors::LoadError,
    filename::{FilenameSchema, SourceFile},
};

/// Path fragment marking re-gridded products, which are never loaded.
pub const REGRIDDED_MARKER: &str = "ReGrA";

/// Optional label filters; `None` keeps everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filters {
    pub technologies: Option<Vec<String>>,
    pub models: Option<Vec<String>>,
    pub scenarios: Option<Vec<String>>,
}

impl Filters {
    /// `true` if `file` passes every filter.
    pub fn accepts(&self, file: &SourceFile) -> bool {
        allowed(&self.technologies, &file.technology)
            && allowed(&self.models, &file.model)
            && allowed(&self.scenarios, &file.scenario)
    }
}

fn allowed(filter: &Option<Vec<String>>, label: &str) -> bool {
    filter.as_ref().is_none_or(|f| f.iter().any(|x| x == label))
}

/// Every `*.csv` below `dir`, sorted, skipping re-gridded products.
fn csv_files(dir: &Path) -> Result<Vec<PathBuf>, LoadError> {
    let mut out = Vec::new();
    let mut pending = vec![dir.to_path_buf()];
    while let Some(current) = pending.pop() {
        let entries = std::fs::read_dir(&current).map_err(|source| LoadError::Read {
            path: current.clone(),
            source,
        })?;
        for entry in entries {
            let path = entry?.path();
            if path.to_string_lossy().contains(REGRIDDED_MARKER) {
                continue;
            }
            if path.is_dir() {
                pending.push(path);
            } else if path.extension().is_some_and(|e| e == "csv") {
                out.push(path);
            }
        }
    }
    out.sort();
    Ok(out)
}

/// Parses every file name under `dir`; names that do not follow `schema`
/// are logged and left out.
fn parse_all(dir: &Path, schema: &FilenameSchema) -> Result<Vec<SourceFile>, LoadError> {
    if !dir.is_dir() {
        return Err(LoadError::NotFound(format!(
            "dataset directory {} does not exist",
            dir.display()
        )));
    }
    let mut files = Vec::new();
    for path in csv_files(dir)? {
        match schema.parse(&path) {
            Ok(f) => files.push(f),
            Err(e) => warn!(error = %e, "skipping file with unexpected name"),
        }
    }
    Ok(files)
}

/// Source files under `dir` holding `variable` and passing `filters`.
///
/// Returns [`LoadError::NotFound`] when nothing matches.
pub fn discover(
    dir: &Path,
    schema: &FilenameSchema,
    variable: &str,
    filters: &Filters,
) -> Result<Vec<SourceFile>, LoadError> {
    let all = parse_all(dir, schema)?;
    let for_variable: Vec<SourceFile> = all.into_iter().filter(|f| f.variable == variable).collect();
    if for_variable.is_empty() {
        return Err(LoadError::NotFound(format!(
            "no CSV files for variable '{variable}' in {}",
            dir.display()
        )));
    }
    let found = for_variable.len();
    let kept: Vec<SourceFile> = for_variable.into_iter().filter(|f| filters.accepts(f)).collect();
    info!(variable, found, kept = kept.len(), "source files discovered");
    if kept.is_empty() {
        return Err(LoadError::NotFound(format!(
            "no CSV files for variable '{variable}' match the technology/model/scenario filters"
        )));
    }
    Ok(kept)
}

/// What a dataset directory contains.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Inventory {
    pub files: Vec<SourceFile>,
    pub variables: BTreeSet<String>,
    pub models: BTreeSet<String>,
    pub scenarios: BTreeSet<String>,
    pub technologies: BTreeSet<String>,
}

/// Lists the files under `dir` and the distinct labels they carry,
/// optionally for one variable only.
pub fn explore(
    dir: &Path,
    schema: &FilenameSchema,
    variable: Option<&str>,
) -> Result<Inventory, LoadError> {
    let mut inv = Inventory::default();
    for f in parse_all(dir, schema)? {
        if variable.is_some_and(|v| v != f.variable) {
            continue;
        }
        inv.variables.insert(f.variable.clone());
        inv.models.insert(f.model.clone());
        inv.scenarios.insert(f.scenario.clone());
        inv.technologies.insert(f.technology.clone());
        inv.files.push(f);
    }
    debug!(
        files = inv.files.len(),
        variables = ?inv.variables,
        models = ?inv.models,
        "inventory built"
    );
    Ok(inv)
}
