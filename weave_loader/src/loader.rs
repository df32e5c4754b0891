//! Loading variables from the flat-file database into dense cubes.
//!
//! A request is split into units, one per (country, variable, technology).
//! Each unit is served from the cache when its artifact exists, otherwise
//! computed from the source files and written back unless one of its files
//! failed. Units run on the rayon
//! pool; their cubes are merged into one cube per variable.

use std::{
    error::Error as _,
    path::PathBuf,
    sync::atomic::{AtomicUsize, Ordering},
};

use indexmap::IndexMap;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::{
    cache::{Cache, CacheKey, WriteOutcome},
    catalog::{self, SCENARIOS, country_name, is_known_model, is_known_scenario, technologies_for},
    discover::{Filters, discover},
    errors::LoadError,
    filename::{FilenameSchema, SourceFile},
    frequency::{Frequency, Statistic},
    pivot::{DataCube, Record, pivot},
    reader::read_source,
    settings::Settings,
};

/// Country key of the unit that keeps every country column.
pub const ALL_COUNTRIES: &str = "ALL";

/// What to load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadRequest {
    pub variables: Vec<String>,
    /// `None` loads every country column as a single unit.
    pub countries: Option<Vec<String>>,
    pub technologies: Option<Vec<String>>,
    pub models: Option<Vec<String>>,
    pub scenarios: Option<Vec<String>>,
    pub frequency: Frequency,
    pub statistic: Statistic,
}

impl LoadRequest {
    /// Daily means of `variables`, unfiltered.
    pub fn new<S: Into<String>>(variables: impl IntoIterator<Item = S>) -> Self {
        Self {
            variables: variables.into_iter().map(Into::into).collect(),
            countries: None,
            technologies: None,
            models: None,
            scenarios: None,
            frequency: Frequency::Day,
            statistic: Statistic::Mean,
        }
    }

    pub fn countries<S: Into<String>>(mut self, countries: impl IntoIterator<Item = S>) -> Self {
        self.countries = Some(countries.into_iter().map(Into::into).collect());
        self
    }

    pub fn technologies<S: Into<String>>(mut self, technologies: impl IntoIterator<Item = S>) -> Self {
        self.technologies = Some(technologies.into_iter().map(Into::into).collect());
        self
    }

    pub fn models<S: Into<String>>(mut self, models: impl IntoIterator<Item = S>) -> Self {
        self.models = Some(models.into_iter().map(Into::into).collect());
        self
    }

    pub fn scenarios<S: Into<String>>(mut self, scenarios: impl IntoIterator<Item = S>) -> Self {
        self.scenarios = Some(scenarios.into_iter().map(Into::into).collect());
        self
    }

    pub fn aggregation(mut self, frequency: Frequency, statistic: Statistic) -> Self {
        self.frequency = frequency;
        self.statistic = statistic;
        self
    }

    fn validate(&self) -> Result<(), LoadError> {
        if self.variables.is_empty() {
            return Err(LoadError::Configuration("no variable requested".into()));
        }
        let empty = |name: &str, list: &Option<Vec<String>>| match list {
            Some(l) if l.is_empty() => Err(LoadError::Configuration(format!(
                "empty {name} list; omit it to load all {name}"
            ))),
            _ => Ok(()),
        };
        empty("countries", &self.countries)?;
        empty("technologies", &self.technologies)?;
        empty("models", &self.models)?;
        empty("scenarios", &self.scenarios)?;

        for code in self.countries.iter().flatten() {
            if country_name(code).is_none() {
                return Err(LoadError::Configuration(format!("unknown country code '{code}'")));
            }
        }
        for scenario in self.scenarios.iter().flatten() {
            if !is_known_scenario(scenario) {
                return Err(LoadError::Configuration(format!(
                    "unknown scenario '{scenario}' (expected one of {SCENARIOS:?})"
                )));
            }
        }
        // The database may hold runs newer than the catalog.
        for model in self.models.iter().flatten() {
            if !is_known_model(model) {
                warn!(model = %model, "model not in the catalog");
            }
        }
        for code in &self.variables {
            if catalog::variable(code).is_none() {
                warn!(variable = %code, "variable not in the catalog");
            }
        }
        Ok(())
    }

    fn country_keys(&self) -> Vec<String> {
        self.countries
            .clone()
            .unwrap_or_else(|| vec![ALL_COUNTRIES.to_string()])
    }
}

/// One independently cached slice of a request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Unit {
    pub country: String,
    pub variable: String,
    pub technology: String,
}

/// A source file that matched but could not be used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedFile {
    pub path: PathBuf,
    pub reason: String,
}

/// Per-variable summary of a load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub variable: String,
    pub units: usize,
    pub cache_hits: usize,
    pub cache_writes: usize,
    pub files_found: usize,
    pub files_read: usize,
    pub failed: Vec<FailedFile>,
    /// Units for which no file yielded any row.
    pub empty_units: Vec<Unit>,
}

/// The loaded cubes, by variable in request order.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub cubes: IndexMap<String, DataCube>,
    pub reports: Vec<LoadReport>,
}

impl Dataset {
    pub fn get(&self, variable: &str) -> Option<&DataCube> {
        self.cubes.get(variable)
    }
}

#[derive(Debug)]
struct UnitOutcome {
    unit: Unit,
    cube: Option<DataCube>,
    cache_hit: bool,
    written: bool,
    files_found: usize,
    files_read: usize,
    failed: Vec<FailedFile>,
}

impl UnitOutcome {
    fn new(unit: Unit) -> Self {
        Self {
            unit,
            cube: None,
            cache_hit: false,
            written: false,
            files_found: 0,
            files_read: 0,
            failed: Vec::new(),
        }
    }
}

/// Loads requests against one configured database and cache.
#[derive(Debug, Clone)]
pub struct Loader {
    settings: Settings,
    schema: FilenameSchema,
    cache: Cache,
}

impl Loader {
    pub fn new(settings: Settings) -> Self {
        let cache = Cache::new(&settings.cache_root);
        Self {
            settings,
            schema: FilenameSchema::default(),
            cache,
        }
    }

    pub fn with_schema(mut self, schema: FilenameSchema) -> Self {
        self.schema = schema;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn schema(&self) -> &FilenameSchema {
        &self.schema
    }

    /// Every unit of `request`, by variable, then country, then technology.
    pub fn units(&self, request: &LoadRequest) -> Vec<Unit> {
        let countries = request.country_keys();
        let mut units = Vec::new();
        for variable in &request.variables {
            for country in &countries {
                for technology in technologies_for(variable, request.technologies.as_deref()) {
                    units.push(Unit {
                        country: country.clone(),
                        variable: variable.clone(),
                        technology,
                    });
                }
            }
        }
        units
    }

    /// Cache key of `unit` under `request`'s aggregation.
    pub fn cache_key(&self, unit: &Unit, request: &LoadRequest) -> CacheKey {
        CacheKey {
            version: self.settings.dataset_version.clone(),
            variable: unit.variable.clone(),
            technology: unit.technology.clone(),
            frequency: request.frequency,
            statistic: request.statistic,
            country: unit.country.clone(),
        }
    }

    /// Loads every requested variable.
    ///
    /// Artifacts hold every model and scenario of their unit; the model and
    /// scenario filters are applied to the merged cube.
    #[instrument(skip_all, fields(variables = ?request.variables, freq = %request.frequency, stat = %request.statistic))]
    pub fn load(&self, request: &LoadRequest) -> Result<Dataset, LoadError> {
        request.validate()?;
        let dir = self.settings.dataset_dir();
        let units = self.units(request);
        info!(source = %dir.display(), cache = %self.cache.root().display(), units = units.len(), "loading");

        let mut cubes = IndexMap::new();
        let mut reports = Vec::with_capacity(request.variables.len());
        for variable in &request.variables {
            let technologies = technologies_for(variable, request.technologies.as_deref());
            if technologies.is_empty() {
                return Err(LoadError::Configuration(format!(
                    "none of the requested technologies {:?} exist for '{variable}'",
                    request.technologies.as_deref().unwrap_or_default()
                )));
            }
            // Fails early when the filters leave nothing.
            discover(
                &dir,
                &self.schema,
                variable,
                &Filters {
                    technologies: Some(technologies.clone()),
                    models: request.models.clone(),
                    scenarios: request.scenarios.clone(),
                },
            )?;
            let candidates = discover(
                &dir,
                &self.schema,
                variable,
                &Filters {
                    technologies: Some(technologies),
                    ..Filters::default()
                },
            )?;

            let mine: Vec<&Unit> = units.iter().filter(|u| &u.variable == variable).collect();
            let done = AtomicUsize::new(0);
            let outcomes = mine
                .par_iter()
                .map(|u| {
                    let outcome = self.load_unit(u, request, &candidates)?;
                    let n = done.fetch_add(1, Ordering::Relaxed) + 1;
                    info!(
                        country = %u.country,
                        tech = %u.technology,
                        cache_hit = outcome.cache_hit,
                        "unit {n}/{} loaded",
                        mine.len()
                    );
                    Ok(outcome)
                })
                .collect::<Result<Vec<_>, LoadError>>()?;

            let (cube, report) = assemble(variable, outcomes)?;
            let cube = restrict(cube, "model", request.models.as_deref())?;
            let cube = restrict(cube, "scenario", request.scenarios.as_deref())?;
            info!(
                variable = %variable,
                units = report.units,
                cache_hits = report.cache_hits,
                files_read = report.files_read,
                failed = report.failed.len(),
                "variable loaded"
            );
            cubes.insert(variable.clone(), cube);
            reports.push(report);
        }
        Ok(Dataset { cubes, reports })
    }

    #[instrument(skip_all, fields(country = %unit.country, variable = %unit.variable, tech = %unit.technology))]
    fn load_unit(&self, unit: &Unit, request: &LoadRequest, files: &[SourceFile]) -> Result<UnitOutcome, LoadError> {
        let key = self.cache_key(unit, request);
        let mut outcome = UnitOutcome::new(unit.clone());
        if let Some(cube) = self.cache.read(&key)? {
            outcome.cache_hit = true;
            outcome.cube = Some(cube);
            return Ok(outcome);
        }

        let countries = (unit.country != ALL_COUNTRIES).then(|| vec![unit.country.clone()]);
        let mut records = Vec::new();
        for file in files.iter().filter(|f| f.technology == unit.technology) {
            outcome.files_found += 1;
            let table = read_source(&file.path, countries.as_deref())
                .and_then(|t| t.resample(request.frequency, request.statistic));
            match table {
                Ok(table) => records.push(Record {
                    model: file.model.clone(),
                    scenario: file.scenario.clone(),
                    tech: file.technology.clone(),
                    table,
                }),
                Err(e) => {
                    let reason = error_chain(&e);
                    warn!(path = %file.path.display(), error = %reason, "skipping unreadable source file");
                    outcome.failed.push(FailedFile {
                        path: file.path.clone(),
                        reason,
                    });
                }
            }
        }
        outcome.files_read = records.len();

        if records
            .iter()
            .all(|r| r.table.columns.is_empty() || r.table.times.is_empty())
        {
            warn!(files_read = outcome.files_read, "no data for unit");
            return Ok(outcome);
        }
        let cube = pivot(&records)?;
        // A partial unit is never cached; the next load retries the failed files.
        if outcome.failed.is_empty() {
            outcome.written = self.cache.write(&key, &cube)? == WriteOutcome::Written;
        } else {
            warn!(failed = outcome.failed.len(), "unit incomplete, not cached");
        }
        outcome.cube = Some(cube);
        Ok(outcome)
    }
}

fn assemble(variable: &str, outcomes: Vec<UnitOutcome>) -> Result<(DataCube, LoadReport), LoadError> {
    let mut report = LoadReport {
        variable: variable.to_string(),
        units: outcomes.len(),
        ..LoadReport::default()
    };
    let mut cubes = Vec::with_capacity(outcomes.len());
    for o in outcomes {
        report.cache_hits += usize::from(o.cache_hit);
        report.cache_writes += usize::from(o.written);
        report.files_found += o.files_found;
        report.files_read += o.files_read;
        report.failed.extend(o.failed);
        match o.cube {
            Some(cube) => cubes.push(cube),
            None => report.empty_units.push(o.unit),
        }
    }
    if cubes.is_empty() {
        return Err(LoadError::NotFound(format!(
            "no data could be read for '{variable}' ({} of {} files failed)",
            report.failed.len(),
            report.files_found
        )));
    }
    let cube = DataCube::merge(cubes, f64::NAN)?;
    Ok((cube, report))
}

/// Keeps the labels of `dim` listed in `wanted`.
fn restrict(cube: DataCube, dim: &str, wanted: Option<&[String]>) -> Result<DataCube, LoadError> {
    let Some(wanted) = wanted else {
        return Ok(cube);
    };
    let keep: Vec<&str> = cube
        .labels_of(dim)
        .unwrap_or_default()
        .into_iter()
        .filter(|label| wanted.iter().any(|w| w == label))
        .collect();
    if keep.is_empty() {
        return Err(LoadError::NotFound(format!("no {dim} among {wanted:?} could be read")));
    }
    let selected = cube.select(dim, &keep)?;
    Ok(selected)
}

fn error_chain(e: &LoadError) -> String {
    let mut text = e.to_string();
    let mut source = e.source();
    while let Some(s) = source {
        text.push_str(": ");
        text.push_str(&s.to_string());
        source = s.source();
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn units_cover_countries_and_technologies() {
        let loader = Loader::new(Settings::with_roots("/src", "/cache"));
        let req = LoadRequest::new(["TA", "SPV"])
            .countries(["FR", "DE"])
            .technologies(["60", "61"]);
        let units = loader.units(&req);
        assert_eq!(units.len(), 2 + 4);
        assert_eq!(units[0].technology, "NA");
        assert!(units.iter().filter(|u| u.variable == "SPV").all(|u| u.technology != "NA"));
    }

    #[test]
    fn missing_countries_is_one_all_unit() {
        let loader = Loader::new(Settings::with_roots("/src", "/cache"));
        let units = loader.units(&LoadRequest::new(["TA"]));
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].country, ALL_COUNTRIES);
        let key = loader.cache_key(&units[0], &LoadRequest::new(["TA"]));
        assert_eq!(key.file_name(), "TA_NA_D-mean_ALL_PECD4.2.feather");
    }

    #[test]
    fn empty_lists_are_configuration_errors() {
        let loader = Loader::new(Settings::with_roots("/src", "/cache"));
        let none: [&str; 0] = [];
        for req in [
            LoadRequest::new(none),
            LoadRequest::new(["TA"]).countries(none),
            LoadRequest::new(["TA"]).models(none),
        ] {
            assert!(matches!(loader.load(&req), Err(LoadError::Configuration(_))));
        }
    }

    #[test]
    fn unknown_countries_and_scenarios_are_configuration_errors() {
        let loader = Loader::new(Settings::with_roots("/src", "/cache"));
        for req in [
            LoadRequest::new(["TA"]).countries(["FR", "XX"]),
            LoadRequest::new(["TA"]).scenarios(["ssp245"]),
        ] {
            assert!(matches!(loader.load(&req), Err(LoadError::Configuration(_))));
        }
        assert!(LoadRequest::new(["TA"]).countries(["FR10"]).scenarios(["SP245"]).validate().is_ok());
        assert!(LoadRequest::new(["TA"]).models(["NEW-_MODL"]).validate().is_ok());
    }

    #[test]
    fn error_chain_includes_sources() {
        let e = LoadError::Read {
            path: "x.csv".into(),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert_eq!(error_chain(&e), "Cannot read x.csv: denied");
    }
}
