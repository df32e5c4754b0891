use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;

use weave_events::{Comparator, classify_cube, count_by_year, extract_all};
use weave_loader::{
    EnvSource, Explicit, FileSource, LoadReport, LoadRequest, Loader, PartialSettings, Settings,
    SettingsSource, catalog, explore,
    frequency::{Frequency, Statistic},
    io::{counts_frame, events_frame, write_csv},
};

/// Settings file picked up from the working directory when `--settings` is not given.
const DEFAULT_SETTINGS_FILE: &str = "weave.toml";

#[derive(Parser)]
#[command(name = "weave")]
#[command(about = "Threshold events over PECD climate and energy data")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// TOML settings file with per-host profiles
    #[arg(long, value_name = "FILE", global = true)]
    settings: Option<PathBuf>,

    /// Root of the source database (overrides settings and environment)
    #[arg(long, global = true)]
    source_root: Option<PathBuf>,

    /// Root of the cache store
    #[arg(long, global = true)]
    cache_root: Option<PathBuf>,

    /// Holding area for discarded raw archives
    #[arg(long, global = true)]
    trash_root: Option<PathBuf>,

    /// Dataset version, e.g. 4.2
    #[arg(long, global = true)]
    dataset_version: Option<String>,

    /// Enable verbose (debug-level) logging
    #[arg(long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Number of threads for loading (defaults to all cores)
    #[arg(long, global = true)]
    threads: Option<usize>,
}

/// Which slice of the database to load and how to aggregate it.
#[derive(Args, Debug, Clone)]
struct FilterArgs {
    /// Country codes (comma separated, see `weave catalog`); all countries when omitted
    #[arg(long, value_delimiter = ',')]
    countries: Option<Vec<String>>,

    /// Technology codes of energy variables
    #[arg(long, value_delimiter = ',')]
    technologies: Option<Vec<String>>,

    /// Models, e.g. ERA5,CMCC_CMR5
    #[arg(long, value_delimiter = ',')]
    models: Option<Vec<String>>,

    /// Scenarios, e.g. historical,SP245
    #[arg(long, value_delimiter = ',')]
    scenarios: Option<Vec<String>>,

    /// Aggregation frequency: H, D, M or Y (see `weave catalog`)
    #[arg(long, default_value = "D")]
    freq: Frequency,

    /// Aggregation function: mean, sum, min, max or median
    #[arg(long, default_value = "mean")]
    stat: Statistic,
}

impl FilterArgs {
    fn request(&self, variables: Vec<String>) -> LoadRequest {
        LoadRequest {
            variables,
            countries: self.countries.clone(),
            technologies: self.technologies.clone(),
            models: self.models.clone(),
            scenarios: self.scenarios.clone(),
            frequency: self.freq,
            statistic: self.stat,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Print the catalogued variables, models, scenarios, frequencies and countries
    Catalog,

    /// List the source files and the labels they carry
    Inventory {
        /// Only files of this variable
        #[arg(long)]
        variable: Option<String>,

        /// Print the inventory as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Load variables, filling the cache
    Load {
        /// Variable codes (comma separated)
        #[arg(long, value_delimiter = ',', required = true)]
        variables: Vec<String>,

        #[command(flatten)]
        filters: FilterArgs,
    },

    /// Detect threshold events and count them per year
    Events {
        /// Variable code
        #[arg(long)]
        variable: String,

        /// One of <, <=, >, >=
        #[arg(long, default_value = "<")]
        comparator: Comparator,

        /// Threshold; the catalog default of the variable when omitted
        #[arg(long, allow_negative_numbers = true)]
        threshold: Option<f64>,

        /// Output directory for the CSV files
        #[arg(long, default_value = ".")]
        out: PathBuf,

        #[command(flatten)]
        filters: FilterArgs,
    },
}

fn resolve_settings(cli: &Cli) -> Result<Settings> {
    let explicit = Explicit(PartialSettings {
        source_root: cli.source_root.clone(),
        cache_root: cli.cache_root.clone(),
        trash_root: cli.trash_root.clone(),
        dataset_version: cli.dataset_version.clone(),
    });
    let file = cli.settings.clone().or_else(|| {
        let default = PathBuf::from(DEFAULT_SETTINGS_FILE);
        default.is_file().then_some(default)
    });
    let file = file.map(FileSource::new);

    let mut sources: Vec<&dyn SettingsSource> = vec![&explicit, &EnvSource];
    if let Some(f) = &file {
        sources.push(f);
    }
    let settings = Settings::resolve(&sources).context("failed to resolve settings")?;
    info!(
        source = %settings.source_root.display(),
        cache = %settings.cache_root.display(),
        version = %settings.dataset_version,
        "settings resolved"
    );
    Ok(settings)
}

fn print_catalog() {
    println!("Climate variables:");
    for v in catalog::CLIMATE_VARIABLES {
        println!(
            "  {:<6} {} [{}], default threshold {}",
            v.code, v.name, v.units, v.threshold.default
        );
    }
    println!("Energy variables:");
    for v in catalog::ENERGY_VARIABLES {
        println!("  {:<6} {}", v.code, v.name);
        for (code, description) in v.technologies {
            println!("    tech {code}: {description}");
        }
    }
    println!("Models: {}", catalog::MODELS.join(", "));
    println!("Scenarios: {}", catalog::SCENARIOS.join(", "));
    println!("Frequencies:");
    for (code, name) in catalog::FREQUENCIES {
        println!("  {code}  {name}");
    }
    println!("Countries:");
    for (code, name) in catalog::COUNTRIES {
        println!("  {code}  {name}");
    }
}

fn print_report(report: &LoadReport) {
    eprintln!(
        "{}: {} unit(s), {} cache hit(s), {} written, {}/{} file(s) read",
        report.variable,
        report.units,
        report.cache_hits,
        report.cache_writes,
        report.files_read,
        report.files_found,
    );
    for failed in &report.failed {
        eprintln!("  skipped {}: {}", failed.path.display(), failed.reason);
    }
    for unit in &report.empty_units {
        eprintln!("  no data for {} {} {}", unit.variable, unit.technology, unit.country);
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match (cli.verbose, cli.quiet) {
        (true, _) => "debug",
        (_, true) => "error",
        _ => "info",
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("failed to configure thread pool")?;
        info!(threads, "thread pool configured");
    }

    if matches!(cli.command, Command::Catalog) {
        print_catalog();
        return Ok(());
    }

    let settings = resolve_settings(&cli)?;
    let loader = Loader::new(settings);

    match cli.command {
        Command::Catalog => {}

        Command::Inventory { variable, json } => {
            let dir = loader.settings().dataset_dir();
            let inventory = explore(&dir, loader.schema(), variable.as_deref())?;
            if json {
                println!("{}", serde_json::to_string_pretty(&inventory)?);
            } else {
                for file in &inventory.files {
                    println!(
                        "{}\t{}\t{}\t{}\t{}",
                        file.variable,
                        file.model,
                        file.scenario,
                        file.technology,
                        file.path.display()
                    );
                }
                eprintln!(
                    "{} file(s); variables {:?}; models {:?}; scenarios {:?}",
                    inventory.files.len(),
                    inventory.variables,
                    inventory.models,
                    inventory.scenarios
                );
            }
        }

        Command::Load {
            variables,
            filters,
        } => {
            let request = filters.request(variables);
            let dataset = loader.load(&request).context("load failed")?;
            for report in &dataset.reports {
                print_report(report);
            }
        }

        Command::Events {
            variable,
            comparator,
            threshold,
            out,
            filters,
        } => {
            let threshold = threshold
                .or_else(|| catalog::default_threshold(&variable))
                .with_context(|| format!("no default threshold for '{variable}'; pass --threshold"))?;
            let request = filters.request(vec![variable.clone()]);
            let dataset = loader.load(&request).context("load failed")?;
            for report in &dataset.reports {
                print_report(report);
            }
            let cube = dataset
                .get(&variable)
                .with_context(|| format!("'{variable}' missing from the loaded dataset"))?;

            std::fs::create_dir_all(&out)
                .with_context(|| format!("cannot create {}", out.display()))?;
            for tech in cube.labels_of("tech").unwrap_or_default() {
                let slice = cube.select("tech", &[tech])?.squeeze();
                let flags = classify_cube(&slice, comparator, threshold);
                let table = extract_all(&flags)?;
                let counts = count_by_year(&table);

                let events_path = out.join(format!("events_{variable}_{tech}.csv"));
                let counts_path = out.join(format!("counts_{variable}_{tech}.csv"));
                write_csv(&mut events_frame(&table)?, &events_path)?;
                write_csv(&mut counts_frame(&counts)?, &counts_path)?;

                eprintln!(
                    "{variable} {tech} {comparator} {threshold}: {} event(s) in {} series ({} skipped), {} count row(s) -> {}",
                    table.len(),
                    table.series_scanned(),
                    table.series_skipped(),
                    counts.len(),
                    out.display()
                );
            }
        }
    }

    Ok(())
}
