//! Loading the PECD flat-file database into labeled cubes.
//!
//! Source CSV files are discovered by their positional file names, read,
//! resampled and pivoted into one [`DataCube`] per variable. Every
//! (country, variable, technology) unit is cached as an Arrow IPC artifact
//! so that later loads are bit-identical without touching the sources.

pub mod cache;
pub mod catalog;
pub mod discover;
pub mod errors;
pub mod filename;
pub mod frequency;
pub mod io;
pub mod loader;
pub mod pivot;
pub mod reader;
pub mod settings;

pub use cache::{Cache, CacheKey, WriteOutcome};
pub use discover::{Filters, Inventory, discover, explore};
pub use errors::LoadError;
pub use filename::{FilenameSchema, SourceFile};
pub use frequency::{Frequency, Statistic};
pub use loader::{ALL_COUNTRIES, Dataset, FailedFile, LoadReport, LoadRequest, Loader, Unit};
pub use pivot::{DIMS, DataCube};
pub use settings::{EnvSource, Explicit, FileSource, PartialSettings, Settings, SettingsError, SettingsSource};
