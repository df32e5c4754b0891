//! Where the source database and the cache live.
//!
//! [`Settings`] are resolved once from a chain of [`SettingsSource`]s,
//! highest priority first. Each field is taken from the first source that
//! supplies it:
//! - [`Explicit`] values (command-line flags, test fixtures)
//! - [`EnvSource`]: `WEAVE_SOURCE_ROOT`, `WEAVE_CACHE_ROOT`,
//!   `WEAVE_TRASH_ROOT`, `WEAVE_DATASET_VERSION`
//! - [`FileSource`]: a TOML file with per-host profiles
//!
//! A settings file looks like:
//! ```toml
//! [[profiles]]
//! name = "hpc"
//! host_suffix = "bullx"
//! source_root = "/perm/pecd"
//! cache_root = "/scratch/{user}"
//!
//! [[profiles]]
//! name = "local"
//! source_root = "/home/me/raw_data"
//! cache_root = "/home/me/cache_data"
//! ```
//! The first profile whose matcher accepts the host name wins; a profile
//! without a matcher accepts every host. `{user}` expands to the login name.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use shared_utils::{ConfigError, current_host, current_user, get_env_path, get_env_var};
use thiserror::Error;
use tracing::debug;

/// Dataset version used when no source names one.
pub const DEFAULT_DATASET_VERSION: &str = "4.2";

/// Environment variable for [`Settings::source_root`].
pub const ENV_SOURCE_ROOT: &str = "WEAVE_SOURCE_ROOT";
/// Environment variable for [`Settings::cache_root`].
pub const ENV_CACHE_ROOT: &str = "WEAVE_CACHE_ROOT";
/// Environment variable for [`Settings::trash_root`].
pub const ENV_TRASH_ROOT: &str = "WEAVE_TRASH_ROOT";
/// Environment variable for [`Settings::dataset_version`].
pub const ENV_DATASET_VERSION: &str = "WEAVE_DATASET_VERSION";

const USER_PLACEHOLDER: &str = "{user}";

/// Errors raised while resolving [`Settings`].
#[derive(Debug, Error)]
pub enum SettingsError {
    /// No source supplied a required field.
    #[error("Missing setting: {0}")]
    Missing(&'static str),

    /// The settings file could not be read.
    #[error("Cannot read settings file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The settings file is not valid TOML for [`SettingsFile`].
    #[error("Cannot parse settings file {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// A path uses `{user}` but the login name is unknown.
    #[error("Profile '{profile}' uses {{user}} but the current user is unknown")]
    UnknownUser { profile: String },

    /// Two profiles share a name.
    #[error("Duplicate settings profile: {0}")]
    DuplicateProfile(String),

    /// An environment variable is set but unusable.
    #[error(transparent)]
    Env(#[from] ConfigError),
}

/// Fully resolved locations and dataset version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Root of the flat-file database; files live under `PECD{version}/`.
    pub source_root: PathBuf,
    /// Root of the cache store.
    pub cache_root: PathBuf,
    /// Holding area for discarded raw source archives. Cache artifacts are
    /// write-once and never moved here.
    pub trash_root: PathBuf,
    /// Dataset version, e.g. `"4.2"`.
    pub dataset_version: String,
}

/// Any subset of the settings fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialSettings {
    pub source_root: Option<PathBuf>,
    pub cache_root: Option<PathBuf>,
    pub trash_root: Option<PathBuf>,
    pub dataset_version: Option<String>,
}

impl PartialSettings {
    /// Fills every field still unset from `other`.
    fn or(self, other: PartialSettings) -> Self {
        Self {
            source_root: self.source_root.or(other.source_root),
            cache_root: self.cache_root.or(other.cache_root),
            trash_root: self.trash_root.or(other.trash_root),
            dataset_version: self.dataset_version.or(other.dataset_version),
        }
    }
}

/// One strategy for supplying settings fields.
pub trait SettingsSource {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// The fields this source knows about.
    fn partial(&self) -> Result<PartialSettings, SettingsError>;
}

/// Values given directly by the caller.
#[derive(Debug, Clone, Default)]
pub struct Explicit(pub PartialSettings);

impl SettingsSource for Explicit {
    fn name(&self) -> &str {
        "explicit"
    }

    fn partial(&self) -> Result<PartialSettings, SettingsError> {
        Ok(self.0.clone())
    }
}

/// Reads the `WEAVE_*` environment variables.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvSource;

fn optional_env<T>(name: &str, read: fn(&str) -> Result<T, ConfigError>) -> Option<T> {
    match read(name) {
        Ok(v) => Some(v),
        Err(ConfigError::MissingEnvVar(_)) => None,
        Err(ConfigError::EmptyEnvVar(_)) => {
            debug!(name, "ignoring empty environment variable");
            None
        }
    }
}

impl SettingsSource for EnvSource {
    fn name(&self) -> &str {
        "environment"
    }

    fn partial(&self) -> Result<PartialSettings, SettingsError> {
        Ok(PartialSettings {
            source_root: optional_env(ENV_SOURCE_ROOT, get_env_path),
            cache_root: optional_env(ENV_CACHE_ROOT, get_env_path),
            trash_root: optional_env(ENV_TRASH_ROOT, get_env_path),
            dataset_version: optional_env(ENV_DATASET_VERSION, get_env_var)
                .map(|v| v.trim().to_string()),
        })
    }
}

/// A host profile in the settings file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostProfile {
    /// Profile name, unique within the file.
    pub name: String,
    /// Matches hosts whose name starts with this.
    pub host_prefix: Option<String>,
    /// Matches hosts whose name ends with this.
    pub host_suffix: Option<String>,
    /// Fields supplied when the profile matches.
    #[serde(flatten)]
    pub fields: PartialSettings,
}

impl HostProfile {
    /// `true` if the profile applies to `host`. A profile with no matcher
    /// applies everywhere; with both, both must hold.
    ///
    /// The host comes from [`current_host`], which outside Linux only knows
    /// `HOSTNAME`. With no host, only matcher-free profiles apply; use
    /// [`FileSource::with_host`] to pick one explicitly.
    pub fn matches(&self, host: Option<&str>) -> bool {
        let prefix_ok = self
            .host_prefix
            .as_deref()
            .is_none_or(|p| host.is_some_and(|h| h.starts_with(p)));
        let suffix_ok = self
            .host_suffix
            .as_deref()
            .is_none_or(|s| host.is_some_and(|h| h.ends_with(s)));
        prefix_ok && suffix_ok
    }
}

/// Parsed settings file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsFile {
    /// Profiles in priority order.
    #[serde(default)]
    pub profiles: Vec<HostProfile>,
}

impl SettingsFile {
    /// Parses and normalizes a settings file from a TOML string.
    ///
    /// Profile names and matchers are trimmed; empty matchers are dropped.
    pub fn from_toml_str(text: &str, path: &Path) -> Result<Self, SettingsError> {
        let mut file: SettingsFile = toml::from_str(text).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        let mut seen = std::collections::HashSet::new();
        for p in &mut file.profiles {
            p.name = p.name.trim().to_string();
            p.host_prefix = p.host_prefix.take().map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
            p.host_suffix = p.host_suffix.take().map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
            if !seen.insert(p.name.clone()) {
                return Err(SettingsError::DuplicateProfile(p.name.clone()));
            }
        }
        Ok(file)
    }

    /// Reads a settings file from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text, path)
    }

    /// The first profile applying to `host`.
    pub fn profile_for(&self, host: Option<&str>) -> Option<&HostProfile> {
        self.profiles.iter().find(|p| p.matches(host))
    }
}

/// Settings from a TOML file, picked by host name.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
    host: Option<String>,
    user: Option<String>,
}

impl FileSource {
    /// A file source for the current machine and user.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            host: current_host(),
            user: current_user(),
        }
    }

    /// Overrides the host name used to pick a profile.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Overrides the user name substituted for `{user}`.
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    fn expand(&self, profile: &str, path: Option<PathBuf>) -> Result<Option<PathBuf>, SettingsError> {
        let Some(path) = path else {
            return Ok(None);
        };
        let text = path.to_string_lossy();
        if !text.contains(USER_PLACEHOLDER) {
            return Ok(Some(path));
        }
        let user = self.user.as_deref().ok_or_else(|| SettingsError::UnknownUser {
            profile: profile.to_string(),
        })?;
        Ok(Some(PathBuf::from(text.replace(USER_PLACEHOLDER, user))))
    }
}

impl SettingsSource for FileSource {
    fn name(&self) -> &str {
        "file"
    }

    fn partial(&self) -> Result<PartialSettings, SettingsError> {
        let file = SettingsFile::load(&self.path)?;
        let Some(profile) = file.profile_for(self.host.as_deref()) else {
            debug!(host = ?self.host, path = %self.path.display(), "no settings profile matches");
            return Ok(PartialSettings::default());
        };
        debug!(profile = %profile.name, host = ?self.host, "settings profile selected");
        let fields = profile.fields.clone();
        Ok(PartialSettings {
            source_root: self.expand(&profile.name, fields.source_root)?,
            cache_root: self.expand(&profile.name, fields.cache_root)?,
            trash_root: self.expand(&profile.name, fields.trash_root)?,
            dataset_version: fields.dataset_version,
        })
    }
}

impl Settings {
    /// Resolves settings field by field from `sources`, highest priority
    /// first.
    pub fn resolve(sources: &[&dyn SettingsSource]) -> Result<Self, SettingsError> {
        let mut merged = PartialSettings::default();
        for source in sources {
            let partial = source.partial()?;
            debug!(source = source.name(), ?partial, "settings source read");
            merged = merged.or(partial);
        }
        Self::from_partial(merged)
    }

    /// Completes a partial set of fields with the defaults.
    pub fn from_partial(partial: PartialSettings) -> Result<Self, SettingsError> {
        let source_root = partial.source_root.ok_or(SettingsError::Missing("source_root"))?;
        let cache_root = partial.cache_root.ok_or(SettingsError::Missing("cache_root"))?;
        let trash_root = partial.trash_root.unwrap_or_else(|| cache_root.join("trash"));
        let dataset_version = partial
            .dataset_version
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_DATASET_VERSION.to_string());
        Ok(Self {
            source_root,
            cache_root,
            trash_root,
            dataset_version,
        })
    }

    /// Settings rooted in two directories, with every other field defaulted.
    pub fn with_roots(source_root: impl Into<PathBuf>, cache_root: impl Into<PathBuf>) -> Self {
        let cache_root = cache_root.into();
        Self {
            source_root: source_root.into(),
            trash_root: cache_root.join("trash"),
            cache_root,
            dataset_version: DEFAULT_DATASET_VERSION.to_string(),
        }
    }

    /// Directory holding the CSV files of the configured dataset version.
    pub fn dataset_dir(&self) -> PathBuf {
        self.source_root.join(format!("PECD{}", self.dataset_version))
    }
}
