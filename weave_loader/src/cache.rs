//! Derived-artifact cache.
//!
//! One Arrow IPC (`.feather`) file per load unit:
//! `{cache_root}/PECD{version}/{variable}_{tech}_{freq}-{stat}_{country}_PECD{version}.feather`.
//! Artifacts are written to a temporary file in the target directory and
//! then linked into place without overwriting, so concurrent writers of the
//! same unit end up with exactly one complete artifact.

use std::{
    fs::{self, File},
    io,
    path::{Path, PathBuf},
};

use polars_io::{SerReader, SerWriter, ipc::IpcReader, ipc::IpcWriter};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::{
    errors::LoadError,
    frequency::{Frequency, Statistic},
    io::{cube_to_frame, frame_to_cube},
    pivot::DataCube,
};

/// Extension of cache artifacts.
pub const ARTIFACT_EXTENSION: &str = "feather";

/// Everything that determines the content of one artifact.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub version: String,
    pub variable: String,
    pub technology: String,
    pub frequency: Frequency,
    pub statistic: Statistic,
    pub country: String,
}

impl CacheKey {
    /// File name of the artifact.
    pub fn file_name(&self) -> String {
        format!(
            "{}_{}_{}-{}_{}_PECD{}.{ARTIFACT_EXTENSION}",
            self.variable, self.technology, self.frequency, self.statistic, self.country, self.version
        )
    }

    /// Full artifact path below `cache_root`.
    pub fn path(&self, cache_root: &Path) -> PathBuf {
        cache_root
            .join(format!("PECD{}", self.version))
            .join(self.file_name())
    }
}

/// What [`Cache::write`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Written,
    /// Another writer got there first; its artifact was kept.
    AlreadyPresent,
}

#[derive(Debug, Clone)]
pub struct Cache {
    root: PathBuf,
}

impl Cache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Reads the artifact for `key`, if there is one.
    pub fn read(&self, key: &CacheKey) -> Result<Option<DataCube>, LoadError> {
        let path = key.path(&self.root);
        let file = match File::open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(LoadError::Read { path, source }),
        };
        let corrupt = |reason: String| LoadError::CorruptCache {
            path: path.clone(),
            reason,
        };
        let df = IpcReader::new(file)
            .finish()
            .map_err(|e| corrupt(e.to_string()))?;
        let cube = frame_to_cube(&df, &key.variable).map_err(|e| corrupt(e.to_string()))?;
        debug!(path = %path.display(), rows = df.height(), "cache hit");
        Ok(Some(cube))
    }

    /// Stores `cube` under `key` unless an artifact is already there.
    pub fn write(&self, key: &CacheKey, cube: &DataCube) -> Result<WriteOutcome, LoadError> {
        let path = key.path(&self.root);
        let write_err = |source: io::Error| LoadError::CacheWrite {
            path: path.clone(),
            source,
        };
        let dir = path
            .parent()
            .ok_or_else(|| LoadError::Configuration(format!("{} has no parent", path.display())))?;
        fs::create_dir_all(dir).map_err(write_err)?;

        let mut df = cube_to_frame(cube, &key.variable)?;
        let mut tmp = NamedTempFile::new_in(dir).map_err(write_err)?;
        IpcWriter::new(tmp.as_file_mut()).finish(&mut df)?;
        tmp.as_file().sync_all().map_err(write_err)?;

        match tmp.persist_noclobber(&path) {
            Ok(_) => {
                info!(path = %path.display(), rows = df.height(), "cache artifact written");
                Ok(WriteOutcome::Written)
            }
            Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => {
                debug!(path = %path.display(), "cache artifact already present");
                Ok(WriteOutcome::AlreadyPresent)
            }
            Err(e) => Err(write_err(e.error)),
        }
    }
}
