//! Entry-point resolution cache
//!
//! One JSON file per requested range, named `entry_points_{start}_{end}.json`,
//! holding the range it was computed for and the homepage → entry-point
//! mapping. A file is only reused when its embedded range equals the
//! requested range; every other cache file in the directory is deleted, so at
//! most one file exists after `load` or `store`.

use crate::cache::CacheError;
use crate::domains::DomainRange;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use url::Url;

/// Homepage URL (`https://{domain}`) → resolved entry point
pub type EntryPointMap = BTreeMap<String, Option<Url>>;

const FILE_PREFIX: &str = "entry_points_";
const FILE_SUFFIX: &str = ".json";

#[derive(Debug, Serialize, Deserialize)]
struct CacheFile {
    range: DomainRange,
    entries: EntryPointMap,
}

/// Directory-backed resolution cache
#[derive(Debug, Clone)]
pub struct ResolutionCache {
    dir: PathBuf,
}

impl ResolutionCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the cache file for a range
    pub fn path_for(&self, range: DomainRange) -> PathBuf {
        self.dir
            .join(format!("{}{}_{}{}", FILE_PREFIX, range.start, range.end, FILE_SUFFIX))
    }

    /// Loads the mapping computed for exactly `range`
    ///
    /// Cache files for any other range, and files whose embedded range does
    /// not match their name, are deleted. A corrupt file for the requested
    /// range is deleted and treated as a miss.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(map))` - A valid cache file for this range exists
    /// * `Ok(None)` - No usable cache; the caller resolves afresh
    /// * `Err(CacheError)` - The directory could not be read or cleaned
    pub fn load(&self, range: DomainRange) -> Result<Option<EntryPointMap>, CacheError> {
        let mut found = None;

        for path in self.cache_files()? {
            if found.is_none() && path == self.path_for(range) {
                match read_cache_file(&path) {
                    Ok(file) if file.range == range => {
                        found = Some(file.entries);
                        continue;
                    }
                    Ok(file) => tracing::warn!(
                        "Cache file {} records range {}, expected {}",
                        path.display(),
                        file.range,
                        range
                    ),
                    Err(e) => tracing::warn!("{}", e),
                }
            }

            tracing::info!("Removing stale resolution cache {}", path.display());
            remove_file(&path)?;
        }

        Ok(found)
    }

    /// Persists the mapping for `range`, replacing any existing cache file
    pub fn store(&self, range: DomainRange, entries: &EntryPointMap) -> Result<(), CacheError> {
        std::fs::create_dir_all(&self.dir).map_err(|e| CacheError::io(&self.dir, e))?;

        for path in self.cache_files()? {
            remove_file(&path)?;
        }

        let path = self.path_for(range);
        let file = CacheFile {
            range,
            entries: entries.clone(),
        };
        let json = serde_json::to_string_pretty(&file).map_err(|source| CacheError::Corrupt {
            path: path.display().to_string(),
            source,
        })?;
        std::fs::write(&path, json).map_err(|e| CacheError::io(&path, e))?;

        tracing::info!(
            "Stored {} entry points for range {} in {}",
            entries.len(),
            range,
            path.display()
        );
        Ok(())
    }

    /// Deletes every cache file in the directory
    pub fn clear(&self) -> Result<(), CacheError> {
        for path in self.cache_files()? {
            remove_file(&path)?;
        }
        Ok(())
    }

    /// Lists resolution cache files in the directory
    fn cache_files(&self) -> Result<Vec<PathBuf>, CacheError> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(CacheError::io(&self.dir, e)),
        };

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| CacheError::io(&self.dir, e))?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.starts_with(FILE_PREFIX) && name.ends_with(FILE_SUFFIX) {
                files.push(entry.path());
            }
        }
        files.sort();
        Ok(files)
    }
}

fn read_cache_file(path: &Path) -> Result<CacheFile, CacheError> {
    let content = std::fs::read_to_string(path).map_err(|e| CacheError::io(path, e))?;
    serde_json::from_str(&content).map_err(|source| CacheError::Corrupt {
        path: path.display().to_string(),
        source,
    })
}

fn remove_file(path: &Path) -> Result<(), CacheError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(CacheError::io(path, e)),
    }
}
