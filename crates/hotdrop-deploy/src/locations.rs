//! Latest runtime directory per logical application name.
//!
//! The servlet container keeps applications in two places: a staged area
//! holding one extracted copy per deploy (`<n>-<name>`), and the published
//! area holding one directory per application. Each is rescanned on its
//! own and swapped in whole, so readers always see a complete map.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::time::{Instant, SystemTime};

use serde::Serialize;

use crate::error::ScanError;

/// Where a runtime location was discovered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationSource {
    /// Per-deploy extraction area.
    Staged,
    /// Published applications directory.
    Published,
}

/// Live directory of an application.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RuntimeLocation {
    /// Directory path.
    pub path: PathBuf,
    /// Which scan reported it.
    pub source: LocationSource,
}

type LocationMap = HashMap<String, PathBuf>;

/// Thread-safe cache of runtime locations.
///
/// Staged entries take precedence over published ones regardless of the
/// order in which the two maps were refreshed.
pub struct DeployLocationCache {
    staged_dir: PathBuf,
    published_dir: PathBuf,
    staged: RwLock<Arc<LocationMap>>,
    published: RwLock<Arc<LocationMap>>,
}

impl DeployLocationCache {
    /// Create an empty cache over the given directories.
    pub fn new(staged_dir: PathBuf, published_dir: PathBuf) -> Self {
        Self {
            staged_dir,
            published_dir,
            staged: RwLock::new(Arc::new(HashMap::new())),
            published: RwLock::new(Arc::new(HashMap::new())),
        }
    }

    /// Staged area being scanned.
    pub fn staged_dir(&self) -> &Path {
        &self.staged_dir
    }

    /// Published area being scanned.
    pub fn published_dir(&self) -> &Path {
        &self.published_dir
    }

    /// Rescan both areas.
    pub fn rescan(&self) {
        self.rescan_staged();
        self.rescan_published();
    }

    /// Rescan the staged area and replace its map.
    ///
    /// A failed scan leaves an empty map.
    pub fn rescan_staged(&self) {
        let start = Instant::now();
        let map = scan_staged(&self.staged_dir).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Staged scan failed");
            HashMap::new()
        });
        let count = map.len();
        *self.staged.write().unwrap() = Arc::new(map);
        tracing::debug!(count, elapsed_ms = start.elapsed().as_millis(), "Staged locations rescanned");
    }

    /// Rescan the published area and replace its map.
    ///
    /// A failed scan leaves an empty map.
    pub fn rescan_published(&self) {
        let start = Instant::now();
        let map = scan_published(&self.published_dir).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Published scan failed");
            HashMap::new()
        });
        let count = map.len();
        *self.published.write().unwrap() = Arc::new(map);
        tracing::debug!(count, elapsed_ms = start.elapsed().as_millis(), "Published locations rescanned");
    }

    /// Current location of `name`: staged, else published, else `None`.
    pub fn locate(&self, name: &str) -> Option<RuntimeLocation> {
        let staged = Arc::clone(&self.staged.read().unwrap());
        if let Some(path) = staged.get(name) {
            return Some(RuntimeLocation {
                path: path.clone(),
                source: LocationSource::Staged,
            });
        }
        let published = Arc::clone(&self.published.read().unwrap());
        published.get(name).map(|path| RuntimeLocation {
            path: path.clone(),
            source: LocationSource::Published,
        })
    }

    /// Merged table of every known name.
    pub fn snapshot(&self) -> BTreeMap<String, RuntimeLocation> {
        let staged = Arc::clone(&self.staged.read().unwrap());
        let published = Arc::clone(&self.published.read().unwrap());

        let mut merged: BTreeMap<String, RuntimeLocation> = published
            .iter()
            .map(|(name, path)| {
                let location = RuntimeLocation {
                    path: path.clone(),
                    source: LocationSource::Published,
                };
                (name.clone(), location)
            })
            .collect();
        for (name, path) in staged.iter() {
            let location = RuntimeLocation {
                path: path.clone(),
                source: LocationSource::Staged,
            };
            merged.insert(name.clone(), location);
        }
        merged
    }
}

/// Immediate subdirectories of `dir` with their modification times.
fn subdirectories(dir: &Path) -> Result<Vec<(String, PathBuf, SystemTime)>, ScanError> {
    let to_error = |source| ScanError {
        path: dir.to_path_buf(),
        source,
    };

    let mut found = Vec::new();
    for entry in fs::read_dir(dir).map_err(to_error)? {
        let entry = entry.map_err(to_error)?;
        let path = entry.path();
        let Ok(metadata) = fs::metadata(&path) else {
            continue;
        };
        if !metadata.is_dir() {
            continue;
        }
        let mtime = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        found.push((entry.file_name().to_string_lossy().into_owned(), path, mtime));
    }
    Ok(found)
}

/// `<prefix>-<name>` directories; latest mtime per name, ties to the greatest path.
fn scan_staged(dir: &Path) -> Result<LocationMap, ScanError> {
    let mut latest: HashMap<String, (SystemTime, PathBuf)> = HashMap::new();

    for (dir_name, path, mtime) in subdirectories(dir)? {
        let Some((_, name)) = dir_name.split_once('-') else {
            continue;
        };
        let candidate = (mtime, path);
        match latest.get(name) {
            Some(current) if *current >= candidate => {}
            _ => {
                latest.insert(name.to_owned(), candidate);
            }
        }
    }

    Ok(latest
        .into_iter()
        .map(|(name, (_, path))| (name, path))
        .collect())
}

fn scan_published(dir: &Path) -> Result<LocationMap, ScanError> {
    Ok(subdirectories(dir)?
        .into_iter()
        .map(|(name, path, _)| (name, path))
        .collect())
}
