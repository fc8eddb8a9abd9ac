//! Library comparison between an artifact and its running copy.
//!
//! Decides whether a new artifact can simply be published over the
//! running application or whether the old one must be undeployed first
//! because its bundled libraries differ.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

use serde::Serialize;

use crate::artifact::{Artifact, LIBRARY_DIR};
use crate::error::DeployError;

/// Framework libraries always provided by the portal.
pub const DEFAULT_EXEMPT_LIBRARIES: &[&str] = &["util-taglib.jar", "util-java.jar", "util-bridges.jar"];

/// Classification of a single library.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LibraryStatus {
    /// Same checksum in artifact and runtime.
    Unchanged,
    /// In both, with different content.
    Outdated,
    /// Only in the artifact.
    Missing,
    /// Only in the runtime.
    Lingering,
    /// Provided by the portal; never compared.
    Exempt,
}

impl LibraryStatus {
    /// Whether this status forces an undeploy before publishing.
    pub fn forces_redeploy(self) -> bool {
        matches!(self, Self::Outdated | Self::Lingering)
    }
}

/// Result of a library comparison.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct LibraryDiff {
    /// Whether the running copy must be undeployed first.
    pub needs_redeploy: bool,
    /// Status per library, keyed by `WEB-INF/lib/<file>`.
    pub entries: BTreeMap<String, LibraryStatus>,
}

impl LibraryDiff {
    /// Libraries with the given status.
    pub fn with_status(&self, status: LibraryStatus) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(move |(_, s)| **s == status)
            .map(|(name, _)| name.as_str())
    }
}

/// Compares artifact libraries against a runtime directory.
#[derive(Debug, Clone)]
pub struct DependencyDiffer {
    exempt: Vec<String>,
}

impl Default for DependencyDiffer {
    fn default() -> Self {
        Self::new(DEFAULT_EXEMPT_LIBRARIES.iter().map(|s| (*s).to_owned()).collect())
    }
}

impl DependencyDiffer {
    /// Create a differ with the given fixed exempt library names.
    pub fn new(exempt: Vec<String>) -> Self {
        Self { exempt }
    }

    /// Compare `artifact` with the application exploded at `runtime_dir`.
    ///
    /// Only `runtime_dir/WEB-INF/lib` is inspected; a missing library
    /// directory means every artifact library is `missing`.
    pub fn diff(&self, artifact: &Path, runtime_dir: &Path) -> Result<LibraryDiff, DeployError> {
        let runtime = runtime_checksums(&runtime_dir.join(LIBRARY_DIR))?;

        let mut artifact = Artifact::open(artifact)?;
        let mut exempt: HashSet<String> = self.exempt.iter().cloned().collect();
        exempt.extend(
            artifact
                .plugin_properties()?
                .get_list("portal-dependency-jars"),
        );
        let bundled = artifact.library_checksums()?;

        let is_exempt = |key: &str| {
            key.strip_prefix(LIBRARY_DIR)
                .is_some_and(|name| exempt.contains(name))
        };

        let mut entries = BTreeMap::new();
        for (key, crc) in &bundled {
            let status = if is_exempt(key) {
                LibraryStatus::Exempt
            } else {
                match runtime.get(key) {
                    None => LibraryStatus::Missing,
                    Some(Some(running)) if running == crc => LibraryStatus::Unchanged,
                    // Different checksum, or a directory in the runtime
                    Some(_) => LibraryStatus::Outdated,
                }
            };
            entries.insert(key.clone(), status);
        }
        for key in runtime.keys() {
            if !bundled.contains_key(key) {
                let status = if is_exempt(key) {
                    LibraryStatus::Exempt
                } else {
                    LibraryStatus::Lingering
                };
                entries.insert(key.clone(), status);
            }
        }

        for (key, status) in &entries {
            match status {
                LibraryStatus::Missing => tracing::info!(library = %key, "Library is missing"),
                LibraryStatus::Outdated => tracing::info!(library = %key, "Library is out of date"),
                LibraryStatus::Lingering => tracing::info!(library = %key, "Library is lingering"),
                LibraryStatus::Unchanged | LibraryStatus::Exempt => {
                    tracing::debug!(library = %key, ?status, "Library checked");
                }
            }
        }

        let needs_redeploy = entries.values().any(|status| status.forces_redeploy());
        Ok(LibraryDiff {
            needs_redeploy,
            entries,
        })
    }
}

/// Checksums of the entries of a runtime library directory.
///
/// Directories have no checksum (`None`).
fn runtime_checksums(lib_dir: &Path) -> Result<BTreeMap<String, Option<u32>>, DeployError> {
    let mut checksums = BTreeMap::new();
    let entries = match fs::read_dir(lib_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(checksums),
        Err(e) => return Err(DeployError::io(lib_dir, e)),
    };

    for entry in entries {
        let entry = entry.map_err(|e| DeployError::io(lib_dir, e))?;
        let path = entry.path();
        let key = format!("{LIBRARY_DIR}{}", entry.file_name().to_string_lossy());
        if path.is_file() {
            let bytes = fs::read(&path).map_err(|e| DeployError::io(&path, e))?;
            checksums.insert(key, Some(crc32fast::hash(&bytes)));
        } else {
            checksums.insert(key, None);
        }
    }
    Ok(checksums)
}
