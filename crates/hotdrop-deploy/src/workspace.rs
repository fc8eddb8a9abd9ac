//! Workspace projects and the names they deploy under.
//!
//! Every directory holding a `pom.xml` is a project. Its deployed name is
//! the `artifactId`, with `-<version>` appended unless the id already
//! carries a plugin-type suffix.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::time::Instant;

use serde::Serialize;

use crate::error::DeployError;
use crate::xml;

/// Project descriptor file name.
pub const PROJECT_DESCRIPTOR: &str = "pom.xml";

/// Directory names never descended into.
const SKIPPED_DIRS: &[&str] = &[".svn", ".git", "target", ".metadata", ".settings", "src", "Servers"];

/// Plugin-type suffixes that deploy without a version.
const UNVERSIONED_SUFFIXES: &[&str] = &["portlet", "hook", "theme", "web", "layouttpl"];

/// A workspace project.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LogicalApplication {
    /// Deployed name.
    pub name: String,
    /// Project directory (the one holding `pom.xml`).
    pub source_root: PathBuf,
}

/// Deployed name from a project descriptor, `None` without an `artifactId`.
pub fn application_name(pom: &str) -> Result<Option<String>, DeployError> {
    let Some(artifact_id) = xml::text_at(pom, &["project", "artifactId"])? else {
        return Ok(None);
    };
    if UNVERSIONED_SUFFIXES
        .iter()
        .any(|suffix| artifact_id.ends_with(&format!("-{suffix}")))
    {
        return Ok(Some(artifact_id));
    }

    let version = match xml::text_at(pom, &["project", "version"])? {
        Some(version) => Some(version),
        None => xml::text_at(pom, &["project", "parent", "version"])?,
    };
    Ok(Some(match version {
        Some(version) => format!("{artifact_id}-{version}"),
        None => artifact_id,
    }))
}

/// Find every project below `root`.
pub fn scan_workspace(root: &Path) -> Vec<LogicalApplication> {
    let mut found = Vec::new();
    scan_dir(root, &mut found);
    found.sort_by(|a, b| a.source_root.cmp(&b.source_root));
    found
}

fn scan_dir(dir: &Path, found: &mut Vec<LogicalApplication>) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(path = %dir.display(), error = %e, "Failed to read workspace directory");
            return;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        let file_name = entry.file_name();
        let file_name = file_name.to_string_lossy();

        if file_type.is_dir() {
            if !SKIPPED_DIRS.contains(&&*file_name) {
                scan_dir(&path, found);
            }
        } else if file_name == PROJECT_DESCRIPTOR {
            match read_project(&path) {
                Ok(Some(name)) => found.push(LogicalApplication {
                    name,
                    source_root: dir.to_path_buf(),
                }),
                Ok(None) => {
                    tracing::debug!(path = %path.display(), "Descriptor without artifactId");
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Unreadable project descriptor");
                }
            }
        }
    }
}

fn read_project(pom: &Path) -> Result<Option<String>, DeployError> {
    let text = fs::read_to_string(pom).map_err(|e| DeployError::io(pom, e))?;
    application_name(&text)
}

/// Source root to application name mapping, replaced whole on rescan.
pub struct WorkspaceIndex {
    root: PathBuf,
    applications: RwLock<Arc<HashMap<PathBuf, String>>>,
}

impl WorkspaceIndex {
    /// Create an empty index over `root`; call [`rescan`](Self::rescan) to fill it.
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            applications: RwLock::new(Arc::new(HashMap::new())),
        }
    }

    /// Workspace root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Rescan the workspace and replace the mapping.
    pub fn rescan(&self) {
        let start = Instant::now();
        let map: HashMap<PathBuf, String> = scan_workspace(&self.root)
            .into_iter()
            .map(|app| (app.source_root, app.name))
            .collect();
        let count = map.len();
        *self.applications.write().unwrap() = Arc::new(map);
        tracing::info!(
            count,
            elapsed_ms = start.elapsed().as_millis(),
            "Workspace scanned"
        );
    }

    /// Application name for a project directory.
    pub fn lookup(&self, source_root: &Path) -> Option<String> {
        self.applications.read().unwrap().get(source_root).cloned()
    }

    /// Every known application, ordered by source root.
    pub fn applications(&self) -> Vec<LogicalApplication> {
        let map = Arc::clone(&self.applications.read().unwrap());
        let mut apps: Vec<LogicalApplication> = map
            .iter()
            .map(|(source_root, name)| LogicalApplication {
                name: name.clone(),
                source_root: source_root.clone(),
            })
            .collect();
        apps.sort_by(|a, b| a.source_root.cmp(&b.source_root));
        apps
    }
}
