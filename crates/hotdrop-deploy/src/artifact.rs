//! Packaged web application artifacts (zip archives).

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use zip::ZipArchive;
use zip::result::ZipError;

use crate::error::DeployError;
use crate::properties::Properties;
use crate::xml;

/// Directory holding bundled libraries, inside artifacts and runtimes.
pub const LIBRARY_DIR: &str = "WEB-INF/lib/";

const PORTLET_DESCRIPTOR: &str = "WEB-INF/portlet.xml";
const PLUGIN_PACKAGE: &str = "WEB-INF/liferay-plugin-package.properties";

/// Values read from an artifact's descriptors.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ArtifactDescriptor {
    /// `portlet-name` entries of `WEB-INF/portlet.xml`.
    pub portlet_names: Vec<String>,
    /// Plugin display name from the plugin package properties.
    pub plugin_name: Option<String>,
    /// Libraries the portal provides to this application.
    pub portal_dependency_jars: Vec<String>,
}

/// An opened artifact archive.
pub struct Artifact {
    path: PathBuf,
    archive: ZipArchive<File>,
}

impl Artifact {
    /// Open an artifact for reading.
    pub fn open(path: &Path) -> Result<Self, DeployError> {
        let file = File::open(path).map_err(|e| DeployError::io(path, e))?;
        let archive = ZipArchive::new(file).map_err(|source| DeployError::Archive {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            archive,
        })
    }

    /// Path of the archive on disk.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read an entry as UTF-8 text; `None` if the entry does not exist.
    pub fn read_text(&mut self, name: &str) -> Result<Option<String>, DeployError> {
        let mut entry = match self.archive.by_name(name) {
            Ok(entry) => entry,
            Err(ZipError::FileNotFound) => return Ok(None),
            Err(source) => {
                return Err(DeployError::Archive {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        let mut text = String::new();
        entry
            .read_to_string(&mut text)
            .map_err(|e| DeployError::io(&self.path, e))?;
        Ok(Some(text))
    }

    /// CRC-32 of every file directly under `WEB-INF/lib/`, keyed by entry name.
    ///
    /// Checksums come from the archive's central directory.
    pub fn library_checksums(&mut self) -> Result<BTreeMap<String, u32>, DeployError> {
        let mut checksums = BTreeMap::new();
        for i in 0..self.archive.len() {
            let entry = self
                .archive
                .by_index_raw(i)
                .map_err(|source| DeployError::Archive {
                    path: self.path.clone(),
                    source,
                })?;
            let name = entry.name();
            let Some(file_name) = name.strip_prefix(LIBRARY_DIR) else {
                continue;
            };
            if file_name.is_empty() || file_name.contains('/') || entry.is_dir() {
                continue;
            }
            checksums.insert(name.to_owned(), entry.crc32());
        }
        Ok(checksums)
    }

    /// Plugin package properties; empty when the file is absent.
    pub fn plugin_properties(&mut self) -> Result<Properties, DeployError> {
        Ok(self
            .read_text(PLUGIN_PACKAGE)?
            .map(|text| Properties::parse(&text))
            .unwrap_or_default())
    }

    /// Read descriptor values. Missing descriptors yield empty fields.
    pub fn descriptor(&mut self) -> Result<ArtifactDescriptor, DeployError> {
        let portlet_names = match self.read_text(PORTLET_DESCRIPTOR)? {
            Some(text) => xml::texts_at(&text, &["portlet-app", "portlet", "portlet-name"])?,
            None => Vec::new(),
        };
        let properties = self.plugin_properties()?;

        Ok(ArtifactDescriptor {
            portlet_names,
            plugin_name: properties.get("name").map(str::to_owned),
            portal_dependency_jars: properties.get_list("portal-dependency-jars"),
        })
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use std::io::Write;
    use std::path::Path;

    use zip::ZipWriter;
    use zip::write::SimpleFileOptions;

    /// Write a zip archive with the given `(name, content)` entries.
    pub fn write_zip(path: &Path, entries: &[(&str, &[u8])]) {
        let file = std::fs::File::create(path).unwrap();
        let mut zip = ZipWriter::new(file);
        for (name, content) in entries {
            if name.ends_with('/') {
                zip.add_directory(*name, SimpleFileOptions::default()).unwrap();
            } else {
                zip.start_file(*name, SimpleFileOptions::default()).unwrap();
                zip.write_all(content).unwrap();
            }
        }
        zip.finish().unwrap();
    }
}
