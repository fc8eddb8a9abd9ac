//! Error types for deployment and change propagation.

use std::path::PathBuf;
use std::time::Duration;

/// Error reading an artifact or running a deploy step.
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    /// A log signal did not appear within its budget.
    #[error("Timed out after {}s waiting for {signal:?}", waited.as_secs())]
    Timeout {
        /// Pattern that was being waited for.
        signal: String,
        /// Time spent waiting.
        waited: Duration,
    },

    /// Filesystem operation failed.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Artifact is not a readable zip archive.
    #[error("Invalid archive {}: {source}", path.display())]
    Archive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    /// Descriptor XML could not be parsed.
    #[error("XML parse error")]
    Xml(#[from] quick_xml::Error),

    /// Descriptor XML used an unsupported encoding.
    #[error("XML encoding error")]
    Encoding(#[from] quick_xml::encoding::EncodingError),

    /// Signal template produced an invalid pattern.
    #[error("Invalid signal pattern: {0}")]
    Pattern(#[from] regex::Error),
}

impl DeployError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Error listing a runtime directory.
#[derive(Debug, thiserror::Error)]
#[error("Failed to scan {}: {source}", path.display())]
pub struct ScanError {
    /// Directory being scanned.
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

/// Error compiling a style sheet.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    /// Compiler could not be started.
    #[error("Failed to run {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    /// Compiler reported an error.
    #[error("{command} failed: {stderr}")]
    Failed { command: String, stderr: String },
    /// Compiler output was not UTF-8.
    #[error("{command} produced invalid UTF-8 output")]
    Output { command: String },
}

/// Error propagating a source change.
#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    /// Style compilation failed; nothing was copied.
    #[error("Compilation of {} failed: {source}", path.display())]
    Compile {
        path: PathBuf,
        #[source]
        source: CompileError,
    },
    /// Copy into the runtime failed.
    #[error("Failed to copy {} to {}: {source}", from.display(), to.display())]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
