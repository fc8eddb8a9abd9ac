//! Server error types.

use std::path::PathBuf;

use hotdrop_watch::WatchError;

/// Failure starting or running the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Filesystem watching could not start.
    #[error("Failed to start watcher: {0}")]
    Watch(#[from] WatchError),

    /// A required directory could not be prepared.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The dispatcher thread could not be started.
    #[error("Failed to start dispatcher: {0}")]
    Spawn(#[source] std::io::Error),

    /// The listening socket could not be bound.
    #[error("Failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// The HTTP server stopped with an error.
    #[error("Server error: {0}")]
    Serve(#[source] std::io::Error),
}

/// Malformed live reload message.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("Malformed message: {0}")]
    Malformed(#[from] serde_json::Error),
}
