//! Browser reload notifications.

use std::fmt;

/// What connected browsers should refresh.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReloadScope {
    /// Reload the whole page.
    All,
    /// Hot-swap a single resource, `<application>/<relative path>`.
    Resource(String),
}

impl ReloadScope {
    /// Path sent to clients; `*` for a full reload.
    pub fn as_path(&self) -> &str {
        match self {
            Self::All => "*",
            Self::Resource(path) => path,
        }
    }
}

impl fmt::Display for ReloadScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_path())
    }
}

/// Receiver of reload requests from deploys and source propagation.
pub trait ReloadNotifier: Send + Sync {
    /// Ask every connected client to reload.
    fn reload(&self, scope: ReloadScope);
}
