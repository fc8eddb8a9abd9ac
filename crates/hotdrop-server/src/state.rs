//! Application state.
//!
//! Shared state for all request handlers.

use std::sync::Arc;

use hotdrop_deploy::{DeployLocationCache, WorkspaceIndex};

use crate::live_reload::NotificationHub;

/// Application state shared across all handlers.
pub(crate) struct AppState {
    /// Connected browsers.
    pub(crate) hub: Arc<NotificationHub>,
    /// Known workspace applications.
    pub(crate) workspace: Arc<WorkspaceIndex>,
    /// Current deploy locations.
    pub(crate) locations: Arc<DeployLocationCache>,
    /// Application version reported by `/info`.
    pub(crate) version: String,
}
