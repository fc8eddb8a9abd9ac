//! Forced reload endpoint.

use std::sync::Arc;

use axum::extract::{Query, State};
use hotdrop_deploy::ReloadScope;
use serde::Deserialize;

use crate::state::AppState;

/// Query of GET /forcereload.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ForceReloadQuery {
    /// Resource to reload; whole page when absent.
    path: Option<String>,
}

impl ForceReloadQuery {
    fn scope(self) -> ReloadScope {
        match self.path {
            Some(path) if !path.is_empty() && path != "*" => ReloadScope::Resource(path),
            _ => ReloadScope::All,
        }
    }
}

/// Handle GET /forcereload.
pub(crate) async fn force_reload(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ForceReloadQuery>,
) -> &'static str {
    state.hub.broadcast(&query.scope());
    "ok"
}
