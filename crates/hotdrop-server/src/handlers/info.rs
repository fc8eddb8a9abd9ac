//! Status endpoint.
//!
//! Reports connected browsers, workspace applications and deploy locations.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use chrono::{DateTime, Utc};
use hotdrop_deploy::{LogicalApplication, RuntimeLocation};
use serde::Serialize;

use crate::state::AppState;

/// Response for GET /info.
#[derive(Serialize)]
pub(crate) struct InfoResponse {
    version: String,
    /// Pages of connected browsers.
    clients: Vec<String>,
    applications: Vec<LogicalApplication>,
    /// Current runtime directory per logical name.
    locations: BTreeMap<String, RuntimeLocation>,
    server_time: DateTime<Utc>,
}

/// Handle GET /info.
pub(crate) async fn get_info(State(state): State<Arc<AppState>>) -> Json<InfoResponse> {
    Json(InfoResponse {
        version: state.version.clone(),
        clients: state.hub.client_urls(),
        applications: state.workspace.applications(),
        locations: state.locations.snapshot(),
        server_time: Utc::now(),
    })
}
