//! Router construction.
//!
//! Builds the axum router with all routes and middleware.

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::live_reload;
use crate::state::AppState;

/// Create the application router.
pub(crate) fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/livereload", get(live_reload::ws_handler))
        .route("/forcereload", get(handlers::reload::force_reload))
        .route("/info", get(handlers::info::get_info))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
