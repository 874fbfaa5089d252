use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::health::healthz;
use crate::state::AppState;
use crate::webhook::webhook_handler;

/// Builds the HTTP router: `webhook_path_prefix` defaults to `/webhook` and
/// is joined with the `{provider}` path segment, e.g. `/webhook/{provider}`.
pub fn router(state: AppState, webhook_path_prefix: &str) -> Router {
    let webhook_path = format!("{}/{{provider}}", webhook_path_prefix.trim_end_matches('/'));
    Router::new()
        .route(&webhook_path, post(webhook_handler))
        .route("/healthz", get(healthz))
        .with_state(Arc::new(state))
        .layer(TraceLayer::new_for_http())
}
