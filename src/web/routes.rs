//! HTTP route handlers for the status server.

use std::sync::Arc;
use axum::{extract::Extension, routing::get, Json, Router};
use serde::Serialize;

use crate::AppState;

/// Build the API router with both endpoints.
pub fn api_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .layer(Extension(state))
}

/// Static acknowledgement that the process is up, independent of session state.
async fn root() -> &'static str {
    "OK - AFK bot process is running.\n"
}

#[derive(Debug, Serialize)]
struct Health {
    alive: bool,
    username: Option<String>,
}

/// Liveness of the supervised session. Always 200; `alive` is true iff a
/// session is present and reports a resolvable position.
async fn health(Extension(state): Extension<Arc<AppState>>) -> Json<Health> {
    let session = state.session.read();
    let (alive, username) = match session.as_ref() {
        Some(handle) => (
            handle.position().is_some(),
            Some(handle.username().to_string()),
        ),
        None => (false, None),
    };
    Json(Health { alive, username })
}
