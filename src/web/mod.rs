//! Web status server.
//!
//! An axum server exposing the two read-only endpoints external monitors
//! poll. It never mutates supervisor state and never returns an error
//! status; a missing session is a normal, reportable condition.

pub mod routes;

use std::sync::Arc;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::AppState;

/// Build the complete axum router.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    routes::api_router(state).layer(cors)
}

/// Start the web server on the given port. Runs until the shutdown token
/// fires.
pub async fn start_server(state: Arc<AppState>, port: u16) -> anyhow::Result<()> {
    let shutdown = state.shutdown.clone();
    let app = build_router(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    info!("Web status server listening on http://0.0.0.0:{}", port);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AppConfig;

    #[tokio::test]
    async fn bind_failure_surfaces_as_an_error() {
        let occupied = std::net::TcpListener::bind("0.0.0.0:0").unwrap();
        let port = occupied.local_addr().unwrap().port();

        let state = Arc::new(AppState::new(AppConfig::default()));
        let result = start_server(state, port).await;
        assert!(result.is_err(), "binding an occupied port must fail");
    }
}

