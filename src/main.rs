//! afkbot daemon entry point.
//!
//! Starts the connection supervisor and the web status server, then waits
//! for ctrl-c. Connection failures never stop the process; the supervisor
//! retries forever. The only exit path is the shutdown signal, which closes
//! the session best-effort and exits with status 0.
//!
//! Environment variables: see `AppConfig::from_env`.

use std::sync::Arc;
use tracing::{error, info};

use afkbot::client::NetConnector;
use afkbot::{web, AppConfig, AppState, Supervisor};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _guard = afkbot::init_logging();

    info!("Starting afkbot");
    if let Some(dir) = afkbot::log_dir() {
        info!("Log files saved to: {}", dir.display());
    }

    let config = AppConfig::from_env();
    info!(
        "Target server {}:{} as {} (keepalive {}ms, reconnect {}ms)",
        config.host,
        config.port,
        config.username,
        config.keepalive_interval.as_millis(),
        config.reconnect_delay.as_millis()
    );

    let state = Arc::new(AppState::new(config.clone()));

    let supervisor = Supervisor::new(
        NetConnector::new(),
        &config,
        state.session.clone(),
        state.shutdown.clone(),
    );
    let supervisor_task = supervisor.start();

    let web_task = tokio::spawn(web::start_server(state.clone(), config.web_port));

    // Signal shutdown exits 0; a web server that never came up (or died)
    // exits non-zero so monitors can tell the two apart.
    let mut outcome: anyhow::Result<()> = Ok(());
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received - closing session");
        }
        result = web_task => {
            // The web server only returns early on a bind/serve error.
            outcome = match result {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => Err(e),
                Err(e) => Err(anyhow::anyhow!("web server task panicked: {}", e)),
            };
            if let Err(e) = &outcome {
                error!("Web server failed: {}", e);
            }
        }
    }

    state.shutdown.cancel();
    // Best-effort close; the quit is not awaited beyond the supervisor's
    // own unwinding.
    let _ = supervisor_task.await;

    info!("afkbot stopped");
    outcome
}
