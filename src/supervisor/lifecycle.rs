//! Connection lifecycle supervisor.
//!
//! One session at a time: connect, supervise its event stream, tear down,
//! wait a fixed delay, reconnect. Retries forever with the same options and
//! the same delay - the remote is assumed to be either up or down, so there
//! is deliberately no backoff growth and no attempt limit.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::client::{ClientEvent, ClientSession, ConnectOptions, Connector, SessionHandle};
use crate::AppConfig;

use super::keepalive;

/// Delay between spawn and the scripted login command, for servers that
/// gate chat and movement behind a post-connect login plugin.
const LOGIN_DELAY: Duration = Duration::from_secs(1);

/// Shared read-only view of the current session. The supervisor is the only
/// writer; the web layer reads it per request.
pub type SessionView = Arc<RwLock<Option<SessionHandle>>>;

/// Why a supervised session stopped.
enum Stop {
    /// Session over; schedule a reconnect.
    Reconnect,
    /// Shutdown requested; unwind without reconnecting.
    Shutdown,
}

/// Supervises the lifecycle of the single bot session.
pub struct Supervisor<C: Connector> {
    connector: C,
    options: ConnectOptions,
    keepalive_interval: Duration,
    pulse_duration: Duration,
    reconnect_delay: Duration,
    session: SessionView,
    shutdown: CancellationToken,
}

impl<C: Connector> Supervisor<C> {
    pub fn new(
        connector: C,
        config: &AppConfig,
        session: SessionView,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            connector,
            options: config.connect_options(),
            keepalive_interval: config.keepalive_interval,
            pulse_duration: config.pulse_duration,
            reconnect_delay: config.reconnect_delay,
            session,
            shutdown,
        }
    }

    /// Spawn the supervision loop. Runs until the shutdown token fires.
    pub fn start(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// The supervision loop: connect, supervise, back off, repeat.
    pub async fn run(self) {
        loop {
            info!(
                "Connecting to {}:{} as {}",
                self.options.host, self.options.port, self.options.username
            );

            let attempt = tokio::select! {
                _ = self.shutdown.cancelled() => {
                    info!("Shutdown requested before connect completed");
                    return;
                }
                result = self.connector.connect(self.options.clone()) => result,
            };

            match attempt {
                Ok(session) => {
                    if let Stop::Shutdown = self.supervise(session).await {
                        return;
                    }
                }
                Err(e) => error!("Connection attempt failed: {}", e),
            }

            info!("Reconnecting in {}ms", self.reconnect_delay.as_millis());
            tokio::select! {
                _ = self.shutdown.cancelled() => return,
                _ = tokio::time::sleep(self.reconnect_delay) => {}
            }
        }
    }

    /// Drive one established session until it ends or shutdown is requested.
    ///
    /// The keepalive task only exists inside this scope, so it can never
    /// outlive the session handle or leak into the next connection attempt:
    /// it is aborted on every exit path before the session view is cleared.
    async fn supervise(&self, session: ClientSession) -> Stop {
        let ClientSession { handle, mut events } = session;
        *self.session.write() = Some(handle.clone());

        let mut keepalive: Option<JoinHandle<()>> = None;
        let mut login_sent = false;

        let stop = loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    info!("Shutdown requested - closing session");
                    // Timer first, then the close. Best-effort; the close
                    // is not awaited.
                    if let Some(task) = keepalive.take() {
                        task.abort();
                    }
                    handle.quit("Shutting down");
                    break Stop::Shutdown;
                }
                event = events.recv() => match event {
                    Some(ClientEvent::Spawned) => {
                        info!("Session spawned as {}", handle.username());
                        // Once per session, even if spawn is raised again.
                        if !login_sent {
                            self.send_login(&handle);
                            login_sent = true;
                        }
                        // Tolerates a client that raises spawn more than once.
                        if let Some(task) = keepalive.take() {
                            task.abort();
                        }
                        keepalive = Some(keepalive::start(
                            handle.clone(),
                            self.keepalive_interval,
                            self.pulse_duration,
                        ));
                    }
                    Some(ClientEvent::Ended { reason }) => {
                        match reason {
                            Some(reason) => warn!("Session ended: {}", reason),
                            None => warn!("Session ended"),
                        }
                        break Stop::Reconnect;
                    }
                    Some(ClientEvent::Errored { message }) => {
                        // Logged only; the end event follows on its own.
                        error!("Session error: {}", message);
                    }
                    Some(ClientEvent::Message { text }) => {
                        // Hook point for reactive behavior, unused for now.
                        debug!("Chat: {}", text);
                    }
                    None => {
                        warn!("Session event stream closed");
                        break Stop::Reconnect;
                    }
                }
            }
        };

        if let Some(task) = keepalive.take() {
            task.abort();
        }
        *self.session.write() = None;

        stop
    }

    /// Send the scripted login command shortly after spawn, iff a credential
    /// is configured. The same configured credential is used for the connect
    /// and for this command.
    fn send_login(&self, handle: &SessionHandle) {
        let Some(password) = self.options.password.clone() else {
            return;
        };
        let handle = handle.clone();
        tokio::spawn(async move {
            tokio::time::sleep(LOGIN_DELAY).await;
            match handle.chat(&format!("/login {}", password)) {
                Ok(()) => info!("Sent login command"),
                Err(e) => warn!("Could not send login command: {}", e),
            }
        });
    }
}
