//! Protocol client collaborator interface.
//!
//! The supervisor only ever sees the narrow surface defined here: a
//! [`Connector`] that produces a session, the session's event stream, and a
//! cloneable [`SessionHandle`] for the handful of operations the bot needs
//! (chat, control input, quit). The concrete network client lives in
//! [`net`]; tests drive the supervisor with a scripted connector instead.

mod errors;
pub mod net;
pub mod protocol;

pub use errors::ClientError;
pub use net::NetConnector;

use std::future::Future;
use std::sync::Arc;
use parking_lot::RwLock;
use tokio::sync::mpsc;

/// Options for a single connection attempt. The supervisor reuses the same
/// options for every attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectOptions {
    pub host: String,
    pub port: u16,
    pub username: String,
    /// Only sent when configured
    pub password: Option<String>,
    /// `None` lets the server pick the protocol version
    pub protocol_version: Option<u32>,
}

/// Events a live session delivers to the supervisor.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    /// The session is fully established and the player is in the world.
    Spawned,
    /// The session terminated, gracefully or by being kicked.
    Ended { reason: Option<String> },
    /// A transport or protocol fault. Does not itself end the session;
    /// an `Ended` follows (or the event channel closes).
    Errored { message: String },
    /// Chat or server text. Observed but ignored for now.
    Message { text: String },
}

/// Boolean movement inputs the session can assert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Jump,
}

/// Player position in the world, as last reported by the server.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// Operations the session handle forwards to the client I/O task.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionCommand {
    Chat(String),
    SetControl(Control, bool),
    Quit(String),
}

/// Cloneable handle to a live session.
///
/// Commands are forwarded over a channel to the client I/O task; once that
/// task is gone every fallible operation returns
/// [`ClientError::SessionClosed`].
#[derive(Debug, Clone)]
pub struct SessionHandle {
    username: String,
    position: Arc<RwLock<Option<Position>>>,
    commands: mpsc::UnboundedSender<SessionCommand>,
}

impl SessionHandle {
    pub(crate) fn new(
        username: String,
        position: Arc<RwLock<Option<Position>>>,
        commands: mpsc::UnboundedSender<SessionCommand>,
    ) -> Self {
        Self {
            username,
            position,
            commands,
        }
    }

    /// Identity this session presented to the server.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Last position reported by the server, or `None` before spawn.
    pub fn position(&self) -> Option<Position> {
        *self.position.read()
    }

    /// Send a chat line (also used for `/login`-style commands).
    pub fn chat(&self, text: &str) -> Result<(), ClientError> {
        self.commands
            .send(SessionCommand::Chat(text.to_string()))
            .map_err(|_| ClientError::SessionClosed)
    }

    /// Assert or deassert a movement input.
    pub fn set_control(&self, control: Control, active: bool) -> Result<(), ClientError> {
        self.commands
            .send(SessionCommand::SetControl(control, active))
            .map_err(|_| ClientError::SessionClosed)
    }

    /// Request a graceful close. Best-effort: a session that is already gone
    /// is fine, and the close is not awaited.
    pub fn quit(&self, reason: &str) {
        let _ = self.commands.send(SessionCommand::Quit(reason.to_string()));
    }
}

/// A freshly connected session: the handle plus its event stream.
#[derive(Debug)]
pub struct ClientSession {
    pub handle: SessionHandle,
    pub events: mpsc::Receiver<ClientEvent>,
}

/// Produces sessions for the supervisor. Implemented by [`NetConnector`] in
/// production and by scripted connectors in tests.
pub trait Connector: Send + Sync + 'static {
    fn connect(
        &self,
        opts: ConnectOptions,
    ) -> impl Future<Output = Result<ClientSession, ClientError>> + Send;
}
