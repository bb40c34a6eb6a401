//! Concrete protocol client over UDP.
//!
//! One datagram per bincode-encoded [`Packet`]. `connect` performs the join
//! handshake, then hands the socket to a background I/O task that translates
//! server packets into [`ClientEvent`]s and drains the session command
//! channel. The supervisor never touches the socket directly.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::net::{lookup_host, UdpSocket};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::protocol::{Packet, MAX_PACKET_SIZE};
use super::{
    ClientError, ClientEvent, ClientSession, ConnectOptions, Connector, Control, Position,
    SessionCommand, SessionHandle,
};

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const EVENT_CHANNEL_CAPACITY: usize = 32;

/// Production [`Connector`].
#[derive(Debug, Clone)]
pub struct NetConnector {
    connect_timeout: Duration,
}

impl NetConnector {
    pub fn new() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    pub fn with_connect_timeout(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

impl Default for NetConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl Connector for NetConnector {
    fn connect(
        &self,
        opts: ConnectOptions,
    ) -> impl Future<Output = Result<ClientSession, ClientError>> + Send {
        let connect_timeout = self.connect_timeout;
        async move {
            let addr = lookup_host((opts.host.as_str(), opts.port))
                .await
                .map_err(|e| {
                    ClientError::AddressResolution(format!("{}:{} ({})", opts.host, opts.port, e))
                })?
                .next()
                .ok_or_else(|| {
                    ClientError::AddressResolution(format!("{}:{}", opts.host, opts.port))
                })?;

            let socket = UdpSocket::bind("0.0.0.0:0").await?;
            socket.connect(addr).await?;

            let join = Packet::Join {
                username: opts.username.clone(),
                password: opts.password.clone(),
                protocol_version: opts.protocol_version,
            };
            send_packet(&socket, &join).await?;

            let mut buf = [0u8; MAX_PACKET_SIZE];
            let response = tokio::time::timeout(connect_timeout, async {
                loop {
                    let len = socket.recv(&mut buf).await?;
                    match bincode::deserialize::<Packet>(&buf[..len]) {
                        Ok(Packet::JoinAccepted { player_id }) => {
                            return Ok::<u32, ClientError>(player_id)
                        }
                        Ok(Packet::JoinRejected { reason }) => {
                            return Err(ClientError::JoinRejected(reason))
                        }
                        Ok(other) => debug!("Ignoring pre-join packet: {:?}", other),
                        Err(e) => warn!("Dropping undecodable packet during join: {}", e),
                    }
                }
            })
            .await;

            let player_id = match response {
                Ok(result) => result?,
                Err(_) => {
                    return Err(ClientError::ConnectFailed(format!(
                        "no join response from {} within {:?}",
                        addr, connect_timeout
                    )))
                }
            };

            info!("Joined {} as {} (player id {})", addr, opts.username, player_id);

            let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
            let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
            let position = Arc::new(RwLock::new(None));

            tokio::spawn(io_task(socket, cmd_rx, event_tx, position.clone()));

            Ok(ClientSession {
                handle: SessionHandle::new(opts.username, position, cmd_tx),
                events: event_rx,
            })
        }
    }
}

/// Owns the socket for the lifetime of one session.
async fn io_task(
    socket: UdpSocket,
    mut commands: mpsc::UnboundedReceiver<SessionCommand>,
    events: mpsc::Sender<ClientEvent>,
    position: Arc<RwLock<Option<Position>>>,
) {
    let mut buf = [0u8; MAX_PACKET_SIZE];
    loop {
        tokio::select! {
            result = socket.recv(&mut buf) => match result {
                Ok(len) => match bincode::deserialize::<Packet>(&buf[..len]) {
                    Ok(packet) => {
                        if handle_packet(packet, &events, &position).await {
                            break;
                        }
                    }
                    Err(e) => warn!("Dropping undecodable packet: {}", e),
                },
                Err(e) => {
                    error!("Session transport error: {}", e);
                    let _ = events.send(ClientEvent::Errored { message: e.to_string() }).await;
                    let _ = events.send(ClientEvent::Ended { reason: None }).await;
                    break;
                }
            },
            cmd = commands.recv() => match cmd {
                Some(SessionCommand::Chat(text)) => {
                    if let Err(e) = send_packet(&socket, &Packet::Chat { text }).await {
                        warn!("Failed to send chat: {}", e);
                    }
                }
                Some(SessionCommand::SetControl(Control::Jump, active)) => {
                    if let Err(e) = send_packet(&socket, &Packet::Input { jump: active }).await {
                        warn!("Failed to send input: {}", e);
                    }
                }
                Some(SessionCommand::Quit(reason)) => {
                    info!("Closing session: {}", reason);
                    let _ = send_packet(&socket, &Packet::Quit).await;
                    break;
                }
                // Every handle dropped; nothing left to serve.
                None => {
                    let _ = send_packet(&socket, &Packet::Quit).await;
                    break;
                }
            },
        }
    }
    *position.write() = None;
}

/// Translate one server packet. Returns true when the session is over.
async fn handle_packet(
    packet: Packet,
    events: &mpsc::Sender<ClientEvent>,
    position: &Arc<RwLock<Option<Position>>>,
) -> bool {
    match packet {
        Packet::Spawn { x, y, z } => {
            *position.write() = Some(Position { x, y, z });
            let _ = events.send(ClientEvent::Spawned).await;
        }
        Packet::State { x, y, z } => {
            *position.write() = Some(Position { x, y, z });
        }
        Packet::ChatMessage { text } => {
            let _ = events.send(ClientEvent::Message { text }).await;
        }
        Packet::Kick { reason } => {
            *position.write() = None;
            let _ = events
                .send(ClientEvent::Ended {
                    reason: Some(reason),
                })
                .await;
            return true;
        }
        other => debug!("Ignoring unexpected packet: {:?}", other),
    }
    false
}

async fn send_packet(socket: &UdpSocket, packet: &Packet) -> Result<(), ClientError> {
    let data = bincode::serialize(packet)?;
    socket.send(&data).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::timeout;

    const TEST_TIMEOUT: Duration = Duration::from_secs(5);

    fn opts(port: u16) -> ConnectOptions {
        ConnectOptions {
            host: "127.0.0.1".to_string(),
            port,
            username: "AFKBot".to_string(),
            password: None,
            protocol_version: None,
        }
    }

    async fn recv_packet(server: &UdpSocket) -> (Packet, std::net::SocketAddr) {
        let mut buf = [0u8; MAX_PACKET_SIZE];
        let (len, peer) = server.recv_from(&mut buf).await.unwrap();
        (bincode::deserialize(&buf[..len]).unwrap(), peer)
    }

    async fn send_to(server: &UdpSocket, peer: std::net::SocketAddr, packet: &Packet) {
        server
            .send_to(&bincode::serialize(packet).unwrap(), peer)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn join_handshake_and_spawn() {
        let server = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let port = server.local_addr().unwrap().port();

        let server_task = tokio::spawn(async move {
            let (packet, peer) = recv_packet(&server).await;
            match packet {
                Packet::Join { username, password, protocol_version } => {
                    assert_eq!(username, "AFKBot");
                    assert_eq!(password, None);
                    assert_eq!(protocol_version, None);
                }
                other => panic!("expected Join, got {:?}", other),
            }
            send_to(&server, peer, &Packet::JoinAccepted { player_id: 7 }).await;
            send_to(&server, peer, &Packet::Spawn { x: 0.0, y: 64.0, z: 0.0 }).await;

            // Bot quits at the end of the test.
            loop {
                let (packet, _) = recv_packet(&server).await;
                if packet == Packet::Quit {
                    break;
                }
            }
        });

        let connector = NetConnector::new();
        let mut session = timeout(TEST_TIMEOUT, connector.connect(opts(port)))
            .await
            .unwrap()
            .unwrap();

        let event = timeout(TEST_TIMEOUT, session.events.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event, ClientEvent::Spawned);
        assert_eq!(session.handle.username(), "AFKBot");
        assert!(session.handle.position().is_some());

        session.handle.quit("test done");
        timeout(TEST_TIMEOUT, server_task).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn kick_surfaces_as_ended_with_reason() {
        let server = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let port = server.local_addr().unwrap().port();

        tokio::spawn(async move {
            let (_, peer) = recv_packet(&server).await;
            send_to(&server, peer, &Packet::JoinAccepted { player_id: 1 }).await;
            send_to(&server, peer, &Packet::Spawn { x: 1.0, y: 2.0, z: 3.0 }).await;
            send_to(&server, peer, &Packet::Kick { reason: "Server restarting".to_string() }).await;
        });

        let connector = NetConnector::new();
        let mut session = timeout(TEST_TIMEOUT, connector.connect(opts(port)))
            .await
            .unwrap()
            .unwrap();

        let spawned = timeout(TEST_TIMEOUT, session.events.recv()).await.unwrap();
        assert_eq!(spawned, Some(ClientEvent::Spawned));

        let ended = timeout(TEST_TIMEOUT, session.events.recv()).await.unwrap();
        assert_eq!(
            ended,
            Some(ClientEvent::Ended {
                reason: Some("Server restarting".to_string())
            })
        );

        // Position is cleared on kick, and the event channel closes behind it.
        assert!(session.handle.position().is_none());
        let closed = timeout(TEST_TIMEOUT, session.events.recv()).await.unwrap();
        assert_eq!(closed, None);
    }

    #[tokio::test]
    async fn join_rejection_fails_the_connect() {
        let server = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let port = server.local_addr().unwrap().port();

        tokio::spawn(async move {
            let (_, peer) = recv_packet(&server).await;
            send_to(&server, peer, &Packet::JoinRejected { reason: "Whitelist".to_string() }).await;
        });

        let connector = NetConnector::new();
        let result = timeout(TEST_TIMEOUT, connector.connect(opts(port))).await.unwrap();
        assert!(matches!(result, Err(ClientError::JoinRejected(reason)) if reason == "Whitelist"));
    }

    #[tokio::test]
    async fn silent_server_times_out() {
        let server = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let port = server.local_addr().unwrap().port();

        let connector = NetConnector::with_connect_timeout(Duration::from_millis(100));
        let result = timeout(TEST_TIMEOUT, connector.connect(opts(port))).await.unwrap();
        assert!(matches!(result, Err(ClientError::ConnectFailed(_))));
        drop(server);
    }
}
