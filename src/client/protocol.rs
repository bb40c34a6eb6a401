//! Wire protocol between the bot and the game server.
//!
//! Datagram-per-packet, bincode-encoded.

use serde::{Deserialize, Serialize};

/// Maximum encoded packet size we accept from the server.
pub const MAX_PACKET_SIZE: usize = 2048;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum Packet {
    // client -> server
    Join {
        username: String,
        password: Option<String>,
        /// `None` lets the server pick
        protocol_version: Option<u32>,
    },
    Chat {
        text: String,
    },
    Input {
        jump: bool,
    },
    Quit,

    // server -> client
    JoinAccepted {
        player_id: u32,
    },
    JoinRejected {
        reason: String,
    },
    Spawn {
        x: f32,
        y: f32,
        z: f32,
    },
    State {
        x: f32,
        y: f32,
        z: f32,
    },
    ChatMessage {
        text: String,
    },
    Kick {
        reason: String,
    },
}
