//! Client error types

use thiserror::Error;

/// Errors from the protocol client
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Could not resolve server address: {0}")]
    AddressResolution(String),

    #[error("Connection failed: {0}")]
    ConnectFailed(String),

    #[error("Join rejected: {0}")]
    JoinRejected(String),

    #[error("Session closed")]
    SessionClosed,

    #[error("Codec error: {0}")]
    Codec(#[from] bincode::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
