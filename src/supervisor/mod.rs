//! Session supervisor module
//!
//! Owns the connect / maintain / reconnect lifecycle of the single bot
//! session and the keepalive pulse that runs while it is established.

mod keepalive;
mod lifecycle;

pub use lifecycle::{SessionView, Supervisor};
