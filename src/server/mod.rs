//! WebSocket signaling server module
//!
//! Hosts client connections and routes call-signaling messages between them
//! by registered identity.

mod protocol;
mod router;
mod websocket;

pub use protocol::*;
pub use router::SignalingRouter;
pub use websocket::{ServerConfig, WebSocketServer};
