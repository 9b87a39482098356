//! Call relay library
//!
//! Presence and signaling relay for peer-to-peer call setup. Clients
//! register a user identity over WebSocket and exchange call-lifecycle
//! messages (invite, accept, reject, missed, end) routed by recipient
//! identity; the relay brokers the handshake and carries no media.
//!
//! ## Architecture
//!
//! ```text
//! WebSocket listener (WebSocketServer)
//!     |
//!     v
//! connection task (one per client)
//!     |
//!     v
//! SignalingRouter ---- PresenceRegistry (identity <-> connection)
//!
//! HTTP API (axum)
//!     +-- /api/auth   account registration and login
//!     +-- /api/users  read-only user directory
//!     +-- /api/media  join-token issuance for the media provider
//! ```
//!
//! The HTTP side is plain request/response plumbing; only the relay has
//! shared live state.

pub mod api;
pub mod auth;
pub mod config;
pub mod directory;
pub mod media;
pub mod presence;
pub mod server;
