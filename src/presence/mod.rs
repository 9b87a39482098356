//! Presence tracking module
//!
//! Maps user identities to their one live WebSocket connection and hands the
//! signaling router the connection handles it routes to.

mod peer;
mod registry;

pub use peer::{PeerHandle, SendOutcome};
pub use registry::PresenceRegistry;
