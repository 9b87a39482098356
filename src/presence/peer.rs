//! Connection handle for registered peers
//!
//! Wraps the transport-assigned connection id together with the outbound
//! channel used to deliver server messages to that connection. The handle is
//! what the presence registry stores; it stays valid only as long as the
//! connection task that owns the receiving end is alive.

use tokio::sync::mpsc;
use uuid::Uuid;

use crate::server::ServerMessage;

/// Result of queueing a message for delivery to a peer
#[derive(Debug, PartialEq, Eq)]
pub enum SendOutcome {
    /// Message was queued on the connection's outbound channel
    Queued,
    /// The connection task has gone away; the peer is effectively offline
    Closed,
}

/// Handle to one live client connection
///
/// Cloning is cheap; clones share the same outbound channel.
#[derive(Debug, Clone)]
pub struct PeerHandle {
    /// Transport-assigned connection id
    conn_id: Uuid,
    /// Outbound channel into the connection's write task
    tx: mpsc::UnboundedSender<ServerMessage>,
}

impl PeerHandle {
    /// Create a handle for a connection with the given outbound sender
    pub fn new(conn_id: Uuid, tx: mpsc::UnboundedSender<ServerMessage>) -> Self {
        Self { conn_id, tx }
    }

    /// The transport-assigned connection id
    pub fn conn_id(&self) -> Uuid {
        self.conn_id
    }

    /// Queue a message for delivery to this peer
    ///
    /// Never blocks. Failure means the connection task has already dropped
    /// its receiver; callers treat that the same as the peer being offline.
    pub fn send(&self, msg: ServerMessage) -> SendOutcome {
        match self.tx.send(msg) {
            Ok(()) => SendOutcome::Queued,
            Err(_) => SendOutcome::Closed,
        }
    }
}
