//! Signaling message router
//!
//! Translates each inbound message's target identity into a connection
//! handle via the presence registry and forwards the payload, or answers the
//! sender when that is not possible. Owns the per-kind routing rules and the
//! disconnect cleanup rule.
//!
//! Routing is uniform across the call-lifecycle kinds: resolve the target,
//! forward verbatim. Only `invite` reports an absent target back to the
//! sender (`user-offline`); for every other kind the sender already knows
//! the call failed to progress, so the message is dropped silently.

use std::sync::Arc;

use tracing::{debug, warn};
use uuid::Uuid;

use crate::presence::{PeerHandle, PresenceRegistry, SendOutcome};
use crate::server::protocol::{
    ClientMessage, ErrorCode, ProtocolError, ServerMessage, MAX_FRAME_BYTES,
};

/// Routes signaling messages between registered connections
///
/// Cloning is cheap; clones share the injected registry.
#[derive(Clone)]
pub struct SignalingRouter {
    registry: Arc<PresenceRegistry>,
}

impl SignalingRouter {
    /// Create a router over the given presence registry
    pub fn new(registry: Arc<PresenceRegistry>) -> Self {
        Self { registry }
    }

    /// The registry this router resolves targets against
    pub fn registry(&self) -> &Arc<PresenceRegistry> {
        &self.registry
    }

    /// Process one raw text frame from a connection
    ///
    /// Returns the reply to send back to the sender, if any. Malformed
    /// frames produce an error notice and never affect the connection or
    /// the registry.
    pub async fn handle_frame(&self, peer: &PeerHandle, text: &str) -> Option<ServerMessage> {
        if text.len() > MAX_FRAME_BYTES {
            warn!(conn_id = %peer.conn_id(), len = text.len(), "Dropping oversized frame");
            return Some(ServerMessage::error_with_code(
                format!("frame exceeds maximum size of {} bytes", MAX_FRAME_BYTES),
                ErrorCode::InvalidMessage,
            ));
        }

        let message: ClientMessage = match serde_json::from_str(text) {
            Ok(msg) => msg,
            Err(e) => {
                debug!(conn_id = %peer.conn_id(), error = %e, "Unparseable frame");
                return Some(ServerMessage::from(ProtocolError::from(e)));
            }
        };

        if let Err(e) = message.validate() {
            debug!(conn_id = %peer.conn_id(), error = %e, "Invalid message");
            return Some(ServerMessage::from(e));
        }

        self.handle_message(peer, message).await
    }

    /// Apply the routing rule for one parsed, validated message
    pub async fn handle_message(
        &self,
        peer: &PeerHandle,
        message: ClientMessage,
    ) -> Option<ServerMessage> {
        debug!(conn_id = %peer.conn_id(), kind = message.kind(), "Routing message");

        match message {
            ClientMessage::Register { identity } => {
                self.registry.register(identity, peer.clone()).await;
                None
            }

            ClientMessage::Invite { target, payload } => {
                // Absent target and a connection that vanished between lookup
                // and send look the same to the caller.
                let delivered = match self.registry.lookup(&target).await {
                    Some(callee) => {
                        callee.send(ServerMessage::incoming_call(payload)) == SendOutcome::Queued
                    }
                    None => false,
                };

                if delivered {
                    debug!(target = %target, "Forwarded invite");
                    None
                } else {
                    debug!(target = %target, "Invite target offline");
                    Some(ServerMessage::user_offline(target))
                }
            }

            ClientMessage::Accept { target, payload } => {
                self.forward(&target, ServerMessage::call_accepted(payload))
                    .await;
                None
            }

            ClientMessage::Reject { target, payload } => {
                self.forward(&target, ServerMessage::call_rejected(payload))
                    .await;
                None
            }

            ClientMessage::Missed { target, payload } => {
                self.forward(&target, ServerMessage::missed_call(payload))
                    .await;
                None
            }

            ClientMessage::End { target, payload } => {
                self.forward(&target, ServerMessage::call_ended(payload))
                    .await;
                None
            }
        }
    }

    /// Forward a message to a target identity, dropping silently when the
    /// target has no live connection
    async fn forward(&self, target: &str, message: ServerMessage) {
        match self.registry.lookup(target).await {
            Some(peer) => {
                if peer.send(message) == SendOutcome::Closed {
                    debug!(target = %target, "Target connection closed, dropping");
                }
            }
            None => {
                debug!(target = %target, "Target not registered, dropping");
            }
        }
    }

    /// Clean up after a closed connection
    ///
    /// Removes the registry entry owned by the connection, if any. No other
    /// party is notified; an in-call peer detects transport loss itself or
    /// has already received an explicit `end`/`missed`.
    pub async fn handle_disconnect(&self, conn_id: Uuid) {
        if let Some(identity) = self.registry.remove_by_connection(conn_id).await {
            debug!(conn_id = %conn_id, identity = %identity, "Connection cleanup complete");
        }
    }
}
