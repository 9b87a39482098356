//! Protocol message definitions
//!
//! Defines the signaling messages exchanged between clients and the relay.
//! All messages are JSON-encoded text frames tagged with a `type` field.
//! Call payloads (session descriptions, channel names, caller info) are
//! opaque to the relay and forwarded verbatim.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Maximum length of a user identity in bytes
pub const MAX_IDENTITY_LENGTH: usize = 128;

/// Maximum size of a single inbound text frame (64 KiB)
pub const MAX_FRAME_BYTES: usize = 64 * 1024;

// ============================================================================
// Error Types
// ============================================================================

/// Protocol-related errors
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("JSON serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

/// Result type for protocol operations
pub type ProtocolResult<T> = Result<T, ProtocolError>;

// ============================================================================
// Client Messages
// ============================================================================

/// Messages sent from client to relay
///
/// Every kind except `Register` names a target identity; the relay resolves
/// it against the presence registry and forwards the payload unchanged.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Claim a user identity for this connection
    Register {
        /// Identity to bind to the current connection
        identity: String,
    },

    /// Start a call with the target identity
    Invite {
        /// Identity of the callee
        target: String,
        /// Opaque call setup payload (e.g. session description)
        #[serde(default)]
        payload: Value,
    },

    /// Accept a pending call
    Accept {
        /// Identity of the caller
        target: String,
        /// Opaque answer payload
        #[serde(default)]
        payload: Value,
    },

    /// Reject a pending call
    Reject {
        /// Identity of the caller
        target: String,
        /// Opaque rejection payload
        #[serde(default)]
        payload: Value,
    },

    /// Report a call that rang out unanswered
    Missed {
        /// Identity of the callee that missed the call
        target: String,
        /// Opaque payload
        #[serde(default)]
        payload: Value,
    },

    /// Terminate an established call
    End {
        /// Identity of the other call party
        target: String,
        /// Opaque payload
        #[serde(default)]
        payload: Value,
    },
}

impl ClientMessage {
    /// Validate message contents
    pub fn validate(&self) -> ProtocolResult<()> {
        match self {
            ClientMessage::Register { identity } => validate_identity(identity, "identity"),
            ClientMessage::Invite { target, .. }
            | ClientMessage::Accept { target, .. }
            | ClientMessage::Reject { target, .. }
            | ClientMessage::Missed { target, .. }
            | ClientMessage::End { target, .. } => validate_identity(target, "target"),
        }
    }

    /// Wire name of this message kind, for logging
    pub fn kind(&self) -> &'static str {
        match self {
            ClientMessage::Register { .. } => "register",
            ClientMessage::Invite { .. } => "invite",
            ClientMessage::Accept { .. } => "accept",
            ClientMessage::Reject { .. } => "reject",
            ClientMessage::Missed { .. } => "missed",
            ClientMessage::End { .. } => "end",
        }
    }

    /// Create a Register message
    pub fn register(identity: impl Into<String>) -> Self {
        ClientMessage::Register {
            identity: identity.into(),
        }
    }

    /// Create an Invite message
    pub fn invite(target: impl Into<String>, payload: Value) -> Self {
        ClientMessage::Invite {
            target: target.into(),
            payload,
        }
    }

    /// Create an Accept message
    pub fn accept(target: impl Into<String>, payload: Value) -> Self {
        ClientMessage::Accept {
            target: target.into(),
            payload,
        }
    }

    /// Create a Reject message
    pub fn reject(target: impl Into<String>, payload: Value) -> Self {
        ClientMessage::Reject {
            target: target.into(),
            payload,
        }
    }

    /// Create a Missed message
    pub fn missed(target: impl Into<String>, payload: Value) -> Self {
        ClientMessage::Missed {
            target: target.into(),
            payload,
        }
    }

    /// Create an End message
    pub fn end(target: impl Into<String>, payload: Value) -> Self {
        ClientMessage::End {
            target: target.into(),
            payload,
        }
    }
}

fn validate_identity(identity: &str, field: &str) -> ProtocolResult<()> {
    if identity.is_empty() {
        return Err(ProtocolError::ValidationError(format!(
            "{} cannot be empty",
            field
        )));
    }
    if identity.len() > MAX_IDENTITY_LENGTH {
        return Err(ProtocolError::ValidationError(format!(
            "{} exceeds maximum length of {} bytes",
            field, MAX_IDENTITY_LENGTH
        )));
    }
    Ok(())
}

// ============================================================================
// Server Messages
// ============================================================================

/// Messages sent from relay to client
///
/// Forwarded kinds carry the sender's payload verbatim; the recipient learns
/// who is calling from the payload itself, not from the relay.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerMessage {
    /// A caller wants to start a call with this client
    IncomingCall {
        /// The caller's invite payload, verbatim
        payload: Value,
    },

    /// The callee accepted the call
    CallAccepted {
        /// The callee's answer payload, verbatim
        payload: Value,
    },

    /// The callee rejected the call
    CallRejected {
        /// The callee's rejection payload, verbatim
        payload: Value,
    },

    /// The callee did not answer in time
    MissedCall {
        /// The sender's payload, verbatim
        payload: Value,
    },

    /// The other party ended the call
    CallEnded {
        /// The sender's payload, verbatim
        payload: Value,
    },

    /// The invited identity has no live connection
    UserOffline {
        /// The identity that was invited
        target: String,
    },

    /// The previous inbound message could not be processed
    Error {
        /// Human-readable description
        message: String,
        /// Error code for programmatic handling
        #[serde(skip_serializing_if = "Option::is_none")]
        code: Option<ErrorCode>,
    },
}

/// Error codes for programmatic error handling
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Malformed or invalid message
    InvalidMessage,
    /// Internal server error
    InternalError,
}

impl ServerMessage {
    /// Create an IncomingCall message
    pub fn incoming_call(payload: Value) -> Self {
        ServerMessage::IncomingCall { payload }
    }

    /// Create a CallAccepted message
    pub fn call_accepted(payload: Value) -> Self {
        ServerMessage::CallAccepted { payload }
    }

    /// Create a CallRejected message
    pub fn call_rejected(payload: Value) -> Self {
        ServerMessage::CallRejected { payload }
    }

    /// Create a MissedCall message
    pub fn missed_call(payload: Value) -> Self {
        ServerMessage::MissedCall { payload }
    }

    /// Create a CallEnded message
    pub fn call_ended(payload: Value) -> Self {
        ServerMessage::CallEnded { payload }
    }

    /// Create a UserOffline message
    pub fn user_offline(target: impl Into<String>) -> Self {
        ServerMessage::UserOffline {
            target: target.into(),
        }
    }

    /// Create an Error message with code
    pub fn error_with_code(message: impl Into<String>, code: ErrorCode) -> Self {
        ServerMessage::Error {
            message: message.into(),
            code: Some(code),
        }
    }
}

// ============================================================================
// Conversion Traits
// ============================================================================

impl From<ProtocolError> for ServerMessage {
    fn from(err: ProtocolError) -> Self {
        ServerMessage::error_with_code(err.to_string(), ErrorCode::InvalidMessage)
    }
}

// ============================================================================
// Tests
// ============================================================================
