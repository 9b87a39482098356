//! Presence registry
//!
//! The single source of truth for which connection currently represents a
//! user identity. One identity maps to at most one live connection;
//! registering again replaces the previous entry (last write wins, the most
//! recent client instance for an identity is authoritative).
//!
//! Alongside the identity map the registry keeps a reverse index from
//! connection id to identity so disconnect cleanup is a constant-time lookup
//! instead of a scan. Both maps are guarded by one lock and always mutated
//! together.

use std::collections::HashMap;

use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use super::peer::PeerHandle;

/// Paired maps; every entry in one has exactly one counterpart in the other.
#[derive(Default)]
struct RegistryInner {
    /// identity -> live connection handle
    by_identity: HashMap<String, PeerHandle>,
    /// connection id -> identity, for disconnect cleanup
    by_connection: HashMap<Uuid, String>,
}

/// Live mapping from user identity to connection handle
///
/// Shared across all connection tasks; all access goes through one `RwLock`.
pub struct PresenceRegistry {
    inner: RwLock<RegistryInner>,
}

impl PresenceRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(RegistryInner::default()),
        }
    }

    /// Bind an identity to a connection
    ///
    /// Replaces any prior entry for the identity without notifying the
    /// superseded connection. If this connection was already registered under
    /// another identity, that stale binding is removed as well, keeping
    /// identities and connections strictly one-to-one. Registering the same
    /// pair twice is a no-op.
    pub async fn register(&self, identity: impl Into<String>, peer: PeerHandle) {
        let identity = identity.into();
        let conn_id = peer.conn_id();
        let mut inner = self.inner.write().await;

        // This connection may be re-registering under a new identity.
        if let Some(previous_identity) = inner.by_connection.insert(conn_id, identity.clone()) {
            if previous_identity != identity {
                inner.by_identity.remove(&previous_identity);
                debug!(
                    conn_id = %conn_id,
                    old = %previous_identity,
                    new = %identity,
                    "Connection re-registered under a new identity"
                );
            }
        }

        // The identity may previously have been held by another connection.
        if let Some(displaced) = inner.by_identity.insert(identity.clone(), peer) {
            if displaced.conn_id() != conn_id {
                inner.by_connection.remove(&displaced.conn_id());
                debug!(
                    identity = %identity,
                    old_conn = %displaced.conn_id(),
                    new_conn = %conn_id,
                    "Identity re-registered from a new connection"
                );
            }
        }

        info!(identity = %identity, conn_id = %conn_id, "User registered");
    }

    /// Resolve an identity to its live connection handle
    ///
    /// Pure read; returns a clone of the handle or `None` when the identity
    /// has no live connection.
    pub async fn lookup(&self, identity: &str) -> Option<PeerHandle> {
        self.inner.read().await.by_identity.get(identity).cloned()
    }

    /// Remove the entry owned by a closed connection
    ///
    /// Returns the identity that was freed, if the connection had one. At
    /// most one entry is removed; connections hold at most one identity.
    pub async fn remove_by_connection(&self, conn_id: Uuid) -> Option<String> {
        let mut inner = self.inner.write().await;
        let identity = inner.by_connection.remove(&conn_id)?;
        inner.by_identity.remove(&identity);
        info!(identity = %identity, conn_id = %conn_id, "User unregistered");
        Some(identity)
    }

    /// Unconditionally remove an identity's entry
    ///
    /// Used for explicit logout; removing an unknown identity is a no-op.
    pub async fn remove_by_identity(&self, identity: &str) {
        let mut inner = self.inner.write().await;
        if let Some(peer) = inner.by_identity.remove(identity) {
            inner.by_connection.remove(&peer.conn_id());
            info!(identity = %identity, "Identity explicitly unregistered");
        }
    }

    /// Whether an identity currently has a live connection
    pub async fn is_online(&self, identity: &str) -> bool {
        self.inner.read().await.by_identity.contains_key(identity)
    }

    /// Number of registered identities
    pub async fn online_count(&self) -> usize {
        self.inner.read().await.by_identity.len()
    }
}

impl Default for PresenceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn test_peer() -> PeerHandle {
        let (tx, _rx) = mpsc::unbounded_channel();
        PeerHandle::new(Uuid::new_v4(), tx)
    }

    #[tokio::test]
    async fn test_register_and_lookup() {
        let registry = PresenceRegistry::new();
        let peer = test_peer();
        let conn_id = peer.conn_id();

        registry.register("alice", peer).await;

        let found = registry.lookup("alice").await.expect("alice registered");
        assert_eq!(found.conn_id(), conn_id);
        assert!(registry.is_online("alice").await);
        assert_eq!(registry.online_count().await, 1);
    }

    #[tokio::test]
    async fn test_lookup_unknown_identity() {
        let registry = PresenceRegistry::new();
        assert!(registry.lookup("ghost").await.is_none());
        assert!(!registry.is_online("ghost").await);
    }

    #[tokio::test]
    async fn test_last_register_wins() {
        let registry = PresenceRegistry::new();
        let first = test_peer();
        let second = test_peer();
        let second_id = second.conn_id();

        registry.register("alice", first.clone()).await;
        registry.register("alice", second).await;

        // Most recent connection is authoritative
        let found = registry.lookup("alice").await.unwrap();
        assert_eq!(found.conn_id(), second_id);
        assert_eq!(registry.online_count().await, 1);

        // The displaced connection no longer owns any entry
        assert!(registry.remove_by_connection(first.conn_id()).await.is_none());
    }

    #[tokio::test]
    async fn test_idempotent_re_registration() {
        let registry = PresenceRegistry::new();
        let peer = test_peer();
        let conn_id = peer.conn_id();

        registry.register("alice", peer.clone()).await;
        registry.register("alice", peer).await;

        assert_eq!(registry.online_count().await, 1);
        assert_eq!(registry.lookup("alice").await.unwrap().conn_id(), conn_id);
        assert_eq!(
            registry.remove_by_connection(conn_id).await,
            Some("alice".to_string())
        );
        assert_eq!(registry.online_count().await, 0);
    }

    #[tokio::test]
    async fn test_remove_by_connection_frees_identity() {
        let registry = PresenceRegistry::new();
        let peer = test_peer();
        let conn_id = peer.conn_id();

        registry.register("alice", peer).await;
        let freed = registry.remove_by_connection(conn_id).await;

        assert_eq!(freed, Some("alice".to_string()));
        assert!(registry.lookup("alice").await.is_none());
        assert_eq!(registry.online_count().await, 0);
    }

    #[tokio::test]
    async fn test_remove_by_connection_unknown_is_none() {
        let registry = PresenceRegistry::new();
        assert!(registry.remove_by_connection(Uuid::new_v4()).await.is_none());
    }

    #[tokio::test]
    async fn test_stale_disconnect_does_not_evict_new_registration() {
        // Old connection disconnects after the identity re-registered elsewhere
        let registry = PresenceRegistry::new();
        let old = test_peer();
        let new = test_peer();
        let new_id = new.conn_id();

        registry.register("alice", old.clone()).await;
        registry.register("alice", new).await;

        assert!(registry.remove_by_connection(old.conn_id()).await.is_none());
        assert_eq!(registry.lookup("alice").await.unwrap().conn_id(), new_id);
    }

    #[tokio::test]
    async fn test_remove_by_identity() {
        let registry = PresenceRegistry::new();
        let peer = test_peer();
        let conn_id = peer.conn_id();

        registry.register("alice", peer).await;
        registry.remove_by_identity("alice").await;

        assert!(registry.lookup("alice").await.is_none());
        // Reverse index is cleaned too
        assert!(registry.remove_by_connection(conn_id).await.is_none());
    }

    #[tokio::test]
    async fn test_remove_by_identity_unknown_is_noop() {
        let registry = PresenceRegistry::new();
        registry.remove_by_identity("ghost").await;
        assert_eq!(registry.online_count().await, 0);
    }

    #[tokio::test]
    async fn test_connection_switching_identity_keeps_maps_paired() {
        let registry = PresenceRegistry::new();
        let peer = test_peer();
        let conn_id = peer.conn_id();

        registry.register("alice", peer.clone()).await;
        registry.register("alice2", peer).await;

        // The connection now answers for alice2 only
        assert!(registry.lookup("alice").await.is_none());
        assert!(registry.lookup("alice2").await.is_some());
        assert_eq!(registry.online_count().await, 1);
        assert_eq!(
            registry.remove_by_connection(conn_id).await,
            Some("alice2".to_string())
        );
    }

    #[tokio::test]
    async fn test_distinct_identities_coexist() {
        let registry = PresenceRegistry::new();
        registry.register("alice", test_peer()).await;
        registry.register("bob", test_peer()).await;

        assert_eq!(registry.online_count().await, 2);
        assert!(registry.is_online("alice").await);
        assert!(registry.is_online("bob").await);
    }
}
