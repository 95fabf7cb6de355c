//! The set of currently live peer connections.

use std::sync::Arc;

use pylon_core::ConnectionId;

use super::connection::PeerConnection;

/// Source of truth for broadcast targets and population counts.
///
/// Insertion order is kept so fan-out iterates deterministically. The
/// registry itself is not synchronized — it lives inside the hub's single
/// lock along with the identity store and room flag.
#[derive(Default)]
pub struct ConnectionRegistry {
    peers: Vec<Arc<PeerConnection>>,
}

impl ConnectionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self { peers: Vec::new() }
    }

    /// Add a connection. The transport layer guarantees one handler per
    /// connection, so no duplicate detection is done.
    pub fn register(&mut self, conn: Arc<PeerConnection>) {
        self.peers.push(conn);
    }

    /// Remove a connection by ID. Removing an absent connection is a no-op.
    ///
    /// Returns the removed connection, if it was present.
    pub fn unregister(&mut self, id: &ConnectionId) -> Option<Arc<PeerConnection>> {
        let idx = self.peers.iter().position(|c| &c.id == id)?;
        Some(self.peers.remove(idx))
    }

    /// Owned snapshot of the current membership, safe to iterate while the
    /// registry is concurrently mutated.
    pub fn snapshot(&self) -> Vec<Arc<PeerConnection>> {
        self.peers.clone()
    }

    /// Current membership size.
    pub fn count(&self) -> usize {
        self.peers.len()
    }

    /// Whether a connection is currently registered.
    pub fn contains(&self, id: &ConnectionId) -> bool {
        self.peers.iter().any(|c| &c.id == id)
    }
}
