//! Identity records announced by peers.

use std::collections::HashMap;

use bytes::Bytes;
use pylon_core::ConnectionId;

/// Maps a connection to the opaque identity byte-string it announced.
///
/// A record exists only after the peer sends an identity frame; a later
/// announcement overwrites the earlier one. Content is never validated —
/// any payload is accepted as-is.
#[derive(Default)]
pub struct IdentityStore {
    records: HashMap<ConnectionId, Bytes>,
}

impl IdentityStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            records: HashMap::new(),
        }
    }

    /// Store or overwrite the identity for a connection.
    pub fn set(&mut self, id: ConnectionId, identity: Bytes) {
        let _ = self.records.insert(id, identity);
    }

    /// Remove the record for a connection, if any. Returns whether one
    /// was present.
    pub fn remove(&mut self, id: &ConnectionId) -> bool {
        self.records.remove(id).is_some()
    }

    /// The identity announced by a connection, if any.
    pub fn get(&self, id: &ConnectionId) -> Option<&Bytes> {
        self.records.get(id)
    }

    /// Whether a connection has announced an identity.
    pub fn contains(&self, id: &ConnectionId) -> bool {
        self.records.contains_key(id)
    }

    /// Number of identified connections.
    pub fn identified_count(&self) -> usize {
        self.records.len()
    }
}
