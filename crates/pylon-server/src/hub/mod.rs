//! The relay hub core.
//!
//! ## Submodules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | `connection` | Per-peer handle: ID, remote label, send queue, liveness |
//! | `registry` | Live connection set, snapshot-based iteration |
//! | `identity` | Opaque identity byte-strings announced by peers |
//! | `room` | OPEN/CLOSED gate for join/leave notices |
//! | `dispatch` | Opcode dispatch for inbound frames |
//!
//! Registry, identity store, and room flag are deliberately plain (unlocked)
//! types composed into [`HubState`] behind a single `RwLock` — one
//! serialization boundary, so a connection can never be half-removed while
//! a concurrent snapshot is taken.

pub mod connection;
pub mod dispatch;
pub mod identity;
pub mod registry;
pub mod room;

use std::collections::VecDeque;
use std::sync::Arc;

use bytes::Bytes;
use metrics::counter;
use parking_lot::RwLock;
use pylon_core::{ConnectionId, Notice, protocol};
use tracing::{debug, info};

use crate::metrics::{RELAY_BROADCASTS_TOTAL, RELAY_SEND_FAILURES_TOTAL};
use self::connection::PeerConnection;
use self::identity::IdentityStore;
use self::registry::ConnectionRegistry;
use self::room::Room;

/// Everything the per-peer tasks share, guarded as one unit.
struct HubState {
    registry: ConnectionRegistry,
    identities: IdentityStore,
    room: Room,
}

/// Population counts, for logs and the health endpoint.
#[derive(Clone, Copy, Debug)]
pub struct HubStats {
    /// Currently registered connections.
    pub connections: usize,
    /// Connections that have announced an identity.
    pub identified: usize,
}

/// A connection removed during cleanup, with the facts captured under the
/// lock at removal time.
struct Departed {
    conn: Arc<PeerConnection>,
    /// Captured *before* the identity record was removed.
    was_identified: bool,
    room_open: bool,
    stats: HubStats,
}

/// The message relay hub: registry, identities, room gate, and fan-out.
pub struct RelayHub {
    state: RwLock<HubState>,
}

impl RelayHub {
    /// Create an empty hub with the room OPEN.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(HubState {
                registry: ConnectionRegistry::new(),
                identities: IdentityStore::new(),
                room: Room::new(),
            }),
        }
    }

    /// Register a newly accepted connection and, if the room is OPEN,
    /// announce the join to every peer — the new one included.
    pub fn attach(&self, conn: Arc<PeerConnection>) {
        let _ = self.try_attach(conn, usize::MAX);
    }

    /// [`attach`](Self::attach) with a capacity gate: returns `false` without
    /// registering when `limit` peers are already connected.
    ///
    /// The count check and the registration happen under the same write lock,
    /// so two racing upgrades cannot both slip past the limit.
    pub fn try_attach(&self, conn: Arc<PeerConnection>, limit: usize) -> bool {
        let remote = conn.remote.clone();
        let (open, stats) = {
            let mut state = self.state.write();
            if state.registry.count() >= limit {
                return false;
            }
            state.registry.register(conn);
            (state.room.is_open(), stats_of(&state))
        };
        info!(
            remote,
            peers = stats.connections,
            identified = stats.identified,
            "peer connected"
        );
        if open {
            self.broadcast(&Notice::PeerJoined.frame(), None);
        }
        true
    }

    /// Terminate one connection: remove it from the registry and identity
    /// store, then announce the departure if the room is OPEN.
    ///
    /// Idempotent — cleaning up an already-absent connection is a no-op.
    pub fn disconnect(&self, id: &ConnectionId) {
        self.reap(VecDeque::from([id.clone()]));
    }

    /// Send a frame to every registered peer except `exclude`.
    ///
    /// A per-peer send failure never aborts the pass: failed peers are
    /// collected and cleaned up after the snapshot has been fully walked.
    pub fn broadcast(&self, payload: &Bytes, exclude: Option<&ConnectionId>) {
        let failed = self.fan_out(payload, exclude);
        self.reap(failed.into());
    }

    /// Whether the room is currently OPEN.
    pub fn is_open(&self) -> bool {
        self.state.read().room.is_open()
    }

    /// Current registered connection count.
    pub fn connection_count(&self) -> usize {
        self.state.read().registry.count()
    }

    /// Current population counts.
    pub fn stats(&self) -> HubStats {
        stats_of(&self.state.read())
    }

    /// One fan-out pass over a fresh registry snapshot.
    ///
    /// Returns the IDs of peers whose send failed. Empty registry → no-op.
    fn fan_out(&self, payload: &Bytes, exclude: Option<&ConnectionId>) -> Vec<ConnectionId> {
        let (targets, stats) = {
            let state = self.state.read();
            (state.registry.snapshot(), stats_of(&state))
        };
        if targets.is_empty() {
            return Vec::new();
        }

        let mut failed = Vec::new();
        let mut sent = 0_usize;
        for conn in &targets {
            if exclude == Some(&conn.id) {
                continue;
            }
            if conn.send(payload.clone()) {
                sent += 1;
            } else {
                failed.push(conn.id.clone());
            }
        }

        counter!(RELAY_BROADCASTS_TOTAL).increment(1);
        if !failed.is_empty() {
            counter!(RELAY_SEND_FAILURES_TOTAL).increment(failed.len() as u64);
        }
        debug!(
            payload = %protocol::hex_preview(payload, 32),
            targets = sent,
            failed = failed.len(),
            peers = stats.connections,
            identified = stats.identified,
            "broadcast"
        );
        failed
    }

    /// Drain a disconnect queue.
    ///
    /// Each removal happens under the write lock before the next fan-out, so
    /// a just-removed peer is never a send target again. Leave notices that
    /// themselves fail feed their casualties back into the queue — iteration
    /// here, not recursion, keeps the cleanup fan-out bounded.
    fn reap(&self, mut queue: VecDeque<ConnectionId>) {
        while let Some(id) = queue.pop_front() {
            let Some(departed) = self.remove(&id) else {
                continue;
            };
            info!(
                remote = departed.conn.remote,
                identified = departed.was_identified,
                peers = departed.stats.connections,
                "peer disconnected"
            );
            if departed.room_open {
                queue.extend(self.fan_out(&Notice::PeerLeft.frame(), None));
            }
        }
    }

    /// Remove one connection from registry and identity store atomically.
    ///
    /// Identification status is captured before the record is deleted.
    fn remove(&self, id: &ConnectionId) -> Option<Departed> {
        let mut state = self.state.write();
        let was_identified = state.identities.contains(id);
        let conn = state.registry.unregister(id)?;
        let _ = state.identities.remove(id);
        Some(Departed {
            conn,
            was_identified,
            room_open: state.room.is_open(),
            stats: stats_of(&state),
        })
    }
}

impl Default for RelayHub {
    fn default() -> Self {
        Self::new()
    }
}

fn stats_of(state: &HubState) -> HubStats {
    HubStats {
        connections: state.registry.count(),
        identified: state.identities.identified_count(),
    }
}
