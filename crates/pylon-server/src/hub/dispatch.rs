//! Opcode dispatch for inbound frames.

use std::sync::Arc;

use bytes::Bytes;
use metrics::counter;
use pylon_core::{Inbound, protocol};
use tracing::{debug, info};

use super::RelayHub;
use super::connection::PeerConnection;
use crate::metrics::RELAY_FRAMES_TOTAL;

impl RelayHub {
    /// Handle one inbound frame from a peer.
    ///
    /// Malformed frames (empty, short or unknown room-control) are dropped
    /// without touching any state; an unknown opcode is relayed as an
    /// opaque payload. This never fails — every outcome is either "ignore
    /// the frame" or "some peer got disconnected along the way".
    pub fn handle_frame(&self, conn: &Arc<PeerConnection>, frame: &Bytes) {
        // Any inbound traffic counts as a liveness signal, malformed or not.
        conn.mark_alive();
        let Some(kind) = Inbound::classify(frame) else {
            debug!(
                remote = conn.remote,
                payload = %protocol::hex_preview(frame, 32),
                "ignoring malformed frame"
            );
            return;
        };
        counter!(RELAY_FRAMES_TOTAL, "kind" => kind.kind()).increment(1);
        debug!(
            remote = conn.remote,
            kind = kind.kind(),
            len = frame.len(),
            payload = %protocol::hex_preview(frame, 32),
            "frame received"
        );

        match kind {
            Inbound::RoomControl(cmd) => {
                let notice = {
                    let mut state = self.state.write();
                    state.room.apply(cmd)
                };
                // Self-transitions are silent: no notice, no broadcast.
                if let Some(notice) = notice {
                    info!(remote = conn.remote, ?cmd, "room transition");
                    self.broadcast(&notice.frame(), None);
                }
            }
            Inbound::LatencyProbe => {
                // Best-effort echo to the sender only.
                let _ = conn.send(frame.clone());
            }
            Inbound::Drift => {}
            Inbound::Identity => {
                let identity = frame.slice(1..);
                let identified = {
                    let mut state = self.state.write();
                    state.identities.set(conn.id.clone(), identity.clone());
                    state.identities.identified_count()
                };
                info!(
                    remote = conn.remote,
                    identity = %protocol::hex_preview(&identity, 16),
                    identified,
                    "identity announced"
                );
                // Full frame, opcode included, to everyone — sender too.
                self.broadcast(frame, None);
            }
            Inbound::Opaque => self.broadcast(frame, Some(&conn.id)),
        }
    }
}
