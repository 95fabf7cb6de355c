//! Per-peer connection state.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use bytes::Bytes;
use parking_lot::Mutex;
use pylon_core::ConnectionId;
use tokio::sync::mpsc;

/// One live peer connection.
///
/// Owned by the WebSocket task that created it; the registry and broadcast
/// path hold `Arc` references only. Sending is non-blocking: frames are
/// queued into the peer's write task, and a full or closed queue counts as
/// a send failure.
pub struct PeerConnection {
    /// Unique connection ID.
    pub id: ConnectionId,
    /// Best-effort `host:port` label of the remote end (`"unknown"` when
    /// the transport cannot provide one).
    pub remote: String,
    /// Frame channel into the peer's write task.
    tx: mpsc::Sender<Bytes>,
    /// When this connection was established.
    pub connected_at: Instant,
    /// Whether the peer has responded since the last heartbeat check.
    pub is_alive: AtomicBool,
    /// When the last pong (or any liveness signal) was received.
    last_pong: Mutex<Instant>,
    /// Frames dropped because the send queue was full or closed.
    dropped_frames: AtomicU64,
}

impl PeerConnection {
    /// Create a new connection around a frame channel.
    pub fn new(id: ConnectionId, remote: String, tx: mpsc::Sender<Bytes>) -> Self {
        let now = Instant::now();
        Self {
            id,
            remote,
            tx,
            connected_at: now,
            is_alive: AtomicBool::new(true),
            last_pong: Mutex::new(now),
            dropped_frames: AtomicU64::new(0),
        }
    }

    /// Queue a frame for delivery to this peer.
    ///
    /// Returns `false` if the queue is full or the write task is gone, and
    /// increments the dropped-frame counter.
    pub fn send(&self, frame: Bytes) -> bool {
        if self.tx.try_send(frame).is_ok() {
            true
        } else {
            let _ = self.dropped_frames.fetch_add(1, Ordering::Relaxed);
            false
        }
    }

    /// Total frames dropped for this peer.
    pub fn drop_count(&self) -> u64 {
        self.dropped_frames.load(Ordering::Relaxed)
    }

    /// Mark the connection as alive (pong or inbound traffic seen).
    pub fn mark_alive(&self) {
        self.is_alive.store(true, Ordering::Relaxed);
        *self.last_pong.lock() = Instant::now();
    }

    /// Duration since the last liveness signal.
    pub fn last_pong_elapsed(&self) -> Duration {
        self.last_pong.lock().elapsed()
    }

    /// Check and reset the alive flag for the heartbeat loop.
    ///
    /// Returns `true` if the peer was alive since the last check.
    pub fn check_alive(&self) -> bool {
        self.is_alive.swap(false, Ordering::Relaxed)
    }

    /// Connection age.
    pub fn age(&self) -> Duration {
        self.connected_at.elapsed()
    }
}

/// Test helper: a connection plus the receiving end of its frame channel.
#[cfg(test)]
pub(crate) fn test_pair(
    capacity: usize,
) -> (std::sync::Arc<PeerConnection>, mpsc::Receiver<Bytes>) {
    let (tx, rx) = mpsc::channel(capacity);
    let conn = std::sync::Arc::new(PeerConnection::new(
        ConnectionId::new(),
        "test:0".into(),
        tx,
    ));
    (conn, rx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_queues_frame() {
        let (conn, mut rx) = test_pair(8);
        assert!(conn.send(Bytes::from_static(&[0x42, 0xFF])));
        let frame = rx.recv().await.unwrap();
        assert_eq!(&frame[..], &[0x42, 0xFF]);
    }

    #[tokio::test]
    async fn send_to_closed_queue_fails() {
        let (conn, rx) = test_pair(8);
        drop(rx);
        assert!(!conn.send(Bytes::from_static(&[0x01])));
        assert_eq!(conn.drop_count(), 1);
    }

    #[tokio::test]
    async fn send_to_full_queue_fails() {
        let (conn, _rx) = test_pair(1);
        assert!(conn.send(Bytes::from_static(&[0x01])));
        assert!(!conn.send(Bytes::from_static(&[0x02])));
        assert_eq!(conn.drop_count(), 1);
    }

    #[test]
    fn check_alive_resets_flag() {
        let (conn, _rx) = test_pair(1);
        assert!(conn.check_alive());
        assert!(!conn.check_alive());
        conn.mark_alive();
        assert!(conn.check_alive());
    }

    #[test]
    fn age_increases() {
        let (conn, _rx) = test_pair(1);
        let a = conn.age();
        std::thread::sleep(Duration::from_millis(5));
        assert!(conn.age() > a);
    }

    #[test]
    fn remote_label_kept() {
        let (tx, _rx) = mpsc::channel(1);
        let conn = PeerConnection::new(ConnectionId::new(), "unknown".into(), tx);
        assert_eq!(conn.remote, "unknown");
    }
}
