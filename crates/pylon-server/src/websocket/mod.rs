//! WebSocket gateway — upgrade handling and per-peer session tasks.
//!
//! Each accepted peer gets a read loop (this task) plus a spawned write
//! task fed by a bounded frame queue. The write task also owns the
//! heartbeat: periodic Ping frames, with unresponsive peers dropped after
//! the configured timeout. The hub only ever sees discrete binary frames
//! and the final disconnect.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{ConnectInfo, State};
use axum::response::IntoResponse;
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use metrics::{counter, gauge, histogram};
use pylon_core::ConnectionId;
use tokio::sync::mpsc;
use tracing::{info, instrument, warn};

use crate::hub::connection::PeerConnection;
use crate::metrics::{
    WS_CONNECTION_DURATION_SECONDS, WS_CONNECTIONS_ACTIVE, WS_CONNECTIONS_TOTAL,
    WS_DISCONNECTIONS_TOTAL,
};
use crate::server::AppState;

/// GET `/` and `/ws` — upgrade to a relay session.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let remote = addr.to_string();
    ws.max_message_size(state.config.max_frame_size)
        .on_upgrade(move |socket| run_session(socket, remote, state))
}

/// Run one peer's session from upgrade through cleanup.
#[instrument(skip_all, fields(remote = %remote))]
async fn run_session(ws: WebSocket, remote: String, state: AppState) {
    let (mut ws_tx, mut ws_rx) = ws.split();
    let (tx, mut rx) = mpsc::channel::<Bytes>(state.config.send_queue_capacity);
    let conn = Arc::new(PeerConnection::new(ConnectionId::new(), remote, tx));

    // Registration broadcasts the join notice (room permitting) before any
    // frame from this peer is processed. The capacity check happens inside
    // the hub so concurrent upgrades cannot overshoot the limit.
    if !state.hub.try_attach(conn.clone(), state.config.max_connections) {
        warn!(
            limit = state.config.max_connections,
            "connection limit reached, refusing peer"
        );
        return;
    }

    let session_start = Instant::now();
    counter!(WS_CONNECTIONS_TOTAL).increment(1);
    gauge!(WS_CONNECTIONS_ACTIVE).increment(1.0);

    // Write task: forwards queued frames and owns the heartbeat.
    let ping_interval = Duration::from_secs(state.config.heartbeat_interval_secs);
    let pong_timeout = Duration::from_secs(state.config.heartbeat_timeout_secs);
    let outbound_conn = conn.clone();
    let outbound = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(ping_interval);
        // Skip the immediate first tick
        let _ = ticker.tick().await;
        loop {
            tokio::select! {
                frame = rx.recv() => {
                    match frame {
                        Some(frame) => {
                            if ws_tx.send(Message::Binary(frame)).await.is_err() {
                                break;
                            }
                        }
                        None => break,
                    }
                }
                _ = ticker.tick() => {
                    if !outbound_conn.check_alive()
                        && outbound_conn.last_pong_elapsed() > pong_timeout
                    {
                        warn!("peer unresponsive for {pong_timeout:?}, dropping");
                        break;
                    }
                    if ws_tx.send(Message::Ping(Bytes::new())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    // Read loop: every binary message is one protocol frame.
    let cancel = state.shutdown.token();
    loop {
        tokio::select! {
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Binary(data))) => {
                        state.hub.handle_frame(&conn, &data);
                    }
                    Some(Ok(Message::Ping(_) | Message::Pong(_))) => {
                        conn.mark_alive();
                    }
                    Some(Ok(Message::Text(_))) => {
                        // The protocol is binary-only; stray text frames
                        // are dropped the same way malformed frames are.
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(_)) => break, // receive failure == termination
                }
            }
            () = cancel.cancelled() => break,
        }
    }

    // Cleanup runs before this task ends, whatever ended the loop.
    counter!(WS_DISCONNECTIONS_TOTAL).increment(1);
    gauge!(WS_CONNECTIONS_ACTIVE).decrement(1.0);
    histogram!(WS_CONNECTION_DURATION_SECONDS).record(session_start.elapsed().as_secs_f64());
    outbound.abort();
    state.hub.disconnect(&conn.id);
    info!(age = ?conn.age(), "session ended");
}
