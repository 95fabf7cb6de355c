//! # pylon-server
//!
//! The relay hub and its Axum WebSocket front door.
//!
//! - Hub core: connection registry, identity store, room state machine,
//!   broadcast fan-out, and opcode dispatch (all behind one lock)
//! - WebSocket gateway: upgrade, per-peer read/write tasks, heartbeat
//! - HTTP endpoints: health check, Prometheus metrics
//! - Graceful shutdown via `tokio::signal` + `CancellationToken`

#![deny(unsafe_code)]

pub mod config;
pub mod health;
pub mod hub;
pub mod metrics;
pub mod server;
pub mod shutdown;
pub mod websocket;
