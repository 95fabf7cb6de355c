//! Health check endpoint payload.

use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::hub::HubStats;

/// Response body for `GET /health`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always `"ok"` while the process is serving.
    pub status: String,
    /// Seconds since the server started.
    pub uptime_secs: u64,
    /// Currently connected peers.
    pub connections: usize,
    /// Peers that have announced an identity.
    pub identified: usize,
}

/// Build a health response from the server start time and hub stats.
pub fn health_check(start_time: Instant, stats: HubStats) -> HealthResponse {
    HealthResponse {
        status: "ok".into(),
        uptime_secs: start_time.elapsed().as_secs(),
        connections: stats.connections,
        identified: stats.identified,
    }
}
