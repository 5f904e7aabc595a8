//! `/health` endpoint body.

use serde::Serialize;
use std::time::Instant;

/// Health check response body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// Always `"ok"` while the process is up.
    pub status: String,
    /// Seconds since startup.
    pub uptime_secs: u64,
    /// Entries in the directory cache.
    pub directory_size: usize,
    /// Users currently flagged as late.
    pub violators: usize,
    /// Configured privileged identities.
    pub privileged: usize,
}

/// Build a health response from live counters.
pub fn health_check(
    start_time: Instant,
    directory_size: usize,
    violators: usize,
    privileged: usize,
) -> HealthResponse {
    HealthResponse {
        status: "ok".into(),
        uptime_secs: start_time.elapsed().as_secs(),
        directory_size,
        violators,
        privileged,
    }
}
