use std::time::Duration;

/// Pacing of a single playback session.
///
/// The defaults mimic the network footprint of a real player at the lowest
/// rendition: a couple of segments per playlist refresh, a long dwell per
/// segment and a short pause between refreshes.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// How many segments of each refreshed playlist are fetched.
    pub segments_per_refresh: usize,
    /// Simulated watch time after each segment fetch.
    pub segment_dwell: Duration,
    /// Pause between playlist refreshes.
    pub refresh_interval: Duration,
    /// Per-request timeout for segment fetches.
    pub segment_timeout: Duration,
    /// Bound on waiting for a session task to exit after a stop request.
    pub stop_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            segments_per_refresh: 2,
            segment_dwell: Duration::from_secs(40),
            refresh_interval: Duration::from_secs(5),
            segment_timeout: Duration::from_secs(30),
            stop_timeout: Duration::from_secs(5),
        }
    }
}
