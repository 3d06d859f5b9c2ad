//! Liveness timing shared by the read and write pumps.

use std::time::Duration;

use beacon_core::config::RealtimeConfig;

/// Heartbeat configuration.
#[derive(Debug, Clone, Copy)]
pub struct HeartbeatConfig {
    /// Interval between pings.
    pub ping_interval: Duration,
    /// Read deadline, pushed forward on every pong.
    pub pong_wait: Duration,
    /// Deadline for a single socket write.
    pub write_timeout: Duration,
    /// Largest inbound text frame accepted, in bytes.
    pub max_frame_bytes: usize,
}

impl HeartbeatConfig {
    /// Build from the realtime configuration section.
    pub fn from_config(config: &RealtimeConfig) -> Self {
        Self {
            ping_interval: config.ping_interval(),
            pong_wait: config.pong_wait(),
            write_timeout: config.write_timeout(),
            max_frame_bytes: config.max_frame_bytes,
        }
    }
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self::from_config(&RealtimeConfig::default())
    }
}
