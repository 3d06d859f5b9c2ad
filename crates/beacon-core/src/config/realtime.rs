//! Connection hub configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Who may open a real-time connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ConnectPolicy {
    /// No connections are accepted at all.
    #[serde(rename = "none")]
    Closed,
    /// Any principal holding a valid access credential.
    #[default]
    #[serde(rename = "login")]
    LoginRequired,
    /// Only principals flagged as admin by the identity directory.
    #[serde(rename = "admin")]
    AdminRequired,
}

impl ConnectPolicy {
    /// Returns the configuration name of the policy.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Closed => "none",
            Self::LoginRequired => "login",
            Self::AdminRequired => "admin",
        }
    }
}

/// Real-time (WebSocket) hub configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// Policy applied to every upgrade request.
    #[serde(default)]
    pub connect_policy: ConnectPolicy,
    /// Per-connection outbound queue capacity.
    #[serde(default = "default_outbound_capacity")]
    pub outbound_queue_capacity: usize,
    /// Per-principal offline buffer capacity.
    #[serde(default = "default_offline_capacity")]
    pub offline_buffer_capacity: usize,
    /// Capacity of the hub's command inbox.
    #[serde(default = "default_inbox_capacity")]
    pub hub_inbox_capacity: usize,
    /// Interval between liveness probes, in seconds.
    #[serde(default = "default_ping_interval")]
    pub ping_interval_seconds: u64,
    /// Read deadline refreshed on every pong, in seconds.
    #[serde(default = "default_pong_wait")]
    pub pong_wait_seconds: u64,
    /// Deadline for a single socket write, in seconds.
    #[serde(default = "default_write_timeout")]
    pub write_timeout_seconds: u64,
    /// Largest inbound frame accepted, in bytes.
    #[serde(default = "default_max_frame")]
    pub max_frame_bytes: usize,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            connect_policy: ConnectPolicy::default(),
            outbound_queue_capacity: default_outbound_capacity(),
            offline_buffer_capacity: default_offline_capacity(),
            hub_inbox_capacity: default_inbox_capacity(),
            ping_interval_seconds: default_ping_interval(),
            pong_wait_seconds: default_pong_wait(),
            write_timeout_seconds: default_write_timeout(),
            max_frame_bytes: default_max_frame(),
        }
    }
}

impl RealtimeConfig {
    /// Ping interval as a [`Duration`].
    pub fn ping_interval(&self) -> Duration {
        Duration::from_secs(self.ping_interval_seconds)
    }

    /// Pong wait as a [`Duration`].
    pub fn pong_wait(&self) -> Duration {
        Duration::from_secs(self.pong_wait_seconds)
    }

    /// Write timeout as a [`Duration`].
    pub fn write_timeout(&self) -> Duration {
        Duration::from_secs(self.write_timeout_seconds)
    }

    /// Validates capacities and the liveness timing relationship.
    ///
    /// A probe must be able to complete a round trip before the read deadline
    /// elapses, and a single write must never outlast the read deadline.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.outbound_queue_capacity == 0
            || self.offline_buffer_capacity == 0
            || self.hub_inbox_capacity == 0
        {
            return Err(AppError::configuration(
                "realtime capacities must be greater than zero",
            ));
        }
        if self.max_frame_bytes == 0 {
            return Err(AppError::configuration(
                "max_frame_bytes must be greater than zero",
            ));
        }
        if self.ping_interval_seconds == 0 || self.ping_interval_seconds >= self.pong_wait_seconds
        {
            return Err(AppError::configuration(format!(
                "ping_interval_seconds ({}) must be non-zero and below pong_wait_seconds ({})",
                self.ping_interval_seconds, self.pong_wait_seconds
            )));
        }
        if self.write_timeout_seconds == 0 || self.write_timeout_seconds >= self.pong_wait_seconds
        {
            return Err(AppError::configuration(format!(
                "write_timeout_seconds ({}) must be non-zero and below pong_wait_seconds ({})",
                self.write_timeout_seconds, self.pong_wait_seconds
            )));
        }
        Ok(())
    }
}

fn default_outbound_capacity() -> usize {
    256
}

fn default_offline_capacity() -> usize {
    50
}

fn default_inbox_capacity() -> usize {
    1024
}

fn default_ping_interval() -> u64 {
    100
}

fn default_pong_wait() -> u64 {
    120
}

fn default_write_timeout() -> u64 {
    10
}

fn default_max_frame() -> usize {
    512
}
