//! Per-socket connection state, liveness timing, pumps, and upgrade gate.

pub mod authenticator;
pub mod handle;
pub mod heartbeat;
pub mod pump;

pub use authenticator::ConnectionGate;
pub use handle::{Connection, ConnectionId};
pub use heartbeat::HeartbeatConfig;
