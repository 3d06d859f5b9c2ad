//! # beacon-realtime
//!
//! Real-time connection hub for Beacon. Provides:
//!
//! - A single-task hub actor that owns the connection registry and enforces
//!   one live connection per principal
//! - Bounded per-principal offline buffering with oldest-first eviction
//! - Read/write pumps with liveness probes and write deadlines
//! - Typed inbound routing to handlers registered at startup
//! - Upgrade authorization against the session authority

pub mod connection;
pub mod hub;
pub mod message;
pub mod metrics;
pub mod offline;
pub mod router;
pub mod server;

pub use connection::authenticator::ConnectionGate;
pub use connection::handle::{Connection, ConnectionId};
pub use hub::{DispatchReport, HubHandle};
pub use message::{Frame, Message, MessageKind};
pub use metrics::{MetricsSnapshot, RealtimeMetrics};
pub use offline::OfflineBuffer;
pub use router::{InboundContext, InboundRouter, InboundRouterBuilder, MessageHandler, RouteOutcome};
pub use server::RealtimeEngine;
