//! Commands accepted by the hub loop.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::oneshot;

use beacon_core::types::id::PrincipalId;

use crate::connection::handle::{Connection, ConnectionId};
use crate::message::Message;

/// A request processed by the hub loop.
#[derive(Debug)]
pub enum HubCommand {
    /// Make a connection the live one for its principal.
    Register(Arc<Connection>),
    /// Remove a connection if it is still the live one for its principal.
    Unregister {
        /// Connection to remove.
        connection_id: ConnectionId,
        /// Principal it was registered under.
        principal_id: PrincipalId,
    },
    /// Deliver a message to each principal, live or buffered.
    Dispatch {
        /// Message to deliver.
        message: Message,
        /// Recipients.
        principal_ids: Vec<PrincipalId>,
        /// Where to report the outcome, if anyone is listening.
        reply: Option<oneshot::Sender<DispatchReport>>,
    },
    /// Report the current registry contents.
    Snapshot(oneshot::Sender<HubSnapshot>),
}

/// How a dispatch was partitioned between live and offline recipients.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    /// Principals whose live connection accepted the message.
    pub delivered: Vec<PrincipalId>,
    /// Principals whose copy went to the offline buffer.
    pub buffered: Vec<PrincipalId>,
}

impl DispatchReport {
    /// Total number of recipients accounted for.
    pub fn len(&self) -> usize {
        self.delivered.len() + self.buffered.len()
    }

    /// Whether the dispatch had no recipients.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Point-in-time view of the registry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HubSnapshot {
    /// Live `(principal, connection)` pairs, ordered by principal.
    pub connections: Vec<(PrincipalId, ConnectionId)>,
}
