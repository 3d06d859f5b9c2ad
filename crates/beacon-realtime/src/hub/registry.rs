//! Registry state owned by the hub loop.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;

use beacon_core::types::id::PrincipalId;

use crate::connection::handle::{Connection, ConnectionId};

use super::command::HubSnapshot;

/// Live connections, indexed by id and by principal.
///
/// Only the hub loop mutates this. Every write to `by_principal` is mirrored
/// into the shared `presence` index so other tasks can answer "is X
/// connected" without a round trip through the inbox.
#[derive(Debug)]
pub struct Registry {
    live: HashMap<ConnectionId, Arc<Connection>>,
    by_principal: HashMap<PrincipalId, ConnectionId>,
    presence: Arc<DashMap<PrincipalId, ConnectionId>>,
}

impl Registry {
    /// Create an empty registry mirroring into `presence`.
    pub fn new(presence: Arc<DashMap<PrincipalId, ConnectionId>>) -> Self {
        Self {
            live: HashMap::new(),
            by_principal: HashMap::new(),
            presence,
        }
    }

    /// Insert a connection as the live one for its principal.
    ///
    /// Returns the connection it replaced, if any. Inserting a connection
    /// that is already live returns `None` and changes nothing.
    pub fn insert(&mut self, conn: Arc<Connection>) -> Option<Arc<Connection>> {
        let principal_id = conn.principal_id;
        let previous = match self.by_principal.insert(principal_id, conn.id) {
            Some(old_id) if old_id == conn.id => return None,
            Some(old_id) => self.live.remove(&old_id),
            None => None,
        };
        self.presence.insert(principal_id, conn.id);
        self.live.insert(conn.id, conn);
        previous
    }

    /// Remove a connection, but only if it is still the live one for
    /// `principal_id`.
    pub fn remove(
        &mut self,
        connection_id: ConnectionId,
        principal_id: PrincipalId,
    ) -> Option<Arc<Connection>> {
        if self.by_principal.get(&principal_id) != Some(&connection_id) {
            return None;
        }
        self.by_principal.remove(&principal_id);
        self.presence.remove(&principal_id);
        self.live.remove(&connection_id)
    }

    /// The live connection for a principal.
    pub fn get(&self, principal_id: PrincipalId) -> Option<&Arc<Connection>> {
        self.by_principal
            .get(&principal_id)
            .and_then(|id| self.live.get(id))
    }

    /// Number of live connections.
    pub fn len(&self) -> usize {
        self.live.len()
    }

    /// Whether no connection is live.
    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// Remove and return every live connection.
    pub fn drain(&mut self) -> Vec<Arc<Connection>> {
        self.by_principal.clear();
        self.presence.clear();
        self.live.drain().map(|(_, conn)| conn).collect()
    }

    /// Current contents, ordered by principal.
    pub fn snapshot(&self) -> HubSnapshot {
        let mut connections: Vec<_> = self
            .by_principal
            .iter()
            .map(|(principal, conn)| (*principal, *conn))
            .collect();
        connections.sort();
        HubSnapshot { connections }
    }
}
