//! Cloneable client for the hub loop.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{mpsc, oneshot};
use tracing::warn;

use beacon_core::error::AppError;
use beacon_core::result::AppResult;
use beacon_core::types::id::PrincipalId;

use crate::connection::handle::{Connection, ConnectionId};
use crate::message::Message;

use super::command::{DispatchReport, HubCommand, HubSnapshot};

/// Handle used by pumps, the engine, and collaborators to talk to the hub.
#[derive(Debug, Clone)]
pub struct HubHandle {
    tx: mpsc::Sender<HubCommand>,
    presence: Arc<DashMap<PrincipalId, ConnectionId>>,
}

impl HubHandle {
    pub(crate) fn new(
        tx: mpsc::Sender<HubCommand>,
        presence: Arc<DashMap<PrincipalId, ConnectionId>>,
    ) -> Self {
        Self { tx, presence }
    }

    async fn send(&self, command: HubCommand) -> AppResult<()> {
        self.tx
            .send(command)
            .await
            .map_err(|_| AppError::service_unavailable("Connection hub is not running"))
    }

    /// Register a connection as the live one for its principal.
    pub async fn register(&self, conn: Arc<Connection>) -> AppResult<()> {
        self.send(HubCommand::Register(conn)).await
    }

    /// Unregister a connection. Does nothing if it has been superseded.
    pub async fn unregister(
        &self,
        connection_id: ConnectionId,
        principal_id: PrincipalId,
    ) -> AppResult<()> {
        self.send(HubCommand::Unregister {
            connection_id,
            principal_id,
        })
        .await
    }

    /// Deliver a message to one principal and report where it went.
    pub async fn dispatch(
        &self,
        message: Message,
        principal_id: PrincipalId,
    ) -> AppResult<DispatchReport> {
        self.dispatch_many(message, vec![principal_id]).await
    }

    /// Deliver a message to several principals and report where each copy went.
    pub async fn dispatch_many(
        &self,
        message: Message,
        principal_ids: Vec<PrincipalId>,
    ) -> AppResult<DispatchReport> {
        let (reply, rx) = oneshot::channel();
        self.send(HubCommand::Dispatch {
            message,
            principal_ids,
            reply: Some(reply),
        })
        .await?;
        rx.await
            .map_err(|_| AppError::service_unavailable("Connection hub stopped before replying"))
    }

    /// Deliver a message to one principal without waiting for the outcome.
    pub async fn send_to_principal(&self, message: Message, principal_id: PrincipalId) {
        self.send_to_principals(message, vec![principal_id]).await;
    }

    /// Deliver a message to several principals without waiting for the outcome.
    pub async fn send_to_principals(&self, message: Message, principal_ids: Vec<PrincipalId>) {
        let command = HubCommand::Dispatch {
            message,
            principal_ids,
            reply: None,
        };
        if let Err(e) = self.send(command).await {
            warn!(error = %e, "Dropping outbound message");
        }
    }

    /// Current registry contents.
    pub async fn snapshot(&self) -> AppResult<HubSnapshot> {
        let (reply, rx) = oneshot::channel();
        self.send(HubCommand::Snapshot(reply)).await?;
        rx.await
            .map_err(|_| AppError::service_unavailable("Connection hub stopped before replying"))
    }

    /// Whether a principal currently has a live connection.
    pub fn is_connected(&self, principal_id: PrincipalId) -> bool {
        self.presence.contains_key(&principal_id)
    }

    /// Live connection id for a principal, if any.
    pub fn connection_of(&self, principal_id: PrincipalId) -> Option<ConnectionId> {
        self.presence.get(&principal_id).map(|entry| *entry.value())
    }

    /// Number of principals with a live connection.
    pub fn connected_count(&self) -> usize {
        self.presence.len()
    }
}
