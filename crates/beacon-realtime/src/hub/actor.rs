//! The hub loop.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use beacon_core::types::id::PrincipalId;

use crate::connection::handle::{Connection, ConnectionId};
use crate::message::Message;
use crate::metrics::RealtimeMetrics;
use crate::offline::OfflineBuffer;

use super::command::{DispatchReport, HubCommand};
use super::handle::HubHandle;
use super::registry::Registry;

/// Where a single dispatched copy ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Delivery {
    Queued,
    Buffered,
}

/// State owned by the hub task.
#[derive(Debug)]
pub struct Hub {
    inbox: mpsc::Receiver<HubCommand>,
    registry: Registry,
    offline: Arc<OfflineBuffer>,
    metrics: Arc<RealtimeMetrics>,
    shutdown: CancellationToken,
}

impl Hub {
    /// Spawn the hub loop.
    ///
    /// The loop runs until `shutdown` is cancelled or every [`HubHandle`] is
    /// dropped. On exit it closes every live connection.
    pub fn spawn(
        inbox_capacity: usize,
        offline: Arc<OfflineBuffer>,
        metrics: Arc<RealtimeMetrics>,
        shutdown: CancellationToken,
    ) -> (HubHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(inbox_capacity.max(1));
        let presence = Arc::new(DashMap::new());

        let hub = Self {
            inbox: rx,
            registry: Registry::new(Arc::clone(&presence)),
            offline,
            metrics,
            shutdown,
        };

        let task = tokio::spawn(hub.run());
        (HubHandle::new(tx, presence), task)
    }

    async fn run(mut self) {
        info!("Connection hub started");

        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                command = self.inbox.recv() => match command {
                    Some(command) => self.handle(command),
                    None => break,
                },
            }
        }

        let remaining = self.registry.drain();
        for conn in &remaining {
            conn.close();
            self.metrics.connection_closed();
        }
        info!(closed = remaining.len(), "Connection hub stopped");
    }

    fn handle(&mut self, command: HubCommand) {
        match command {
            HubCommand::Register(conn) => self.register(conn),
            HubCommand::Unregister {
                connection_id,
                principal_id,
            } => self.unregister(connection_id, principal_id),
            HubCommand::Dispatch {
                message,
                principal_ids,
                reply,
            } => {
                let report = self.dispatch_many(message, principal_ids);
                if let Some(reply) = reply {
                    // The caller may have stopped waiting.
                    let _ = reply.send(report);
                }
            }
            HubCommand::Snapshot(reply) => {
                let _ = reply.send(self.registry.snapshot());
            }
        }
    }

    fn register(&mut self, conn: Arc<Connection>) {
        if conn.is_closed() {
            debug!(conn_id = %conn.id, "Ignoring registration of closed connection");
            return;
        }

        let principal_id = conn.principal_id;
        if let Some(previous) = self.registry.insert(Arc::clone(&conn)) {
            previous.close();
            self.metrics.connection_superseded();
            self.metrics.connection_closed();
            info!(
                principal_id = %principal_id,
                old_conn_id = %previous.id,
                conn_id = %conn.id,
                "Connection superseded by a newer one"
            );
        }
        self.metrics.connection_opened();
        info!(principal_id = %principal_id, conn_id = %conn.id, "Connection registered");

        self.flush_offline(&conn);
    }

    /// Move everything buffered for the new connection's principal onto its
    /// queue, ahead of any later dispatch.
    fn flush_offline(&mut self, conn: &Arc<Connection>) {
        let pending = self.offline.drain(conn.principal_id);
        if pending.is_empty() {
            return;
        }

        let total = pending.len();
        let mut pending = pending.into_iter();
        while let Some(message) = pending.next() {
            match conn.try_enqueue(message) {
                Ok(()) => self.metrics.message_queued(),
                Err(err) => {
                    let stalled = matches!(err, TrySendError::Full(_));
                    let mut rest = vec![err.into_inner()];
                    rest.extend(pending);
                    let restored = rest.len();
                    let evicted = self.offline.restore(conn.principal_id, rest);
                    self.metrics.messages_evicted(evicted as u64);
                    warn!(
                        principal_id = %conn.principal_id,
                        conn_id = %conn.id,
                        restored,
                        "Could not flush offline messages, connection torn down"
                    );
                    self.teardown(conn, stalled);
                    return;
                }
            }
        }
        debug!(principal_id = %conn.principal_id, count = total, "Flushed offline messages");
    }

    fn unregister(&mut self, connection_id: ConnectionId, principal_id: PrincipalId) {
        match self.registry.remove(connection_id, principal_id) {
            Some(conn) => {
                conn.close();
                self.metrics.connection_closed();
                info!(principal_id = %principal_id, conn_id = %connection_id, "Connection unregistered");
            }
            None => {
                debug!(
                    principal_id = %principal_id,
                    conn_id = %connection_id,
                    "Unregister for connection that is no longer live"
                );
            }
        }
    }

    fn dispatch_many(&mut self, message: Message, principal_ids: Vec<PrincipalId>) -> DispatchReport {
        let mut report = DispatchReport::default();
        let last = principal_ids.len().saturating_sub(1);
        let mut message = Some(message);

        for (i, principal_id) in principal_ids.into_iter().enumerate() {
            let copy = if i == last {
                message.take()
            } else {
                message.clone()
            };
            let Some(copy) = copy else { break };

            match self.dispatch(copy, principal_id) {
                Delivery::Queued => report.delivered.push(principal_id),
                Delivery::Buffered => report.buffered.push(principal_id),
            }
        }
        report
    }

    fn dispatch(&mut self, message: Message, principal_id: PrincipalId) -> Delivery {
        let Some(conn) = self.registry.get(principal_id).cloned() else {
            return self.buffer(principal_id, message);
        };

        match conn.try_enqueue(message) {
            Ok(()) => {
                self.metrics.message_queued();
                debug!(principal_id = %principal_id, conn_id = %conn.id, "Message queued");
                Delivery::Queued
            }
            Err(TrySendError::Full(message)) => {
                warn!(
                    principal_id = %principal_id,
                    conn_id = %conn.id,
                    "Outbound queue full, tearing connection down"
                );
                self.teardown(&conn, true);
                self.buffer(principal_id, message)
            }
            Err(TrySendError::Closed(message)) => {
                debug!(principal_id = %principal_id, conn_id = %conn.id, "Connection already closing");
                self.teardown(&conn, false);
                self.buffer(principal_id, message)
            }
        }
    }

    fn buffer(&mut self, principal_id: PrincipalId, message: Message) -> Delivery {
        let evicted = self.offline.push(principal_id, message);
        self.metrics.message_buffered(evicted);
        debug!(principal_id = %principal_id, evicted, "Message buffered for offline principal");
        Delivery::Buffered
    }

    fn teardown(&mut self, conn: &Arc<Connection>, stalled: bool) {
        conn.close();
        if self.registry.remove(conn.id, conn.principal_id).is_some() {
            self.metrics.connection_closed();
            if stalled {
                self.metrics.stalled_teardown();
            }
        }
    }
}
