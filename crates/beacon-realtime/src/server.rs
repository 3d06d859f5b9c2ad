//! Top-level real-time engine that ties together all subsystems.

use std::fmt::Display;
use std::sync::Arc;

use futures::{Sink, Stream};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use beacon_auth::SessionAuthority;
use beacon_core::config::{ConnectPolicy, RealtimeConfig};
use beacon_core::error::AppError;
use beacon_core::result::AppResult;
use beacon_core::traits::identity::IdentityProvider;
use beacon_core::types::id::PrincipalId;
use beacon_core::types::principal::Principal;

use crate::connection::authenticator::ConnectionGate;
use crate::connection::handle::{Connection, ConnectionId};
use crate::connection::heartbeat::HeartbeatConfig;
use crate::connection::pump::{read_pump, write_pump};
use crate::hub::{DispatchReport, Hub, HubHandle};
use crate::message::{Frame, Message};
use crate::metrics::{MetricsSnapshot, RealtimeMetrics};
use crate::offline::OfflineBuffer;
use crate::router::InboundRouter;

/// Central real-time engine that owns the hub and spawns per-socket pumps.
#[derive(Clone)]
pub struct RealtimeEngine {
    hub: HubHandle,
    gate: ConnectionGate,
    router: Arc<InboundRouter>,
    offline: Arc<OfflineBuffer>,
    metrics: Arc<RealtimeMetrics>,
    config: RealtimeConfig,
    heartbeat: HeartbeatConfig,
    shutdown: CancellationToken,
    hub_task: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl std::fmt::Debug for RealtimeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeEngine")
            .field("connect_policy", &self.config.connect_policy)
            .field("connected", &self.hub.connected_count())
            .finish()
    }
}

impl RealtimeEngine {
    /// Validates `config` and starts the hub loop.
    pub fn start(
        config: RealtimeConfig,
        authority: Arc<SessionAuthority>,
        identities: Arc<dyn IdentityProvider>,
        router: InboundRouter,
    ) -> AppResult<Self> {
        config.validate()?;

        let metrics = Arc::new(RealtimeMetrics::new());
        let offline = Arc::new(OfflineBuffer::new(config.offline_buffer_capacity));
        let shutdown = CancellationToken::new();
        let (hub, hub_task) = Hub::spawn(
            config.hub_inbox_capacity,
            Arc::clone(&offline),
            Arc::clone(&metrics),
            shutdown.child_token(),
        );

        info!(
            connect_policy = config.connect_policy.as_str(),
            outbound_capacity = config.outbound_queue_capacity,
            offline_capacity = config.offline_buffer_capacity,
            "Real-time engine initialized"
        );

        Ok(Self {
            hub,
            gate: ConnectionGate::new(authority, identities),
            router: Arc::new(router),
            offline,
            metrics,
            heartbeat: HeartbeatConfig::from_config(&config),
            config,
            shutdown,
            hub_task: Arc::new(Mutex::new(Some(hub_task))),
        })
    }

    /// Authorizes a connect attempt under the configured policy.
    pub async fn authorize(&self, token: &str) -> AppResult<Principal> {
        self.authorize_with(token, self.config.connect_policy).await
    }

    /// Authorizes a connect attempt under an explicit policy.
    pub async fn authorize_with(&self, token: &str, policy: ConnectPolicy) -> AppResult<Principal> {
        if self.shutdown.is_cancelled() {
            return Err(AppError::service_unavailable("Real-time engine is shutting down"));
        }
        self.gate.authorize(token, policy).await
    }

    /// Registers an already-authorized socket and spawns its pumps.
    ///
    /// Registration happens before either pump starts, so anything buffered
    /// for the principal is queued ahead of later traffic and a pump exit
    /// always reaches the hub after the registration.
    pub async fn attach<S, R, E>(
        &self,
        principal_id: PrincipalId,
        sink: S,
        stream: R,
    ) -> AppResult<ConnectionId>
    where
        S: Sink<Frame> + Send + 'static,
        S::Error: Display,
        R: Stream<Item = Result<Frame, E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        let (conn, outbound) = Connection::new(principal_id, self.config.outbound_queue_capacity);
        self.hub.register(Arc::clone(&conn)).await?;

        tokio::spawn(write_pump(
            Arc::clone(&conn),
            outbound,
            sink,
            self.hub.clone(),
            self.heartbeat,
            Arc::clone(&self.metrics),
        ));
        tokio::spawn(read_pump(
            Arc::clone(&conn),
            stream,
            self.hub.clone(),
            Arc::clone(&self.router),
            self.heartbeat,
            Arc::clone(&self.metrics),
        ));

        Ok(conn.id)
    }

    /// Authorizes `token` and, if accepted, attaches the socket halves.
    pub async fn upgrade_connection<S, R, E>(
        &self,
        token: &str,
        policy: ConnectPolicy,
        sink: S,
        stream: R,
    ) -> AppResult<(Principal, ConnectionId)>
    where
        S: Sink<Frame> + Send + 'static,
        S::Error: Display,
        R: Stream<Item = Result<Frame, E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        let principal = self.authorize_with(token, policy).await?;
        let conn_id = self.attach(principal.id, sink, stream).await?;
        Ok((principal, conn_id))
    }

    /// Fire-and-forget delivery to one principal.
    pub async fn send_to_principal(&self, message: Message, principal_id: PrincipalId) {
        self.hub.send_to_principal(message, principal_id).await;
    }

    /// Fire-and-forget delivery to several principals.
    pub async fn send_to_principals(&self, message: Message, principal_ids: Vec<PrincipalId>) {
        self.hub.send_to_principals(message, principal_ids).await;
    }

    /// Delivery to several principals, reporting who was live and who was buffered.
    pub async fn dispatch_many(
        &self,
        message: Message,
        principal_ids: Vec<PrincipalId>,
    ) -> AppResult<DispatchReport> {
        self.hub.dispatch_many(message, principal_ids).await
    }

    /// Whether `principal_id` has a live connection.
    pub fn is_connected(&self, principal_id: PrincipalId) -> bool {
        self.hub.is_connected(principal_id)
    }

    /// Number of principals with a live connection.
    pub fn connected_count(&self) -> usize {
        self.hub.connected_count()
    }

    /// Messages waiting in a principal's offline buffer.
    pub fn buffered_for(&self, principal_id: PrincipalId) -> usize {
        self.offline.len(principal_id)
    }

    /// Point-in-time copy of the engine counters.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Handle to the hub loop.
    pub fn hub(&self) -> &HubHandle {
        &self.hub
    }

    /// Settings the engine was started with.
    pub fn config(&self) -> &RealtimeConfig {
        &self.config
    }

    /// Stops the hub, which closes every live connection and lets the pumps
    /// wind down. Safe to call more than once.
    pub async fn shutdown(&self) -> AppResult<()> {
        info!("Shutting down real-time engine");
        self.shutdown.cancel();

        let task = self.hub_task.lock().await.take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                warn!(error = %e, "Hub task ended abnormally");
                return Err(AppError::internal(format!("Hub task failed: {e}")));
            }
        }

        info!("Real-time engine shut down");
        Ok(())
    }
}
