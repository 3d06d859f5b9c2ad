//! Handler contract for inbound messages.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use beacon_core::result::AppResult;
use beacon_core::types::id::PrincipalId;

use crate::connection::handle::ConnectionId;
use crate::hub::HubHandle;
use crate::message::Message;

/// Who sent an inbound message, and a way to answer.
#[derive(Debug, Clone)]
pub struct InboundContext {
    /// Principal owning the sending connection.
    pub principal_id: PrincipalId,
    /// Connection the message arrived on.
    pub connection_id: ConnectionId,
    /// Hub client for replies and fan-out.
    pub hub: HubHandle,
}

/// Handles one inbound message type.
///
/// Each invocation runs on its own task and is allowed to finish even if the
/// connection that delivered the message goes away.
#[async_trait]
pub trait MessageHandler: Send + Sync + 'static {
    /// Handle a single message.
    async fn handle(&self, ctx: InboundContext, message: Message) -> AppResult<()>;
}

struct FnHandler<F>(F);

#[async_trait]
impl<F, Fut> MessageHandler for FnHandler<F>
where
    F: Fn(InboundContext, Message) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = AppResult<()>> + Send + 'static,
{
    async fn handle(&self, ctx: InboundContext, message: Message) -> AppResult<()> {
        (self.0)(ctx, message).await
    }
}

/// Wrap an async closure as a [`MessageHandler`].
pub fn handler_fn<F, Fut>(f: F) -> Arc<dyn MessageHandler>
where
    F: Fn(InboundContext, Message) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = AppResult<()>> + Send + 'static,
{
    Arc::new(FnHandler(f))
}
