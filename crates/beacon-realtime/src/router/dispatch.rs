//! Type-keyed routing table.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::message::{Message, MessageKind, codec};

use super::handler::{InboundContext, MessageHandler};

/// What happened to one inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    /// A handler task was spawned.
    Routed(MessageKind),
    /// The payload was not a valid message.
    Malformed,
    /// No handler is registered for the message type.
    Unhandled(MessageKind),
}

/// Builds the routing table before any connection is accepted.
#[derive(Default)]
pub struct InboundRouterBuilder {
    handlers: HashMap<MessageKind, Arc<dyn MessageHandler>>,
}

impl InboundRouterBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the handler for a message type, replacing any earlier one.
    pub fn on(mut self, kind: MessageKind, handler: Arc<dyn MessageHandler>) -> Self {
        if self.handlers.insert(kind, handler).is_some() {
            warn!(kind, "Replacing existing inbound handler");
        }
        self
    }

    /// Freeze the table.
    pub fn build(self) -> InboundRouter {
        InboundRouter {
            handlers: self.handlers,
        }
    }
}

/// Read-only map from message type to handler.
pub struct InboundRouter {
    handlers: HashMap<MessageKind, Arc<dyn MessageHandler>>,
}

impl std::fmt::Debug for InboundRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut kinds: Vec<_> = self.handlers.keys().copied().collect();
        kinds.sort_unstable();
        f.debug_struct("InboundRouter").field("kinds", &kinds).finish()
    }
}

impl InboundRouter {
    /// Start building a router.
    pub fn builder() -> InboundRouterBuilder {
        InboundRouterBuilder::new()
    }

    /// A router with no handlers; every message is dropped.
    pub fn empty() -> Self {
        InboundRouterBuilder::new().build()
    }

    /// Whether a handler exists for `kind`.
    pub fn handles(&self, kind: MessageKind) -> bool {
        self.handlers.contains_key(&kind)
    }

    /// Decode one inbound frame and hand the message to its handler on a new task.
    pub fn route(&self, raw: &str, ctx: InboundContext) -> RouteOutcome {
        let message = match codec::decode_frame(raw) {
            Ok(message) => message,
            Err(e) => {
                warn!(
                    principal_id = %ctx.principal_id,
                    conn_id = %ctx.connection_id,
                    error = %e,
                    "Dropping malformed inbound message"
                );
                return RouteOutcome::Malformed;
            }
        };

        self.route_message(message, ctx)
    }

    /// Hand an already decoded message to its handler on a new task.
    pub fn route_message(&self, message: Message, ctx: InboundContext) -> RouteOutcome {
        let kind = message.kind();
        let Some(handler) = self.handlers.get(&kind).cloned() else {
            warn!(
                principal_id = %ctx.principal_id,
                conn_id = %ctx.connection_id,
                kind,
                "No handler for inbound message type"
            );
            return RouteOutcome::Unhandled(kind);
        };

        debug!(principal_id = %ctx.principal_id, kind, "Routing inbound message");
        tokio::spawn(async move {
            let principal_id = ctx.principal_id;
            if let Err(e) = handler.handle(ctx, message).await {
                warn!(principal_id = %principal_id, kind, error = %e, "Inbound handler failed");
            }
        });
        RouteOutcome::Routed(kind)
    }
}
