//! Inbound message routing by message type.

pub mod dispatch;
pub mod handler;

pub use dispatch::{InboundRouter, InboundRouterBuilder, RouteOutcome};
pub use handler::{InboundContext, MessageHandler, handler_fn};
