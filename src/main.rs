//! Beacon Server: session authority and real-time connection hub.
//!
//! Main entry point that wires all crates together and starts the server.

use std::sync::Arc;

use tracing_subscriber::{EnvFilter, fmt};

use beacon_auth::StaticIdentityDirectory;
use beacon_core::config::AppConfig;
use beacon_realtime::router::handler_fn;
use beacon_realtime::{InboundRouter, Message, MessageKind};

/// Inbound messages of this kind are sent straight back to their sender.
const ECHO_KIND: MessageKind = 1;

#[tokio::main]
async fn main() {
    let env = std::env::var("BEACON_ENV").unwrap_or_else(|_| "development".to_string());

    let config = match AppConfig::load(&env) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);
    tracing::info!(env = %env, "Starting Beacon v{}", env!("CARGO_PKG_VERSION"));

    let identities = Arc::new(StaticIdentityDirectory::from_config(&config.identity));
    tracing::info!(principals = identities.len(), "Identity directory loaded");

    if let Err(e) = beacon_api::run_server(config, identities, inbound_router()).await {
        tracing::error!(error = %e, "Server error");
        std::process::exit(1);
    }
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

fn inbound_router() -> InboundRouter {
    InboundRouter::builder()
        .on(
            ECHO_KIND,
            handler_fn(|ctx, message: Message| async move {
                ctx.hub.send_to_principal(message, ctx.principal_id).await;
                Ok(())
            }),
        )
        .build()
}
