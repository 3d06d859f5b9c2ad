//! Application builder: wires the store, session authority, and real-time
//! engine into an Axum app and runs it.

use std::sync::Arc;

use tracing::{error, info};

use beacon_auth::{LoginService, SessionAuthority};
use beacon_cache::StoreManager;
use beacon_core::config::AppConfig;
use beacon_core::error::AppError;
use beacon_core::traits::identity::IdentityProvider;
use beacon_realtime::{InboundRouter, RealtimeEngine};

use crate::router::build_router;
use crate::state::AppState;

/// Builds the complete Axum application.
pub fn build_app(state: AppState) -> axum::Router {
    build_router(state)
}

/// Connects the store, loads configured machine clients, and starts the
/// real-time engine.
pub async fn build_state(
    config: AppConfig,
    identities: Arc<dyn IdentityProvider>,
    inbound: InboundRouter,
) -> Result<AppState, AppError> {
    info!(provider = %config.store.provider, "Initializing store");
    let store = Arc::new(StoreManager::new(&config.store).await?);

    let authority = Arc::new(SessionAuthority::new(&config.auth, Arc::clone(&store))?);
    authority.reload_clients(&config.identity.clients).await?;
    let login = Arc::new(LoginService::new(
        Arc::clone(&authority),
        Arc::clone(&identities),
    ));

    let engine = Arc::new(RealtimeEngine::start(
        config.realtime.clone(),
        Arc::clone(&authority),
        identities,
        inbound,
    )?);

    Ok(AppState {
        config: Arc::new(config),
        store,
        authority,
        login,
        engine,
    })
}

/// Runs the Beacon server until a shutdown signal arrives.
pub async fn run_server(
    config: AppConfig,
    identities: Arc<dyn IdentityProvider>,
    inbound: InboundRouter,
) -> Result<(), AppError> {
    let addr = config.server.bind_address();
    let state = build_state(config, identities, inbound).await?;
    let engine = Arc::clone(&state.engine);

    let app = build_app(state);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {addr}: {e}")))?;

    info!(addr = %addr, "Beacon server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            if let Err(e) = engine.shutdown().await {
                error!(error = %e, "Real-time engine did not shut down cleanly");
            }
        })
        .await
        .map_err(|e| AppError::internal(format!("Server error: {e}")))?;

    info!("Beacon server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
