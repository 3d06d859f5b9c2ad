//! Application state shared across all handlers and middleware.

use std::sync::Arc;

use beacon_auth::{LoginService, SessionAuthority};
use beacon_cache::StoreManager;
use beacon_core::config::AppConfig;
use beacon_realtime::RealtimeEngine;

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<AppConfig>,
    /// Expiring key-value store
    pub store: Arc<StoreManager>,
    /// Credential issuance, validation, and revocation
    pub authority: Arc<SessionAuthority>,
    /// Password and machine-client login
    pub login: Arc<LoginService>,
    /// Connection hub and socket pumps
    pub engine: Arc<RealtimeEngine>,
}
