//! Request DTOs.

use serde::{Deserialize, Serialize};

/// Username/password login request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    /// Login name.
    pub username: String,
    /// Plaintext password.
    pub password: String,
}

/// Token refresh request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshRequest {
    /// Refresh token.
    pub refresh_token: String,
}

/// Query string accepted by the WebSocket upgrade.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WsQuery {
    /// Access token.
    pub token: Option<String>,
}
