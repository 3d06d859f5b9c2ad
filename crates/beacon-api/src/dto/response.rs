//! Response DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use beacon_auth::{IssuedCredentials, LoginOutcome};
use beacon_core::types::id::PrincipalId;
use beacon_core::types::principal::Principal;
use beacon_realtime::MetricsSnapshot;

/// Standard success wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T: Serialize> {
    /// Whether the request was successful.
    pub success: bool,
    /// Response data.
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Creates a successful response.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// A freshly issued token pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPairResponse {
    /// Principal the pair belongs to.
    pub principal_id: PrincipalId,
    /// Access token.
    pub access_token: String,
    /// Refresh token.
    pub refresh_token: String,
    /// Access token expiry.
    pub access_expires_at: DateTime<Utc>,
    /// Refresh token expiry.
    pub refresh_expires_at: DateTime<Utc>,
}

impl From<IssuedCredentials> for TokenPairResponse {
    fn from(issued: IssuedCredentials) -> Self {
        Self {
            principal_id: issued.pair.principal_id,
            access_token: issued.access_token,
            refresh_token: issued.refresh_token,
            access_expires_at: issued.pair.access_expires_at,
            refresh_expires_at: issued.pair.refresh_expires_at,
        }
    }
}

/// The principal that logged in and its new token pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    /// Authenticated principal.
    pub principal: Principal,
    /// Issued tokens.
    pub tokens: TokenPairResponse,
}

impl From<LoginOutcome> for LoginResponse {
    fn from(outcome: LoginOutcome) -> Self {
        Self {
            principal: outcome.principal,
            tokens: TokenPairResponse::from(outcome.credentials),
        }
    }
}

/// Simple message response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    /// Message text.
    pub message: String,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// `"ok"` or `"degraded"`.
    pub status: String,
    /// Server version.
    pub version: String,
    /// Store reachability: `"connected"` or `"unavailable"`.
    pub store: String,
    /// Principals with a live connection.
    pub connections: usize,
    /// Hub counters.
    pub metrics: MetricsSnapshot,
}
