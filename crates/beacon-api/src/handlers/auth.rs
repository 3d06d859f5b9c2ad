//! Login, token refresh and logout.

use axum::Json;
use axum::extract::State;
use tracing::info;

use crate::dto::request::{LoginRequest, RefreshRequest};
use crate::dto::response::{ApiResponse, LoginResponse, MessageResponse, TokenPairResponse};
use crate::error::ApiError;
use crate::extractors::{BearerToken, ClientCredentials};
use crate::state::AppState;

/// POST /auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>, ApiError> {
    let outcome = state.login.login(&req.username, &req.password).await?;
    Ok(Json(ApiResponse::ok(LoginResponse::from(outcome))))
}

/// POST /auth/client
///
/// Machine clients present `X-Client: <name>` and `Authorization: Bearer <key>`.
pub async fn client_login(
    State(state): State<AppState>,
    client: ClientCredentials,
) -> Result<Json<ApiResponse<LoginResponse>>, ApiError> {
    let outcome = state.login.client_login(&client.name, &client.key).await?;
    Ok(Json(ApiResponse::ok(LoginResponse::from(outcome))))
}

/// POST /auth/refresh
///
/// Consumes the refresh token and returns a brand-new pair. The old refresh
/// token cannot be used again.
pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> Result<Json<ApiResponse<TokenPairResponse>>, ApiError> {
    let issued = state.authority.refresh(&req.refresh_token).await?;
    Ok(Json(ApiResponse::ok(TokenPairResponse::from(issued))))
}

/// POST /auth/logout
pub async fn logout(
    State(state): State<AppState>,
    token: BearerToken,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let principal_id = state.authority.logout(token.as_str()).await?;
    info!(principal_id = %principal_id, "Logged out");

    Ok(Json(ApiResponse::ok(MessageResponse {
        message: "Logged out successfully".to_string(),
    })))
}
