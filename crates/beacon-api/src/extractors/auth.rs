//! Credential extractors.
//!
//! `BearerToken` pulls the raw token out of the Authorization header.
//! `ClientCredentials` pairs it with the `X-Client` header for machine clients.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use beacon_core::error::AppError;

use crate::error::ApiError;

/// Raw bearer token. Validation is left to the handler so it can pick the
/// expected token type.
#[derive(Debug, Clone)]
pub struct BearerToken(pub String);

impl BearerToken {
    /// Returns the token text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::authentication("Missing Authorization header"))?;

        let token = header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::authentication("Invalid Authorization header format"))?;

        Ok(Self(token.to_string()))
    }
}

/// Header naming the machine client.
pub const CLIENT_HEADER: &str = "x-client";

/// A machine client's name (`X-Client`) and shared key (bearer token).
#[derive(Debug, Clone)]
pub struct ClientCredentials {
    /// Client name.
    pub name: String,
    /// Shared key.
    pub key: String,
}

impl<S> FromRequestParts<S> for ClientCredentials
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let name = parts
            .headers
            .get(CLIENT_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| AppError::authentication("Missing X-Client header"))?
            .to_string();

        let BearerToken(key) = BearerToken::from_request_parts(parts, state).await?;
        Ok(Self { name, key })
    }
}
