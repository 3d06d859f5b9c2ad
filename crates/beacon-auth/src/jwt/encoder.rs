//! JWT token creation with per-type signing keys.

use std::time::Duration;

use chrono::{DateTime, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use uuid::Uuid;

use beacon_core::config::AuthConfig;
use beacon_core::error::AppError;
use beacon_core::types::id::{CredentialId, PrincipalId};

use super::claims::{Claims, TokenType};

/// Creates signed JWT access and refresh tokens.
#[derive(Clone)]
pub struct JwtEncoder {
    /// HMAC key for access tokens.
    access_key: EncodingKey,
    /// HMAC key for refresh tokens.
    refresh_key: EncodingKey,
}

impl std::fmt::Debug for JwtEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtEncoder").finish_non_exhaustive()
    }
}

/// A freshly signed token and the claims it carries.
#[derive(Debug, Clone)]
pub struct SignedToken {
    /// Compact JWS string.
    pub token: String,
    /// Claims embedded in the token.
    pub claims: Claims,
}

impl SignedToken {
    /// Credential id minted for this token.
    pub fn credential_id(&self) -> &CredentialId {
        &self.claims.jti
    }

    /// Expiration as a `DateTime<Utc>`.
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.claims.expires_at()
    }
}

impl JwtEncoder {
    /// Creates a new encoder from auth configuration.
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            access_key: EncodingKey::from_secret(config.access_secret.as_bytes()),
            refresh_key: EncodingKey::from_secret(config.refresh_secret.as_bytes()),
        }
    }

    /// Mints a new credential id and signs a token of the given type for it.
    pub fn sign(
        &self,
        principal_id: PrincipalId,
        token_type: TokenType,
        ttl: Duration,
    ) -> Result<SignedToken, AppError> {
        let now = Utc::now();
        // Round up so sub-second lifetimes still produce exp > iat.
        let ttl_secs = i64::try_from(ttl.as_secs() + u64::from(ttl.subsec_nanos() > 0))
            .map_err(|_| AppError::validation("Token lifetime is too large"))?;

        let claims = Claims {
            sub: principal_id,
            jti: CredentialId::new(Uuid::new_v4().to_string()),
            iat: now.timestamp(),
            exp: now.timestamp().saturating_add(ttl_secs),
            token_type,
        };

        let key = match token_type {
            TokenType::Access => &self.access_key,
            TokenType::Refresh => &self.refresh_key,
        };

        let token = encode(&Header::default(), &claims, key).map_err(|e| {
            AppError::internal(format!("Failed to encode {token_type} token: {e}"))
        })?;

        Ok(SignedToken { token, claims })
    }
}
