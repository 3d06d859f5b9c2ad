//! Records handed out by the session authority.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use beacon_core::types::id::{CredentialId, PrincipalId};

use crate::jwt::{Claims, TokenType};

/// The two store-backed credentials minted by one issuance.
///
/// Each id maps to `principal_id` in the store for exactly as long as its
/// own lifetime. An id that is absent from the store is invalid no matter
/// what the signed token says.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialPair {
    /// Access credential id.
    pub access_id: CredentialId,
    /// When the access credential stops being valid.
    pub access_expires_at: DateTime<Utc>,
    /// Refresh credential id.
    pub refresh_id: CredentialId,
    /// When the refresh credential stops being valid.
    pub refresh_expires_at: DateTime<Utc>,
    /// Principal both credentials belong to.
    pub principal_id: PrincipalId,
}

/// A credential pair together with the signed tokens a client presents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuedCredentials {
    /// Store-side credential records.
    pub pair: CredentialPair,
    /// Signed access token.
    pub access_token: String,
    /// Signed refresh token.
    pub refresh_token: String,
}

/// A token that passed signature, expiry, type, and liveness checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedToken {
    /// Principal the token was issued to.
    pub principal_id: PrincipalId,
    /// Credential id backing the token.
    pub credential_id: CredentialId,
    /// Access or refresh.
    pub token_type: TokenType,
    /// Expiration claim.
    pub expires_at: DateTime<Utc>,
}

impl From<Claims> for AuthenticatedToken {
    fn from(claims: Claims) -> Self {
        Self {
            principal_id: claims.sub,
            expires_at: claims.expires_at(),
            credential_id: claims.jti,
            token_type: claims.token_type,
        }
    }
}
