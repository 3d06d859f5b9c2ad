//! Session authority: the single owner of credential lifecycle rules.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use beacon_cache::keys;
use beacon_cache::provider::StoreManager;
use beacon_core::config::{AuthConfig, ClientEntry};
use beacon_core::error::{AppError, ErrorKind};
use beacon_core::traits::store::{KeyValueStore, StoreExt};
use beacon_core::types::id::{CredentialId, PrincipalId};
use beacon_core::types::store_value::FromStoreValue;

use crate::jwt::{JwtDecoder, JwtEncoder, TokenType};

use super::credentials::{AuthenticatedToken, CredentialPair, IssuedCredentials};

/// Issues, validates, revokes and rotates credentials.
///
/// Cryptographic validity alone never authenticates: every credential must
/// also be present in the store, which is how revocation and expiry are
/// enforced. Any store failure while validating is returned as a `Store`
/// error so callers refuse the request.
#[derive(Clone)]
pub struct SessionAuthority {
    /// JWT encoder for token generation.
    encoder: Arc<JwtEncoder>,
    /// JWT decoder for token validation.
    decoder: Arc<JwtDecoder>,
    /// Expiring store holding live credential ids.
    store: Arc<StoreManager>,
    /// Access credential lifetime.
    access_ttl: Duration,
    /// Refresh credential lifetime.
    refresh_ttl: Duration,
}

impl std::fmt::Debug for SessionAuthority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionAuthority")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish()
    }
}

impl SessionAuthority {
    /// Creates a new authority from auth configuration.
    pub fn new(config: &AuthConfig, store: Arc<StoreManager>) -> Result<Self, AppError> {
        config.validate()?;
        Ok(Self {
            encoder: Arc::new(JwtEncoder::new(config)),
            decoder: Arc::new(JwtDecoder::new(config)),
            store,
            access_ttl: config.access_ttl(),
            refresh_ttl: config.refresh_ttl(),
        })
    }

    /// Overrides the configured lifetimes.
    pub fn with_lifetimes(mut self, access_ttl: Duration, refresh_ttl: Duration) -> Self {
        self.access_ttl = access_ttl;
        self.refresh_ttl = refresh_ttl;
        self
    }

    /// Access credential lifetime.
    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    /// Refresh credential lifetime.
    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }

    /// Issues a new access/refresh pair for `principal_id`.
    ///
    /// Both ids are recorded in the store with their own lifetimes. If the
    /// second write fails the first id is removed again, so a caller never
    /// observes a half-issued pair.
    pub async fn issue_credentials(
        &self,
        principal_id: PrincipalId,
    ) -> Result<IssuedCredentials, AppError> {
        let access = self
            .encoder
            .sign(principal_id, TokenType::Access, self.access_ttl)?;
        let refresh = self
            .encoder
            .sign(principal_id, TokenType::Refresh, self.refresh_ttl)?;

        let access_key = keys::credential(access.credential_id());
        self.store
            .put_typed_with_ttl(&access_key, principal_id, self.access_ttl)
            .await?;

        let refresh_key = keys::credential(refresh.credential_id());
        if let Err(e) = self
            .store
            .put_typed_with_ttl(&refresh_key, principal_id, self.refresh_ttl)
            .await
        {
            error!(
                principal_id = %principal_id,
                error = %e,
                "Failed to record refresh credential, rolling back access credential"
            );
            if let Err(rollback) = self.store.delete(&access_key).await {
                if !rollback.is_not_found() {
                    error!(
                        principal_id = %principal_id,
                        error = %rollback,
                        "Failed to roll back access credential"
                    );
                }
            }
            return Err(e);
        }

        info!(
            principal_id = %principal_id,
            access_id = %access.credential_id(),
            refresh_id = %refresh.credential_id(),
            "Issued credentials"
        );

        Ok(IssuedCredentials {
            pair: CredentialPair {
                access_id: access.claims.jti.clone(),
                access_expires_at: access.expires_at(),
                refresh_id: refresh.claims.jti.clone(),
                refresh_expires_at: refresh.expires_at(),
                principal_id,
            },
            access_token: access.token,
            refresh_token: refresh.token,
        })
    }

    /// Validates an access token and returns the principal it authenticates.
    pub async fn validate_access(&self, token: &str) -> Result<AuthenticatedToken, AppError> {
        self.validate(token, TokenType::Access).await
    }

    /// Validates a refresh token without consuming it.
    pub async fn validate_refresh(&self, token: &str) -> Result<AuthenticatedToken, AppError> {
        self.validate(token, TokenType::Refresh).await
    }

    /// Revokes a credential id and returns the principal it belonged to.
    ///
    /// Returns `NotFound` if the id was never issued, already revoked, or
    /// has expired.
    pub async fn revoke(&self, credential_id: &CredentialId) -> Result<PrincipalId, AppError> {
        let removed = self.store.delete(&keys::credential(credential_id)).await?;
        let principal_id = PrincipalId::from_store_value(removed)?;
        info!(principal_id = %principal_id, credential_id = %credential_id, "Revoked credential");
        Ok(principal_id)
    }

    /// Exchanges a refresh token for a brand new pair.
    ///
    /// The presented refresh credential is revoked first, and only the caller
    /// that actually removes it gets a new pair. Presenting the same refresh
    /// token twice therefore fails the second time.
    pub async fn refresh(&self, refresh_token: &str) -> Result<IssuedCredentials, AppError> {
        let current = self.validate_refresh(refresh_token).await?;

        match self.revoke(&current.credential_id).await {
            Ok(_) => {}
            Err(e) if e.is_not_found() => {
                warn!(
                    principal_id = %current.principal_id,
                    credential_id = %current.credential_id,
                    "Refresh credential was consumed concurrently"
                );
                return Err(AppError::authentication("Refresh token has already been used"));
            }
            Err(e) => return Err(e),
        }

        let issued = self.issue_credentials(current.principal_id).await?;
        info!(principal_id = %current.principal_id, "Rotated credentials");
        Ok(issued)
    }

    /// Revokes the credential behind an access token.
    pub async fn logout(&self, access_token: &str) -> Result<PrincipalId, AppError> {
        let current = self.validate_access(access_token).await?;
        match self.revoke(&current.credential_id).await {
            Ok(principal_id) => Ok(principal_id),
            Err(e) if e.is_not_found() => {
                Err(AppError::authentication("Token has been revoked"))
            }
            Err(e) => Err(e),
        }
    }

    /// Records a machine client so [`resolve_client`](Self::resolve_client)
    /// can map its name and key to `principal_id`. The entry has no expiry.
    pub async fn register_client(
        &self,
        name: &str,
        key: &str,
        principal_id: PrincipalId,
    ) -> Result<(), AppError> {
        if name.is_empty() || key.is_empty() || name.contains(':') {
            return Err(AppError::validation(format!("Invalid client name '{name}'")));
        }
        self.store
            .put_typed(&keys::client_session(name, key), principal_id)
            .await?;
        debug!(client = name, principal_id = %principal_id, "Registered client");
        Ok(())
    }

    /// Registers every configured client, replacing earlier entries.
    pub async fn reload_clients(&self, clients: &[ClientEntry]) -> Result<usize, AppError> {
        for client in clients {
            self.register_client(&client.name, &client.key, PrincipalId::new(client.principal_id))
                .await?;
        }
        let names: Vec<&str> = clients.iter().map(|c| c.name.as_str()).collect();
        info!(clients = ?names, "Loaded machine clients");
        Ok(clients.len())
    }

    /// Maps a machine client's name and key to the principal it acts as.
    ///
    /// Unknown pairs are an `Authentication` error; store failures stay
    /// `Store` errors.
    pub async fn resolve_client(&self, name: &str, key: &str) -> Result<PrincipalId, AppError> {
        match self
            .store
            .get::<PrincipalId>(&keys::client_session(name, key))
            .await
        {
            Ok(principal_id) => Ok(principal_id),
            Err(e) if e.is_not_found() || e.kind == ErrorKind::Serialization => {
                warn!(client = name, "Unknown client credentials");
                Err(AppError::authentication("Unknown client credentials"))
            }
            Err(e) => Err(e),
        }
    }

    async fn validate(
        &self,
        token: &str,
        expected: TokenType,
    ) -> Result<AuthenticatedToken, AppError> {
        let claims = self.decoder.decode(token, expected)?;

        let stored = match self.store.get::<PrincipalId>(&keys::credential(&claims.jti)).await {
            Ok(id) => id,
            Err(e) if e.is_not_found() => {
                debug!(credential_id = %claims.jti, "Credential not live");
                return Err(AppError::authentication("Token has been revoked or has expired"));
            }
            Err(e) if e.kind == ErrorKind::Serialization => {
                warn!(credential_id = %claims.jti, error = %e, "Unreadable credential record");
                return Err(AppError::authentication("Token is not recognised"));
            }
            Err(e) => {
                error!(credential_id = %claims.jti, error = %e, "Store unavailable during validation");
                return Err(AppError::with_source(
                    ErrorKind::Store,
                    "Credential store unavailable",
                    e,
                ));
            }
        };

        if stored != claims.sub {
            warn!(
                credential_id = %claims.jti,
                token_principal = %claims.sub,
                stored_principal = %stored,
                "Credential principal mismatch"
            );
            return Err(AppError::authentication("Token principal mismatch"));
        }

        Ok(AuthenticatedToken::from(claims))
    }
}
