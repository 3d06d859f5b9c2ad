//! Login flows that end in a freshly issued credential pair.

use std::sync::Arc;

use tracing::{info, warn};

use beacon_core::error::AppError;
use beacon_core::traits::identity::IdentityProvider;
use beacon_core::types::principal::Principal;

use crate::password::PasswordHasher;

use super::authority::SessionAuthority;
use super::credentials::IssuedCredentials;

/// A successful login: who logged in and the pair they received.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    /// The authenticated principal.
    pub principal: Principal,
    /// Newly issued credentials.
    pub credentials: IssuedCredentials,
}

/// Authenticates users by password and machine clients by shared key, then
/// asks the [`SessionAuthority`] for a pair.
#[derive(Debug, Clone)]
pub struct LoginService {
    authority: Arc<SessionAuthority>,
    identities: Arc<dyn IdentityProvider>,
    hasher: PasswordHasher,
}

impl LoginService {
    /// Creates a login service over an authority and an identity provider.
    pub fn new(authority: Arc<SessionAuthority>, identities: Arc<dyn IdentityProvider>) -> Self {
        Self {
            authority,
            identities,
            hasher: PasswordHasher::new(),
        }
    }

    /// Username/password login.
    ///
    /// Unknown users, users without a password and wrong passwords all fail
    /// with the same `Authentication` error.
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginOutcome, AppError> {
        if username.is_empty() || password.is_empty() {
            return Err(AppError::validation("Username and password are required"));
        }

        let record = self
            .identities
            .find_login(username)
            .await?
            .ok_or_else(|| AppError::authentication("Invalid username or password"))?;

        if !self.hasher.verify_password(password, &record.password_hash)? {
            warn!(username = %username, "Password login rejected");
            return Err(AppError::authentication("Invalid username or password"));
        }

        let credentials = self.authority.issue_credentials(record.principal.id).await?;
        info!(principal_id = %record.principal.id, username = %username, "User logged in");
        Ok(LoginOutcome {
            principal: record.principal,
            credentials,
        })
    }

    /// Machine client login with the name and key registered in the store.
    pub async fn client_login(&self, name: &str, key: &str) -> Result<LoginOutcome, AppError> {
        let principal_id = self.authority.resolve_client(name, key).await?;
        let principal = self
            .identities
            .find_principal(principal_id)
            .await?
            .ok_or_else(|| {
                warn!(client = name, principal_id = %principal_id, "Client maps to unknown principal");
                AppError::authentication("Unknown client credentials")
            })?;

        let credentials = self.authority.issue_credentials(principal.id).await?;
        info!(principal_id = %principal.id, client = name, "Client logged in");
        Ok(LoginOutcome {
            principal,
            credentials,
        })
    }
}
