//! Upgrade gate: decides whether a bearer of an access token may connect.

use std::sync::Arc;

use tracing::{debug, warn};

use beacon_auth::SessionAuthority;
use beacon_core::config::ConnectPolicy;
use beacon_core::error::AppError;
use beacon_core::traits::identity::IdentityProvider;
use beacon_core::types::principal::Principal;

/// Checks connect policy, credential validity, and identity before a socket
/// is accepted.
#[derive(Clone)]
pub struct ConnectionGate {
    authority: Arc<SessionAuthority>,
    identities: Arc<dyn IdentityProvider>,
}

impl std::fmt::Debug for ConnectionGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionGate").finish()
    }
}

impl ConnectionGate {
    /// Creates a new gate.
    pub fn new(authority: Arc<SessionAuthority>, identities: Arc<dyn IdentityProvider>) -> Self {
        Self {
            authority,
            identities,
        }
    }

    /// Resolves the principal behind `token` if `policy` lets it connect.
    pub async fn authorize(&self, token: &str, policy: ConnectPolicy) -> Result<Principal, AppError> {
        if policy == ConnectPolicy::Closed {
            debug!("Rejecting connection: connections are disabled");
            return Err(AppError::authorization("Connections are not accepted"));
        }

        let token = self.authority.validate_access(token).await?;

        let principal = self
            .identities
            .find_principal(token.principal_id)
            .await?
            .ok_or_else(|| {
                warn!(principal_id = %token.principal_id, "Valid token for unknown principal");
                AppError::authentication("Unknown principal")
            })?;

        if policy == ConnectPolicy::AdminRequired && !principal.is_admin {
            debug!(principal_id = %principal.id, "Rejecting connection: admin required");
            return Err(AppError::authorization("Administrator access required"));
        }

        Ok(principal)
    }
}
