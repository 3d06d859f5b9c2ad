//! Static identity directory configuration.

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Principals and machine clients known to the built-in identity directory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// Seed entries.
    #[serde(default)]
    pub principals: Vec<PrincipalEntry>,
    /// Machine clients that authenticate with a name and a shared key.
    #[serde(default)]
    pub clients: Vec<ClientEntry>,
}

/// One principal in the identity directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrincipalEntry {
    /// Numeric principal id.
    pub id: u64,
    /// Display name, also the login name.
    pub username: String,
    /// Whether the principal may connect under the admin-only policy.
    #[serde(default)]
    pub is_admin: bool,
    /// Argon2 PHC string. Principals without one cannot log in with a password.
    #[serde(default)]
    pub password_hash: Option<String>,
}

/// A machine client registered at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientEntry {
    /// Client name, presented in the `X-Client` header.
    pub name: String,
    /// Shared key, presented as the bearer token.
    pub key: String,
    /// Principal the client acts as.
    pub principal_id: u64,
}

impl IdentityConfig {
    /// Rejects client entries that could not be looked up later.
    pub fn validate(&self) -> Result<(), AppError> {
        for client in &self.clients {
            if client.name.is_empty() || client.key.is_empty() {
                return Err(AppError::configuration(
                    "identity.clients entries need a non-empty name and key",
                ));
            }
            if client.name.contains(':') {
                return Err(AppError::configuration(format!(
                    "identity.clients name '{}' must not contain ':'",
                    client.name
                )));
            }
        }
        Ok(())
    }
}
