//! Profile returned by the identity collaborator.

use serde::{Deserialize, Serialize};

use super::id::PrincipalId;

/// An authenticated principal's profile, as far as the hub cares about it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Principal id.
    pub id: PrincipalId,
    /// Display name, used only for logging.
    pub username: String,
    /// Admin flag consulted by the admin-only connect policy.
    pub is_admin: bool,
}

impl Principal {
    /// Create a new principal profile.
    pub fn new(id: PrincipalId, username: impl Into<String>, is_admin: bool) -> Self {
        Self {
            id,
            username: username.into(),
            is_admin,
        }
    }
}

/// What a password login needs: the profile and its stored hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginRecord {
    /// The principal logging in.
    pub principal: Principal,
    /// Argon2 PHC string to verify the presented password against.
    pub password_hash: String,
}
