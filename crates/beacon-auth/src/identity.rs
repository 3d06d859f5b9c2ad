//! Configuration-seeded identity directory.

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::debug;

use beacon_core::config::IdentityConfig;
use beacon_core::result::AppResult;
use beacon_core::traits::identity::IdentityProvider;
use beacon_core::types::id::PrincipalId;
use beacon_core::types::principal::{LoginRecord, Principal};

/// In-process [`IdentityProvider`] backed by a concurrent map.
///
/// The binary seeds it from configuration. Collaborators that own real user
/// records can keep it in sync through [`upsert`](Self::upsert) and
/// [`remove`](Self::remove), or replace it with their own provider.
#[derive(Debug, Default)]
pub struct StaticIdentityDirectory {
    principals: DashMap<PrincipalId, Principal>,
    password_hashes: DashMap<PrincipalId, String>,
}

impl StaticIdentityDirectory {
    /// Creates an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a directory holding every principal listed in configuration.
    pub fn from_config(config: &IdentityConfig) -> Self {
        let directory = Self::new();
        for entry in &config.principals {
            let id = PrincipalId::new(entry.id);
            directory.upsert(Principal::new(id, entry.username.clone(), entry.is_admin));
            if let Some(hash) = &entry.password_hash {
                directory.set_password_hash(id, hash.clone());
            }
        }
        debug!(count = directory.len(), "Seeded identity directory");
        directory
    }

    /// Inserts or replaces a principal.
    pub fn upsert(&self, principal: Principal) {
        self.principals.insert(principal.id, principal);
    }

    /// Sets the Argon2 hash a password login is checked against.
    pub fn set_password_hash(&self, id: PrincipalId, hash: impl Into<String>) {
        self.password_hashes.insert(id, hash.into());
    }

    /// Removes a principal, returning its last profile.
    pub fn remove(&self, id: PrincipalId) -> Option<Principal> {
        self.password_hashes.remove(&id);
        self.principals.remove(&id).map(|(_, p)| p)
    }

    /// Number of known principals.
    pub fn len(&self) -> usize {
        self.principals.len()
    }

    /// Whether the directory is empty.
    pub fn is_empty(&self) -> bool {
        self.principals.is_empty()
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentityDirectory {
    async fn find_principal(&self, id: PrincipalId) -> AppResult<Option<Principal>> {
        Ok(self.principals.get(&id).map(|entry| entry.value().clone()))
    }

    async fn find_login(&self, username: &str) -> AppResult<Option<LoginRecord>> {
        let Some(principal) = self
            .principals
            .iter()
            .find(|entry| entry.username == username)
            .map(|entry| entry.value().clone())
        else {
            return Ok(None);
        };

        Ok(self
            .password_hashes
            .get(&principal.id)
            .map(|hash| LoginRecord {
                principal,
                password_hash: hash.value().clone(),
            }))
    }
}
