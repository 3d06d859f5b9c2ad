//! Identity lookup contract.

use async_trait::async_trait;

use crate::result::AppResult;
use crate::types::id::PrincipalId;
use crate::types::principal::{LoginRecord, Principal};

/// Resolves a principal's profile and admin flag.
///
/// Implemented by whichever collaborator owns user records. Beacon only ever
/// reads through this trait.
#[async_trait]
pub trait IdentityProvider: Send + Sync + std::fmt::Debug + 'static {
    /// Look up a principal. `Ok(None)` means the principal does not exist.
    async fn find_principal(&self, id: PrincipalId) -> AppResult<Option<Principal>>;

    /// Look up the password login for `username`.
    ///
    /// Providers that keep passwords elsewhere return `Ok(None)`, which makes
    /// every password login fail.
    async fn find_login(&self, _username: &str) -> AppResult<Option<LoginRecord>> {
        Ok(None)
    }
}
