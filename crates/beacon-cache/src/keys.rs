//! Store key builders for every entry Beacon writes.
//!
//! Centralising key construction prevents typos and makes it easy
//! to find every key the application uses.

use beacon_core::types::id::CredentialId;
use beacon_core::types::store_value::StoreKey;

/// Namespace holding credential id → principal id mappings.
pub const SESSION_NAMESPACE: &str = "user_session";

/// Namespace holding machine client → principal id mappings. Entries never expire.
pub const CLIENT_NAMESPACE: &str = "client_session";

/// Store key for an access or refresh credential id.
pub fn credential(id: &CredentialId) -> StoreKey {
    StoreKey::new(SESSION_NAMESPACE, id.as_str())
}

/// Store key for a machine client's name and shared key.
pub fn client_session(name: &str, key: &str) -> StoreKey {
    StoreKey::new(CLIENT_NAMESPACE, format!("{name}:{key}"))
}
