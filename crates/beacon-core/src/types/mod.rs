//! Core type definitions used across the Beacon workspace.

pub mod id;
pub mod principal;
pub mod store_value;

pub use id::{CredentialId, PrincipalId};
pub use principal::Principal;
pub use store_value::{FromStoreValue, StoreKey, StoreValue};
