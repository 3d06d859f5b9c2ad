//! Contracts consumed from external collaborators.

pub mod identity;
pub mod store;

pub use identity::IdentityProvider;
pub use store::{KeyValueStore, StoreExt};
