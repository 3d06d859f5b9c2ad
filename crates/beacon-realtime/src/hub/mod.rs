//! The connection hub: a single task that owns the registry.
//!
//! Every membership change and every dispatch goes through the hub's inbox
//! and is applied in arrival order by one loop, so the registry needs no lock.
//! The only state shared outside the loop is a read-only presence index and
//! the offline buffer.

pub mod actor;
pub mod command;
pub mod handle;
pub mod registry;

pub use actor::Hub;
pub use command::{DispatchReport, HubCommand, HubSnapshot};
pub use handle::HubHandle;
