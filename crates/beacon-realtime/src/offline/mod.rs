//! Per-principal storage for messages that could not be delivered live.

pub mod buffer;

pub use buffer::OfflineBuffer;
