//! Message model, wire codec, and transport-neutral frames.

pub mod codec;
pub mod frame;
pub mod types;

pub use frame::Frame;
pub use types::{Message, MessageKind};
