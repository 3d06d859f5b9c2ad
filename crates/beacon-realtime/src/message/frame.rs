//! Transport-neutral socket frames.
//!
//! Pumps read and write [`Frame`]s so they can run over any sink/stream
//! pair. The HTTP layer adapts the WebSocket implementation to this type.

use bytes::Bytes;

/// A single socket frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// UTF-8 text; carries one or more newline-separated messages.
    Text(String),
    /// Binary payload. Not part of the protocol.
    Binary(Bytes),
    /// Liveness probe.
    Ping(Bytes),
    /// Liveness acknowledgment.
    Pong(Bytes),
    /// Close handshake.
    Close,
}
