//! Realtime engine metrics.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Engine-level metrics counters.
#[derive(Debug, Default)]
pub struct RealtimeMetrics {
    /// Connections registered with the hub.
    connections_opened: AtomicU64,
    /// Connections removed from the hub for any reason.
    connections_closed: AtomicU64,
    /// Connections closed because the same principal connected again.
    connections_superseded: AtomicU64,
    /// Connections torn down because their outbound queue was full.
    stalled_teardowns: AtomicU64,
    /// Messages placed on a live outbound queue.
    messages_queued: AtomicU64,
    /// Messages written to a socket.
    messages_written: AtomicU64,
    /// Messages placed in the offline buffer.
    messages_buffered: AtomicU64,
    /// Buffered messages evicted by newer ones.
    messages_evicted: AtomicU64,
    /// Socket writes that failed or timed out.
    write_failures: AtomicU64,
    /// Inbound messages handed to a handler.
    inbound_routed: AtomicU64,
    /// Inbound messages dropped as malformed or unhandled.
    inbound_dropped: AtomicU64,
}

impl RealtimeMetrics {
    /// Create new zeroed metrics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a registration.
    pub fn connection_opened(&self) {
        self.connections_opened.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a removal from the registry.
    pub fn connection_closed(&self) {
        self.connections_closed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a last-writer-wins replacement.
    pub fn connection_superseded(&self) {
        self.connections_superseded.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a teardown caused by a full outbound queue.
    pub fn stalled_teardown(&self) {
        self.stalled_teardowns.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a message queued for a live connection.
    pub fn message_queued(&self) {
        self.messages_queued.fetch_add(1, Ordering::Relaxed);
    }

    /// Record messages written to a socket.
    pub fn messages_written(&self, count: u64) {
        self.messages_written.fetch_add(count, Ordering::Relaxed);
    }

    /// Record a message buffered offline, and whether that evicted another.
    pub fn message_buffered(&self, evicted: bool) {
        self.messages_buffered.fetch_add(1, Ordering::Relaxed);
        if evicted {
            self.messages_evicted.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record buffered messages lost when restoring a drained queue.
    pub fn messages_evicted(&self, count: u64) {
        self.messages_evicted.fetch_add(count, Ordering::Relaxed);
    }

    /// Record a failed socket write.
    pub fn write_failure(&self) {
        self.write_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an inbound message handed to a handler.
    pub fn inbound_routed(&self) {
        self.inbound_routed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a dropped inbound message.
    pub fn inbound_dropped(&self) {
        self.inbound_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a snapshot of all metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let opened = self.connections_opened.load(Ordering::Relaxed);
        let closed = self.connections_closed.load(Ordering::Relaxed);
        MetricsSnapshot {
            connections_opened: opened,
            connections_closed: closed,
            connections_active: opened.saturating_sub(closed),
            connections_superseded: self.connections_superseded.load(Ordering::Relaxed),
            stalled_teardowns: self.stalled_teardowns.load(Ordering::Relaxed),
            messages_queued: self.messages_queued.load(Ordering::Relaxed),
            messages_written: self.messages_written.load(Ordering::Relaxed),
            messages_buffered: self.messages_buffered.load(Ordering::Relaxed),
            messages_evicted: self.messages_evicted.load(Ordering::Relaxed),
            write_failures: self.write_failures.load(Ordering::Relaxed),
            inbound_routed: self.inbound_routed.load(Ordering::Relaxed),
            inbound_dropped: self.inbound_dropped.load(Ordering::Relaxed),
        }
    }
}

/// Serializable metrics snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Connections ever registered.
    pub connections_opened: u64,
    /// Connections ever removed.
    pub connections_closed: u64,
    /// Currently registered connections.
    pub connections_active: u64,
    /// Connections replaced by a newer one for the same principal.
    pub connections_superseded: u64,
    /// Connections torn down because their queue was full.
    pub stalled_teardowns: u64,
    /// Messages queued for live connections.
    pub messages_queued: u64,
    /// Messages written to sockets.
    pub messages_written: u64,
    /// Messages buffered for offline principals.
    pub messages_buffered: u64,
    /// Buffered messages evicted by newer ones.
    pub messages_evicted: u64,
    /// Failed socket writes.
    pub write_failures: u64,
    /// Inbound messages routed to a handler.
    pub inbound_routed: u64,
    /// Inbound messages dropped.
    pub inbound_dropped: u64,
}
