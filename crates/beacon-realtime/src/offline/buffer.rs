//! Bounded FIFO of undelivered messages, one per principal.

use std::collections::VecDeque;

use dashmap::DashMap;
use tracing::debug;

use beacon_core::types::id::PrincipalId;

use crate::message::Message;

/// Offline message buffer.
///
/// Kept apart from the hub registry so that buffering never needs the
/// registry and the registry never needs to know about buffered content.
/// Each principal's queue holds at most `capacity` messages; pushing onto a
/// full queue evicts the oldest one.
#[derive(Debug)]
pub struct OfflineBuffer {
    capacity: usize,
    queues: DashMap<PrincipalId, VecDeque<Message>>,
}

impl OfflineBuffer {
    /// Create an empty buffer with the given per-principal capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            queues: DashMap::new(),
        }
    }

    /// Per-principal capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append a message. Returns `true` if the oldest message was evicted to
    /// make room.
    pub fn push(&self, principal_id: PrincipalId, message: Message) -> bool {
        let mut queue = self.queues.entry(principal_id).or_default();
        let evicted = if queue.len() >= self.capacity {
            queue.pop_front();
            true
        } else {
            false
        };
        queue.push_back(message);
        if evicted {
            debug!(principal_id = %principal_id, "Offline buffer full, evicted oldest message");
        }
        evicted
    }

    /// Remove and return every buffered message for a principal, oldest first.
    pub fn drain(&self, principal_id: PrincipalId) -> Vec<Message> {
        self.queues
            .remove(&principal_id)
            .map(|(_, queue)| queue.into())
            .unwrap_or_default()
    }

    /// Put messages back in front of anything buffered since they were
    /// drained. Returns how many were evicted to stay within capacity.
    pub fn restore(&self, principal_id: PrincipalId, messages: Vec<Message>) -> usize {
        if messages.is_empty() {
            return 0;
        }
        let mut queue = self.queues.entry(principal_id).or_default();
        for message in messages.into_iter().rev() {
            queue.push_front(message);
        }
        let mut evicted = 0;
        while queue.len() > self.capacity {
            queue.pop_front();
            evicted += 1;
        }
        evicted
    }

    /// Number of messages buffered for a principal.
    pub fn len(&self, principal_id: PrincipalId) -> usize {
        self.queues.get(&principal_id).map_or(0, |q| q.len())
    }

    /// Whether nothing is buffered for a principal.
    pub fn is_empty(&self, principal_id: PrincipalId) -> bool {
        self.len(principal_id) == 0
    }

    /// Number of messages buffered across all principals.
    pub fn total(&self) -> usize {
        self.queues.iter().map(|q| q.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const P: PrincipalId = PrincipalId::new(1);

    #[test]
    fn test_sixty_messages_keep_latest_fifty() {
        let buffer = OfflineBuffer::new(50);
        let mut evictions = 0;
        for i in 0..60 {
            if buffer.push(P, Message::new(1, i.to_string())) {
                evictions += 1;
            }
        }
        assert_eq!(evictions, 10);
        assert_eq!(buffer.len(P), 50);

        let drained = buffer.drain(P);
        let contents: Vec<&str> = drained.iter().map(Message::content).collect();
        let expected: Vec<String> = (10..60).map(|i| i.to_string()).collect();
        assert_eq!(contents, expected);
        assert!(buffer.is_empty(P));
    }

    #[test]
    fn test_drain_is_exactly_once() {
        let buffer = OfflineBuffer::new(5);
        buffer.push(P, Message::new(1, "a"));
        assert_eq!(buffer.drain(P).len(), 1);
        assert!(buffer.drain(P).is_empty());
    }

    #[test]
    fn test_principals_are_independent() {
        let buffer = OfflineBuffer::new(2);
        let other = PrincipalId::new(2);
        buffer.push(P, Message::new(1, "a"));
        buffer.push(other, Message::new(1, "b"));
        buffer.push(other, Message::new(1, "c"));
        assert_eq!(buffer.len(P), 1);
        assert_eq!(buffer.len(other), 2);
        assert_eq!(buffer.total(), 3);
    }

    #[test]
    fn test_restore_goes_to_front() {
        let buffer = OfflineBuffer::new(3);
        buffer.push(P, Message::new(1, "newer"));
        let evicted = buffer.restore(
            P,
            vec![Message::new(1, "old-1"), Message::new(1, "old-2"), Message::new(1, "old-3")],
        );
        assert_eq!(evicted, 1);

        let contents: Vec<String> = buffer
            .drain(P)
            .into_iter()
            .map(Message::into_content)
            .collect();
        assert_eq!(contents, vec!["old-2", "old-3", "newer"]);
    }
}
