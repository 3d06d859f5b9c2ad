//! Individual connection handle.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use beacon_core::types::id::PrincipalId;

use crate::message::Message;

/// Unique connection identifier.
pub type ConnectionId = Uuid;

/// A handle to a single live connection.
///
/// The pumps own the socket halves and the receiving end of the outbound
/// queue; the hub only keeps this handle for routing. Closing the handle
/// stops both pumps.
#[derive(Debug)]
pub struct Connection {
    /// Unique connection ID.
    pub id: ConnectionId,
    /// Principal who owns this connection.
    pub principal_id: PrincipalId,
    /// When the connection was established.
    pub connected_at: DateTime<Utc>,
    /// Sender for outbound messages.
    outbound: mpsc::Sender<Message>,
    /// Cancelled when the connection must stop.
    shutdown: CancellationToken,
}

impl Connection {
    /// Create a connection with an outbound queue of `capacity` messages.
    ///
    /// Returns the handle and the receiving end of the queue, which belongs
    /// to the write pump.
    pub fn new(principal_id: PrincipalId, capacity: usize) -> (Arc<Self>, mpsc::Receiver<Message>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let conn = Arc::new(Self {
            id: Uuid::new_v4(),
            principal_id,
            connected_at: Utc::now(),
            outbound: tx,
            shutdown: CancellationToken::new(),
        });
        (conn, rx)
    }

    /// Queue a message without waiting.
    pub fn try_enqueue(&self, message: Message) -> Result<(), TrySendError<Message>> {
        if self.is_closed() {
            return Err(TrySendError::Closed(message));
        }
        self.outbound.try_send(message)
    }

    /// Signal both pumps to stop. Idempotent.
    pub fn close(&self) {
        self.shutdown.cancel();
    }

    /// Whether the connection has been closed.
    pub fn is_closed(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Resolves once the connection is closed.
    pub async fn closed(&self) {
        self.shutdown.cancelled().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_queue_is_bounded() {
        let (conn, mut rx) = Connection::new(PrincipalId::new(1), 2);
        assert!(conn.try_enqueue(Message::new(1, "a")).is_ok());
        assert!(conn.try_enqueue(Message::new(1, "b")).is_ok());
        assert!(matches!(
            conn.try_enqueue(Message::new(1, "c")),
            Err(TrySendError::Full(_))
        ));
        assert_eq!(rx.recv().await.unwrap().content(), "a");
    }

    #[tokio::test]
    async fn test_closed_connection_rejects_messages() {
        let (conn, _rx) = Connection::new(PrincipalId::new(1), 4);
        conn.close();
        conn.close();
        assert!(conn.is_closed());
        conn.closed().await;
        assert!(matches!(
            conn.try_enqueue(Message::new(1, "late")),
            Err(TrySendError::Closed(_))
        ));
    }
}
