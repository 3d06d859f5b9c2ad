//! Read and write pumps.
//!
//! Each connection runs exactly one of each. The write pump is the only
//! writer to the socket sink; the read pump is the only reader of the
//! stream. Both stop when the connection is closed, and either one failing
//! closes the connection and asks the hub to unregister it.

use std::fmt::Display;
use std::pin::pin;
use std::sync::Arc;

use bytes::Bytes;
use futures::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior, interval_at, sleep, timeout};
use tracing::{debug, info, warn};

use beacon_core::error::AppError;

use crate::hub::HubHandle;
use crate::message::{Frame, Message, codec};
use crate::metrics::RealtimeMetrics;
use crate::router::{InboundContext, InboundRouter, RouteOutcome};

use super::handle::Connection;
use super::heartbeat::HeartbeatConfig;

/// Why a pump stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PumpExit {
    /// The connection was closed locally (unregister, supersede, shutdown).
    Closed,
    /// The peer closed the socket or ended the stream.
    PeerClosed,
    /// No pong arrived before the read deadline.
    TimedOut,
    /// A socket read or write failed.
    Failed(String),
    /// An inbound frame exceeded the size limit.
    FrameTooLarge(usize),
}

impl PumpExit {
    /// The connection error behind this exit, if the socket failed rather
    /// than being closed by either side.
    pub fn error(&self) -> Option<AppError> {
        match self {
            Self::Closed | Self::PeerClosed => None,
            Self::TimedOut => Some(AppError::connection("No pong before the read deadline")),
            Self::Failed(reason) => Some(AppError::connection(format!("Socket failed: {reason}"))),
            Self::FrameTooLarge(len) => Some(AppError::connection(format!(
                "Inbound frame of {len} bytes exceeds the limit"
            ))),
        }
    }
}

/// Drain the outbound queue into the socket and send periodic pings.
///
/// Everything already queued when the pump wakes is coalesced into a single
/// newline-separated text frame. If a write fails or times out, the batch
/// that was in flight is handed back to the hub, which delivers it to a
/// newer connection or the offline buffer. Messages still queued when the
/// connection closes are discarded.
pub async fn write_pump<S>(
    conn: Arc<Connection>,
    mut outbound: mpsc::Receiver<Message>,
    sink: S,
    hub: HubHandle,
    heartbeat: HeartbeatConfig,
    metrics: Arc<RealtimeMetrics>,
) -> PumpExit
where
    S: Sink<Frame> + Send,
    S::Error: Display,
{
    let mut sink = pin!(sink);
    let mut ticker = interval_at(
        Instant::now() + heartbeat.ping_interval,
        heartbeat.ping_interval,
    );
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let (exit, in_flight) = loop {
        tokio::select! {
            biased;
            _ = conn.closed() => break (PumpExit::Closed, Vec::new()),
            next = outbound.recv() => {
                let Some(first) = next else {
                    break (PumpExit::Closed, Vec::new());
                };
                let mut batch = vec![first];
                while let Ok(more) = outbound.try_recv() {
                    batch.push(more);
                }

                let payload = match codec::coalesce(&batch) {
                    Ok(payload) => payload,
                    Err(e) => {
                        warn!(conn_id = %conn.id, error = %e, "Dropping unencodable batch");
                        continue;
                    }
                };

                match timeout(heartbeat.write_timeout, sink.send(Frame::Text(payload))).await {
                    Ok(Ok(())) => {
                        metrics.messages_written(batch.len() as u64);
                        debug!(conn_id = %conn.id, count = batch.len(), "Wrote batch");
                    }
                    Ok(Err(e)) => break (PumpExit::Failed(e.to_string()), batch),
                    Err(_) => break (PumpExit::Failed("write deadline elapsed".to_string()), batch),
                }
            }
            _ = ticker.tick() => {
                match timeout(heartbeat.write_timeout, sink.send(Frame::Ping(Bytes::new()))).await {
                    Ok(Ok(())) => debug!(conn_id = %conn.id, "Sent ping"),
                    Ok(Err(e)) => break (PumpExit::Failed(e.to_string()), Vec::new()),
                    Err(_) => break (PumpExit::Failed("ping deadline elapsed".to_string()), Vec::new()),
                }
            }
        }
    };

    match exit.error() {
        Some(err) => {
            metrics.write_failure();
            warn!(
                principal_id = %conn.principal_id,
                conn_id = %conn.id,
                error = %err,
                requeued = in_flight.len(),
                "Write failed, tearing connection down"
            );
            conn.close();
            // Unregister first so the requeued batch cannot land back on
            // this connection.
            let _ = hub.unregister(conn.id, conn.principal_id).await;
            for message in in_flight {
                hub.send_to_principal(message, conn.principal_id).await;
            }
        }
        None => {
            let _ = timeout(heartbeat.write_timeout, sink.send(Frame::Close)).await;
            let _ = timeout(heartbeat.write_timeout, sink.close()).await;
            debug!(conn_id = %conn.id, "Write pump stopped");
        }
    }

    outbound.close();
    let mut discarded = 0usize;
    while outbound.try_recv().is_ok() {
        discarded += 1;
    }
    if discarded > 0 {
        debug!(conn_id = %conn.id, count = discarded, "Discarded unwritten messages");
    }

    exit
}

/// Read frames, keep the read deadline alive on pongs, and route messages.
///
/// Every text frame carries exactly one message, possibly spread over
/// several lines. Malformed or unhandled messages are dropped and the
/// connection stays open.
pub async fn read_pump<R, E>(
    conn: Arc<Connection>,
    stream: R,
    hub: HubHandle,
    router: Arc<InboundRouter>,
    heartbeat: HeartbeatConfig,
    metrics: Arc<RealtimeMetrics>,
) -> PumpExit
where
    R: Stream<Item = Result<Frame, E>> + Send,
    E: Display + Send,
{
    let mut stream = pin!(stream);
    let deadline = sleep(heartbeat.pong_wait);
    let mut deadline = pin!(deadline);

    let exit = loop {
        tokio::select! {
            biased;
            _ = conn.closed() => break PumpExit::Closed,
            _ = &mut deadline => break PumpExit::TimedOut,
            next = stream.next() => match next {
                None => break PumpExit::PeerClosed,
                Some(Err(e)) => break PumpExit::Failed(e.to_string()),
                Some(Ok(Frame::Close)) => break PumpExit::PeerClosed,
                Some(Ok(Frame::Pong(_))) => {
                    deadline.as_mut().reset(Instant::now() + heartbeat.pong_wait);
                }
                Some(Ok(Frame::Ping(_))) => {}
                Some(Ok(Frame::Binary(data))) => {
                    metrics.inbound_dropped();
                    warn!(conn_id = %conn.id, bytes = data.len(), "Dropping binary frame");
                }
                Some(Ok(Frame::Text(text))) => {
                    if text.len() > heartbeat.max_frame_bytes {
                        break PumpExit::FrameTooLarge(text.len());
                    }
                    let ctx = InboundContext {
                        principal_id: conn.principal_id,
                        connection_id: conn.id,
                        hub: hub.clone(),
                    };
                    match router.route(&text, ctx) {
                        RouteOutcome::Routed(_) => metrics.inbound_routed(),
                        RouteOutcome::Malformed | RouteOutcome::Unhandled(_) => {
                            metrics.inbound_dropped()
                        }
                    }
                }
            },
        }
    };

    match (&exit, exit.error()) {
        (PumpExit::Closed, _) => debug!(conn_id = %conn.id, "Read pump stopped"),
        (_, Some(err)) => {
            warn!(principal_id = %conn.principal_id, conn_id = %conn.id, error = %err, "Connection lost");
            conn.close();
            let _ = hub.unregister(conn.id, conn.principal_id).await;
        }
        (_, None) => {
            info!(principal_id = %conn.principal_id, conn_id = %conn.id, "Peer closed connection");
            conn.close();
            let _ = hub.unregister(conn.id, conn.principal_id).await;
        }
    }

    exit
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use futures::channel::mpsc as chan;
    use tokio_util::sync::CancellationToken;

    use beacon_core::types::id::PrincipalId;

    use super::*;
    use crate::hub::Hub;
    use crate::offline::OfflineBuffer;
    use crate::router::handler_fn;

    const P: PrincipalId = PrincipalId::new(1);

    fn heartbeat() -> HeartbeatConfig {
        HeartbeatConfig {
            ping_interval: Duration::from_secs(100),
            pong_wait: Duration::from_secs(120),
            write_timeout: Duration::from_secs(10),
            max_frame_bytes: 512,
        }
    }

    fn hub() -> (HubHandle, Arc<OfflineBuffer>, Arc<RealtimeMetrics>) {
        let offline = Arc::new(OfflineBuffer::new(50));
        let metrics = Arc::new(RealtimeMetrics::new());
        let (hub, _task) = Hub::spawn(
            64,
            Arc::clone(&offline),
            Arc::clone(&metrics),
            CancellationToken::new(),
        );
        (hub, offline, metrics)
    }

    #[tokio::test(start_paused = true)]
    async fn test_write_pump_coalesces_queued_messages() {
        let (hub, _, metrics) = hub();
        let (conn, rx) = Connection::new(P, 16);
        conn.try_enqueue(Message::new(1, "a")).unwrap();
        conn.try_enqueue(Message::new(2, "b")).unwrap();

        let (sink, mut frames) = chan::unbounded::<Frame>();
        let task = tokio::spawn(write_pump(
            Arc::clone(&conn),
            rx,
            sink,
            hub,
            heartbeat(),
            Arc::clone(&metrics),
        ));

        let Frame::Text(text) = frames.next().await.unwrap() else {
            panic!("expected text frame");
        };
        assert_eq!(
            text,
            "{\"type\":1,\"content\":\"a\"}\n{\"type\":2,\"content\":\"b\"}"
        );

        conn.close();
        assert_eq!(task.await.unwrap(), PumpExit::Closed);
        assert_eq!(frames.next().await, Some(Frame::Close));
        assert_eq!(metrics.snapshot().messages_written, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_write_pump_pings_on_interval() {
        let (hub, _, _) = hub();
        let (conn, rx) = Connection::new(P, 16);
        let (sink, mut frames) = chan::unbounded::<Frame>();
        let _task = tokio::spawn(write_pump(
            Arc::clone(&conn),
            rx,
            sink,
            hub,
            heartbeat(),
            Arc::new(RealtimeMetrics::new()),
        ));

        tokio::time::advance(Duration::from_secs(101)).await;
        assert!(matches!(frames.next().await, Some(Frame::Ping(_))));
        conn.close();
    }

    #[tokio::test(start_paused = true)]
    async fn test_write_failure_requeues_in_flight() {
        let (hub, offline, metrics) = hub();
        let (conn, rx) = Connection::new(P, 16);
        hub.register(Arc::clone(&conn)).await.unwrap();

        let (sink, frames) = chan::unbounded::<Frame>();
        drop(frames);

        conn.try_enqueue(Message::new(1, "lost-in-flight")).unwrap();
        let exit = write_pump(
            Arc::clone(&conn),
            rx,
            sink,
            hub.clone(),
            heartbeat(),
            Arc::clone(&metrics),
        )
        .await;

        assert!(matches!(exit, PumpExit::Failed(_)));
        assert!(conn.is_closed());

        hub.snapshot().await.unwrap();
        assert!(!hub.is_connected(P));
        assert_eq!(offline.drain(P), vec![Message::new(1, "lost-in-flight")]);
        assert_eq!(metrics.snapshot().write_failures, 1);
    }

    #[tokio::test]
    async fn test_superseded_connection_discards_queued_messages() {
        let (hub, offline, _) = hub();
        let (old, old_rx) = Connection::new(P, 16);
        hub.register(Arc::clone(&old)).await.unwrap();
        old.try_enqueue(Message::new(1, "before-reconnect")).unwrap();

        let (new, mut new_rx) = Connection::new(P, 16);
        hub.register(Arc::clone(&new)).await.unwrap();
        hub.send_to_principal(Message::new(1, "after-reconnect"), P).await;
        hub.snapshot().await.unwrap();
        assert!(old.is_closed());

        let (sink, _frames) = chan::unbounded::<Frame>();
        let exit = write_pump(
            Arc::clone(&old),
            old_rx,
            sink,
            hub.clone(),
            heartbeat(),
            Arc::new(RealtimeMetrics::new()),
        )
        .await;
        assert_eq!(exit, PumpExit::Closed);

        hub.snapshot().await.unwrap();
        assert_eq!(new_rx.recv().await, Some(Message::new(1, "after-reconnect")));
        assert!(new_rx.try_recv().is_err());
        assert!(offline.drain(P).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_pump_times_out_without_pong() {
        let (hub, _, _) = hub();
        let (conn, _rx) = Connection::new(P, 16);
        hub.register(Arc::clone(&conn)).await.unwrap();

        let (_inbound_tx, inbound) = chan::unbounded::<Result<Frame, String>>();
        let exit = read_pump(
            Arc::clone(&conn),
            inbound,
            hub.clone(),
            Arc::new(InboundRouter::empty()),
            heartbeat(),
            Arc::new(RealtimeMetrics::new()),
        )
        .await;

        assert_eq!(exit, PumpExit::TimedOut);
        assert!(conn.is_closed());
        hub.snapshot().await.unwrap();
        assert!(!hub.is_connected(P));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pong_extends_read_deadline() {
        let (hub, _, _) = hub();
        let (conn, _rx) = Connection::new(P, 16);
        let (inbound_tx, inbound) = chan::unbounded::<Result<Frame, String>>();

        let task = tokio::spawn(read_pump(
            Arc::clone(&conn),
            inbound,
            hub,
            Arc::new(InboundRouter::empty()),
            heartbeat(),
            Arc::new(RealtimeMetrics::new()),
        ));

        tokio::time::advance(Duration::from_secs(100)).await;
        inbound_tx.unbounded_send(Ok(Frame::Pong(Bytes::new()))).unwrap();
        tokio::task::yield_now().await;

        tokio::time::advance(Duration::from_secs(100)).await;
        tokio::task::yield_now().await;
        assert!(!conn.is_closed());

        tokio::time::advance(Duration::from_secs(21)).await;
        assert_eq!(task.await.unwrap(), PumpExit::TimedOut);
    }

    #[tokio::test]
    async fn test_read_pump_routes_multi_line_object() {
        let (hub, _, metrics) = hub();
        let (conn, _rx) = Connection::new(P, 16);
        let (seen_tx, mut seen) = tokio::sync::mpsc::unbounded_channel();
        let router = InboundRouter::builder()
            .on(
                4,
                handler_fn(move |_, message: Message| {
                    let seen_tx = seen_tx.clone();
                    async move {
                        let _ = seen_tx.send(message.into_content());
                        Ok(())
                    }
                }),
            )
            .build();

        let (inbound_tx, inbound) = chan::unbounded::<Result<Frame, String>>();
        let task = tokio::spawn(read_pump(
            Arc::clone(&conn),
            inbound,
            hub,
            Arc::new(router),
            heartbeat(),
            Arc::clone(&metrics),
        ));

        inbound_tx
            .unbounded_send(Ok(Frame::Text(
                "{\n  \"type\": 4,\n  \"content\": \"pretty\"\n}".to_string(),
            )))
            .unwrap();
        inbound_tx
            .unbounded_send(Ok(Frame::Text("not-json".to_string())))
            .unwrap();

        assert_eq!(seen.recv().await.unwrap(), "pretty");

        drop(inbound_tx);
        assert_eq!(task.await.unwrap(), PumpExit::PeerClosed);
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.inbound_routed, 1);
        assert_eq!(snapshot.inbound_dropped, 1);
    }

    #[tokio::test]
    async fn test_oversized_frame_closes_connection() {
        let (hub, _, _) = hub();
        let (conn, _rx) = Connection::new(P, 16);
        let (inbound_tx, inbound) = chan::unbounded::<Result<Frame, String>>();
        inbound_tx
            .unbounded_send(Ok(Frame::Text("x".repeat(513))))
            .unwrap();

        let exit = read_pump(
            Arc::clone(&conn),
            inbound,
            hub,
            Arc::new(InboundRouter::empty()),
            heartbeat(),
            Arc::new(RealtimeMetrics::new()),
        )
        .await;
        assert_eq!(exit, PumpExit::FrameTooLarge(513));
        assert_eq!(
            exit.error().map(|e| e.kind),
            Some(beacon_core::error::ErrorKind::Connection)
        );
        assert!(conn.is_closed());
    }
}
