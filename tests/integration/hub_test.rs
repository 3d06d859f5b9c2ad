//! Integration tests for the connection hub, driven through in-memory
//! socket halves.

mod helpers;

use std::time::Duration;

use futures::StreamExt;
use futures::channel::mpsc;

use beacon_core::config::ConnectPolicy;
use beacon_core::error::ErrorKind;
use beacon_realtime::{Frame, Message};

use helpers::{ADMIN, ALICE, BOB, TestApp};

struct FakeSocket {
    frames: mpsc::UnboundedReceiver<Frame>,
    inbound: mpsc::UnboundedSender<Result<Frame, String>>,
}

impl FakeSocket {
    async fn next_text(&mut self) -> String {
        loop {
            match tokio::time::timeout(Duration::from_secs(5), self.frames.next())
                .await
                .expect("Timed out waiting for a frame")
            {
                Some(Frame::Text(text)) => return text,
                Some(Frame::Ping(_)) => continue,
                other => panic!("expected text frame, got {other:?}"),
            }
        }
    }
}

async fn connect(app: &TestApp, principal: beacon_core::types::id::PrincipalId) -> FakeSocket {
    let issued = app.issue(principal).await;
    connect_with(app, &issued.access_token, ConnectPolicy::LoginRequired)
        .await
        .expect("upgrade rejected")
}

async fn connect_with(
    app: &TestApp,
    token: &str,
    policy: ConnectPolicy,
) -> Result<FakeSocket, beacon_core::error::AppError> {
    let (sink, frames) = mpsc::unbounded::<Frame>();
    let (inbound, stream) = mpsc::unbounded::<Result<Frame, String>>();
    app.state
        .engine
        .upgrade_connection(token, policy, sink, stream)
        .await?;
    Ok(FakeSocket { frames, inbound })
}

fn lines(payload: &str) -> Vec<Message> {
    payload
        .split('\n')
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

#[tokio::test]
async fn test_fan_out_partitions_live_and_offline() {
    let app = TestApp::new().await;
    let mut alice = connect(&app, ALICE).await;

    let report = app
        .state
        .engine
        .dispatch_many(Message::new(5, "hello"), vec![ALICE, BOB])
        .await
        .unwrap();

    assert_eq!(report.delivered, vec![ALICE]);
    assert_eq!(report.buffered, vec![BOB]);
    assert_eq!(lines(&alice.next_text().await), vec![Message::new(5, "hello")]);
    assert_eq!(app.state.engine.buffered_for(BOB), 1);

    let mut bob = connect(&app, BOB).await;
    assert_eq!(lines(&bob.next_text().await), vec![Message::new(5, "hello")]);
    assert_eq!(app.state.engine.buffered_for(BOB), 0);
}

#[tokio::test]
async fn test_offline_buffer_keeps_newest_fifty_in_order() {
    let app = TestApp::new().await;
    for i in 0..60 {
        app.state
            .engine
            .send_to_principal(Message::new(2, format!("m{i}")), BOB)
            .await;
    }
    // A reply-carrying dispatch is processed after the 60 fire-and-forget ones.
    app.state
        .engine
        .dispatch_many(Message::new(2, "m60"), vec![])
        .await
        .unwrap();
    assert_eq!(app.state.engine.buffered_for(BOB), 50);

    let mut bob = connect(&app, BOB).await;
    let mut received = Vec::new();
    while received.len() < 50 {
        received.extend(lines(&bob.next_text().await));
    }

    let expected: Vec<Message> = (10..60).map(|i| Message::new(2, format!("m{i}"))).collect();
    assert_eq!(received, expected);
    assert_eq!(app.state.engine.metrics().messages_evicted, 10);
}

#[tokio::test]
async fn test_new_connection_supersedes_old() {
    let app = TestApp::new().await;
    let mut first = connect(&app, ALICE).await;
    let first_id = app.state.engine.hub().connection_of(ALICE).unwrap();

    let mut second = connect(&app, ALICE).await;
    let second_id = app.state.engine.hub().connection_of(ALICE).unwrap();
    assert_ne!(first_id, second_id);

    let closed = tokio::time::timeout(Duration::from_secs(5), first.frames.next())
        .await
        .unwrap();
    assert_eq!(closed, Some(Frame::Close));

    app.state
        .engine
        .send_to_principal(Message::new(3, "to-new"), ALICE)
        .await;
    assert_eq!(lines(&second.next_text().await), vec![Message::new(3, "to-new")]);
    assert_eq!(app.state.engine.connected_count(), 1);
    assert_eq!(app.state.engine.metrics().connections_superseded, 1);
}

#[tokio::test]
async fn test_inbound_echo_round_trip() {
    let app = TestApp::new().await;
    let mut alice = connect(&app, ALICE).await;

    alice
        .inbound
        .unbounded_send(Ok(Frame::Text(
            "{\"type\":99,\"content\":\"nobody\"}".to_string(),
        )))
        .unwrap();
    alice
        .inbound
        .unbounded_send(Ok(Frame::Text(
            "{\n  \"type\": 1,\n  \"content\": \"ping\"\n}".to_string(),
        )))
        .unwrap();

    assert_eq!(lines(&alice.next_text().await), vec![Message::new(1, "ping")]);
}

#[tokio::test]
async fn test_peer_close_unregisters() {
    let app = TestApp::new().await;
    let alice = connect(&app, ALICE).await;
    assert!(app.state.engine.is_connected(ALICE));

    drop(alice.inbound);
    for _ in 0..50 {
        if !app.state.engine.is_connected(ALICE) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(!app.state.engine.is_connected(ALICE));

    app.state
        .engine
        .send_to_principal(Message::new(1, "later"), ALICE)
        .await;
    app.state
        .engine
        .dispatch_many(Message::new(1, "sync"), vec![])
        .await
        .unwrap();
    assert_eq!(app.state.engine.buffered_for(ALICE), 1);
}

#[tokio::test]
async fn test_reconnect_receives_offline_message_before_later_traffic() {
    let app = TestApp::new().await;
    let alice = connect(&app, ALICE).await;

    // Drop the socket without logging out.
    drop(alice);
    for _ in 0..50 {
        if !app.state.engine.is_connected(ALICE) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(!app.state.engine.is_connected(ALICE));

    let report = app
        .state
        .engine
        .dispatch_many(Message::new(6, "M1"), vec![ALICE])
        .await
        .unwrap();
    assert_eq!(report.buffered, vec![ALICE]);

    let mut alice = connect(&app, ALICE).await;
    app.state
        .engine
        .send_to_principal(Message::new(6, "M2"), ALICE)
        .await;

    let mut received = Vec::new();
    while received.len() < 2 {
        received.extend(lines(&alice.next_text().await));
    }
    assert_eq!(received, vec![Message::new(6, "M1"), Message::new(6, "M2")]);
    assert_eq!(app.state.engine.buffered_for(ALICE), 0);
}

#[tokio::test]
async fn test_connect_policies() {
    let app = TestApp::new().await;
    let alice = app.issue(ALICE).await;
    let admin = app.issue(ADMIN).await;

    let err = connect_with(&app, &alice.access_token, ConnectPolicy::AdminRequired)
        .await
        .err()
        .unwrap();
    assert_eq!(err.kind, ErrorKind::Authorization);
    assert!(
        connect_with(&app, &admin.access_token, ConnectPolicy::AdminRequired)
            .await
            .is_ok()
    );

    let err = connect_with(&app, &admin.access_token, ConnectPolicy::Closed)
        .await
        .err()
        .unwrap();
    assert_eq!(err.kind, ErrorKind::Authorization);
}

#[tokio::test]
async fn test_shutdown_closes_everyone() {
    let app = TestApp::new().await;
    let mut alice = connect(&app, ALICE).await;
    let mut bob = connect(&app, BOB).await;

    app.state.engine.shutdown().await.unwrap();

    for socket in [&mut alice, &mut bob] {
        let frame = tokio::time::timeout(Duration::from_secs(5), socket.frames.next())
            .await
            .unwrap();
        assert_eq!(frame, Some(Frame::Close));
    }
    assert_eq!(app.state.engine.connected_count(), 0);
}
