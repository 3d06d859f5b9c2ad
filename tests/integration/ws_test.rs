//! Integration tests for WebSocket connection and messaging over a real socket.

mod helpers;

use std::net::SocketAddr;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use http::StatusCode;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{self, Message as WsMessage};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use beacon_core::types::id::PrincipalId;
use beacon_realtime::Message;

use helpers::{ALICE, ECHO_KIND, TestApp};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn open(addr: SocketAddr, token: &str) -> Result<Client, tungstenite::Error> {
    connect_async(format!("ws://{addr}/ws?token={token}"))
        .await
        .map(|(socket, _)| socket)
}

async fn next_message(client: &mut Client) -> Option<WsMessage> {
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(5), client.next())
            .await
            .expect("Timed out waiting for a frame")?;
        match frame {
            Ok(WsMessage::Ping(_)) | Ok(WsMessage::Pong(_)) => continue,
            Ok(other) => return Some(other),
            Err(_) => return None,
        }
    }
}

async fn next_text(client: &mut Client) -> String {
    match next_message(client).await {
        Some(WsMessage::Text(text)) => text.as_str().to_owned(),
        other => panic!("expected text frame, got {other:?}"),
    }
}

async fn wait_connected(app: &TestApp, principal: PrincipalId) {
    for _ in 0..100 {
        if app.state.engine.is_connected(principal) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("principal {principal} never connected");
}

#[tokio::test]
async fn test_ws_upgrade_without_token() {
    let app = TestApp::new().await;
    let response = app.request("GET", "/ws", None, None).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_ws_rejects_bad_token_before_upgrade() {
    let app = TestApp::new().await;
    let addr = app.serve().await;

    match open(addr, "not-a-jwt").await {
        Err(tungstenite::Error::Http(response)) => {
            assert_eq!(response.status().as_u16(), 401);
        }
        other => panic!("expected HTTP rejection, got {:?}", other.map(|_| ())),
    }

    let refresh = app.issue(ALICE).await.refresh_token;
    match open(addr, &refresh).await {
        Err(tungstenite::Error::Http(response)) => {
            assert_eq!(response.status().as_u16(), 401);
        }
        other => panic!("expected HTTP rejection, got {:?}", other.map(|_| ())),
    }
}

#[tokio::test]
async fn test_ws_delivers_buffered_live_and_echo() {
    let app = TestApp::new().await;
    let addr = app.serve().await;

    app.state
        .engine
        .send_to_principal(Message::new(7, "while-offline"), ALICE)
        .await;

    let token = app.issue(ALICE).await.access_token;
    let mut client = open(addr, &token).await.expect("upgrade failed");

    let first = next_text(&mut client).await;
    assert_eq!(first, r#"{"type":7,"content":"while-offline"}"#);

    wait_connected(&app, ALICE).await;
    app.state
        .engine
        .send_to_principal(Message::new(8, "live"), ALICE)
        .await;
    assert_eq!(next_text(&mut client).await, r#"{"type":8,"content":"live"}"#);

    client
        .send(WsMessage::text(format!(
            r#"{{"type":{ECHO_KIND},"content":"echo me"}}"#
        )))
        .await
        .unwrap();
    assert_eq!(
        next_text(&mut client).await,
        format!(r#"{{"type":{ECHO_KIND},"content":"echo me"}}"#)
    );
}

#[tokio::test]
async fn test_ws_second_login_supersedes_first() {
    let app = TestApp::new().await;
    let addr = app.serve().await;

    let mut first = open(addr, &app.issue(ALICE).await.access_token)
        .await
        .unwrap();
    wait_connected(&app, ALICE).await;
    let first_id = app.state.engine.hub().connection_of(ALICE).unwrap();

    let mut second = open(addr, &app.issue(ALICE).await.access_token)
        .await
        .unwrap();

    match next_message(&mut first).await {
        Some(WsMessage::Close(_)) | None => {}
        other => panic!("expected close, got {other:?}"),
    }
    assert_ne!(app.state.engine.hub().connection_of(ALICE), Some(first_id));

    app.state
        .engine
        .send_to_principal(Message::new(1, "to-second"), ALICE)
        .await;
    assert_eq!(
        next_text(&mut second).await,
        r#"{"type":1,"content":"to-second"}"#
    );
}

#[tokio::test]
async fn test_ws_oversized_frame_closes_socket() {
    let app = TestApp::new().await;
    let addr = app.serve().await;
    let mut client = open(addr, &app.issue(ALICE).await.access_token)
        .await
        .unwrap();
    wait_connected(&app, ALICE).await;

    let huge = format!(r#"{{"type":1,"content":"{}"}}"#, "x".repeat(4096));
    let _ = client.send(WsMessage::text(huge)).await;

    match next_message(&mut client).await {
        Some(WsMessage::Close(_)) | None => {}
        other => panic!("expected close, got {other:?}"),
    }
    for _ in 0..100 {
        if !app.state.engine.is_connected(ALICE) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("connection was not unregistered");
}
