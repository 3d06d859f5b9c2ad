//! WebSocket upgrade handler.

use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::ws::{Message as WsMessage, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::response::{IntoResponse, Response};
use futures::{SinkExt, StreamExt, future};
use tracing::{info, warn};

use beacon_core::error::AppError;
use beacon_core::types::principal::Principal;
use beacon_realtime::Frame;

use crate::dto::request::WsQuery;
use crate::error::ApiError;
use crate::state::AppState;

/// GET /ws?token={jwt}
///
/// The token is checked before the upgrade so a rejected client gets a
/// plain 401/403 instead of a socket that closes immediately.
pub async fn ws_upgrade(
    State(state): State<AppState>,
    Query(query): Query<WsQuery>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Result<Response, ApiError> {
    let token = query
        .token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::authentication("Missing token"))?;

    let principal = state.engine.authorize(&token).await?;

    let ws = match ws {
        Ok(ws) => ws,
        Err(rejection) => return Ok(rejection.into_response()),
    };

    Ok(ws
        .max_message_size(state.config.realtime.max_frame_bytes)
        .on_upgrade(move |socket| handle_socket(state, principal, socket)))
}

async fn handle_socket(state: AppState, principal: Principal, socket: WebSocket) {
    let (ws_tx, ws_rx) = socket.split();

    let sink = ws_tx.with(|frame: Frame| future::ready(Ok::<_, axum::Error>(to_ws(frame))));
    let stream = ws_rx.map(|result| result.map(from_ws));

    match state.engine.attach(principal.id, sink, stream).await {
        Ok(conn_id) => info!(
            principal_id = %principal.id,
            username = %principal.username,
            conn_id = %conn_id,
            "WebSocket connection established"
        ),
        Err(e) => warn!(
            principal_id = %principal.id,
            error = %e,
            "Failed to attach WebSocket connection"
        ),
    }
}

fn to_ws(frame: Frame) -> WsMessage {
    match frame {
        Frame::Text(text) => WsMessage::Text(text.into()),
        Frame::Binary(data) => WsMessage::Binary(data),
        Frame::Ping(data) => WsMessage::Ping(data),
        Frame::Pong(data) => WsMessage::Pong(data),
        Frame::Close => WsMessage::Close(None),
    }
}

fn from_ws(message: WsMessage) -> Frame {
    match message {
        WsMessage::Text(text) => Frame::Text(text.as_str().to_owned()),
        WsMessage::Binary(data) => Frame::Binary(data),
        WsMessage::Ping(data) => Frame::Ping(data),
        WsMessage::Pong(data) => Frame::Pong(data),
        WsMessage::Close(_) => Frame::Close,
    }
}

