//! WebSocket handler
//!
//! The credential is checked before the upgrade; a refused attempt gets a
//! JSON 401 and leaves no trace in the connection table or presence.

use crate::connection::Connection;
use crate::events::{GatewayEventType, ReadyEvent};
use crate::handlers::{HandlerError, HandlerResult, MessageDispatcher};
use crate::protocol::{CloseCode, GatewayMessage, HelloPayload};
use crate::server::GatewayState;
use axum::{
    extract::{
        ws::{CloseFrame, Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use chat_common::ErrorResponse;
use chat_core::Profile;
use chat_service::dto::UserResponse;
use chat_service::{AuthService, ServiceError};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::interval;
use uuid::Uuid;

/// Lower bound for the liveness check period
const MIN_HEARTBEAT_CHECK: Duration = Duration::from_millis(10);

#[derive(Debug, Default, Deserialize)]
pub struct GatewayQuery {
    #[serde(default)]
    pub token: Option<String>,
}

/// WebSocket gateway handler
///
/// The credential comes from `?token=` or, failing that, `Authorization: Bearer`.
pub async fn gateway_handler(
    State(state): State<GatewayState>,
    Query(query): Query<GatewayQuery>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    ws: WebSocketUpgrade,
) -> Response {
    let credential = query
        .token
        .or_else(|| bearer.map(|TypedHeader(Authorization(bearer))| bearer.token().to_string()));

    match AuthService::new(state.service_context())
        .authenticate(credential.as_deref())
        .await
    {
        Ok(profile) => ws
            .on_upgrade(move |socket| handle_socket(state, socket, profile))
            .into_response(),
        Err(e) => {
            tracing::info!(code = e.code(), error = %e, "Gateway connection refused");
            reject(&e)
        }
    }
}

fn reject(err: &ServiceError) -> Response {
    let status = StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::UNAUTHORIZED);
    (status, Json(ErrorResponse::new(err.code(), err.client_message()))).into_response()
}

/// Handle an upgraded, authenticated WebSocket connection
async fn handle_socket(state: GatewayState, socket: WebSocket, profile: Profile) {
    let session_id = Uuid::new_v4().to_string();
    let delivery = state.config().delivery.clone();

    let (tx, mut rx) = mpsc::channel::<GatewayMessage>(delivery.outbound_buffer);
    let connection = Connection::new(session_id.clone(), profile, tx);

    // Hello and READY are queued before the connection becomes reachable by
    // any broadcast
    if let Err(e) = greet(&connection, delivery.heartbeat_interval_ms).await {
        tracing::warn!(session_id = %session_id, error = %e, "Failed to queue Hello/READY");
        return;
    }
    state.connection_manager().insert_connection(connection.clone());

    tracing::info!(
        session_id = %session_id,
        user_id = %connection.user_id(),
        "WebSocket connection established"
    );

    state.presence().register(&connection);

    let (mut ws_sink, mut ws_stream) = socket.split();

    let state_recv = state.clone();
    let connection_recv = connection.clone();

    // Inbound frames of one connection are handled one at a time, in order
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = ws_stream.next().await {
            let session_id = connection_recv.session_id();
            match msg {
                Ok(Message::Text(text)) => {
                    if let Err(close_code) =
                        handle_text_message(&state_recv, &connection_recv, &text).await
                    {
                        tracing::debug!(
                            session_id = %session_id,
                            close_code = ?close_code,
                            "Closing connection due to error"
                        );
                        return Some(close_code);
                    }
                }
                Ok(Message::Binary(_)) => {
                    tracing::debug!(session_id = %session_id, "Binary messages not supported");
                    return Some(CloseCode::DecodeError);
                }
                Ok(Message::Ping(_) | Message::Pong(_)) => {
                    tracing::trace!(session_id = %session_id, "Ping/Pong received");
                }
                Ok(Message::Close(_)) => {
                    tracing::info!(session_id = %session_id, "Client closed connection");
                    return None;
                }
                Err(e) => {
                    tracing::warn!(session_id = %session_id, error = %e, "WebSocket error");
                    return None;
                }
            }
        }
        None
    });

    let close_code = tokio::select! {
        result = &mut recv_task => result.ok().flatten(),
        () = forward_outbound(&mut ws_sink, &mut rx, &session_id) => None,
        code = heartbeat_monitor(&connection, delivery.heartbeat_interval(), delivery.heartbeat_timeout()) => Some(code),
        code = connection.evicted() => Some(code),
    };
    recv_task.abort();

    cleanup_connection(&state, &connection);

    if let Some(code) = close_code {
        tracing::debug!(session_id = %session_id, close_code = %code, "Closing with code");
        let frame = CloseFrame {
            code: code.as_u16(),
            reason: code.description().into(),
        };
        let _ = ws_sink.send(Message::Close(Some(frame))).await;
    }
    let _ = ws_sink.close().await;
}

/// Queue Hello and READY on a connection not yet in the manager
async fn greet(connection: &Connection, heartbeat_interval_ms: u64) -> HandlerResult<()> {
    connection
        .send(GatewayMessage::hello(HelloPayload::with_interval(heartbeat_interval_ms)))
        .await?;
    let ready = ReadyEvent::new(UserResponse::from(connection.user()), connection.session_id());
    let data = serde_json::to_value(ready).map_err(|e| HandlerError::Internal(e.to_string()))?;
    connection.dispatch(GatewayEventType::Ready, data)?;
    Ok(())
}

/// Drain the outbound queue into the socket until either side closes
async fn forward_outbound(
    ws_sink: &mut SplitSink<WebSocket, Message>,
    rx: &mut mpsc::Receiver<GatewayMessage>,
    session_id: &str,
) {
    while let Some(msg) = rx.recv().await {
        match msg.to_json() {
            Ok(json) => {
                if ws_sink.send(Message::Text(json.into())).await.is_err() {
                    tracing::warn!(session_id = %session_id, "Failed to send message to WebSocket");
                    return;
                }
            }
            Err(e) => tracing::error!(session_id = %session_id, error = %e, "Failed to encode frame"),
        }
    }
}

/// Resolves with [`CloseCode::SessionTimeout`] once no heartbeat arrived within `timeout`
async fn heartbeat_monitor(
    connection: &Connection,
    heartbeat_interval: Duration,
    timeout: Duration,
) -> CloseCode {
    let period = (heartbeat_interval.min(timeout) / 2).max(MIN_HEARTBEAT_CHECK);
    let mut check_interval = interval(period);

    loop {
        check_interval.tick().await;

        let time_since = connection.time_since_heartbeat();
        if time_since > timeout {
            tracing::warn!(
                session_id = %connection.session_id(),
                time_since_ms = time_since.as_millis(),
                "Connection timed out (no heartbeat)"
            );
            return CloseCode::SessionTimeout;
        }
    }
}

/// Handle a text message from the client
async fn handle_text_message(
    state: &GatewayState,
    connection: &Arc<Connection>,
    text: &str,
) -> Result<(), CloseCode> {
    let message = match GatewayMessage::from_json(text) {
        Ok(m) => m,
        Err(e) => {
            tracing::debug!(
                session_id = %connection.session_id(),
                error = %e,
                "Failed to parse message"
            );
            return Err(e.close_code());
        }
    };

    tracing::trace!(
        session_id = %connection.session_id(),
        op = %message.op,
        "Received message"
    );

    match MessageDispatcher::dispatch(state, connection, message).await {
        Ok(Some(close_code)) => Err(close_code),
        Ok(None) => Ok(()),
        Err(e) => {
            tracing::warn!(
                session_id = %connection.session_id(),
                error = %e,
                "Handler error"
            );
            Err(e.to_close_code().unwrap_or(CloseCode::UnknownError))
        }
    }
}

/// Drop the connection from every group, then from presence
fn cleanup_connection(state: &GatewayState, connection: &Connection) {
    tracing::info!(
        session_id = %connection.session_id(),
        user_id = %connection.user_id(),
        age_ms = connection.age().as_millis(),
        "Cleaning up connection"
    );

    state
        .connection_manager()
        .remove_connection(connection.session_id());
    state.presence().unregister(connection);
}
