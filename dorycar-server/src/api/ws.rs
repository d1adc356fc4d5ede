use axum::{
    extract::{
        Query, State,
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade},
    },
    http::{HeaderMap, header::AUTHORIZATION},
    response::IntoResponse,
};
use dorycar_core::auth::{AuthError, Connection, Handshake};
use dorycar_sdk::objects::{WsCloseCode, WsServerMessage};
use serde::Deserialize;
use tokio::sync::broadcast::error::RecvError;

use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct WsQuery {
    #[serde(default)]
    token: Option<String>,
}

/// `GET /ws`: real-time ride channel.
///
/// The credential is read from the `Authorization` header or, for browsers,
/// the `token` query parameter. It is checked after the upgrade so a refused
/// client still receives an `error` frame followed by close code 4001.
///
/// Once bound, the socket receives every `ride-updated` broadcast plus the
/// `ride-notification` and `chat-message` frames addressed to its user.
pub async fn ride_events_ws(
    state: State<AppState>,
    headers: HeaderMap,
    Query(query): Query<WsQuery>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let app_state = state.0.clone();
    let authorization = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    ws.on_upgrade(move |socket| handle_ride_ws(socket, app_state, authorization, query.token))
}

async fn handle_ride_ws(
    mut socket: WebSocket,
    state: AppState,
    authorization: Option<String>,
    query_token: Option<String>,
) {
    let handshake = Handshake {
        authorization: authorization.as_deref(),
        query_token: query_token.as_deref(),
    };
    let conn = match state.authenticator.connect(handshake).await {
        Ok(conn) => conn,
        Err(AuthError::Unauthenticated(reason)) => {
            tracing::debug!(reason, "WS: handshake refused");
            refuse(&mut socket, WsCloseCode::UNAUTHENTICATED, reason).await;
            return;
        }
        Err(AuthError::Storage(e)) => {
            tracing::error!(error = %e, "WS: failed to look up user");
            refuse(&mut socket, WsCloseCode::INTERNAL_ERROR, "internal error").await;
            return;
        }
        Err(AuthError::Timeout) => {
            refuse(&mut socket, WsCloseCode::INTERNAL_ERROR, "storage timeout").await;
            return;
        }
    };

    let user_id = conn.user_id();
    tracing::info!(%user_id, "WS: connected");
    relay(&mut socket, conn).await;
    tracing::info!(%user_id, "WS: disconnected");
}

/// Forward hub events to the socket until either side goes away.
async fn relay(socket: &mut WebSocket, mut conn: Connection) {
    let user_id = conn.user_id();
    loop {
        tokio::select! {
            event = conn.next_event() => {
                match event {
                    Ok(event) => {
                        if send_json(socket, &WsServerMessage::from(&event)).await.is_err() {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(%user_id, skipped, "WS: receiver lagged, events dropped");
                    }
                    Err(RecvError::Closed) => {
                        let _ = socket
                            .send(Message::Close(Some(CloseFrame {
                                code: WsCloseCode::NORMAL,
                                reason: "server shutting down".into(),
                            })))
                            .await;
                        break;
                    }
                }
            }

            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                    // The channel is push-only; client frames are ignored.
                    Some(Ok(_)) => {}
                }
            }
        }
    }
    conn.leave().await;
}

async fn refuse(socket: &mut WebSocket, code: u16, reason: &str) {
    let _ = send_json(
        socket,
        &WsServerMessage::Error {
            code,
            reason: reason.to_string(),
        },
    )
    .await;
    let _ = socket
        .send(Message::Close(Some(CloseFrame {
            code,
            reason: reason.to_string().into(),
        })))
        .await;
}

/// Serialize `value` as JSON and send it as a text WebSocket frame.
///
/// Returns `Err(())` if the send fails (client disconnected).
async fn send_json<T: serde::Serialize>(socket: &mut WebSocket, value: &T) -> Result<(), ()> {
    let json = serde_json::to_string(value).map_err(|_| ())?;
    socket
        .send(Message::Text(json.into()))
        .await
        .map_err(|_| ())
}
