use std::time::Duration;

use axum::{
    extract::{
        ws::{Message as WsMessage, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    auth::{authenticate_token, AuthenticatedUser},
    error::{AppError, AppResult},
    state::AppState,
};

const REGISTER_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    pub token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisterFrame {
    event: String,
    user_id: Uuid,
}

pub async fn upgrade(
    State(state): State<AppState>,
    Query(query): Query<WsQuery>,
    ws: WebSocketUpgrade,
) -> AppResult<Response> {
    let token = query.token.ok_or_else(AppError::unauthorized)?;
    let user = authenticate_token(&state, &token)?;
    Ok(ws.on_upgrade(move |socket| serve(state, user, socket)))
}

async fn await_register(socket: &mut WebSocket) -> Option<Uuid> {
    while let Some(Ok(frame)) = socket.recv().await {
        match frame {
            WsMessage::Text(text) => {
                return serde_json::from_str::<RegisterFrame>(&text)
                    .ok()
                    .filter(|frame| frame.event == "register")
                    .map(|frame| frame.user_id);
            }
            WsMessage::Close(_) => return None,
            _ => continue,
        }
    }
    None
}

async fn serve(state: AppState, user: AuthenticatedUser, mut socket: WebSocket) {
    let registered = tokio::time::timeout(REGISTER_TIMEOUT, await_register(&mut socket))
        .await
        .ok()
        .flatten();
    if registered != Some(user.user_id) {
        warn!(user_id = %user.user_id, claimed = ?registered, "websocket register rejected");
        let _ = socket.send(WsMessage::Close(None)).await;
        return;
    }

    let mut events = state.hub.join(user.user_id);
    info!(user_id = %user.user_id, "websocket joined");
    let (mut sink, mut stream) = socket.split();

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => {
                    let payload = match serde_json::to_string(&event) {
                        Ok(payload) => payload,
                        Err(err) => {
                            warn!(error = %err, event = event.name(), "failed to encode event");
                            continue;
                        }
                    };
                    if sink.send(WsMessage::Text(payload)).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(user_id = %user.user_id, skipped, "websocket client lagging");
                }
                Err(RecvError::Closed) => break,
            },
            frame = stream.next() => match frame {
                Some(Ok(WsMessage::Close(_))) | None | Some(Err(_)) => break,
                Some(Ok(other)) => debug!(user_id = %user.user_id, ?other, "ignored client frame"),
            },
        }
    }

    drop(events);
    state.hub.leave(user.user_id);
    info!(user_id = %user.user_id, "websocket left");
}
