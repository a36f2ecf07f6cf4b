use axum::{
    extract::{
        Path, State,
        ws::{CloseFrame, Message, Utf8Bytes, WebSocket, WebSocketUpgrade, close_code},
    },
    response::IntoResponse,
};
use futures_util::{sink::SinkExt, stream::StreamExt};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, error, info, warn};

use crate::db::AppRecord;
use crate::polling::should_keep_polling;
use crate::web::AppState;

pub async fn model_app_ws_handler(
    ws: WebSocketUpgrade,
    State(app_state): State<Arc<AppState>>,
    Path(app_id): Path<i32>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_app_socket(socket, app_state, app_id))
}

/// Pushes the app record, then every change to it, until it leaves `Building`.
async fn handle_app_socket(mut socket: WebSocket, app_state: Arc<AppState>, app_id: i32) {
    // Subscribe before the snapshot so no change falls between the two.
    let mut rx = app_state.app_events.subscribe();
    info!(app_id, "App status client connected.");

    let snapshot = match app_state.lifecycle.get_by_id(app_id).await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            error!(app_id, error = %e, "Failed to load app for status stream.");
            close(&mut socket, close_code::ERROR, "status unavailable").await;
            return;
        }
    };
    if !send_record(&mut socket, snapshot.as_ref()).await {
        return;
    }
    if !snapshot.is_some_and(|app| should_keep_polling(app.state)) {
        close(&mut socket, close_code::NORMAL, "settled").await;
        return;
    }

    loop {
        tokio::select! {
            update = rx.recv() => {
                let record = match update {
                    Ok(record) if record.id == app_id => Some(record),
                    Ok(_) => continue,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(app_id, skipped, "Status stream lagged, re-reading the app.");
                        match app_state.lifecycle.get_by_id(app_id).await {
                            Ok(record) => record,
                            Err(e) => {
                                error!(app_id, error = %e, "Failed to re-read app for status stream.");
                                close(&mut socket, close_code::ERROR, "status unavailable").await;
                                return;
                            }
                        }
                    }
                    Err(RecvError::Closed) => break,
                };
                if !send_record(&mut socket, record.as_ref()).await {
                    return;
                }
                if !record.is_some_and(|app| should_keep_polling(app.state)) {
                    break;
                }
            }
            incoming = socket.next() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | None => {
                        info!(app_id, "App status client closed the connection.");
                        return;
                    }
                    Some(Ok(Message::Ping(payload))) => {
                        if socket.send(Message::Pong(payload)).await.is_err() {
                            return;
                        }
                    }
                    Some(Ok(other)) => debug!(app_id, message = ?other, "Ignoring client message."),
                    Some(Err(e)) => {
                        warn!(app_id, error = %e, "App status socket error.");
                        return;
                    }
                }
            }
        }
    }

    close(&mut socket, close_code::NORMAL, "settled").await;
}

async fn send_record(socket: &mut WebSocket, record: Option<&AppRecord>) -> bool {
    let payload = match serde_json::to_string(&record) {
        Ok(payload) => payload,
        Err(e) => {
            error!(error = %e, "Failed to serialize app record.");
            return false;
        }
    };
    if socket.send(Message::Text(Utf8Bytes::from(payload))).await.is_err() {
        warn!("App status client went away.");
        return false;
    }
    true
}

async fn close(socket: &mut WebSocket, code: u16, reason: &'static str) {
    let frame = CloseFrame {
        code,
        reason: Utf8Bytes::from_static(reason),
    };
    if let Err(e) = socket.send(Message::Close(Some(frame))).await {
        debug!(error = %e, "Close frame not delivered.");
    }
}
