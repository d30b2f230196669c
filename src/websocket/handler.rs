use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{sink::SinkExt, stream::StreamExt};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    middleware::{Actor, AuthActor},
    state::AppState,
    websocket::types::{ClientMessage, ErrorPayload, WsMessage},
};

use super::connection::WsSender;

/// Push WebSocket. The auth middleware has already verified the bearer token
/// (header or `token=` query parameter), so every socket that reaches the
/// upgrade is authenticated; unauthenticated connections are refused with
/// 401 and never touch the registry.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    AuthActor(actor): AuthActor,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, actor, state))
}

async fn handle_socket(socket: WebSocket, actor: Actor, state: AppState) {
    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<WsMessage>();

    let connection_id = Uuid::new_v4();
    if !state
        .ws_connections
        .add_connection(actor.id, connection_id, tx.clone())
    {
        tracing::warn!(
            user_id = %actor.id,
            connections = state.ws_connections.connection_count(&actor.id),
            "connection cap reached, refusing socket"
        );
        let refusal = WsMessage::Error(ErrorPayload {
            message: "Too many simultaneous connections".to_string(),
        });
        if let Ok(json) = serde_json::to_string(&refusal) {
            let _ = sender.send(Message::Text(json)).await;
        }
        return;
    }

    tracing::info!(user_id = %actor.id, kind = %actor.kind, %connection_id, "socket connected");

    // Task: send frames from the channel to the WebSocket
    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if let Ok(json) = serde_json::to_string(&msg) {
                if sender.send(Message::Text(json)).await.is_err() {
                    break;
                }
            }
        }
    });

    // Task: receive frames from the WebSocket
    let state_clone = state.clone();
    let actor_clone = actor.clone();
    let tx_clone = tx.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            if let Message::Text(text) = msg {
                if let Err(e) =
                    process_client_message(&text, &actor_clone, &state_clone, &tx_clone).await
                {
                    tracing::error!(user_id = %actor_clone.id, "Error processing frame: {:?}", e);
                    let error_msg = WsMessage::Error(ErrorPayload {
                        message: e.to_string(),
                    });
                    let _ = tx_clone.send(error_msg);
                }
            } else if let Message::Close(_) = msg {
                break;
            }
        }
    });

    // Heartbeat task
    let tx_heartbeat = tx.clone();
    let mut heartbeat_task = tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(30));
        loop {
            interval.tick().await;
            if tx_heartbeat.send(WsMessage::Ping).is_err() {
                break;
            }
        }
    });

    // Stop all tasks when any one finishes
    tokio::select! {
        _ = &mut send_task => {
            recv_task.abort();
            heartbeat_task.abort();
        },
        _ = &mut recv_task => {
            send_task.abort();
            heartbeat_task.abort();
        },
        _ = &mut heartbeat_task => {
            send_task.abort();
            recv_task.abort();
        }
    }

    state.ws_connections.remove_connection(&actor.id, &connection_id);
    tracing::info!(user_id = %actor.id, %connection_id, "socket closed");
}

/// Handle one inbound frame. Errors bubble up to the caller, which reports
/// them on the socket as an `error` frame: a send into an unknown
/// conversation is a visible failure, not a silent drop.
async fn process_client_message(
    text: &str,
    actor: &Actor,
    state: &AppState,
    tx: &WsSender,
) -> Result<()> {
    let frame: ClientMessage = serde_json::from_str(text)
        .map_err(|e| AppError::BadRequest(format!("Invalid message format: {}", e)))?;

    match frame {
        ClientMessage::Message {
            conversation_id,
            content,
            kind,
        } => {
            state
                .chat_service
                .send_message(actor, conversation_id, &content, kind)
                .await?;
        }

        ClientMessage::MarkRead { conversation_id } => {
            state.chat_service.mark_read(conversation_id).await?;
        }

        ClientMessage::Ping => {
            let _ = tx.send(WsMessage::Pong);
        }
    }

    Ok(())
}
