use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::ActorKind,
    error::{AppError, Result},
    middleware::AuthActor,
    state::AppState,
};

use super::chat_dto::{ConversationQuery, CreateConversationRequest, SendMessageRequest};
use super::chat_models::{Conversation, Message};

/// List conversations visible to the current actor
#[utoipa::path(
    get,
    path = "/api/chat/conversations",
    tag = "chat",
    params(
        ("managed_account_id" = Option<Uuid>, Query,
         description = "Managed account to list conversations for (managers only)")
    ),
    responses(
        (status = 200, description = "Conversations", body = Vec<Conversation>),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_conversations(
    State(state): State<AppState>,
    AuthActor(actor): AuthActor,
    Query(query): Query<ConversationQuery>,
) -> Result<impl IntoResponse> {
    let conversations = state
        .chat_service
        .list_conversations(&actor, query.managed_account_id)
        .await?;

    Ok((StatusCode::OK, Json(conversations)))
}

/// Create (or fetch) the conversation backing a friend link
#[utoipa::path(
    post,
    path = "/api/chat/conversations",
    tag = "chat",
    request_body = CreateConversationRequest,
    responses(
        (status = 201, description = "Conversation", body = Conversation),
        (status = 400, description = "Friend link does not match the managed account"),
        (status = 403, description = "Managed account belongs to another manager"),
        (status = 404, description = "Friend link not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_conversation(
    State(state): State<AppState>,
    AuthActor(actor): AuthActor,
    Json(payload): Json<CreateConversationRequest>,
) -> Result<impl IntoResponse> {
    if actor.kind != ActorKind::Manager {
        return Err(AppError::Forbidden(
            "Manager credentials required".to_string(),
        ));
    }
    payload.validate()?;

    state
        .account_service
        .owned_account(actor.id, payload.managed_account_id)
        .await?;

    let friend = state
        .friend_repository
        .find_by_id(payload.friend_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Friend link not found".to_string()))?;

    if friend.managed_account_id != payload.managed_account_id {
        return Err(AppError::BadRequest(
            "Friend link does not belong to this managed account".to_string(),
        ));
    }

    let conversation = state.chat_service.conversation_from_friend(&friend).await?;
    Ok((StatusCode::CREATED, Json(conversation)))
}

/// Message history of a conversation, oldest first
#[utoipa::path(
    get,
    path = "/api/chat/conversations/{id}/messages",
    tag = "chat",
    params(("id" = Uuid, Path, description = "Conversation ID")),
    responses(
        (status = 200, description = "Messages in ascending timestamp order", body = Vec<Message>),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_messages(
    State(state): State<AppState>,
    AuthActor(_actor): AuthActor,
    Path(conversation_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let messages = state.chat_service.history(conversation_id).await?;
    Ok((StatusCode::OK, Json(messages)))
}

/// Mark every message in a conversation as read
#[utoipa::path(
    post,
    path = "/api/chat/conversations/{id}/read",
    tag = "chat",
    params(("id" = Uuid, Path, description = "Conversation ID")),
    responses(
        (status = 200, description = "Conversation marked read"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = []))
)]
pub async fn mark_conversation_read(
    State(state): State<AppState>,
    AuthActor(_actor): AuthActor,
    Path(conversation_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    state.chat_service.mark_read(conversation_id).await?;
    Ok(StatusCode::OK)
}

/// Send a message into a conversation
///
/// Same fan-out as the WebSocket path: persisted first, then pushed to every
/// live handle of every recipient.
#[utoipa::path(
    post,
    path = "/api/chat/messages",
    tag = "chat",
    request_body = SendMessageRequest,
    responses(
        (status = 201, description = "Message persisted and fanned out", body = Message),
        (status = 400, description = "Invalid input"),
        (status = 404, description = "Conversation not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn send_message(
    State(state): State<AppState>,
    AuthActor(actor): AuthActor,
    Json(payload): Json<SendMessageRequest>,
) -> Result<impl IntoResponse> {
    payload.validate()?;

    let message = state
        .chat_service
        .send_message(&actor, payload.conversation_id, &payload.content, payload.kind)
        .await?;

    Ok((StatusCode::CREATED, Json(message)))
}
