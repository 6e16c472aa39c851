use std::convert::Infallible;

use axum::{
    extract::{Extension, Path, State},
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures::{Stream, StreamExt};
use serde_json::{json, Value};
use tracing::warn;

use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::AppState;

use crate::models::{ChatError, ConversationView, MessageView, SendMessageRequest};
use crate::services::registry::ChatService;

impl From<ChatError> for AppError {
    fn from(err: ChatError) -> Self {
        match err {
            ChatError::EmptyMessage | ChatError::MessageTooLong(_) => {
                AppError::ValidationError(err.to_string())
            }
            ChatError::InvalidConversation(_) => AppError::BadRequest(err.to_string()),
            ChatError::NotParticipant(_) => AppError::Forbidden(err.to_string()),
            ChatError::StoreUnavailable(msg) => AppError::ServiceUnavailable(msg),
            ChatError::Serialization(msg) => AppError::Internal(msg),
        }
    }
}

/// Message inbox: every conversation the caller is part of.
#[axum::debug_handler]
pub async fn list_conversations(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let service = ChatService::new(&state);
    let conversations: Vec<ConversationView> = service
        .list_conversations(&user.id)
        .await?
        .into_iter()
        .map(|c| ConversationView::for_user(c, &user.id))
        .collect();

    Ok(Json(json!({ "conversations": conversations })))
}

#[axum::debug_handler]
pub async fn open_conversation(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(partner_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let service = ChatService::new(&state);
    let conversation = service.ensure_conversation(&user.id, &partner_id).await?;

    Ok(Json(json!(ConversationView::for_user(conversation, &user.id))))
}

#[axum::debug_handler]
pub async fn list_messages(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(conversation_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let service = ChatService::new(&state);
    service.partner_in(&conversation_id, &user.id).await?;

    let messages: Vec<MessageView> = service
        .list_messages(&conversation_id)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();

    Ok(Json(json!({ "messages": messages })))
}

#[axum::debug_handler]
pub async fn send_message(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(conversation_id): Path<String>,
    Json(request): Json<SendMessageRequest>,
) -> Result<Json<Value>, AppError> {
    let service = ChatService::new(&state);
    let receiver_id = service.partner_in(&conversation_id, &user.id).await?;

    let message = service
        .send_message(&conversation_id, &user.id, &user.label(), &receiver_id, &request.text)
        .await?;

    Ok(Json(json!(MessageView::from(message))))
}

/// Server-sent events: the current messages, then each new one as it arrives.
pub async fn stream_messages(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(conversation_id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let service = ChatService::new(&state);
    service.partner_in(&conversation_id, &user.id).await?;

    let messages = service.stream_messages(&conversation_id).await?;
    let events = messages.filter_map(|message| async move {
        match Event::default().event("message").json_data(MessageView::from(message)) {
            Ok(event) => Some(Ok(event)),
            Err(e) => {
                warn!("Failed to encode chat event: {}", e);
                None
            }
        }
    });

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

#[axum::debug_handler]
pub async fn mark_conversation_read(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(conversation_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let service = ChatService::new(&state);
    service.partner_in(&conversation_id, &user.id).await?;

    let updated = service.mark_incoming_read(&conversation_id, &user.id).await?;
    Ok(Json(json!({ "success": true, "updated": updated })))
}

pub async fn chat_health_check() -> Json<Value> {
    Json(json!({ "status": "healthy", "service": "chat" }))
}
