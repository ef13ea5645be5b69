//! Chat handlers: ensure, list, history and send.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::{
    ChatListResponse, EnsureChatResponse, MessagesQuery, SendMessageRequest, parse_timestamp,
};
use crate::app_state::AppState;
use crate::auth::AuthUser;
use crate::domain::{ChatId, Message, MessagePage, UserId};
use crate::error::{ErrorResponse, GatewayError};

/// `POST /chats/with/{userId}` — Find or create the chat with a user.
///
/// # Errors
///
/// Returns [`GatewayError`] on self-chat, unknown user or store failure.
#[utoipa::path(
    post,
    path = "/chats/with/{userId}",
    tag = "Chats",
    summary = "Ensure a chat with a user",
    description = "Returns the caller's chat with the user, creating it on first use. Idempotent.",
    params(("userId" = i64, Path, description = "Other participant")),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Chat id", body = EnsureChatResponse),
        (status = 400, description = "Cannot chat with yourself", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
    )
)]
pub async fn ensure_chat(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(peer): Path<UserId>,
) -> Result<impl IntoResponse, GatewayError> {
    let chat_id = state.chat_resolver.ensure_chat(user, peer).await?;
    Ok(Json(EnsureChatResponse { chat_id }))
}

/// `GET /chats` — The caller's chats with previews.
///
/// # Errors
///
/// Returns [`GatewayError`] on store failure.
#[utoipa::path(
    get,
    path = "/chats",
    tag = "Chats",
    summary = "List chats",
    description = "Each chat carries the other participant, the newest message and the caller's unread count, most recently active first.",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Chat previews", body = ChatListResponse),
    )
)]
pub async fn list_chats(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<impl IntoResponse, GatewayError> {
    let chats = state.dispatcher.list_chats(user).await?;
    Ok(Json(ChatListResponse { chats }))
}

/// `GET /chats/{id}/messages` — One page of history, newest first.
///
/// # Errors
///
/// Returns [`GatewayError::ChatNotFound`] for non-participants and
/// [`GatewayError::InvalidRequest`] for a malformed `before`.
#[utoipa::path(
    get,
    path = "/chats/{id}/messages",
    tag = "Chats",
    summary = "Fetch message history",
    description = "Returns messages strictly older than `before` (or the newest ones), newest first, and marks the chat read for the caller.",
    params(("id" = i64, Path, description = "Chat id"), MessagesQuery),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Message page", body = MessagePage),
        (status = 400, description = "Malformed query", body = ErrorResponse),
        (status = 404, description = "Chat not found", body = ErrorResponse),
    )
)]
pub async fn get_messages(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(chat_id): Path<ChatId>,
    Query(query): Query<MessagesQuery>,
) -> Result<impl IntoResponse, GatewayError> {
    let before = query
        .before
        .as_deref()
        .filter(|raw| !raw.trim().is_empty())
        .map(|raw| parse_timestamp("before", raw))
        .transpose()?;
    let page = state
        .dispatcher
        .fetch_page(user, chat_id, before, query.limit)
        .await?;
    Ok(Json(page))
}

/// `POST /chats/{id}/messages` — Send a message.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidRequest`] for empty or oversized content
/// and [`GatewayError::ChatNotFound`] for non-participants.
#[utoipa::path(
    post,
    path = "/chats/{id}/messages",
    tag = "Chats",
    summary = "Send a message",
    description = "Persists the message, then pushes `new_message` to the other participant's live connections.",
    params(("id" = i64, Path, description = "Chat id")),
    request_body = SendMessageRequest,
    security(("bearer" = [])),
    responses(
        (status = 201, description = "Message stored", body = Message),
        (status = 400, description = "Invalid content", body = ErrorResponse),
        (status = 404, description = "Chat not found", body = ErrorResponse),
    )
)]
pub async fn send_message(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(chat_id): Path<ChatId>,
    Json(req): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    let message = state.dispatcher.send(user, chat_id, &req.content).await?;
    Ok((StatusCode::CREATED, Json(message)))
}

/// Chat routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/chats", get(list_chats))
        .route("/chats/with/{userId}", post(ensure_chat))
        .route("/chats/{id}/messages", get(get_messages).post(send_message))
}
