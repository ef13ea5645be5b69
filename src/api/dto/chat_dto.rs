//! DTOs for chat endpoints.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::{ChatId, ChatPreview};

/// `POST /chats/with/{userId}` response.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EnsureChatResponse {
    /// The pair's chat.
    pub chat_id: ChatId,
}

/// `GET /chats` response.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ChatListResponse {
    /// The caller's chats, most recently active first.
    pub chats: Vec<ChatPreview>,
}

/// Query parameters of `GET /chats/{id}/messages`.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct MessagesQuery {
    /// Page size, 1..=100 (default 20).
    pub limit: Option<u32>,
    /// Only messages strictly older than this RFC 3339 timestamp.
    pub before: Option<String>,
}

/// `POST /chats/{id}/messages` request body.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SendMessageRequest {
    /// Message body; trimmed, 1..=4000 characters.
    pub content: String,
}
