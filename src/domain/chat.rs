//! Chat messages and per-user chat views.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{ChatId, MessageId, UserId};

/// Maximum accepted message length, in characters, after trimming.
pub const MAX_MESSAGE_CHARS: usize = 4000;

/// Default page size for message history.
pub const DEFAULT_PAGE_LIMIT: u32 = 20;

/// Upper bound for a single history page.
pub const MAX_PAGE_LIMIT: u32 = 100;

/// A persisted chat message. Append-only; ordered by `timestamp`, then `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Store-assigned identifier.
    pub id: MessageId,
    /// Chat the message belongs to.
    pub chat_id: ChatId,
    /// Author; always a participant of `chat_id`.
    pub sender_id: UserId,
    /// Trimmed, non-empty body.
    pub content: String,
    /// Store-assigned send time.
    pub timestamp: DateTime<Utc>,
}

/// One page of history, newest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MessagePage {
    /// Messages ordered newest first.
    pub messages: Vec<Message>,
    /// Whether older messages exist beyond this page.
    pub has_more: bool,
}

impl MessagePage {
    /// Builds a page from up to `limit + 1` newest-first rows, trimming the
    /// probe row and reporting whether it existed.
    #[must_use]
    pub fn from_probe(mut rows: Vec<Message>, limit: usize) -> Self {
        let has_more = rows.len() > limit;
        rows.truncate(limit);
        Self {
            messages: rows,
            has_more,
        }
    }
}

/// A chat as seen by one participant in the chat list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChatPreview {
    /// Chat identifier.
    pub id: ChatId,
    /// The other participant.
    pub other_user_id: UserId,
    /// Body of the newest message, empty if the chat has none.
    pub last_message: String,
    /// Timestamp of the newest message.
    pub last_time: Option<DateTime<Utc>>,
    /// Messages from the other participant newer than the viewer's cursor.
    pub unread_count: i64,
}

/// Clamps a requested page size into `1..=MAX_PAGE_LIMIT`, defaulting to
/// [`DEFAULT_PAGE_LIMIT`].
#[must_use]
pub fn clamp_page_limit(requested: Option<u32>) -> u32 {
    requested
        .unwrap_or(DEFAULT_PAGE_LIMIT)
        .clamp(1, MAX_PAGE_LIMIT)
}
