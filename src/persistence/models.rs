//! Database row shapes and their conversion into domain types.

use chrono::{DateTime, Utc};

use crate::domain::{
    ChatId, ChatPreview, Connection, ConnectionId, ConnectionStatus, Message, MessageId, UserId,
};
use crate::error::GatewayError;

/// `(id, from_user_id, to_user_id, status, updated_at)` from `connections`.
pub type ConnectionRow = (i64, i64, i64, String, DateTime<Utc>);

/// `(id, chat_id, sender_id, content, sent_at)` from `messages`.
pub type MessageRow = (i64, i64, i64, String, DateTime<Utc>);

/// `(chat_id, other_user_id, last_content, last_sent_at, unread)` from the
/// chat preview query.
pub type ChatPreviewRow = (i64, i64, Option<String>, Option<DateTime<Utc>>, i64);

/// Converts a `connections` row.
///
/// # Errors
///
/// Returns [`GatewayError::PersistenceError`] if the stored status is not a
/// known [`ConnectionStatus`].
pub fn connection_from_row(row: ConnectionRow) -> Result<Connection, GatewayError> {
    let (id, from_user_id, to_user_id, status, updated_at) = row;
    let status = status
        .parse::<ConnectionStatus>()
        .map_err(|e| GatewayError::PersistenceError(e.to_string()))?;
    Ok(Connection {
        id: ConnectionId::new(id),
        from_user_id: UserId::new(from_user_id),
        to_user_id: UserId::new(to_user_id),
        status,
        updated_at,
    })
}

/// Converts a `messages` row.
#[must_use]
pub fn message_from_row(row: MessageRow) -> Message {
    let (id, chat_id, sender_id, content, timestamp) = row;
    Message {
        id: MessageId::new(id),
        chat_id: ChatId::new(chat_id),
        sender_id: UserId::new(sender_id),
        content,
        timestamp,
    }
}

/// Converts a chat preview row.
#[must_use]
pub fn preview_from_row(row: ChatPreviewRow) -> ChatPreview {
    let (id, other_user_id, last_message, last_time, unread_count) = row;
    ChatPreview {
        id: ChatId::new(id),
        other_user_id: UserId::new(other_user_id),
        last_message: last_message.unwrap_or_default(),
        last_time,
        unread_count,
    }
}
