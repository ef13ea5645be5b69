//! Message dispatcher: persist, then notify.
//!
//! A message is durable before any live connection hears about it, and a
//! failed live delivery never fails the send. Offline recipients pick the
//! message up through history and the unread count.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use super::bounded;
use crate::domain::chat::{MAX_MESSAGE_CHARS, clamp_page_limit};
use crate::domain::{
    ChatId, ChatPreview, Message, MessagePage, PresenceHub, ServerEvent, UserId,
};
use crate::error::GatewayError;
use crate::persistence::Store;

/// Sends messages, serves history and relays typing indicators.
#[derive(Debug, Clone)]
pub struct MessageDispatcher {
    store: Arc<dyn Store>,
    hub: Arc<PresenceHub>,
    store_timeout: Duration,
}

impl MessageDispatcher {
    /// Creates a new `MessageDispatcher`.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, hub: Arc<PresenceHub>, store_timeout: Duration) -> Self {
        Self {
            store,
            hub,
            store_timeout,
        }
    }

    /// Persists a message from `sender` and pushes `new_message` to the
    /// other participant's live connections.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::InvalidRequest`] if the trimmed content is empty
    ///   or longer than [`MAX_MESSAGE_CHARS`].
    /// - [`GatewayError::ChatNotFound`] if `sender` is not a participant.
    /// - [`GatewayError::StoreTimeout`] / [`GatewayError::PersistenceError`]
    ///   on store failure.
    pub async fn send(
        &self,
        sender: UserId,
        chat_id: ChatId,
        content: &str,
    ) -> Result<Message, GatewayError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(GatewayError::InvalidRequest(
                "message content must not be empty".to_string(),
            ));
        }
        if content.chars().count() > MAX_MESSAGE_CHARS {
            return Err(GatewayError::InvalidRequest(format!(
                "message content exceeds {MAX_MESSAGE_CHARS} characters"
            )));
        }

        let recipients = self.peers_of(chat_id, sender).await?;
        let message = bounded(
            self.store_timeout,
            self.store.append_message(chat_id, sender, content),
        )
        .await?;

        let mut delivered = 0;
        for recipient in recipients {
            delivered += self
                .hub
                .send_to_user(
                    recipient,
                    ServerEvent::NewMessage {
                        chat_id,
                        from_user_id: sender,
                        message: message.clone(),
                    },
                )
                .await;
        }
        tracing::debug!(
            chat_id = %chat_id,
            sender_id = %sender,
            message_id = %message.id,
            delivered,
            "message sent"
        );
        Ok(message)
    }

    /// One page of history, newest first, strictly older than `before`
    /// when given. Advances the requester's read cursor.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::ChatNotFound`] if `requester` is not a participant.
    /// - Store failures as in [`Self::send`].
    pub async fn fetch_page(
        &self,
        requester: UserId,
        chat_id: ChatId,
        before: Option<DateTime<Utc>>,
        limit: Option<u32>,
    ) -> Result<MessagePage, GatewayError> {
        self.require_participant(chat_id, requester).await?;

        let limit = usize::try_from(clamp_page_limit(limit)).unwrap_or(usize::MAX);
        let rows = bounded(
            self.store_timeout,
            self.store
                .messages_before(chat_id, before, limit.saturating_add(1)),
        )
        .await?;
        bounded(self.store_timeout, self.store.mark_read(chat_id, requester)).await?;

        Ok(MessagePage::from_probe(rows, limit))
    }

    /// Relays a typing indicator to the other participant's live
    /// connections. Never persisted.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::ChatNotFound`] if `sender` is not a participant.
    /// - Store failures as in [`Self::send`].
    pub async fn typing(
        &self,
        sender: UserId,
        chat_id: ChatId,
        typing: bool,
    ) -> Result<(), GatewayError> {
        for recipient in self.peers_of(chat_id, sender).await? {
            self.hub
                .send_to_user(
                    recipient,
                    ServerEvent::Typing {
                        chat_id,
                        from_user_id: sender,
                        typing,
                    },
                )
                .await;
        }
        Ok(())
    }

    /// The user's chats with last message and unread count.
    ///
    /// # Errors
    ///
    /// Store failures as in [`Self::send`].
    pub async fn list_chats(&self, user: UserId) -> Result<Vec<ChatPreview>, GatewayError> {
        bounded(self.store_timeout, self.store.chat_previews(user)).await
    }

    async fn require_participant(&self, chat_id: ChatId, user: UserId) -> Result<(), GatewayError> {
        if bounded(self.store_timeout, self.store.is_participant(chat_id, user)).await? {
            Ok(())
        } else {
            Err(GatewayError::ChatNotFound(chat_id))
        }
    }

    async fn peers_of(&self, chat_id: ChatId, user: UserId) -> Result<Vec<UserId>, GatewayError> {
        self.require_participant(chat_id, user).await?;
        bounded(
            self.store_timeout,
            self.store.other_participants(chat_id, user),
        )
        .await
    }
}
