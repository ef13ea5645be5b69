//! Volatile events pushed to live connections.
//!
//! Every variant is serialized as a flat JSON object tagged by `type`,
//! for example `{"type":"presence","userId":4,"online":true}`. Events are
//! hints: the durable store stays authoritative.

use serde::{Deserialize, Serialize};

use super::{ChatId, Message, UserId};

/// Server → client event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    /// A message was persisted in a chat the recipient takes part in.
    NewMessage {
        /// Chat the message belongs to.
        chat_id: ChatId,
        /// Author of the message.
        from_user_id: UserId,
        /// The persisted message.
        message: Message,
    },

    /// The other participant started or stopped typing.
    Typing {
        /// Chat being typed in.
        chat_id: ChatId,
        /// Typing user.
        from_user_id: UserId,
        /// `true` while typing.
        typing: bool,
    },

    /// A user's first live connection opened or last one closed.
    Presence {
        /// User whose presence changed.
        user_id: UserId,
        /// Whether the user now holds at least one live connection.
        online: bool,
    },
}

impl ServerEvent {
    /// Returns the wire discriminator (e.g. `"new_message"`).
    #[must_use]
    pub const fn event_type_str(&self) -> &'static str {
        match self {
            Self::NewMessage { .. } => "new_message",
            Self::Typing { .. } => "typing",
            Self::Presence { .. } => "presence",
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::domain::MessageId;

    #[test]
    fn presence_wire_shape() {
        let event = ServerEvent::Presence {
            user_id: UserId::new(4),
            online: true,
        };
        let Ok(json) = serde_json::to_value(&event) else {
            panic!("presence serializes");
        };
        assert_eq!(
            json,
            serde_json::json!({"type": "presence", "userId": 4, "online": true})
        );
    }

    #[test]
    fn typing_wire_shape() {
        let event = ServerEvent::Typing {
            chat_id: ChatId::new(3),
            from_user_id: UserId::new(1),
            typing: false,
        };
        let Ok(json) = serde_json::to_value(&event) else {
            panic!("typing serializes");
        };
        assert_eq!(
            json,
            serde_json::json!({"type": "typing", "chatId": 3, "fromUserId": 1, "typing": false})
        );
    }

    #[test]
    fn new_message_embeds_message() {
        let message = Message {
            id: MessageId::new(10),
            chat_id: ChatId::new(3),
            sender_id: UserId::new(1),
            content: "hi".to_string(),
            timestamp: Utc::now(),
        };
        let event = ServerEvent::NewMessage {
            chat_id: message.chat_id,
            from_user_id: message.sender_id,
            message,
        };
        assert_eq!(event.event_type_str(), "new_message");
        let Ok(json) = serde_json::to_value(&event) else {
            panic!("new_message serializes");
        };
        assert_eq!(json.get("type"), Some(&serde_json::json!("new_message")));
        assert_eq!(
            json.pointer("/message/content"),
            Some(&serde_json::json!("hi"))
        );
    }
}
