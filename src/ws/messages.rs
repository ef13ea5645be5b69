//! Client → server frames on the live connection.
//!
//! Server → client events are [`crate::domain::ServerEvent`]; both sides
//! use the same flat `{"type": ...}` envelope.

use serde::Deserialize;

use crate::domain::ChatId;

/// Frame sent by a client.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ClientFrame {
    /// The client started or stopped typing in a chat.
    Typing {
        /// Chat being typed in.
        chat_id: ChatId,
        /// `true` while typing.
        #[serde(default)]
        typing: bool,
    },

    /// Any frame type this gateway does not handle.
    #[serde(other)]
    Unknown,
}

impl ClientFrame {
    /// Parses a text frame. Malformed JSON yields `None`.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        serde_json::from_str(text).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typing_frame() {
        assert_eq!(
            ClientFrame::parse(r#"{"type":"typing","chatId":7,"typing":true}"#),
            Some(ClientFrame::Typing {
                chat_id: ChatId::new(7),
                typing: true
            })
        );
        assert_eq!(
            ClientFrame::parse(r#"{"type":"typing","chatId":7}"#),
            Some(ClientFrame::Typing {
                chat_id: ChatId::new(7),
                typing: false
            })
        );
    }

    #[test]
    fn unknown_and_malformed_frames() {
        assert_eq!(
            ClientFrame::parse(r#"{"type":"read_receipt","chatId":1}"#),
            Some(ClientFrame::Unknown)
        );
        assert_eq!(ClientFrame::parse("not json"), None);
        assert_eq!(ClientFrame::parse(r#"{"type":"typing"}"#), None);
    }
}
