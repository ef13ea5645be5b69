//! DTOs for relationship endpoints.

use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{ChatId, Connection, ConnectionStatus, PairOutcome, UserId};

/// Result of like / superlike / dislike / accept / reject.
///
/// Describes the directed edge the action is about (`actor → target` for
/// interest, `requester → acceptor` when answering a request).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PairActionResponse {
    /// Edge source.
    pub from_user_id: UserId,
    /// Edge target.
    pub to_user_id: UserId,
    /// Edge status after the action.
    pub status: ConnectionStatus,
    /// Whether the pair is matched.
    pub matched: bool,
    /// The pair's chat, present when matched.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat_id: Option<ChatId>,
}

impl PairActionResponse {
    /// Builds the response for the `from → to` edge of `outcome`.
    #[must_use]
    pub fn from_outcome(outcome: &PairOutcome, from: UserId, to: UserId) -> Self {
        let status = outcome.edge(from, to).map_or(
            if outcome.matched {
                ConnectionStatus::Matched
            } else {
                ConnectionStatus::Disliked
            },
            |c| c.status,
        );
        Self {
            from_user_id: from,
            to_user_id: to,
            status,
            matched: outcome.matched,
            chat_id: outcome.chat_id,
        }
    }
}

/// `POST /connections/{id}/disconnect` response.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DisconnectResponse {
    /// The user no longer matched with the caller.
    pub disconnected_user_id: UserId,
}

/// `GET /connections` response.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MatchedPeersResponse {
    /// Ids of matched users.
    pub connections: Vec<UserId>,
}

/// `GET /connections/requests` response.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct IncomingRequestsResponse {
    /// Open requests addressed to the caller, newest first.
    pub requests: Vec<Connection>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_outcome_reports_matched_edge() {
        let outcome = PairOutcome {
            edges: Vec::new(),
            matched: true,
            chat_id: Some(ChatId::new(3)),
        };
        let response = PairActionResponse::from_outcome(&outcome, UserId::new(1), UserId::new(2));
        assert_eq!(response.status, ConnectionStatus::Matched);
        assert_eq!(response.chat_id, Some(ChatId::new(3)));
    }

    #[test]
    fn unmatched_response_omits_chat() {
        let outcome = PairOutcome {
            edges: Vec::new(),
            matched: false,
            chat_id: None,
        };
        let response = PairActionResponse::from_outcome(&outcome, UserId::new(1), UserId::new(2));
        let json = serde_json::to_value(&response).unwrap_or_default();
        assert!(json.get("chatId").is_none());
        assert_eq!(json.get("fromUserId"), Some(&serde_json::json!(1)));
    }
}
