//! Directed interest records between two users.
//!
//! A [`Connection`] is the *domain* connection: one user's recorded action
//! toward another. It has nothing to do with a live network connection.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{ConnectionId, UserId};

/// Status of a directed `(from → to)` edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionStatus {
    /// The actor liked the target.
    Liked,
    /// The actor super-liked the target.
    Superliked,
    /// The actor disliked, rejected or disconnected from the target.
    Disliked,
    /// Interest is mutual.
    Matched,
    /// Unanswered request written by older clients. Read as positive
    /// interest, never written by the gateway.
    Pending,
}

impl ConnectionStatus {
    /// Storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Liked => "LIKED",
            Self::Superliked => "SUPERLIKED",
            Self::Disliked => "DISLIKED",
            Self::Matched => "MATCHED",
            Self::Pending => "PENDING",
        }
    }

    /// `true` for statuses that count as an open request toward the other
    /// user: a like, a superlike, or a legacy pending request.
    #[must_use]
    pub const fn is_open_request(self) -> bool {
        matches!(self, Self::Liked | Self::Superliked | Self::Pending)
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a stored status string is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown connection status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for ConnectionStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LIKED" => Ok(Self::Liked),
            "SUPERLIKED" => Ok(Self::Superliked),
            "DISLIKED" => Ok(Self::Disliked),
            "MATCHED" => Ok(Self::Matched),
            "PENDING" => Ok(Self::Pending),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// Action a user may record toward another user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterestKind {
    /// Positive interest.
    Like,
    /// Strong positive interest.
    Superlike,
    /// Negative interest.
    Dislike,
}

impl InterestKind {
    /// `true` for [`InterestKind::Like`] and [`InterestKind::Superlike`].
    #[must_use]
    pub const fn is_positive(self) -> bool {
        matches!(self, Self::Like | Self::Superlike)
    }

    /// Edge status written when this action does not complete a match.
    #[must_use]
    pub const fn status(self) -> ConnectionStatus {
        match self {
            Self::Like => ConnectionStatus::Liked,
            Self::Superlike => ConnectionStatus::Superliked,
            Self::Dislike => ConnectionStatus::Disliked,
        }
    }
}

/// A persisted directed edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    /// Row identifier.
    pub id: ConnectionId,
    /// User who acted.
    pub from_user_id: UserId,
    /// User acted upon.
    pub to_user_id: UserId,
    /// Current status.
    pub status: ConnectionStatus,
    /// Last time the status was written.
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parses_storage_form() {
        for status in [
            ConnectionStatus::Liked,
            ConnectionStatus::Superliked,
            ConnectionStatus::Disliked,
            ConnectionStatus::Matched,
            ConnectionStatus::Pending,
        ] {
            assert_eq!(status.as_str().parse::<ConnectionStatus>(), Ok(status));
        }
        assert!("liked".parse::<ConnectionStatus>().is_err());
    }

    #[test]
    fn open_requests() {
        assert!(ConnectionStatus::Liked.is_open_request());
        assert!(ConnectionStatus::Superliked.is_open_request());
        assert!(ConnectionStatus::Pending.is_open_request());
        assert!(!ConnectionStatus::Disliked.is_open_request());
        assert!(!ConnectionStatus::Matched.is_open_request());
    }

    #[test]
    fn interest_kind_maps_to_status() {
        assert_eq!(InterestKind::Like.status(), ConnectionStatus::Liked);
        assert_eq!(InterestKind::Superlike.status(), ConnectionStatus::Superliked);
        assert_eq!(InterestKind::Dislike.status(), ConnectionStatus::Disliked);
        assert!(!InterestKind::Dislike.is_positive());
    }

    #[test]
    fn status_serializes_screaming() {
        let json = serde_json::to_string(&ConnectionStatus::Superliked).ok();
        assert_eq!(json.as_deref(), Some("\"SUPERLIKED\""));
    }
}
