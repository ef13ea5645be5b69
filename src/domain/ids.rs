//! Type-safe identifiers for users, chats, messages and connection rows.
//!
//! Every identifier is a newtype over the `BIGINT` key assigned by the
//! durable store, so a [`ChatId`] can never be passed where a [`UserId`]
//! is expected.

use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

macro_rules! store_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
        )]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Wraps a raw store key.
            #[must_use]
            pub const fn new(raw: i64) -> Self {
                Self(raw)
            }

            /// Returns the raw store key.
            #[must_use]
            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(raw: i64) -> Self {
                Self(raw)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

store_id!(
    /// Identifier of a registered user. Users are owned by the external
    /// account service; this gateway only references them.
    UserId
);

store_id!(
    /// Identifier of a 1:1 chat.
    ChatId
);

store_id!(
    /// Identifier of a persisted chat message.
    MessageId
);

store_id!(
    /// Identifier of a directed `Connection` row.
    ConnectionId
);

/// Unordered pair of distinct users, normalized so that `low < high`.
///
/// Used as the chat uniqueness key and as the per-pair lock key for the
/// match state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UserPair {
    low: UserId,
    high: UserId,
}

impl UserPair {
    /// Normalizes two user ids into a pair. Returns `None` when both ids are
    /// the same user.
    #[must_use]
    pub fn new(a: UserId, b: UserId) -> Option<Self> {
        match a.cmp(&b) {
            std::cmp::Ordering::Less => Some(Self { low: a, high: b }),
            std::cmp::Ordering::Greater => Some(Self { low: b, high: a }),
            std::cmp::Ordering::Equal => None,
        }
    }

    /// Smaller user id of the pair.
    #[must_use]
    pub const fn low(&self) -> UserId {
        self.low
    }

    /// Larger user id of the pair.
    #[must_use]
    pub const fn high(&self) -> UserId {
        self.high
    }

    /// Stable textual key, e.g. `"3:17"`.
    #[must_use]
    pub fn lock_key(&self) -> String {
        format!("{}:{}", self.low, self.high)
    }
}
