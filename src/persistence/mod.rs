//! Persistence layer: the durable-store contract and its implementations.
//!
//! [`Store`] is the thin data-access interface the services run against.
//! [`postgres::PostgresStore`] is the production implementation over
//! `sqlx::PgPool`; [`memory::MemoryStore`] keeps everything in-process and
//! backs the test suite and persistence-disabled deployments.
//!
//! Uniqueness guarantees every implementation must provide:
//! - one `Connection` row per ordered `(from, to)` pair;
//! - one chat per unordered user pair, with exactly two participants;
//! - one read cursor per `(chat, user)`, never moved backward.

pub mod memory;
pub mod models;
pub mod postgres;

use async_trait::async_trait;

use crate::domain::{
    ChatId, ChatPreview, Connection, Message, PairAction, PairOutcome, UserId,
};
use crate::error::GatewayError;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;

/// Durable store contract.
///
/// Every method is a single unit of work: it either commits fully or has
/// no effect.
#[async_trait]
pub trait Store: Send + Sync + std::fmt::Debug {
    /// Checks that the store is reachable.
    async fn ping(&self) -> Result<(), GatewayError>;

    /// Whether a user with this id exists.
    async fn user_exists(&self, user_id: UserId) -> Result<bool, GatewayError>;

    /// Applies one state-machine action atomically.
    ///
    /// Loads both directed edges of the pair while holding the pair
    /// exclusively, runs [`crate::domain::match_machine::plan`], applies
    /// its writes and, when asked, ensures the pair's chat, all before
    /// commit. Concurrent actions on the same pair are serialized.
    async fn apply_pair_action(&self, action: PairAction) -> Result<PairOutcome, GatewayError>;

    /// Ids of users matched with `user_id`, in either direction.
    async fn matched_peers(&self, user_id: UserId) -> Result<Vec<UserId>, GatewayError>;

    /// Open requests (LIKED, SUPERLIKED, PENDING) addressed to `user_id`.
    async fn incoming_requests(&self, user_id: UserId) -> Result<Vec<Connection>, GatewayError>;

    /// Returns the pair's chat, creating it with both participants if it
    /// does not exist. Idempotent under concurrent callers.
    async fn ensure_chat(&self, a: UserId, b: UserId) -> Result<ChatId, GatewayError>;

    /// Number of chats whose participants are exactly `{a, b}`.
    async fn count_chats_between(&self, a: UserId, b: UserId) -> Result<u64, GatewayError>;

    /// Whether `user_id` participates in `chat_id`.
    async fn is_participant(&self, chat_id: ChatId, user_id: UserId) -> Result<bool, GatewayError>;

    /// Participants of `chat_id` other than `user_id`.
    async fn other_participants(
        &self,
        chat_id: ChatId,
        user_id: UserId,
    ) -> Result<Vec<UserId>, GatewayError>;

    /// Persists a message with a store-assigned id and timestamp and
    /// advances the sender's read cursor to that timestamp.
    async fn append_message(
        &self,
        chat_id: ChatId,
        sender_id: UserId,
        content: &str,
    ) -> Result<Message, GatewayError>;

    /// Up to `limit` messages of `chat_id` strictly older than `before`
    /// (or the newest ones), newest first, ties broken by id.
    async fn messages_before(
        &self,
        chat_id: ChatId,
        before: Option<chrono::DateTime<chrono::Utc>>,
        limit: usize,
    ) -> Result<Vec<Message>, GatewayError>;

    /// Advances the user's read cursor for `chat_id` to the store's current
    /// time. Never moves a cursor backward.
    async fn mark_read(&self, chat_id: ChatId, user_id: UserId) -> Result<(), GatewayError>;

    /// The user's chats with last message and unread count, most recently
    /// active first. Unread counts messages from the other participant newer
    /// than the user's read cursor; a missing cursor counts from the epoch.
    async fn chat_previews(&self, user_id: UserId) -> Result<Vec<ChatPreview>, GatewayError>;
}
