//! Chat resolver: one chat per unordered user pair.

use std::sync::Arc;
use std::time::Duration;

use super::bounded;
use crate::domain::{ChatId, UserId};
use crate::error::GatewayError;
use crate::persistence::Store;

/// Idempotent find-or-create of the chat shared by two users.
#[derive(Debug, Clone)]
pub struct ChatResolver {
    store: Arc<dyn Store>,
    store_timeout: Duration,
}

impl ChatResolver {
    /// Creates a new `ChatResolver`.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, store_timeout: Duration) -> Self {
        Self {
            store,
            store_timeout,
        }
    }

    /// Returns the chat of `user` and `peer`, creating it on first use.
    ///
    /// The same id is returned regardless of argument order or how many
    /// callers race.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::SelfAction`] if `user == peer`.
    /// - [`GatewayError::UserNotFound`] if `peer` does not exist.
    /// - [`GatewayError::StoreTimeout`] / [`GatewayError::PersistenceError`]
    ///   on store failure.
    pub async fn ensure_chat(&self, user: UserId, peer: UserId) -> Result<ChatId, GatewayError> {
        if user == peer {
            return Err(GatewayError::SelfAction);
        }
        if !bounded(self.store_timeout, self.store.user_exists(peer)).await? {
            return Err(GatewayError::UserNotFound(peer));
        }
        bounded(self.store_timeout, self.store.ensure_chat(user, peer)).await
    }
}
