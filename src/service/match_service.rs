//! Match service: validates pair actions and runs them through the store.

use std::sync::Arc;
use std::time::Duration;

use super::bounded;
use crate::domain::{Connection, InterestKind, PairAction, PairOutcome, UserId};
use crate::error::GatewayError;
use crate::persistence::Store;

/// Orchestration layer for like / superlike / dislike, request answers and
/// unmatching.
///
/// Stateless coordinator over an [`Arc<dyn Store>`]. Validation happens
/// here; the read-decide-write sequence itself runs inside the store's
/// unit of work (see [`Store::apply_pair_action`]).
#[derive(Debug, Clone)]
pub struct MatchService {
    store: Arc<dyn Store>,
    store_timeout: Duration,
}

impl MatchService {
    /// Creates a new `MatchService`.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, store_timeout: Duration) -> Self {
        Self {
            store,
            store_timeout,
        }
    }

    /// Records `actor`'s interest in `target`.
    ///
    /// A positive action against an open request from `target` forms a
    /// match and ensures the pair's chat in the same unit of work.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::SelfAction`] if `actor == target`.
    /// - [`GatewayError::UserNotFound`] if `target` does not exist.
    /// - [`GatewayError::StoreTimeout`] / [`GatewayError::PersistenceError`]
    ///   on store failure.
    pub async fn record_interest(
        &self,
        actor: UserId,
        target: UserId,
        kind: InterestKind,
    ) -> Result<PairOutcome, GatewayError> {
        if actor == target {
            return Err(GatewayError::SelfAction);
        }
        if !bounded(self.store_timeout, self.store.user_exists(target)).await? {
            return Err(GatewayError::UserNotFound(target));
        }

        let outcome = self
            .apply(PairAction::Interest {
                actor,
                target,
                kind,
            })
            .await?;
        tracing::debug!(%actor, %target, ?kind, matched = outcome.matched, "interest recorded");
        Ok(outcome)
    }

    /// Accepts the open request `requester` sent to `acceptor`.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::SelfAction`] if both ids are equal.
    /// - [`GatewayError::NoPendingRequest`] if there is no open request.
    /// - Store failures as in [`Self::record_interest`].
    pub async fn accept_pending_request(
        &self,
        acceptor: UserId,
        requester: UserId,
    ) -> Result<PairOutcome, GatewayError> {
        if acceptor == requester {
            return Err(GatewayError::SelfAction);
        }
        self.apply(PairAction::Accept {
            acceptor,
            requester,
        })
        .await
    }

    /// Rejects the open request `requester` sent to `acceptor`.
    ///
    /// # Errors
    ///
    /// Same as [`Self::accept_pending_request`].
    pub async fn reject_pending_request(
        &self,
        acceptor: UserId,
        requester: UserId,
    ) -> Result<PairOutcome, GatewayError> {
        if acceptor == requester {
            return Err(GatewayError::SelfAction);
        }
        let outcome = self
            .apply(PairAction::Reject {
                acceptor,
                requester,
            })
            .await?;
        tracing::info!(%acceptor, %requester, "request rejected");
        Ok(outcome)
    }

    /// Moves every existing edge between `user` and `peer` to DISLIKED.
    /// The chat and its history are kept.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::SelfAction`] if both ids are equal.
    /// - [`GatewayError::ConnectionNotFound`] if `peer` does not exist or
    ///   the pair has no edges.
    /// - Store failures as in [`Self::record_interest`].
    pub async fn disconnect(&self, user: UserId, peer: UserId) -> Result<PairOutcome, GatewayError> {
        if user == peer {
            return Err(GatewayError::SelfAction);
        }
        if !bounded(self.store_timeout, self.store.user_exists(peer)).await? {
            return Err(GatewayError::ConnectionNotFound(peer));
        }
        let outcome = self.apply(PairAction::Disconnect { user, peer }).await?;
        tracing::info!(%user, %peer, "pair disconnected");
        Ok(outcome)
    }

    /// Users matched with `user`.
    ///
    /// # Errors
    ///
    /// Store failures as in [`Self::record_interest`].
    pub async fn matched_peers(&self, user: UserId) -> Result<Vec<UserId>, GatewayError> {
        bounded(self.store_timeout, self.store.matched_peers(user)).await
    }

    /// Open requests addressed to `user`, newest first.
    ///
    /// # Errors
    ///
    /// Store failures as in [`Self::record_interest`].
    pub async fn incoming_requests(&self, user: UserId) -> Result<Vec<Connection>, GatewayError> {
        bounded(self.store_timeout, self.store.incoming_requests(user)).await
    }

    async fn apply(&self, action: PairAction) -> Result<PairOutcome, GatewayError> {
        let outcome = bounded(self.store_timeout, self.store.apply_pair_action(action)).await?;
        if outcome.matched && !outcome.edges.is_empty() {
            tracing::info!(
                user_id = %action.actor(),
                peer_id = %action.counterpart(),
                chat_id = ?outcome.chat_id,
                "match formed"
            );
        }
        Ok(outcome)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::ConnectionStatus;
    use crate::persistence::MemoryStore;

    const A: UserId = UserId::new(1);
    const B: UserId = UserId::new(2);
    const GHOST: UserId = UserId::new(404);

    fn service() -> (MatchService, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::with_users([A, B]));
        let service = MatchService::new(
            Arc::clone(&store) as Arc<dyn Store>,
            Duration::from_secs(1),
        );
        (service, store)
    }

    #[tokio::test]
    async fn mutual_like_reports_match_and_chat() {
        let (service, store) = service();
        let Ok(first) = service.record_interest(A, B, InterestKind::Like).await else {
            panic!("like should succeed");
        };
        assert!(!first.matched);

        let Ok(second) = service
            .record_interest(B, A, InterestKind::Superlike)
            .await
        else {
            panic!("like back should succeed");
        };
        assert!(second.matched);
        assert!(second.chat_id.is_some());
        assert_eq!(
            second.edge(A, B).map(|c| c.status),
            Some(ConnectionStatus::Matched)
        );
        assert!(matches!(store.count_chats_between(A, B).await, Ok(1)));
    }

    #[tokio::test]
    async fn self_and_unknown_targets_are_rejected() {
        let (service, _) = service();
        assert!(matches!(
            service.record_interest(A, A, InterestKind::Like).await,
            Err(GatewayError::SelfAction)
        ));
        assert!(matches!(
            service.record_interest(A, GHOST, InterestKind::Like).await,
            Err(GatewayError::UserNotFound(id)) if id == GHOST
        ));
        assert!(matches!(
            service.disconnect(A, GHOST).await,
            Err(GatewayError::ConnectionNotFound(_))
        ));
    }

    #[tokio::test]
    async fn accept_and_reject_need_an_open_request() {
        let (service, _) = service();
        assert!(matches!(
            service.accept_pending_request(A, B).await,
            Err(GatewayError::NoPendingRequest(_))
        ));

        let _ = service.record_interest(B, A, InterestKind::Like).await;
        let Ok(requests) = service.incoming_requests(A).await else {
            panic!("requests should load");
        };
        assert_eq!(requests.len(), 1);

        let Ok(rejected) = service.reject_pending_request(A, B).await else {
            panic!("reject should succeed");
        };
        assert!(!rejected.matched);
        assert!(matches!(
            service.reject_pending_request(A, B).await,
            Err(GatewayError::NoPendingRequest(_))
        ));
    }

    #[tokio::test]
    async fn accept_matches_and_disconnect_unmatches() {
        let (service, store) = service();
        let _ = service.record_interest(B, A, InterestKind::Superlike).await;
        let Ok(accepted) = service.accept_pending_request(A, B).await else {
            panic!("accept should succeed");
        };
        assert!(accepted.matched);
        assert!(matches!(service.matched_peers(A).await, Ok(ref p) if p == &vec![B]));

        let Ok(_) = service.disconnect(A, B).await else {
            panic!("disconnect should succeed");
        };
        assert!(matches!(service.matched_peers(A).await, Ok(ref p) if p.is_empty()));
        // History is kept.
        assert!(matches!(store.count_chats_between(A, B).await, Ok(1)));
    }
}
