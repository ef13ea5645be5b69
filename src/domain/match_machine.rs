//! Pure transition logic for the pairwise match state machine.
//!
//! The store loads both directed edges of a pair inside one unit of work,
//! hands them to [`plan`], applies the returned [`PairPlan`] and commits.
//! Nothing here touches I/O, so every transition is unit-testable.
//!
//! ```text
//! NONE ──like/superlike/dislike──▶ LIKED | SUPERLIKED | DISLIKED
//!   LIKED | SUPERLIKED ◀──re-action──▶ DISLIKED
//!   reverse edge open + positive action / accept ──▶ MATCHED (both edges)
//!   disconnect ──▶ DISLIKED (every existing edge)
//! ```

use super::{ChatId, Connection, ConnectionStatus, InterestKind, UserId, UserPair};
use crate::error::GatewayError;

/// A state-machine input for one pair of users.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairAction {
    /// `actor` records `kind` toward `target`.
    Interest {
        /// Acting user.
        actor: UserId,
        /// User acted upon.
        target: UserId,
        /// Recorded action.
        kind: InterestKind,
    },
    /// `acceptor` accepts the open request sent by `requester`.
    Accept {
        /// User answering the request.
        acceptor: UserId,
        /// User who sent the request.
        requester: UserId,
    },
    /// `acceptor` rejects the open request sent by `requester`.
    Reject {
        /// User answering the request.
        acceptor: UserId,
        /// User who sent the request.
        requester: UserId,
    },
    /// `user` unmatches `peer`.
    Disconnect {
        /// Acting user.
        user: UserId,
        /// Other side of the pair.
        peer: UserId,
    },
}

impl PairAction {
    /// The user performing the action.
    #[must_use]
    pub const fn actor(&self) -> UserId {
        match *self {
            Self::Interest { actor, .. } => actor,
            Self::Accept { acceptor, .. } | Self::Reject { acceptor, .. } => acceptor,
            Self::Disconnect { user, .. } => user,
        }
    }

    /// The other user of the pair.
    #[must_use]
    pub const fn counterpart(&self) -> UserId {
        match *self {
            Self::Interest { target, .. } => target,
            Self::Accept { requester, .. } | Self::Reject { requester, .. } => requester,
            Self::Disconnect { peer, .. } => peer,
        }
    }

    /// Normalized pair, or `None` for a self-action.
    #[must_use]
    pub fn pair(&self) -> Option<UserPair> {
        UserPair::new(self.actor(), self.counterpart())
    }
}

/// Current statuses of both directed edges, seen from the actor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PairEdges {
    /// `actor → counterpart`.
    pub outgoing: Option<ConnectionStatus>,
    /// `counterpart → actor`.
    pub incoming: Option<ConnectionStatus>,
}

/// Upsert of one directed edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeWrite {
    /// Edge source.
    pub from: UserId,
    /// Edge target.
    pub to: UserId,
    /// Status to store.
    pub status: ConnectionStatus,
}

/// Mutations a store must apply atomically for one action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairPlan {
    /// Edge upserts, applied in order.
    pub writes: Vec<EdgeWrite>,
    /// Whether the pair's chat must exist after commit.
    pub ensure_chat: bool,
    /// Whether the pair is matched after commit.
    pub matched: bool,
}

/// Committed result of a [`PairAction`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairOutcome {
    /// Rows as written, in plan order.
    pub edges: Vec<Connection>,
    /// Whether the pair is matched.
    pub matched: bool,
    /// The pair's chat when the plan required one.
    pub chat_id: Option<ChatId>,
}

impl PairOutcome {
    /// Returns the written `from → to` row, if the plan touched it.
    #[must_use]
    pub fn edge(&self, from: UserId, to: UserId) -> Option<&Connection> {
        self.edges
            .iter()
            .find(|c| c.from_user_id == from && c.to_user_id == to)
    }
}

/// Decides the transition for `action` given the pair's current edges.
///
/// # Errors
///
/// - [`GatewayError::SelfAction`] when both sides are the same user.
/// - [`GatewayError::NoPendingRequest`] when accepting or rejecting without
///   an open request from the counterpart.
/// - [`GatewayError::ConnectionNotFound`] when disconnecting a pair with no
///   edges.
pub fn plan(action: &PairAction, edges: &PairEdges) -> Result<PairPlan, GatewayError> {
    if action.pair().is_none() {
        return Err(GatewayError::SelfAction);
    }
    let me = action.actor();
    let other = action.counterpart();

    match *action {
        PairAction::Interest { kind, .. } if kind.is_positive() => {
            let incoming_positive = edges
                .incoming
                .is_some_and(|s| s.is_open_request() || s == ConnectionStatus::Matched);
            if incoming_positive {
                return Ok(match_both(me, other));
            }
            if edges.outgoing == Some(ConnectionStatus::Matched) {
                // Already matched from this side; liking again changes nothing.
                return Ok(PairPlan {
                    writes: Vec::new(),
                    ensure_chat: true,
                    matched: true,
                });
            }
            Ok(single(me, other, kind.status()))
        }
        PairAction::Interest { kind, .. } => Ok(single(me, other, kind.status())),
        PairAction::Accept { .. } => {
            require_open_request(edges, other)?;
            Ok(match_both(me, other))
        }
        PairAction::Reject { .. } => {
            require_open_request(edges, other)?;
            Ok(single(other, me, ConnectionStatus::Disliked))
        }
        PairAction::Disconnect { .. } => {
            let mut writes = Vec::with_capacity(2);
            if edges.outgoing.is_some() {
                writes.push(EdgeWrite {
                    from: me,
                    to: other,
                    status: ConnectionStatus::Disliked,
                });
            }
            if edges.incoming.is_some() {
                writes.push(EdgeWrite {
                    from: other,
                    to: me,
                    status: ConnectionStatus::Disliked,
                });
            }
            if writes.is_empty() {
                return Err(GatewayError::ConnectionNotFound(other));
            }
            Ok(PairPlan {
                writes,
                ensure_chat: false,
                matched: false,
            })
        }
    }
}

fn require_open_request(edges: &PairEdges, requester: UserId) -> Result<(), GatewayError> {
    if edges.incoming.is_some_and(ConnectionStatus::is_open_request) {
        Ok(())
    } else {
        Err(GatewayError::NoPendingRequest(requester))
    }
}

fn match_both(me: UserId, other: UserId) -> PairPlan {
    PairPlan {
        writes: vec![
            EdgeWrite {
                from: other,
                to: me,
                status: ConnectionStatus::Matched,
            },
            EdgeWrite {
                from: me,
                to: other,
                status: ConnectionStatus::Matched,
            },
        ],
        ensure_chat: true,
        matched: true,
    }
}

fn single(from: UserId, to: UserId, status: ConnectionStatus) -> PairPlan {
    PairPlan {
        writes: vec![EdgeWrite { from, to, status }],
        ensure_chat: false,
        matched: false,
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    const A: UserId = UserId::new(1);
    const B: UserId = UserId::new(2);

    fn like(actor: UserId, target: UserId) -> PairAction {
        PairAction::Interest {
            actor,
            target,
            kind: InterestKind::Like,
        }
    }

    fn edges(
        outgoing: Option<ConnectionStatus>,
        incoming: Option<ConnectionStatus>,
    ) -> PairEdges {
        PairEdges { outgoing, incoming }
    }

    #[test]
    fn first_like_writes_single_edge() {
        let Ok(decided) = plan(&like(A, B), &PairEdges::default()) else {
            panic!("like should plan");
        };
        assert!(!decided.matched);
        assert!(!decided.ensure_chat);
        assert_eq!(
            decided.writes,
            vec![EdgeWrite {
                from: A,
                to: B,
                status: ConnectionStatus::Liked
            }]
        );
    }

    #[test]
    fn like_against_open_request_matches_both_edges() {
        for incoming in [
            ConnectionStatus::Liked,
            ConnectionStatus::Superliked,
            ConnectionStatus::Pending,
        ] {
            let Ok(decided) = plan(&like(A, B), &edges(None, Some(incoming))) else {
                panic!("like should plan");
            };
            assert!(decided.matched);
            assert!(decided.ensure_chat);
            assert_eq!(decided.writes.len(), 2);
            assert!(
                decided.writes
                    .iter()
                    .all(|w| w.status == ConnectionStatus::Matched)
            );
        }
    }

    #[test]
    fn superlike_matches_like_incoming() {
        let action = PairAction::Interest {
            actor: A,
            target: B,
            kind: InterestKind::Superlike,
        };
        let Ok(decided) = plan(&action, &edges(None, Some(ConnectionStatus::Liked))) else {
            panic!("superlike should plan");
        };
        assert!(decided.matched);
    }

    #[test]
    fn dislike_never_matches() {
        let action = PairAction::Interest {
            actor: A,
            target: B,
            kind: InterestKind::Dislike,
        };
        let Ok(decided) = plan(&action, &edges(None, Some(ConnectionStatus::Liked))) else {
            panic!("dislike should plan");
        };
        assert!(!decided.matched);
        assert_eq!(
            decided.writes.first().map(|w| w.status),
            Some(ConnectionStatus::Disliked)
        );
    }

    #[test]
    fn like_after_disconnect_does_not_match() {
        let Ok(decided) = plan(
            &like(A, B),
            &edges(
                Some(ConnectionStatus::Disliked),
                Some(ConnectionStatus::Disliked),
            ),
        ) else {
            panic!("like should plan");
        };
        assert!(!decided.matched);
        assert!(!decided.ensure_chat);
    }

    #[test]
    fn repeated_like_on_matched_pair_is_noop() {
        let Ok(decided) = plan(
            &like(A, B),
            &edges(Some(ConnectionStatus::Matched), Some(ConnectionStatus::Disliked)),
        ) else {
            panic!("like should plan");
        };
        assert!(decided.matched);
        assert!(decided.writes.is_empty());
    }

    #[test]
    fn self_action_is_rejected() {
        let result = plan(&like(A, A), &PairEdges::default());
        assert!(matches!(result, Err(GatewayError::SelfAction)));
    }

    #[test]
    fn accept_requires_open_request() {
        let action = PairAction::Accept {
            acceptor: A,
            requester: B,
        };
        assert!(matches!(
            plan(&action, &PairEdges::default()),
            Err(GatewayError::NoPendingRequest(id)) if id == B
        ));
        assert!(matches!(
            plan(&action, &edges(None, Some(ConnectionStatus::Disliked))),
            Err(GatewayError::NoPendingRequest(_))
        ));

        let Ok(decided) = plan(&action, &edges(None, Some(ConnectionStatus::Superliked))) else {
            panic!("accept should plan");
        };
        assert!(decided.matched);
        assert!(decided.ensure_chat);
    }

    #[test]
    fn reject_dislikes_incoming_edge_only() {
        let action = PairAction::Reject {
            acceptor: A,
            requester: B,
        };
        let Ok(decided) = plan(&action, &edges(None, Some(ConnectionStatus::Liked))) else {
            panic!("reject should plan");
        };
        assert!(!decided.ensure_chat);
        assert_eq!(
            decided.writes,
            vec![EdgeWrite {
                from: B,
                to: A,
                status: ConnectionStatus::Disliked
            }]
        );
    }

    #[test]
    fn disconnect_touches_existing_edges() {
        let action = PairAction::Disconnect { user: A, peer: B };
        let Ok(decided) = plan(&action, &edges(Some(ConnectionStatus::Matched), None)) else {
            panic!("disconnect should plan");
        };
        assert_eq!(decided.writes.len(), 1);

        let Ok(decided) = plan(
            &action,
            &edges(Some(ConnectionStatus::Matched), Some(ConnectionStatus::Matched)),
        ) else {
            panic!("disconnect should plan");
        };
        assert_eq!(decided.writes.len(), 2);
        assert!(
            decided.writes
                .iter()
                .all(|w| w.status == ConnectionStatus::Disliked)
        );
    }

    #[test]
    fn disconnect_without_edges_is_not_found() {
        let action = PairAction::Disconnect { user: A, peer: B };
        assert!(matches!(
            plan(&action, &PairEdges::default()),
            Err(GatewayError::ConnectionNotFound(id)) if id == B
        ));
    }
}
