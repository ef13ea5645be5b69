//! In-memory registry of live connections and event fan-out.
//!
//! [`PresenceHub`] maps each user to the set of their live connections
//! (0..N, one per device or tab). Each connection is represented by the
//! sending half of a bounded `mpsc` queue drained by the connection's own
//! writer task, so the hub only ever enqueues and never blocks on a slow
//! socket.
//!
//! # Concurrency
//!
//! - `join`/`leave` take the write lock.
//! - `query` and delivery snapshots take the read lock; events are
//!   enqueued after the lock is released.
//! - Store calls never happen while the lock is held.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::RwLock;
use tokio::sync::mpsc::{self, error::TrySendError};

use super::{ServerEvent, UserId};

/// Opaque handle of one live connection, unique for the hub's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionHandle(u64);

impl fmt::Display for ConnectionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

type Outbound = mpsc::Sender<ServerEvent>;
type Target = (UserId, ConnectionHandle, Outbound);

/// Live-connection registry shared by every request and connection task.
///
/// Constructed once by the composition root and shared through
/// [`crate::app_state::AppState`].
#[derive(Debug, Default)]
pub struct PresenceHub {
    users: RwLock<HashMap<UserId, HashMap<ConnectionHandle, Outbound>>>,
    next_handle: AtomicU64,
}

impl PresenceHub {
    /// Creates an empty hub.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a live connection for `user_id`.
    ///
    /// The first connection of a user broadcasts `presence{online: true}` to
    /// every live connection, the new one included.
    pub async fn join(&self, user_id: UserId, outbound: Outbound) -> ConnectionHandle {
        let handle = ConnectionHandle(self.next_handle.fetch_add(1, Ordering::Relaxed));
        let first = {
            let mut users = self.users.write().await;
            let conns = users.entry(user_id).or_default();
            let first = conns.is_empty();
            conns.insert(handle, outbound);
            first
        };

        tracing::debug!(%user_id, %handle, "live connection joined");
        if first {
            tracing::info!(%user_id, "user online");
            self.broadcast_all(ServerEvent::Presence {
                user_id,
                online: true,
            })
            .await;
        }
        handle
    }

    /// Removes a live connection. Returns `true` when it was the user's last
    /// one, in which case `presence{online: false}` is broadcast.
    ///
    /// Leaving with an unknown or already evicted handle is a no-op.
    ///
    /// The offline broadcast goes out after the write lock is released, so
    /// a reconnect that joins in between may announce `online` before this
    /// `offline` lands. Presence events are hints; `query` reflects the
    /// registry and stays correct.
    pub async fn leave(&self, user_id: UserId, handle: ConnectionHandle) -> bool {
        let offline = self.remove(user_id, handle).await;
        if offline {
            self.announce_offline(vec![user_id]).await;
        }
        offline
    }

    /// Snapshot of which of `user_ids` hold at least one live connection.
    pub async fn query(&self, user_ids: &[UserId]) -> HashMap<UserId, bool> {
        let users = self.users.read().await;
        user_ids
            .iter()
            .map(|id| (*id, users.get(id).is_some_and(|c| !c.is_empty())))
            .collect()
    }

    /// Whether `user_id` holds at least one live connection.
    pub async fn is_online(&self, user_id: UserId) -> bool {
        self.users
            .read()
            .await
            .get(&user_id)
            .is_some_and(|c| !c.is_empty())
    }

    /// Enqueues `event` on every live connection of `user_id`.
    ///
    /// Returns the number of connections the event was queued on. A user
    /// with no live connection silently drops the event.
    pub async fn send_to_user(&self, user_id: UserId, event: ServerEvent) -> usize {
        let targets: Vec<Target> = {
            let users = self.users.read().await;
            users
                .get(&user_id)
                .map(|conns| {
                    conns
                        .iter()
                        .map(|(handle, tx)| (user_id, *handle, tx.clone()))
                        .collect()
                })
                .unwrap_or_default()
        };
        self.deliver(targets, event).await
    }

    /// Enqueues `event` on every live connection of every user.
    pub async fn broadcast_all(&self, event: ServerEvent) -> usize {
        let targets = self.snapshot_all().await;
        self.deliver(targets, event).await
    }

    /// Number of users with at least one live connection.
    pub async fn online_user_count(&self) -> usize {
        self.users.read().await.len()
    }

    /// Total number of live connections.
    pub async fn connection_count(&self) -> usize {
        self.users.read().await.values().map(HashMap::len).sum()
    }

    async fn snapshot_all(&self) -> Vec<Target> {
        let users = self.users.read().await;
        users
            .iter()
            .flat_map(|(user_id, conns)| {
                conns
                    .iter()
                    .map(move |(handle, tx)| (*user_id, *handle, tx.clone()))
            })
            .collect()
    }

    /// Pushes to `targets`, then evicts every connection whose queue was
    /// closed.
    async fn deliver(&self, targets: Vec<Target>, event: ServerEvent) -> usize {
        let (delivered, dead) = push(targets, &event);
        if !dead.is_empty() {
            self.evict(dead).await;
        }
        delivered
    }

    async fn evict(&self, dead: Vec<(UserId, ConnectionHandle)>) {
        let mut went_offline = Vec::new();
        for (user_id, handle) in dead {
            tracing::warn!(%user_id, %handle, "evicting closed live connection");
            if self.remove(user_id, handle).await {
                went_offline.push(user_id);
            }
        }
        if !went_offline.is_empty() {
            self.announce_offline(went_offline).await;
        }
    }

    /// Broadcasts offline presence for each user. Connections found dead
    /// along the way are evicted and may extend the queue.
    async fn announce_offline(&self, mut pending: Vec<UserId>) {
        while let Some(user_id) = pending.pop() {
            tracing::info!(%user_id, "user offline");
            let targets = self.snapshot_all().await;
            let event = ServerEvent::Presence {
                user_id,
                online: false,
            };
            let (_, dead) = push(targets, &event);
            for (dead_user, handle) in dead {
                tracing::warn!(user_id = %dead_user, %handle, "evicting closed live connection");
                if self.remove(dead_user, handle).await {
                    pending.push(dead_user);
                }
            }
        }
    }

    async fn remove(&self, user_id: UserId, handle: ConnectionHandle) -> bool {
        let mut users = self.users.write().await;
        let Some(conns) = users.get_mut(&user_id) else {
            return false;
        };
        if conns.remove(&handle).is_none() {
            return false;
        }
        tracing::debug!(%user_id, %handle, "live connection left");
        if conns.is_empty() {
            users.remove(&user_id);
            true
        } else {
            false
        }
    }
}

/// Enqueues `event` on each target without waiting. Full queues drop the
/// event for that connection only; closed queues are reported back.
fn push(targets: Vec<Target>, event: &ServerEvent) -> (usize, Vec<(UserId, ConnectionHandle)>) {
    let mut delivered = 0;
    let mut dead = Vec::new();
    for (user_id, handle, tx) in targets {
        match tx.try_send(event.clone()) {
            Ok(()) => delivered += 1,
            Err(TrySendError::Full(_)) => {
                tracing::warn!(
                    %user_id,
                    %handle,
                    event_type = event.event_type_str(),
                    "outbound queue full, dropping event"
                );
            }
            Err(TrySendError::Closed(_)) => dead.push((user_id, handle)),
        }
    }
    (delivered, dead)
}
