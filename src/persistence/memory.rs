//! In-process store backed by a single `tokio::sync::Mutex`.
//!
//! Every [`Store`] call holds the mutex for its whole unit of work, which
//! gives the same atomicity the PostgreSQL transactions give: a pair
//! action's read-plan-write sequence cannot interleave with another.
//! Timestamps come from a store-local clock that never repeats, so history
//! order and read cursors stay unambiguous even within one microsecond.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::Mutex;

use super::Store;
use crate::domain::match_machine::{self, EdgeWrite};
use crate::domain::{
    ChatId, ChatPreview, Connection, ConnectionId, ConnectionStatus, Message, MessageId,
    PairAction, PairEdges, PairOutcome, UserId, UserPair,
};
use crate::error::GatewayError;

#[derive(Debug, Default)]
struct State {
    users: HashSet<UserId>,
    connections: HashMap<(UserId, UserId), Connection>,
    chats: HashMap<UserPair, ChatId>,
    participants: HashMap<ChatId, UserPair>,
    messages: HashMap<ChatId, Vec<Message>>,
    cursors: HashMap<(ChatId, UserId), DateTime<Utc>>,
    next_id: i64,
    last_tick: DateTime<Utc>,
}

impl State {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    /// Wall-clock time, bumped forward if it would not advance.
    fn tick(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let at = if now > self.last_tick {
            now
        } else {
            self.last_tick + TimeDelta::microseconds(1)
        };
        self.last_tick = at;
        at
    }

    fn edges(&self, actor: UserId, other: UserId) -> PairEdges {
        PairEdges {
            outgoing: self.connections.get(&(actor, other)).map(|c| c.status),
            incoming: self.connections.get(&(other, actor)).map(|c| c.status),
        }
    }

    fn upsert_edge(&mut self, write: &EdgeWrite) -> Connection {
        let updated_at = self.tick();
        let id = match self.connections.get(&(write.from, write.to)) {
            Some(existing) => existing.id,
            None => ConnectionId::new(self.next_id()),
        };
        let row = Connection {
            id,
            from_user_id: write.from,
            to_user_id: write.to,
            status: write.status,
            updated_at,
        };
        self.connections.insert((write.from, write.to), row.clone());
        row
    }

    fn ensure_chat(&mut self, pair: UserPair) -> ChatId {
        if let Some(chat_id) = self.chats.get(&pair) {
            return *chat_id;
        }
        let chat_id = ChatId::new(self.next_id());
        self.chats.insert(pair, chat_id);
        self.participants.insert(chat_id, pair);
        tracing::info!(chat_id = %chat_id, low = %pair.low(), high = %pair.high(), "chat created");
        chat_id
    }

    fn advance_cursor(&mut self, chat_id: ChatId, user_id: UserId, at: DateTime<Utc>) {
        let cursor = self.cursors.entry((chat_id, user_id)).or_insert(at);
        if at > *cursor {
            *cursor = at;
        }
    }

    fn unread(&self, chat_id: ChatId, user_id: UserId) -> i64 {
        let cursor = self.cursors.get(&(chat_id, user_id));
        let count = self
            .messages
            .get(&chat_id)
            .map(|messages| {
                messages
                    .iter()
                    .filter(|m| m.sender_id != user_id)
                    .filter(|m| cursor.is_none_or(|at| m.timestamp > *at))
                    .count()
            })
            .unwrap_or(0);
        i64::try_from(count).unwrap_or(i64::MAX)
    }
}

/// In-memory [`Store`] for tests and persistence-disabled deployments.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    /// Creates an empty store with no users.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store that already knows the given users.
    #[must_use]
    pub fn with_users(users: impl IntoIterator<Item = UserId>) -> Self {
        let state = State {
            users: users.into_iter().collect(),
            ..State::default()
        };
        Self {
            state: Mutex::new(state),
        }
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<(), GatewayError> {
        Ok(())
    }

    async fn user_exists(&self, user_id: UserId) -> Result<bool, GatewayError> {
        Ok(self.state.lock().await.users.contains(&user_id))
    }

    async fn apply_pair_action(&self, action: PairAction) -> Result<PairOutcome, GatewayError> {
        let pair = action.pair().ok_or(GatewayError::SelfAction)?;
        let mut state = self.state.lock().await;

        let edges = state.edges(action.actor(), action.counterpart());
        let plan = match_machine::plan(&action, &edges)?;

        let edges = plan
            .writes
            .iter()
            .map(|write| state.upsert_edge(write))
            .collect();
        let chat_id = plan.ensure_chat.then(|| state.ensure_chat(pair));

        Ok(PairOutcome {
            edges,
            matched: plan.matched,
            chat_id,
        })
    }

    async fn matched_peers(&self, user_id: UserId) -> Result<Vec<UserId>, GatewayError> {
        let state = self.state.lock().await;
        let mut peers: Vec<UserId> = state
            .connections
            .values()
            .filter(|c| c.status == ConnectionStatus::Matched)
            .filter_map(|c| {
                if c.from_user_id == user_id {
                    Some(c.to_user_id)
                } else if c.to_user_id == user_id {
                    Some(c.from_user_id)
                } else {
                    None
                }
            })
            .collect();
        peers.sort_unstable();
        peers.dedup();
        Ok(peers)
    }

    async fn incoming_requests(&self, user_id: UserId) -> Result<Vec<Connection>, GatewayError> {
        let state = self.state.lock().await;
        let mut requests: Vec<Connection> = state
            .connections
            .values()
            .filter(|c| c.to_user_id == user_id && c.status.is_open_request())
            .cloned()
            .collect();
        requests.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then(b.id.cmp(&a.id)));
        Ok(requests)
    }

    async fn ensure_chat(&self, a: UserId, b: UserId) -> Result<ChatId, GatewayError> {
        let pair = UserPair::new(a, b).ok_or(GatewayError::SelfAction)?;
        Ok(self.state.lock().await.ensure_chat(pair))
    }

    async fn count_chats_between(&self, a: UserId, b: UserId) -> Result<u64, GatewayError> {
        let Some(pair) = UserPair::new(a, b) else {
            return Ok(0);
        };
        let state = self.state.lock().await;
        let count = state.participants.values().filter(|p| **p == pair).count();
        Ok(u64::try_from(count).unwrap_or(u64::MAX))
    }

    async fn is_participant(&self, chat_id: ChatId, user_id: UserId) -> Result<bool, GatewayError> {
        let state = self.state.lock().await;
        Ok(state
            .participants
            .get(&chat_id)
            .is_some_and(|p| p.low() == user_id || p.high() == user_id))
    }

    async fn other_participants(
        &self,
        chat_id: ChatId,
        user_id: UserId,
    ) -> Result<Vec<UserId>, GatewayError> {
        let state = self.state.lock().await;
        Ok(state
            .participants
            .get(&chat_id)
            .map(|p| {
                [p.low(), p.high()]
                    .into_iter()
                    .filter(|id| *id != user_id)
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn append_message(
        &self,
        chat_id: ChatId,
        sender_id: UserId,
        content: &str,
    ) -> Result<Message, GatewayError> {
        let mut state = self.state.lock().await;
        if !state.participants.contains_key(&chat_id) {
            return Err(GatewayError::ChatNotFound(chat_id));
        }
        let message = Message {
            id: MessageId::new(state.next_id()),
            chat_id,
            sender_id,
            content: content.to_string(),
            timestamp: state.tick(),
        };
        state
            .messages
            .entry(chat_id)
            .or_default()
            .push(message.clone());
        state.advance_cursor(chat_id, sender_id, message.timestamp);
        Ok(message)
    }

    async fn messages_before(
        &self,
        chat_id: ChatId,
        before: Option<DateTime<Utc>>,
        limit: usize,
    ) -> Result<Vec<Message>, GatewayError> {
        let state = self.state.lock().await;
        let Some(messages) = state.messages.get(&chat_id) else {
            return Ok(Vec::new());
        };
        // Appends are already in (timestamp, id) order.
        Ok(messages
            .iter()
            .rev()
            .filter(|m| before.is_none_or(|at| m.timestamp < at))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn mark_read(&self, chat_id: ChatId, user_id: UserId) -> Result<(), GatewayError> {
        let mut state = self.state.lock().await;
        let at = state.tick();
        state.advance_cursor(chat_id, user_id, at);
        Ok(())
    }

    async fn chat_previews(&self, user_id: UserId) -> Result<Vec<ChatPreview>, GatewayError> {
        let state = self.state.lock().await;
        let mut previews: Vec<ChatPreview> = state
            .participants
            .iter()
            .filter_map(|(chat_id, pair)| {
                let other = if pair.low() == user_id {
                    pair.high()
                } else if pair.high() == user_id {
                    pair.low()
                } else {
                    return None;
                };
                let last = state.messages.get(chat_id).and_then(|m| m.last());
                Some(ChatPreview {
                    id: *chat_id,
                    other_user_id: other,
                    last_message: last.map(|m| m.content.clone()).unwrap_or_default(),
                    last_time: last.map(|m| m.timestamp),
                    unread_count: state.unread(*chat_id, user_id),
                })
            })
            .collect();
        previews.sort_by(|a, b| b.last_time.cmp(&a.last_time).then(b.id.cmp(&a.id)));
        Ok(previews)
    }
}
