//! PostgreSQL implementation of the durable store.
//!
//! Pair actions run in one transaction that first takes a transaction-scoped
//! advisory lock keyed by the normalized user pair, then locks the existing
//! edge rows with `FOR UPDATE`. Two users liking each other at the same
//! instant therefore serialize, and only the second sees the first's edge.
//! Chat creation relies on the `UNIQUE (user_low, user_high)` constraint,
//! so concurrent `ensure_chat` calls converge on one row.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgConnection;
use sqlx::postgres::{PgPool, PgPoolOptions};

use super::Store;
use super::models::{
    ChatPreviewRow, ConnectionRow, MessageRow, connection_from_row, message_from_row,
    preview_from_row,
};
use crate::config::GatewayConfig;
use crate::domain::match_machine::{self, EdgeWrite};
use crate::domain::{
    ChatId, ChatPreview, Connection, ConnectionStatus, Message, PairAction, PairEdges,
    PairOutcome, UserId, UserPair,
};
use crate::error::GatewayError;

/// PostgreSQL-backed store using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a store over an existing connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a connection pool sized and timed from `config`.
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError::PersistenceError`] if the database cannot
    /// be reached.
    pub async fn connect(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .min_connections(config.database_min_connections)
            .acquire_timeout(Duration::from_secs(config.database_connect_timeout_secs))
            .connect(&config.database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Applies pending migrations from `migrations/`.
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError::PersistenceError`] if a migration fails.
    pub async fn migrate(&self) -> Result<(), GatewayError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| GatewayError::PersistenceError(e.to_string()))
    }
}

#[async_trait]
impl Store for PostgresStore {
    async fn ping(&self) -> Result<(), GatewayError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn user_exists(&self, user_id: UserId) -> Result<bool, GatewayError> {
        let exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
                .bind(user_id.get())
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn apply_pair_action(&self, action: PairAction) -> Result<PairOutcome, GatewayError> {
        let pair = action.pair().ok_or(GatewayError::SelfAction)?;

        let mut tx = self.pool.begin().await?;
        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
            .bind(pair.lock_key())
            .execute(&mut *tx)
            .await?;

        let edges = load_edges(&mut tx, action.actor(), action.counterpart()).await?;
        let plan = match_machine::plan(&action, &edges)?;

        let mut written = Vec::with_capacity(plan.writes.len());
        for write in &plan.writes {
            written.push(upsert_edge(&mut tx, write).await?);
        }
        let chat_id = if plan.ensure_chat {
            Some(ensure_chat_on(&mut tx, pair).await?)
        } else {
            None
        };

        tx.commit().await?;
        Ok(PairOutcome {
            edges: written,
            matched: plan.matched,
            chat_id,
        })
    }

    async fn matched_peers(&self, user_id: UserId) -> Result<Vec<UserId>, GatewayError> {
        let ids = sqlx::query_scalar::<_, i64>(
            "SELECT DISTINCT CASE WHEN from_user_id = $1 THEN to_user_id ELSE from_user_id END \
             FROM connections \
             WHERE status = 'MATCHED' AND (from_user_id = $1 OR to_user_id = $1)",
        )
        .bind(user_id.get())
        .fetch_all(&self.pool)
        .await?;
        Ok(ids.into_iter().map(UserId::new).collect())
    }

    async fn incoming_requests(&self, user_id: UserId) -> Result<Vec<Connection>, GatewayError> {
        let rows = sqlx::query_as::<_, ConnectionRow>(
            "SELECT id, from_user_id, to_user_id, status, updated_at FROM connections \
             WHERE to_user_id = $1 AND status IN ('LIKED', 'SUPERLIKED', 'PENDING') \
             ORDER BY updated_at DESC, id DESC",
        )
        .bind(user_id.get())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(connection_from_row).collect()
    }

    async fn ensure_chat(&self, a: UserId, b: UserId) -> Result<ChatId, GatewayError> {
        let pair = UserPair::new(a, b).ok_or(GatewayError::SelfAction)?;
        let mut tx = self.pool.begin().await?;
        let chat_id = ensure_chat_on(&mut tx, pair).await?;
        tx.commit().await?;
        Ok(chat_id)
    }

    async fn count_chats_between(&self, a: UserId, b: UserId) -> Result<u64, GatewayError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM chats c \
             WHERE (SELECT COUNT(*) FROM chat_participants p WHERE p.chat_id = c.id) = 2 \
               AND EXISTS (SELECT 1 FROM chat_participants p WHERE p.chat_id = c.id AND p.user_id = $1) \
               AND EXISTS (SELECT 1 FROM chat_participants p WHERE p.chat_id = c.id AND p.user_id = $2)",
        )
        .bind(a.get())
        .bind(b.get())
        .fetch_one(&self.pool)
        .await?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    async fn is_participant(&self, chat_id: ChatId, user_id: UserId) -> Result<bool, GatewayError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM chat_participants WHERE chat_id = $1 AND user_id = $2)",
        )
        .bind(chat_id.get())
        .bind(user_id.get())
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn other_participants(
        &self,
        chat_id: ChatId,
        user_id: UserId,
    ) -> Result<Vec<UserId>, GatewayError> {
        let ids = sqlx::query_scalar::<_, i64>(
            "SELECT user_id FROM chat_participants \
             WHERE chat_id = $1 AND user_id <> $2 ORDER BY user_id",
        )
        .bind(chat_id.get())
        .bind(user_id.get())
        .fetch_all(&self.pool)
        .await?;
        Ok(ids.into_iter().map(UserId::new).collect())
    }

    async fn append_message(
        &self,
        chat_id: ChatId,
        sender_id: UserId,
        content: &str,
    ) -> Result<Message, GatewayError> {
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query_as::<_, MessageRow>(
            "INSERT INTO messages (chat_id, sender_id, content) VALUES ($1, $2, $3) \
             RETURNING id, chat_id, sender_id, content, sent_at",
        )
        .bind(chat_id.get())
        .bind(sender_id.get())
        .bind(content)
        .fetch_one(&mut *tx)
        .await?;
        let message = message_from_row(row);

        advance_cursor(&mut tx, chat_id, sender_id, message.timestamp).await?;
        tx.commit().await?;
        Ok(message)
    }

    async fn messages_before(
        &self,
        chat_id: ChatId,
        before: Option<DateTime<Utc>>,
        limit: usize,
    ) -> Result<Vec<Message>, GatewayError> {
        let rows = sqlx::query_as::<_, MessageRow>(
            "SELECT id, chat_id, sender_id, content, sent_at FROM messages \
             WHERE chat_id = $1 AND ($2::timestamptz IS NULL OR sent_at < $2) \
             ORDER BY sent_at DESC, id DESC \
             LIMIT $3",
        )
        .bind(chat_id.get())
        .bind(before)
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(message_from_row).collect())
    }

    async fn mark_read(&self, chat_id: ChatId, user_id: UserId) -> Result<(), GatewayError> {
        sqlx::query(
            "INSERT INTO read_cursors (chat_id, user_id, last_read_at) VALUES ($1, $2, NOW()) \
             ON CONFLICT (chat_id, user_id) DO UPDATE \
             SET last_read_at = GREATEST(read_cursors.last_read_at, EXCLUDED.last_read_at)",
        )
        .bind(chat_id.get())
        .bind(user_id.get())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn chat_previews(&self, user_id: UserId) -> Result<Vec<ChatPreview>, GatewayError> {
        let rows = sqlx::query_as::<_, ChatPreviewRow>(
            "SELECT c.id, other.user_id, lm.content, lm.sent_at, \
                    (SELECT COUNT(*) FROM messages m \
                     LEFT JOIN read_cursors rc ON rc.chat_id = m.chat_id AND rc.user_id = $1 \
                     WHERE m.chat_id = c.id AND m.sender_id <> $1 \
                       AND m.sent_at > COALESCE(rc.last_read_at, 'epoch'::timestamptz)) \
             FROM chats c \
             JOIN chat_participants me ON me.chat_id = c.id AND me.user_id = $1 \
             JOIN chat_participants other ON other.chat_id = c.id AND other.user_id <> $1 \
             LEFT JOIN LATERAL ( \
                 SELECT content, sent_at FROM messages \
                 WHERE chat_id = c.id ORDER BY sent_at DESC, id DESC LIMIT 1 \
             ) lm ON TRUE \
             ORDER BY lm.sent_at DESC NULLS LAST, c.id DESC",
        )
        .bind(user_id.get())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(preview_from_row).collect())
    }
}

/// Reads both directed edges of the pair, locking existing rows.
async fn load_edges(
    conn: &mut PgConnection,
    actor: UserId,
    other: UserId,
) -> Result<PairEdges, GatewayError> {
    let rows = sqlx::query_as::<_, (i64, String)>(
        "SELECT from_user_id, status FROM connections \
         WHERE (from_user_id = $1 AND to_user_id = $2) OR (from_user_id = $2 AND to_user_id = $1) \
         FOR UPDATE",
    )
    .bind(actor.get())
    .bind(other.get())
    .fetch_all(&mut *conn)
    .await?;

    let mut edges = PairEdges::default();
    for (from_user_id, status) in rows {
        let status = status
            .parse::<ConnectionStatus>()
            .map_err(|e| GatewayError::PersistenceError(e.to_string()))?;
        if from_user_id == actor.get() {
            edges.outgoing = Some(status);
        } else {
            edges.incoming = Some(status);
        }
    }
    Ok(edges)
}

async fn upsert_edge(conn: &mut PgConnection, write: &EdgeWrite) -> Result<Connection, GatewayError> {
    let row = sqlx::query_as::<_, ConnectionRow>(
        "INSERT INTO connections (from_user_id, to_user_id, status) VALUES ($1, $2, $3) \
         ON CONFLICT (from_user_id, to_user_id) DO UPDATE \
         SET status = EXCLUDED.status, updated_at = NOW() \
         RETURNING id, from_user_id, to_user_id, status, updated_at",
    )
    .bind(write.from.get())
    .bind(write.to.get())
    .bind(write.status.as_str())
    .fetch_one(&mut *conn)
    .await?;
    connection_from_row(row)
}

/// Find-or-create on the unique pair key. A concurrent creator blocks on
/// the conflicting insert; once it commits, `DO NOTHING` falls through to
/// the lookup, which sees the committed row.
async fn ensure_chat_on(conn: &mut PgConnection, pair: UserPair) -> Result<ChatId, GatewayError> {
    let inserted = sqlx::query_scalar::<_, i64>(
        "INSERT INTO chats (user_low, user_high) VALUES ($1, $2) \
         ON CONFLICT (user_low, user_high) DO NOTHING RETURNING id",
    )
    .bind(pair.low().get())
    .bind(pair.high().get())
    .fetch_optional(&mut *conn)
    .await?;

    let chat_id = match inserted {
        Some(id) => {
            tracing::info!(chat_id = id, low = %pair.low(), high = %pair.high(), "chat created");
            id
        }
        None => {
            sqlx::query_scalar::<_, i64>(
                "SELECT id FROM chats WHERE user_low = $1 AND user_high = $2",
            )
            .bind(pair.low().get())
            .bind(pair.high().get())
            .fetch_one(&mut *conn)
            .await?
        }
    };

    sqlx::query(
        "INSERT INTO chat_participants (chat_id, user_id) VALUES ($1, $2), ($1, $3) \
         ON CONFLICT DO NOTHING",
    )
    .bind(chat_id)
    .bind(pair.low().get())
    .bind(pair.high().get())
    .execute(&mut *conn)
    .await?;

    Ok(ChatId::new(chat_id))
}

async fn advance_cursor(
    conn: &mut PgConnection,
    chat_id: ChatId,
    user_id: UserId,
    at: DateTime<Utc>,
) -> Result<(), GatewayError> {
    sqlx::query(
        "INSERT INTO read_cursors (chat_id, user_id, last_read_at) VALUES ($1, $2, $3) \
         ON CONFLICT (chat_id, user_id) DO UPDATE \
         SET last_read_at = GREATEST(read_cursors.last_read_at, EXCLUDED.last_read_at)",
    )
    .bind(chat_id.get())
    .bind(user_id.get())
    .bind(at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}
