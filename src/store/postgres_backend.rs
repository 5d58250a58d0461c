//! PostgreSQL-based message store.
//!
//! Table structure (`message`):
//! - `m_id UUID PRIMARY KEY`
//! - `content TEXT`, `sender TEXT`, `receiver TEXT`, `product_id TEXT`
//! - `created TIMESTAMPTZ`, `seen BOOLEAN`

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::backend::{ChatSummary, MessageStore, NewMessage, StoreError, StoredMessage};

type MessageRow = (Uuid, String, DateTime<Utc>, String, String, String, bool);

pub struct PostgresMessageStore {
    pool: PgPool,
}

impl PostgresMessageStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn from_row(row: MessageRow) -> StoredMessage {
    let (m_id, content, created, sender, receiver, product_id, seen) = row;
    StoredMessage {
        m_id,
        content,
        created,
        sender,
        receiver,
        product_id,
        seen,
    }
}

#[async_trait]
impl MessageStore for PostgresMessageStore {
    fn backend_name(&self) -> &'static str {
        "postgres"
    }

    async fn persist(&self, message: NewMessage) -> Result<StoredMessage, StoreError> {
        let stored = StoredMessage::from_new(message);

        sqlx::query(
            r#"
            INSERT INTO message (m_id, content, sender, receiver, product_id, created, seen)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(stored.m_id)
        .bind(&stored.content)
        .bind(&stored.sender)
        .bind(&stored.receiver)
        .bind(&stored.product_id)
        .bind(stored.created)
        .bind(stored.seen)
        .execute(&self.pool)
        .await?;

        tracing::trace!(message_id = %stored.m_id, "Message stored in PostgreSQL");
        Ok(stored)
    }

    async fn conversation(
        &self,
        user_a: &str,
        user_b: &str,
        product_id: &str,
    ) -> Result<Vec<StoredMessage>, StoreError> {
        let rows: Vec<MessageRow> = sqlx::query_as(
            r#"
            SELECT m_id, content, created, sender, receiver, product_id, seen
            FROM message
            WHERE ((sender = $1 AND receiver = $2) OR (sender = $2 AND receiver = $1))
              AND product_id = $3
            ORDER BY created ASC
            "#,
        )
        .bind(user_a)
        .bind(user_b)
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(from_row).collect())
    }

    async fn mark_seen(&self, sender: &str, receiver: &str) -> Result<u64, StoreError> {
        let result = sqlx::query(
            "UPDATE message SET seen = true WHERE sender = $1 AND receiver = $2 AND seen = false",
        )
        .bind(sender)
        .bind(receiver)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn chats(&self, receiver: &str) -> Result<Vec<ChatSummary>, StoreError> {
        let rows: Vec<(String, String, i64)> = sqlx::query_as(
            r#"
            SELECT DISTINCT ON (
                LEAST(sender, receiver),
                GREATEST(sender, receiver),
                product_id
            )
                sender,
                product_id,
                COUNT(*) FILTER (WHERE NOT seen AND receiver = $1) AS unseen_count
            FROM message
            WHERE receiver = $1
            GROUP BY sender, receiver, product_id
            ORDER BY
                LEAST(sender, receiver),
                GREATEST(sender, receiver),
                product_id
            "#,
        )
        .bind(receiver)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(sender, product_id, unseen_count)| ChatSummary {
                sender,
                product_id,
                unseen_count: unseen_count.max(0) as u64,
            })
            .collect())
    }
}
