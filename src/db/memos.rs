//! Memo repository: messages left for a nick until they next speak.

use super::DbError;
use sqlx::{FromRow, SqlitePool};

/// A memo waiting for delivery.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Memo {
    pub id: i64,
    pub sender: String,
    pub recipient: String,
    pub message: String,
    /// Unix timestamp.
    pub created_at: i64,
}

/// Repository for memo operations.
pub struct MemoRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> MemoRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn add(&self, sender: &str, recipient: &str, message: &str) -> Result<i64, DbError> {
        let result = sqlx::query(
            r#"
            INSERT INTO memos (sender, recipient, message, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(sender)
        .bind(recipient)
        .bind(message)
        .bind(chrono::Utc::now().timestamp())
        .execute(self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// Memos addressed to `recipient` (case-insensitive), oldest first.
    pub async fn pending_for(&self, recipient: &str) -> Result<Vec<Memo>, DbError> {
        let memos = sqlx::query_as::<_, Memo>(
            r#"
            SELECT id, sender, recipient, message, created_at FROM memos
            WHERE recipient = ?
            ORDER BY id
            "#,
        )
        .bind(recipient)
        .fetch_all(self.pool)
        .await?;
        Ok(memos)
    }

    /// Take every memo for `recipient`, removing them in the same transaction.
    pub async fn take_for(&self, recipient: &str) -> Result<Vec<Memo>, DbError> {
        let mut tx = self.pool.begin().await?;
        let memos = sqlx::query_as::<_, Memo>(
            r#"
            SELECT id, sender, recipient, message, created_at FROM memos
            WHERE recipient = ?
            ORDER BY id
            "#,
        )
        .bind(recipient)
        .fetch_all(&mut *tx)
        .await?;

        if !memos.is_empty() {
            sqlx::query("DELETE FROM memos WHERE recipient = ?")
                .bind(recipient)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(memos)
    }

    /// Undelivered memos left by `sender`, oldest first.
    pub async fn sent_by(&self, sender: &str) -> Result<Vec<Memo>, DbError> {
        let memos = sqlx::query_as::<_, Memo>(
            r#"
            SELECT id, sender, recipient, message, created_at FROM memos
            WHERE sender = ? COLLATE NOCASE
            ORDER BY id
            "#,
        )
        .bind(sender)
        .fetch_all(self.pool)
        .await?;
        Ok(memos)
    }
}
