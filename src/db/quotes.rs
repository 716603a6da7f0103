//! Quote repository: memorable lines, filed under the nick who said them.

use super::{DbError, like_pattern};
use sqlx::{FromRow, SqlitePool};

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Quote {
    pub nick: String,
    pub content: String,
    pub added_by: String,
    pub created_at: i64,
}

/// Repository for quote operations.
pub struct QuoteRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> QuoteRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Returns `false` if the same line is already saved for `nick`.
    pub async fn add(&self, nick: &str, content: &str, added_by: &str) -> Result<bool, DbError> {
        let result = sqlx::query(
            r#"
            INSERT INTO quotes (nick, content, added_by, created_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(nick, content) DO NOTHING
            "#,
        )
        .bind(nick)
        .bind(content)
        .bind(added_by)
        .bind(chrono::Utc::now().timestamp())
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// A random quote, from `nick` only when given.
    pub async fn random(&self, nick: Option<&str>) -> Result<Option<Quote>, DbError> {
        let quote = sqlx::query_as::<_, Quote>(
            r#"
            SELECT nick, content, added_by, created_at FROM quotes
            WHERE ?1 IS NULL OR nick = ?1
            ORDER BY RANDOM()
            LIMIT 1
            "#,
        )
        .bind(nick)
        .fetch_optional(self.pool)
        .await?;
        Ok(quote)
    }

    /// Delete the quotes of `nick` containing `fragment`; returns how many.
    pub async fn remove(&self, nick: &str, fragment: &str) -> Result<u64, DbError> {
        let result = sqlx::query("DELETE FROM quotes WHERE nick = ? AND content LIKE ? ESCAPE '\\'")
            .bind(nick)
            .bind(like_pattern(fragment))
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use crate::db::Database;

    #[tokio::test]
    async fn test_add_is_unique_per_nick_and_line() {
        let db = Database::new(":memory:").await.unwrap();
        let quotes = db.quotes();
        assert!(quotes.add("alice", "ship it", "bob").await.unwrap());
        assert!(!quotes.add("Alice", "ship it", "carol").await.unwrap());
        assert!(quotes.add("dave", "ship it", "bob").await.unwrap());
    }

    #[tokio::test]
    async fn test_random_filters_by_nick_case_insensitively() {
        let db = Database::new(":memory:").await.unwrap();
        let quotes = db.quotes();
        assert!(quotes.random(None).await.unwrap().is_none());

        quotes.add("alice", "ship it", "bob").await.unwrap();
        let quote = quotes.random(Some("ALICE")).await.unwrap().unwrap();
        assert_eq!(quote.content, "ship it");
        assert_eq!(quote.added_by, "bob");
        assert!(quotes.random(Some("bob")).await.unwrap().is_none());
        assert!(quotes.random(None).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_remove_matches_fragment_for_one_nick() {
        let db = Database::new(":memory:").await.unwrap();
        let quotes = db.quotes();
        quotes.add("alice", "100% done", "bob").await.unwrap();
        quotes.add("alice", "1000 done", "bob").await.unwrap();
        quotes.add("carol", "100% done", "bob").await.unwrap();

        assert_eq!(quotes.remove("alice", "100%").await.unwrap(), 1);
        assert_eq!(quotes.remove("alice", "100%").await.unwrap(), 0);
        assert!(quotes.random(Some("carol")).await.unwrap().is_some());
    }
}
