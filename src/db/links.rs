//! Link repository: URLs posted in channels.

use super::{DbError, like_pattern};
use sqlx::{FromRow, SqlitePool};

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Link {
    pub url: String,
    /// Who posted it first.
    pub nick: String,
    pub title: String,
    pub created_at: i64,
}

/// Repository for link operations.
pub struct LinkRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> LinkRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn find(&self, url: &str) -> Result<Option<Link>, DbError> {
        let link = sqlx::query_as::<_, Link>(
            "SELECT url, nick, title, created_at FROM links WHERE url = ?",
        )
        .bind(url)
        .fetch_optional(self.pool)
        .await?;
        Ok(link)
    }

    /// Store a link. The first poster is kept; returns `false` if already known.
    pub async fn remember(&self, url: &str, nick: &str, title: &str) -> Result<bool, DbError> {
        let result = sqlx::query(
            r#"
            INSERT INTO links (url, nick, title, created_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(url) DO NOTHING
            "#,
        )
        .bind(url)
        .bind(nick)
        .bind(title)
        .bind(chrono::Utc::now().timestamp())
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Fill in the title of a link stored without one.
    pub async fn set_title(&self, url: &str, title: &str) -> Result<bool, DbError> {
        let result = sqlx::query("UPDATE links SET title = ? WHERE url = ? AND title = ''")
            .bind(title)
            .bind(url)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Links whose URL or title contains `terms`, newest first.
    pub async fn search(&self, terms: &str, limit: i64) -> Result<Vec<Link>, DbError> {
        let pattern = like_pattern(terms);
        let links = sqlx::query_as::<_, Link>(
            r#"
            SELECT url, nick, title, created_at FROM links
            WHERE url LIKE ?1 ESCAPE '\' OR title LIKE ?1 ESCAPE '\'
            ORDER BY id DESC
            LIMIT ?2
            "#,
        )
        .bind(pattern)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;
        Ok(links)
    }
}
