//! Picture repository: URLs filed under free-text tags.

use super::{DbError, like_pattern};
use sqlx::{FromRow, SqlitePool};

/// A stored picture.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Picture {
    pub tag: String,
    pub url: String,
    pub nick: String,
    pub nsfw: bool,
}

/// Repository for picture operations.
pub struct PictureRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> PictureRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Pictures whose tag contains `terms`, oldest first.
    pub async fn search(&self, terms: &str) -> Result<Vec<Picture>, DbError> {
        let rows = sqlx::query_as::<_, Picture>(
            r#"
            SELECT tag, url, nick, nsfw FROM pictures
            WHERE tag LIKE ? ESCAPE '\'
            ORDER BY id
            "#,
        )
        .bind(like_pattern(terms))
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn count_for_tag(&self, tag: &str) -> Result<i64, DbError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM pictures WHERE tag = ?")
            .bind(tag)
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }

    /// Tag the URL is already stored under, if any.
    pub async fn tag_of(&self, url: &str) -> Result<Option<String>, DbError> {
        let tag = sqlx::query_scalar("SELECT tag FROM pictures WHERE url = ? LIMIT 1")
            .bind(url)
            .fetch_optional(self.pool)
            .await?;
        Ok(tag)
    }

    pub async fn add(&self, tag: &str, url: &str, nick: &str, nsfw: bool) -> Result<(), DbError> {
        sqlx::query(
            r#"
            INSERT INTO pictures (tag, url, nick, nsfw, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(tag)
        .bind(url)
        .bind(nick)
        .bind(nsfw)
        .bind(chrono::Utc::now().timestamp())
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// Returns `true` if a picture was removed.
    pub async fn remove(&self, tag: &str, url: &str) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM pictures WHERE tag = ? AND url = ?")
            .bind(tag)
            .bind(url)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use crate::db::Database;

    #[tokio::test]
    async fn test_search_matches_substring_of_tag() {
        let db = Database::new(":memory:").await.unwrap();
        let pics = db.pictures();
        pics.add("funny cats", "http://x/1.png", "alice", false).await.unwrap();
        pics.add("dogs", "http://x/2.png", "alice", true).await.unwrap();

        let found = pics.search("cat").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].url, "http://x/1.png");
        assert!(!found[0].nsfw);

        assert!(pics.search("100%").await.unwrap().is_empty());
        assert_eq!(pics.count_for_tag("dogs").await.unwrap(), 1);
        assert_eq!(pics.tag_of("http://x/2.png").await.unwrap().as_deref(), Some("dogs"));
    }

    #[tokio::test]
    async fn test_remove_reports_whether_anything_changed() {
        let db = Database::new(":memory:").await.unwrap();
        let pics = db.pictures();
        pics.add("cats", "http://x/1.png", "alice", false).await.unwrap();

        assert!(!pics.remove("dogs", "http://x/1.png").await.unwrap());
        assert!(pics.remove("cats", "http://x/1.png").await.unwrap());
        assert!(pics.search("cats").await.unwrap().is_empty());
    }
}
