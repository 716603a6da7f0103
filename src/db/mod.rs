//! SQLite storage shared by the modules.
//!
//! One repository per table: tagged pictures, pending memos, posted links and
//! saved quotes.

mod links;
mod memos;
mod pictures;
mod quotes;

pub use links::{Link, LinkRepository};
pub use memos::{Memo, MemoRepository};
pub use pictures::{Picture, PictureRepository};
pub use quotes::{Quote, QuoteRepository};

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Database handle with connection pool.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (or create) the database and run migrations.
    ///
    /// `":memory:"` gives a private in-memory database, unique per call.
    pub async fn new(path: &str) -> Result<Self, DbError> {
        let options = if path == ":memory:" {
            SqliteConnectOptions::new().in_memory(true)
        } else {
            if let Some(parent) = Path::new(path).parent()
                && !parent.as_os_str().is_empty()
                && let Err(e) = std::fs::create_dir_all(parent)
            {
                warn!(path = %parent.display(), error = %e, "Failed to create database directory");
            }
            SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal)
        };

        // One connection, never recycled: an in-memory database lives only as long as it.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;
        info!(path = %path, "Database ready");
        Ok(Self { pool })
    }

    /// Get reference to the underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn pictures(&self) -> PictureRepository<'_> {
        PictureRepository::new(&self.pool)
    }

    pub fn memos(&self) -> MemoRepository<'_> {
        MemoRepository::new(&self.pool)
    }

    pub fn links(&self) -> LinkRepository<'_> {
        LinkRepository::new(&self.pool)
    }

    pub fn quotes(&self) -> QuoteRepository<'_> {
        QuoteRepository::new(&self.pool)
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// Escape `%`, `_` and `\` for a `LIKE ... ESCAPE '\'` pattern.
pub(crate) fn like_pattern(terms: &str) -> String {
    let mut escaped = String::with_capacity(terms.len() + 2);
    escaped.push('%');
    for c in terms.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}
