//! Database Module
//!
//! Handles the SQLite connection pool and migrations for the category store.

pub mod store;

pub use store::{
    CategoryFilter, CategorySort, CategoryStore, MemoryCategoryStore, RepoError, RepoResult,
    SqliteCategoryStore,
};

use crate::core::Config;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use std::str::FromStr;

/// Database service owning the SQLite connection pool
#[derive(Debug, Clone)]
pub struct DbService {
    pub pool: SqlitePool,
}

impl DbService {
    /// Open the database with WAL mode and apply migrations
    pub async fn new(config: &Config) -> RepoResult<Self> {
        let options = SqliteConnectOptions::from_str(&config.database_url)
            .map_err(|e| RepoError::Database(format!("Invalid database url: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(std::time::Duration::from_millis(5000));

        let pool = SqlitePoolOptions::new()
            .max_connections(config.db_max_connections)
            .connect_with(options)
            .await?;

        tracing::info!(
            url = %config.database_url,
            "Database connection established (SQLite WAL, busy_timeout=5000ms)"
        );

        sqlx::migrate!("./migrations")
            .set_ignore_missing(true)
            .run(&pool)
            .await?;
        tracing::info!("Database migrations applied");

        Ok(Self { pool })
    }

    /// Category store backed by this pool
    pub fn category_store(&self) -> SqliteCategoryStore {
        SqliteCategoryStore::new(self.pool.clone())
    }
}
