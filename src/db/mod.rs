//! Database module for persistent storage.
//!
//! Async SQLite access through SQLx for:
//! - Users, balances and per-user settings
//! - Channel configuration and per-channel command toggles
//! - The command registry mirror used by the admin panel
//! - AFK statuses, reminders, linked timezones and pull pity

mod afk;
mod channels;
mod commands;
mod models;
mod pity;
mod reminders;
mod timezones;
mod users;

pub use afk::AfkRepository;
pub use channels::ChannelRepository;
pub use commands::{CommandRepository, SyncReport};
pub use models::{
    AfkRecord, ArgMetadata, ChannelRecord, CommandMetadata, Reminder, User, UserSetting,
};
pub use pity::{Pity, PityRepository};
pub use reminders::ReminderRepository;
pub use timezones::TimezoneRepository;
pub use users::UserRepository;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

static MEMDB_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("database error: {0}")]
    Sqlx(sqlx::Error),
    #[error("migration error: {0}")]
    Migration(sqlx::migrate::MigrateError),
    #[error("user not found: {0}")]
    UserNotFound(String),
    #[error("channel not found: {0}")]
    ChannelNotFound(i64),
    #[error("insufficient funds: have {have}, need {need}")]
    InsufficientFunds { have: i64, need: i64 },
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Database handle with connection pool.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Connection acquire timeout.
    const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

    /// Maximum time a connection can remain idle before being closed.
    const IDLE_TIMEOUT: Duration = Duration::from_secs(60);

    /// Open (or create) the database and run migrations.
    ///
    /// `":memory:"` opens a fresh, uniquely named in-memory database.
    pub async fn new(path: &str) -> Result<Self, DbError> {
        let pool = if path == ":memory:" {
            // unique name per call so parallel tests never share state
            let id = MEMDB_COUNTER.fetch_add(1, Ordering::Relaxed);
            let memdb_uri = format!(
                "file:offlinechatbot-memdb-{}-{}?mode=memory&cache=shared",
                std::process::id(),
                id
            );

            let options = SqliteConnectOptions::new()
                .filename(&memdb_uri)
                .shared_cache(true)
                .foreign_keys(true)
                .create_if_missing(true);

            SqlitePoolOptions::new()
                .max_connections(1)
                .acquire_timeout(Self::ACQUIRE_TIMEOUT)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await?
        } else {
            if let Some(parent) = Path::new(path).parent()
                && !parent.as_os_str().is_empty()
                && let Err(e) = std::fs::create_dir_all(parent)
            {
                tracing::warn!(path = %parent.display(), error = %e, "Failed to create database directory");
            }

            let options = SqliteConnectOptions::new()
                .filename(path)
                .foreign_keys(true)
                .create_if_missing(true);

            SqlitePoolOptions::new()
                .max_connections(5)
                .acquire_timeout(Self::ACQUIRE_TIMEOUT)
                .idle_timeout(Some(Self::IDLE_TIMEOUT))
                .test_before_acquire(true)
                .connect_with(options)
                .await?
        };

        info!(path = %path, "Database connected");

        Self::run_migrations(&pool).await?;

        // WAL lets readers proceed while a handler writes
        sqlx::query("PRAGMA journal_mode=WAL")
            .execute(&pool)
            .await?;
        sqlx::query("PRAGMA synchronous=NORMAL")
            .execute(&pool)
            .await?;

        Ok(Self { pool })
    }

    /// Get reference to the underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn run_migrations(pool: &SqlitePool) -> Result<(), DbError> {
        sqlx::migrate!("./migrations")
            .run(pool)
            .await
            .map_err(DbError::Migration)?;

        info!("Database migrations checked/applied");
        Ok(())
    }

    /// Get user repository.
    pub fn users(&self) -> UserRepository<'_> {
        UserRepository::new(&self.pool)
    }

    /// Get channel repository.
    pub fn channels(&self) -> ChannelRepository<'_> {
        ChannelRepository::new(&self.pool)
    }

    /// Get command registry repository.
    pub fn commands(&self) -> CommandRepository<'_> {
        CommandRepository::new(&self.pool)
    }

    /// Get AFK repository.
    pub fn afk(&self) -> AfkRepository<'_> {
        AfkRepository::new(&self.pool)
    }

    /// Get reminder repository.
    pub fn reminders(&self) -> ReminderRepository<'_> {
        ReminderRepository::new(&self.pool)
    }

    /// Get timezone repository.
    pub fn timezones(&self) -> TimezoneRepository<'_> {
        TimezoneRepository::new(&self.pool)
    }

    /// Get pity repository.
    pub fn pity(&self) -> PityRepository<'_> {
        PityRepository::new(&self.pool)
    }
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        DbError::Sqlx(err)
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::Migration(err)
    }
}
