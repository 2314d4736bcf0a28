//! Linked timezones.

use super::DbError;
use sqlx::SqlitePool;

/// Repository for user timezones.
pub struct TimezoneRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> TimezoneRepository<'a> {
    /// Create a new timezone repository.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Link an IANA timezone name to a user.
    pub async fn set(&self, user_id: i64, username: &str, timezone: &str) -> Result<(), DbError> {
        super::UserRepository::new(self.pool)
            .ensure(user_id, username)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO user_timezones (user_id, timezone) VALUES (?, ?)
            ON CONFLICT(user_id) DO UPDATE SET timezone = excluded.timezone
            "#,
        )
        .bind(user_id)
        .bind(timezone)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// A user's linked timezone.
    pub async fn get(&self, user_id: i64) -> Result<Option<String>, DbError> {
        let tz = sqlx::query_scalar("SELECT timezone FROM user_timezones WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(self.pool)
            .await?;
        Ok(tz)
    }
}
