//! Reminder repository.

use super::{DbError, Reminder};
use sqlx::SqlitePool;

type ReminderRow = (i64, i64, String, String, i64, String);

fn reminder_from_row((id, user_id, username, channel, remind_at, message): ReminderRow) -> Reminder {
    Reminder {
        id,
        user_id,
        username,
        channel,
        remind_at,
        message,
    }
}

const SELECT_REMINDERS: &str = r#"
    SELECT r.id, r.user_id, u.username, cu.username, r.remind_at, r.message
    FROM user_reminders r
    JOIN users u ON u.id = r.user_id
    JOIN channels c ON c.id = r.channel_id
    JOIN users cu ON cu.id = c.user_id
"#;

/// Repository for reminders.
pub struct ReminderRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> ReminderRepository<'a> {
    /// Create a new reminder repository.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Every pending reminder, soonest first.
    pub async fn list(&self) -> Result<Vec<Reminder>, DbError> {
        let sql = format!("{SELECT_REMINDERS} ORDER BY r.remind_at");
        let rows = sqlx::query_as::<_, ReminderRow>(&sql)
            .fetch_all(self.pool)
            .await?;
        Ok(rows.into_iter().map(reminder_from_row).collect())
    }

    /// Store a reminder for the channel whose broadcaster id is `room_id`.
    pub async fn create(
        &self,
        user_id: i64,
        username: &str,
        room_id: i64,
        remind_at: i64,
        message: &str,
    ) -> Result<Reminder, DbError> {
        super::UserRepository::new(self.pool)
            .ensure(user_id, username)
            .await?;

        let channel_id: i64 = sqlx::query_scalar("SELECT id FROM channels WHERE user_id = ?")
            .bind(room_id)
            .fetch_optional(self.pool)
            .await?
            .ok_or(DbError::ChannelNotFound(room_id))?;

        let id = sqlx::query(
            r#"
            INSERT INTO user_reminders (user_id, channel_id, remind_at, message)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(user_id)
        .bind(channel_id)
        .bind(remind_at)
        .bind(message)
        .execute(self.pool)
        .await?
        .last_insert_rowid();

        let sql = format!("{SELECT_REMINDERS} WHERE r.id = ?");
        let row = sqlx::query_as::<_, ReminderRow>(&sql)
            .bind(id)
            .fetch_one(self.pool)
            .await?;
        Ok(reminder_from_row(row))
    }

    /// Delete a delivered reminder. Returns whether it was still pending.
    pub async fn finish(&self, id: i64) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM user_reminders WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use crate::db::{Database, DbError};

    #[tokio::test]
    async fn test_create_list_finish() {
        let db = Database::new(":memory:").await.unwrap();
        db.channels().add(19, "bob", false).await.unwrap();

        let late = db.reminders().create(42, "alice", 19, 2000, "later").await.unwrap();
        let soon = db.reminders().create(42, "alice", 19, 1000, "buy milk").await.unwrap();
        assert_eq!(soon.channel, "bob");
        assert_eq!(soon.username, "alice");

        let pending = db.reminders().list().await.unwrap();
        assert_eq!(pending.iter().map(|r| r.id).collect::<Vec<_>>(), [soon.id, late.id]);

        assert!(db.reminders().finish(soon.id).await.unwrap());
        assert!(!db.reminders().finish(soon.id).await.unwrap());
        assert_eq!(db.reminders().list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_channel() {
        let db = Database::new(":memory:").await.unwrap();
        let err = db.reminders().create(42, "alice", 5, 1, "x").await.unwrap_err();
        assert!(matches!(err, DbError::ChannelNotFound(5)));
    }
}
