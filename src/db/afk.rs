//! AFK statuses.

use super::{AfkRecord, DbError};
use sqlx::SqlitePool;

/// Repository for AFK statuses.
pub struct AfkRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> AfkRepository<'a> {
    /// Create a new AFK repository.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Every active AFK status.
    pub async fn list(&self) -> Result<Vec<AfkRecord>, DbError> {
        let rows = sqlx::query_as::<_, (i64, String, String, i64)>(
            r#"
            SELECT a.user_id, u.username, a.message, a.set_at
            FROM user_afk a
            JOIN users u ON u.id = a.user_id
            "#,
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(user_id, username, message, set_at)| AfkRecord {
                user_id,
                username,
                message,
                set_at,
            })
            .collect())
    }

    /// Set or replace a user's AFK status.
    pub async fn set(
        &self,
        user_id: i64,
        username: &str,
        message: &str,
        set_at: i64,
    ) -> Result<AfkRecord, DbError> {
        let user = super::UserRepository::new(self.pool)
            .ensure(user_id, username)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO user_afk (user_id, message, set_at) VALUES (?, ?, ?)
            ON CONFLICT(user_id) DO UPDATE SET message = excluded.message, set_at = excluded.set_at
            "#,
        )
        .bind(user_id)
        .bind(message)
        .bind(set_at)
        .execute(self.pool)
        .await?;

        Ok(AfkRecord {
            user_id,
            username: user.username,
            message: message.to_string(),
            set_at,
        })
    }

    /// Clear a status. Returns whether one existed.
    pub async fn remove(&self, user_id: i64) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM user_afk WHERE user_id = ?")
            .bind(user_id)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use crate::db::Database;

    #[tokio::test]
    async fn test_set_replace_remove() {
        let db = Database::new(":memory:").await.unwrap();
        let afk = db.afk();
        afk.set(1, "alice", "lunch", 100).await.unwrap();
        afk.set(1, "alice", "dinner", 200).await.unwrap();

        let all = afk.list().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].message, "dinner");
        assert_eq!(all[0].set_at, 200);

        assert!(afk.remove(1).await.unwrap());
        assert!(!afk.remove(1).await.unwrap());
    }
}
