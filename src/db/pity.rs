//! Pull pity counters.

use super::DbError;
use sqlx::SqlitePool;

/// Rolls since the last 4 star and the last 5 star.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Pity {
    pub four: i64,
    pub five: i64,
}

/// Repository for pity counters.
pub struct PityRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> PityRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// A user's counters, starting them at zero on first use.
    pub async fn get(&self, user_id: i64, username: &str) -> Result<Pity, DbError> {
        super::UserRepository::new(self.pool)
            .ensure(user_id, username)
            .await?;

        sqlx::query("INSERT OR IGNORE INTO user_pity (user_id, four, five) VALUES (?, 0, 0)")
            .bind(user_id)
            .execute(self.pool)
            .await?;

        let (four, five) =
            sqlx::query_as::<_, (i64, i64)>("SELECT four, five FROM user_pity WHERE user_id = ?")
                .bind(user_id)
                .fetch_one(self.pool)
                .await?;
        Ok(Pity { four, five })
    }

    pub async fn set(&self, user_id: i64, pity: Pity) -> Result<(), DbError> {
        sqlx::query("UPDATE user_pity SET four = ?, five = ? WHERE user_id = ?")
            .bind(pity.four)
            .bind(pity.five)
            .bind(user_id)
            .execute(self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    #[tokio::test]
    async fn test_pity_starts_at_zero_and_persists() {
        let db = Database::new(":memory:").await.unwrap();
        assert_eq!(db.pity().get(5, "alice").await.unwrap(), Pity::default());

        db.pity().set(5, Pity { four: 3, five: 41 }).await.unwrap();
        assert_eq!(
            db.pity().get(5, "alice").await.unwrap(),
            Pity { four: 3, five: 41 }
        );
    }
}
