//! User repository: identities, balances and settings.

use super::{DbError, User, UserSetting};
use sqlx::SqlitePool;

type UserRow = (i64, String, i64, bool, bool);

fn user_from_row((id, username, money, can_receive_money, auto_remove_afk): UserRow) -> User {
    User {
        id,
        username,
        money,
        can_receive_money,
        auto_remove_afk,
    }
}

/// Repository for user operations.
pub struct UserRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Fetch a user, creating it or refreshing its login.
    ///
    /// Logins change on Twitch; the id is the stable key.
    pub async fn ensure(&self, id: i64, username: &str) -> Result<User, DbError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, username) VALUES (?, ?)
            ON CONFLICT(id) DO UPDATE SET username = excluded.username
            "#,
        )
        .bind(id)
        .bind(username.to_lowercase())
        .execute(self.pool)
        .await?;

        self.get(id)
            .await?
            .ok_or_else(|| DbError::UserNotFound(username.to_string()))
    }

    /// Fetch a user by id.
    pub async fn get(&self, id: i64) -> Result<Option<User>, DbError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, username, money, can_receive_money, auto_remove_afk
            FROM users
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(user_from_row))
    }

    /// Fetch a user by login, case-insensitively.
    pub async fn find_by_username(&self, username: &str) -> Result<Option<User>, DbError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, username, money, can_receive_money, auto_remove_afk
            FROM users
            WHERE username = ? COLLATE NOCASE
            "#,
        )
        .bind(username)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(user_from_row))
    }

    /// Add `amount` (may be negative) to a balance, creating the user if
    /// needed. Returns the new balance.
    pub async fn add_money(&self, id: i64, username: &str, amount: i64) -> Result<i64, DbError> {
        self.ensure(id, username).await?;
        let balance: i64 = sqlx::query_scalar(
            r#"
            UPDATE users SET money = money + ? WHERE id = ?
            RETURNING money
            "#,
        )
        .bind(amount)
        .bind(id)
        .fetch_one(self.pool)
        .await?;
        Ok(balance)
    }

    /// Move money between two users atomically.
    pub async fn transfer(&self, from: i64, to: i64, amount: i64) -> Result<(), DbError> {
        let mut tx = self.pool.begin().await?;

        let have: i64 = sqlx::query_scalar("SELECT money FROM users WHERE id = ?")
            .bind(from)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| DbError::UserNotFound(from.to_string()))?;
        if have < amount {
            return Err(DbError::InsufficientFunds { have, need: amount });
        }

        sqlx::query("UPDATE users SET money = money - ? WHERE id = ?")
            .bind(amount)
            .bind(from)
            .execute(&mut *tx)
            .await?;
        sqlx::query("UPDATE users SET money = money + ? WHERE id = ?")
            .bind(amount)
            .bind(to)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Update one boolean setting.
    pub async fn set_setting(
        &self,
        id: i64,
        setting: UserSetting,
        value: bool,
    ) -> Result<(), DbError> {
        // column comes from a closed enum, never from user input
        let sql = format!("UPDATE users SET {} = ? WHERE id = ?", setting.column());
        sqlx::query(&sql)
            .bind(value)
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Richest users first.
    pub async fn top(&self, limit: i64) -> Result<Vec<User>, DbError> {
        let rows = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, username, money, can_receive_money, auto_remove_afk
            FROM users
            ORDER BY money DESC, id ASC
            LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(user_from_row).collect())
    }

    /// 1-based position by balance, `None` for unknown users.
    pub async fn ranking(&self, id: i64) -> Result<Option<i64>, DbError> {
        let rank: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT 1 + (SELECT COUNT(*) FROM users o WHERE o.money > u.money)
            FROM users u
            WHERE u.id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(rank)
    }
}

#[cfg(test)]
mod tests {
    use crate::db::{Database, DbError, UserSetting};

    #[tokio::test]
    async fn test_ensure_refreshes_username() {
        let db = Database::new(":memory:").await.unwrap();
        db.users().ensure(1, "Alice").await.unwrap();
        let user = db.users().ensure(1, "alice_renamed").await.unwrap();
        assert_eq!(user.username, "alice_renamed");
        assert_eq!(user.money, 0);
        assert!(user.can_receive_money);
        assert!(user.auto_remove_afk);
    }

    #[tokio::test]
    async fn test_money_and_ranking() {
        let db = Database::new(":memory:").await.unwrap();
        let users = db.users();
        assert_eq!(users.add_money(1, "a", 50).await.unwrap(), 50);
        assert_eq!(users.add_money(2, "b", 100).await.unwrap(), 100);
        assert_eq!(users.add_money(1, "a", -20).await.unwrap(), 30);

        let top = users.top(10).await.unwrap();
        assert_eq!(top.iter().map(|u| u.id).collect::<Vec<_>>(), [2, 1]);
        assert_eq!(users.ranking(1).await.unwrap(), Some(2));
        assert_eq!(users.ranking(99).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_transfer() {
        let db = Database::new(":memory:").await.unwrap();
        let users = db.users();
        users.add_money(1, "a", 10).await.unwrap();
        users.ensure(2, "b").await.unwrap();

        users.transfer(1, 2, 4).await.unwrap();
        assert_eq!(users.get(2).await.unwrap().unwrap().money, 4);

        let err = users.transfer(1, 2, 100).await.unwrap_err();
        assert!(matches!(err, DbError::InsufficientFunds { have: 6, need: 100 }));
    }

    #[tokio::test]
    async fn test_settings_and_lookup() {
        let db = Database::new(":memory:").await.unwrap();
        let users = db.users();
        users.ensure(3, "Carol").await.unwrap();
        users
            .set_setting(3, UserSetting::CanReceiveMoney, false)
            .await
            .unwrap();
        let carol = users.find_by_username("CAROL").await.unwrap().unwrap();
        assert!(!carol.can_receive_money);
    }
}
