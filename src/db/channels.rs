//! Channel repository: which channels the bot serves and their command
//! toggles.

use std::collections::HashMap;

use super::{ChannelRecord, DbError};
use sqlx::SqlitePool;

type ChannelRow = (i64, i64, String, bool, bool);

/// Repository for channel operations.
pub struct ChannelRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> ChannelRepository<'a> {
    /// Create a new channel repository.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Register a channel. The broadcaster user is created if needed.
    pub async fn add(
        &self,
        user_id: i64,
        username: &str,
        is_offline_only: bool,
    ) -> Result<ChannelRecord, DbError> {
        super::UserRepository::new(self.pool)
            .ensure(user_id, username)
            .await?;

        let result = sqlx::query(
            r#"
            INSERT INTO channels (user_id, is_enabled, is_offline_only)
            VALUES (?, 1, ?)
            "#,
        )
        .bind(user_id)
        .bind(is_offline_only)
        .execute(self.pool)
        .await?;

        let id = result.last_insert_rowid();
        self.get(id).await?.ok_or(DbError::ChannelNotFound(id))
    }

    /// Enable or disable a channel.
    pub async fn set_enabled(&self, id: i64, enabled: bool) -> Result<(), DbError> {
        sqlx::query("UPDATE channels SET is_enabled = ? WHERE id = ?")
            .bind(enabled)
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Toggle one command in one channel.
    pub async fn set_command_enabled(
        &self,
        id: i64,
        command: &str,
        enabled: bool,
    ) -> Result<(), DbError> {
        sqlx::query(
            r#"
            UPDATE channel_commands SET is_enabled = ?
            WHERE channel_id = ?
              AND command_id = (SELECT id FROM commands WHERE name = ?)
            "#,
        )
        .bind(enabled)
        .bind(id)
        .bind(command)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// All channels with their command toggles.
    pub async fn list(&self) -> Result<Vec<ChannelRecord>, DbError> {
        let rows = sqlx::query_as::<_, ChannelRow>(
            r#"
            SELECT c.id, c.user_id, u.username, c.is_enabled, c.is_offline_only
            FROM channels c
            JOIN users u ON u.id = c.user_id
            ORDER BY c.id
            "#,
        )
        .fetch_all(self.pool)
        .await?;

        let toggles = sqlx::query_as::<_, (i64, String, bool)>(
            r#"
            SELECT cc.channel_id, cmd.name, cc.is_enabled
            FROM channel_commands cc
            JOIN commands cmd ON cmd.id = cc.command_id
            "#,
        )
        .fetch_all(self.pool)
        .await?;

        let mut by_channel: HashMap<i64, HashMap<String, bool>> = HashMap::new();
        for (channel_id, name, enabled) in toggles {
            by_channel.entry(channel_id).or_default().insert(name, enabled);
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let commands = by_channel.remove(&row.0).unwrap_or_default();
                record_from_row(row, commands)
            })
            .collect())
    }

    /// One channel by its record id.
    pub async fn get(&self, id: i64) -> Result<Option<ChannelRecord>, DbError> {
        let row = sqlx::query_as::<_, ChannelRow>(
            r#"
            SELECT c.id, c.user_id, u.username, c.is_enabled, c.is_offline_only
            FROM channels c
            JOIN users u ON u.id = c.user_id
            WHERE c.id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let commands: HashMap<String, bool> = sqlx::query_as::<_, (String, bool)>(
            r#"
            SELECT cmd.name, cc.is_enabled
            FROM channel_commands cc
            JOIN commands cmd ON cmd.id = cc.command_id
            WHERE cc.channel_id = ?
            "#,
        )
        .bind(id)
        .fetch_all(self.pool)
        .await?
        .into_iter()
        .collect();

        Ok(Some(record_from_row(row, commands)))
    }
}

fn record_from_row(
    (id, user_id, username, is_enabled, is_offline_only): ChannelRow,
    commands: HashMap<String, bool>,
) -> ChannelRecord {
    ChannelRecord {
        id,
        user_id,
        username,
        is_enabled,
        is_offline_only,
        commands,
    }
}

#[cfg(test)]
mod tests {
    use crate::db::{CommandMetadata, Database};

    fn command(name: &str) -> CommandMetadata {
        CommandMetadata {
            name: name.into(),
            description: format!("{name} command"),
            aliases: vec![],
            args: vec![],
        }
    }

    #[tokio::test]
    async fn test_add_and_list() {
        let db = Database::new(":memory:").await.unwrap();
        db.commands().sync(&[command("rps")]).await.unwrap();
        let bob = db.channels().add(19, "Bob", false).await.unwrap();
        assert_eq!(bob.username, "bob");
        assert!(bob.is_enabled);
        // trigger filled the toggle row
        assert_eq!(bob.commands.get("rps"), Some(&true));

        db.channels()
            .set_command_enabled(bob.id, "rps", false)
            .await
            .unwrap();
        let listed = db.channels().list().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert!(!listed[0].is_command_enabled("rps"));
    }

    #[tokio::test]
    async fn test_commands_added_later_get_toggles() {
        let db = Database::new(":memory:").await.unwrap();
        let bob = db.channels().add(19, "bob", false).await.unwrap();
        db.commands().sync(&[command("guess")]).await.unwrap();
        let bob = db.channels().get(bob.id).await.unwrap().unwrap();
        assert_eq!(bob.commands.get("guess"), Some(&true));
    }

    #[tokio::test]
    async fn test_disable_channel() {
        let db = Database::new(":memory:").await.unwrap();
        let bob = db.channels().add(19, "bob", true).await.unwrap();
        assert!(bob.is_offline_only);
        db.channels().set_enabled(bob.id, false).await.unwrap();
        assert!(!db.channels().get(bob.id).await.unwrap().unwrap().is_enabled);
        assert!(db.channels().get(999).await.unwrap().is_none());
    }
}
