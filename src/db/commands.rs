//! Command registry mirror.
//!
//! The in-process command table is the source of truth; at setup its
//! metadata is synced here so the admin panel can list and toggle commands.

use std::collections::HashMap;

use super::{ArgMetadata, CommandMetadata, DbError};
use sqlx::SqlitePool;
use tracing::info;

/// What a sync changed.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub added: usize,
    pub updated: usize,
    pub removed: usize,
}

/// Repository for the command registry.
pub struct CommandRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> CommandRepository<'a> {
    /// Create a new command repository.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Make the stored registry match `commands` exactly.
    pub async fn sync(&self, commands: &[CommandMetadata]) -> Result<SyncReport, DbError> {
        let mut tx = self.pool.begin().await?;
        let mut report = SyncReport::default();

        let existing: HashMap<String, (i64, String, String, String)> =
            sqlx::query_as::<_, (i64, String, String, String, String)>(
                "SELECT id, name, description, aliases, args FROM commands",
            )
            .fetch_all(&mut *tx)
            .await?
            .into_iter()
            .map(|(id, name, description, aliases, args)| (name, (id, description, aliases, args)))
            .collect();

        for command in commands {
            let aliases = serde_json::to_string(&command.aliases)?;
            let args = serde_json::to_string(&command.args)?;

            match existing.get(&command.name) {
                Some((id, description, old_aliases, old_args)) => {
                    if *description == command.description
                        && *old_aliases == aliases
                        && *old_args == args
                    {
                        continue;
                    }
                    sqlx::query(
                        "UPDATE commands SET description = ?, aliases = ?, args = ? WHERE id = ?",
                    )
                    .bind(&command.description)
                    .bind(&aliases)
                    .bind(&args)
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;
                    report.updated += 1;
                }
                None => {
                    sqlx::query(
                        "INSERT INTO commands (name, description, aliases, args) VALUES (?, ?, ?, ?)",
                    )
                    .bind(&command.name)
                    .bind(&command.description)
                    .bind(&aliases)
                    .bind(&args)
                    .execute(&mut *tx)
                    .await?;
                    report.added += 1;
                }
            }
        }

        for (name, (id, ..)) in &existing {
            if commands.iter().all(|c| &c.name != name) {
                sqlx::query("DELETE FROM commands WHERE id = ?")
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;
                report.removed += 1;
            }
        }

        tx.commit().await?;
        info!(
            added = report.added,
            updated = report.updated,
            removed = report.removed,
            "Synced command registry"
        );
        Ok(report)
    }

    /// Stored registry, ordered by name.
    pub async fn list(&self) -> Result<Vec<CommandMetadata>, DbError> {
        let rows = sqlx::query_as::<_, (String, String, String, String)>(
            "SELECT name, description, aliases, args FROM commands ORDER BY name",
        )
        .fetch_all(self.pool)
        .await?;

        rows.into_iter()
            .map(|(name, description, aliases, args)| {
                Ok(CommandMetadata {
                    name,
                    description,
                    aliases: serde_json::from_str(&aliases)?,
                    args: serde_json::from_str::<Vec<ArgMetadata>>(&args)?,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use crate::db::{ArgMetadata, CommandMetadata, Database, SyncReport};

    fn remind() -> CommandMetadata {
        CommandMetadata {
            name: "remind".into(),
            description: "set a reminder".into(),
            aliases: vec!["reminder".into(), "remindme".into()],
            args: vec![ArgMetadata {
                name: "when".into(),
                description: "time until the reminder".into(),
                optional: false,
                flag: None,
            }],
        }
    }

    fn rps() -> CommandMetadata {
        CommandMetadata {
            name: "rps".into(),
            description: "rock paper scissors".into(),
            aliases: vec![],
            args: vec![],
        }
    }

    #[tokio::test]
    async fn test_sync_add_update_remove() {
        let db = Database::new(":memory:").await.unwrap();
        let repo = db.commands();

        let first = repo.sync(&[remind(), rps()]).await.unwrap();
        assert_eq!(first, SyncReport { added: 2, updated: 0, removed: 0 });

        let unchanged = repo.sync(&[remind(), rps()]).await.unwrap();
        assert_eq!(unchanged, SyncReport::default());

        let mut changed = remind();
        changed.description = "remind yourself".into();
        let second = repo.sync(&[changed.clone()]).await.unwrap();
        assert_eq!(second, SyncReport { added: 0, updated: 1, removed: 1 });

        let stored = repo.list().await.unwrap();
        assert_eq!(stored, vec![changed]);
    }
}
