//! Database models.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A chat user known to the bot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub money: i64,
    pub can_receive_money: bool,
    pub auto_remove_afk: bool,
}

/// Boolean per-user settings toggled with `!toggle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserSetting {
    CanReceiveMoney,
    AutoRemoveAfk,
}

impl UserSetting {
    pub const ALL: [UserSetting; 2] = [Self::CanReceiveMoney, Self::AutoRemoveAfk];

    /// Column name, also the name users type.
    pub fn column(self) -> &'static str {
        match self {
            Self::CanReceiveMoney => "can_receive_money",
            Self::AutoRemoveAfk => "auto_remove_afk",
        }
    }
}

impl FromStr for UserSetting {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|setting| setting.column().eq_ignore_ascii_case(s))
            .ok_or(())
    }
}

impl fmt::Display for UserSetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

/// A channel the bot serves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelRecord {
    pub id: i64,
    /// Twitch user id of the broadcaster (the `room-id` tag).
    pub user_id: i64,
    /// Broadcaster login, the channel name.
    pub username: String,
    pub is_enabled: bool,
    pub is_offline_only: bool,
    /// Per-command toggle keyed by command name.
    pub commands: HashMap<String, bool>,
}

impl ChannelRecord {
    /// Commands without a toggle row are enabled.
    pub fn is_command_enabled(&self, name: &str) -> bool {
        self.commands.get(name).copied().unwrap_or(true)
    }
}

/// One argument in the persisted command description.
///
/// Short keys keep the admin panel's JSON compact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArgMetadata {
    #[serde(rename = "n")]
    pub name: String,
    #[serde(rename = "d")]
    pub description: String,
    #[serde(rename = "o")]
    pub optional: bool,
    #[serde(rename = "f")]
    pub flag: Option<String>,
}

/// Durable mirror of a registered command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandMetadata {
    pub name: String,
    pub description: String,
    pub aliases: Vec<String>,
    pub args: Vec<ArgMetadata>,
}

/// An AFK status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AfkRecord {
    pub user_id: i64,
    pub username: String,
    pub message: String,
    /// Unix seconds.
    pub set_at: i64,
}

/// A pending reminder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reminder {
    pub id: i64,
    pub user_id: i64,
    pub username: String,
    /// Channel name (broadcaster login).
    pub channel: String,
    /// Unix seconds.
    pub remind_at: i64,
    pub message: String,
}
