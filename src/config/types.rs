//! Core configuration types.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use super::defaults::*;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("missing required setting: {0}")]
    Missing(&'static str),
    #[error("invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

/// Bot configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Login identity.
    #[serde(default)]
    pub identity: IdentityConfig,
    /// Chat server connection.
    #[serde(default)]
    pub connection: ConnectionConfig,
    /// Local control channel.
    #[serde(default)]
    pub control: ControlConfig,
    /// Persistent storage.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Outbound pacing.
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    /// Command routing.
    #[serde(default)]
    pub commands: CommandsConfig,
    /// Word scramble game.
    #[serde(default)]
    pub scramble: ScrambleConfig,
    /// Simulated gacha pulls.
    #[serde(default)]
    pub pull: PullConfig,
    /// Bomb party games.
    #[serde(default)]
    pub bomb_party: BombPartyConfig,
    /// Log output.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file, then apply environment overrides.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&content)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `IRC_USERNAME`, `IRC_OAUTH`, `SERVER_PORT` and `DATABASE_PATH`.
    ///
    /// `lookup` is injected so tests do not touch the process environment.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(username) = lookup("IRC_USERNAME") {
            self.identity.username = username.to_lowercase();
        }
        if let Some(oauth) = lookup("IRC_OAUTH") {
            self.identity.oauth = oauth;
        }
        if let Some(port) = lookup("SERVER_PORT") {
            let port: u16 = port.parse().map_err(|_| ConfigError::Invalid {
                key: "SERVER_PORT",
                value: port.clone(),
            })?;
            self.control.listen = format!("127.0.0.1:{port}");
        }
        if let Some(path) = lookup("DATABASE_PATH") {
            self.database.path = path;
        }
        Ok(())
    }

    /// Reject configurations the bot cannot log in with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.identity.username.trim().is_empty() {
            return Err(ConfigError::Missing("identity.username"));
        }
        if self.identity.oauth.trim().is_empty() {
            return Err(ConfigError::Missing("identity.oauth"));
        }
        if self.commands.prefix.is_empty() {
            return Err(ConfigError::Missing("commands.prefix"));
        }
        if self.rate_limit.messages_per_30s == 0 {
            return Err(ConfigError::Invalid {
                key: "rate_limit.messages_per_30s",
                value: "0".to_string(),
            });
        }
        Ok(())
    }
}

/// Login identity.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IdentityConfig {
    /// Bot account login (lowercase).
    #[serde(default)]
    pub username: String,
    /// `oauth:` token sent with PASS.
    #[serde(default)]
    pub oauth: String,
}

/// Chat server connection.
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectionConfig {
    /// `host:port` of the chat server.
    #[serde(default = "default_address")]
    pub address: String,
    /// Interval between UPDATE ticks.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    /// Capabilities requested after login.
    #[serde(default = "default_capabilities")]
    pub capabilities: Vec<String>,
    /// First reconnect delay.
    #[serde(default = "default_backoff_base_secs")]
    pub backoff_base_secs: u64,
    /// Reconnect delay ceiling.
    #[serde(default = "default_backoff_max_secs")]
    pub backoff_max_secs: u64,
    /// Bound of the context queue.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

impl ConnectionConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            tick_interval_ms: default_tick_interval_ms(),
            capabilities: default_capabilities(),
            backoff_base_secs: default_backoff_base_secs(),
            backoff_max_secs: default_backoff_max_secs(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

/// Local control channel.
#[derive(Debug, Clone, Deserialize)]
pub struct ControlConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Listen address. Keep it on loopback: there is no authentication.
    #[serde(default = "default_control_listen")]
    pub listen: String,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            listen: default_control_listen(),
        }
    }
}

/// Persistent storage.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite file path, or `:memory:`.
    #[serde(default = "default_database_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

/// Outbound pacing.
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    /// Delay after each chunk in channels where the bot is mod or owner.
    #[serde(default = "default_moderator_delay_ms")]
    pub moderator_delay_ms: u64,
    /// Delay after each chunk everywhere else.
    #[serde(default = "default_delay_ms")]
    pub default_delay_ms: u64,
    /// Chunk size in bytes.
    #[serde(default = "default_max_message_len")]
    pub max_message_len: usize,
    /// Account-wide send budget.
    #[serde(default = "default_messages_per_30s")]
    pub messages_per_30s: u32,
}

impl RateLimitConfig {
    pub fn moderator_delay(&self) -> Duration {
        Duration::from_millis(self.moderator_delay_ms)
    }

    pub fn default_delay(&self) -> Duration {
        Duration::from_millis(self.default_delay_ms)
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            moderator_delay_ms: default_moderator_delay_ms(),
            default_delay_ms: default_delay_ms(),
            max_message_len: default_max_message_len(),
            messages_per_30s: default_messages_per_30s(),
        }
    }
}

/// Command routing.
#[derive(Debug, Clone, Deserialize)]
pub struct CommandsConfig {
    /// Prefix that marks a chat message as a command.
    #[serde(default = "default_prefix")]
    pub prefix: String,
    /// When set, only the channel with this room id is joined.
    #[serde(default)]
    pub debug_room_id: Option<i64>,
}

impl Default for CommandsConfig {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            debug_room_id: None,
        }
    }
}

/// Word scramble game.
#[derive(Debug, Clone, Deserialize)]
pub struct ScrambleConfig {
    /// Seconds before an unsolved round ends.
    #[serde(default = "default_round_timeout_secs")]
    pub round_timeout_secs: u64,
    /// JSON array of words. A small built-in list is used when unset.
    #[serde(default)]
    pub word_list: Option<String>,
}

impl ScrambleConfig {
    pub fn round_timeout(&self) -> Duration {
        Duration::from_secs(self.round_timeout_secs)
    }
}

impl Default for ScrambleConfig {
    fn default() -> Self {
        Self {
            round_timeout_secs: default_round_timeout_secs(),
            word_list: None,
        }
    }
}

/// Simulated gacha pulls.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PullConfig {
    /// JSON object mapping `"3"`, `"4"` and `"5"` to item names. A small
    /// built-in pool is used when unset.
    #[serde(default)]
    pub options: Option<String>,
}

/// Bomb party games.
#[derive(Debug, Clone, Deserialize)]
pub struct BombPartyConfig {
    /// Seconds a lobby stays open before it starts or closes on its own.
    #[serde(default = "default_lobby_timeout_secs")]
    pub lobby_timeout_secs: u64,
    /// JSON array of dictionary words. A small built-in list is used when unset.
    #[serde(default)]
    pub word_list: Option<String>,
}

impl BombPartyConfig {
    pub fn lobby_timeout(&self) -> Duration {
        Duration::from_secs(self.lobby_timeout_secs)
    }
}

impl Default for BombPartyConfig {
    fn default() -> Self {
        Self {
            lobby_timeout_secs: default_lobby_timeout_secs(),
            word_list: None,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Log output.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub format: LogFormat,
}
