//! Configuration loading and management.
//!
//! - [`types`]: config struct definitions and loading
//! - [`defaults`]: serde default functions

mod defaults;
mod types;

pub use types::{
    BombPartyConfig, CommandsConfig, Config, ConfigError, ConnectionConfig, ControlConfig,
    DatabaseConfig, IdentityConfig, LogFormat, LoggingConfig, PullConfig, RateLimitConfig,
    ScrambleConfig,
};
