//! Default value functions for configuration.

/// Returns `true` (for serde defaults).
pub fn default_true() -> bool {
    true
}

// =============================================================================
// Connection Defaults
// =============================================================================

pub fn default_address() -> String {
    "irc.chat.twitch.tv:6667".to_string()
}

pub fn default_tick_interval_ms() -> u64 {
    1000
}

pub fn default_capabilities() -> Vec<String> {
    vec!["tags".to_string(), "commands".to_string()]
}

pub fn default_backoff_base_secs() -> u64 {
    1
}

pub fn default_backoff_max_secs() -> u64 {
    300
}

pub fn default_queue_capacity() -> usize {
    1024
}

// =============================================================================
// Control Channel Defaults
// =============================================================================

pub fn default_control_listen() -> String {
    "127.0.0.1:7001".to_string()
}

// =============================================================================
// Database Defaults
// =============================================================================

pub fn default_database_path() -> String {
    "offlinechatbot.db".to_string()
}

// =============================================================================
// Rate Limit Defaults
// =============================================================================

pub fn default_moderator_delay_ms() -> u64 {
    300
}

pub fn default_delay_ms() -> u64 {
    1500
}

pub fn default_max_message_len() -> usize {
    tmi_proto::outbound::MAX_MESSAGE_LEN
}

/// Twitch allows 20 messages per 30 seconds for regular accounts.
pub fn default_messages_per_30s() -> u32 {
    20
}

// =============================================================================
// Command Defaults
// =============================================================================

pub fn default_prefix() -> String {
    "!".to_string()
}

// =============================================================================
// Scramble Defaults
// =============================================================================

pub fn default_round_timeout_secs() -> u64 {
    120
}

// =============================================================================
// Bomb Party Defaults
// =============================================================================

pub fn default_lobby_timeout_secs() -> u64 {
    120
}
