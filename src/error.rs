//! Error hierarchy for the bot runtime.
//!
//! Handler errors never cross the dispatch boundary: the dispatcher logs
//! them with [`HandlerError::error_code`] and moves on. Resolution errors
//! are fatal at startup.

use thiserror::Error;

use crate::db::DbError;

// ============================================================================
// Handler Errors (event and command processing)
// ============================================================================

/// Errors returned by component hooks and command invocations.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// The user misused a command. The text is replied in chat.
    #[error("usage: {0}")]
    Usage(String),

    #[error("unknown command: {0}")]
    UnknownCommand(String),

    #[error("send error: {0}")]
    Send(#[from] SendError),

    #[error("database error: {0}")]
    Db(#[from] DbError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl HandlerError {
    /// Shorthand for a usage reply.
    pub fn usage(msg: impl Into<String>) -> Self {
        Self::Usage(msg.into())
    }

    /// Static error code for log labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Usage(_) => "usage",
            Self::UnknownCommand(_) => "unknown_command",
            Self::Send(_) => "send_error",
            Self::Db(_) => "db_error",
            Self::Internal(_) => "internal_error",
        }
    }

    /// Text to show the user, if this error is meant for them.
    pub fn user_reply(&self) -> Option<&str> {
        match self {
            Self::Usage(msg) => Some(msg),
            _ => None,
        }
    }
}

/// Result type for hooks and command handlers.
pub type HandlerResult = Result<(), HandlerError>;

// ============================================================================
// Send Errors (outbound pipeline)
// ============================================================================

/// Failures of the rate-limited sender.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SendError {
    /// No send lane exists for the channel (never joined, or parted).
    #[error("not joined to #{0}")]
    NotJoined(String),

    /// No live connection to write to.
    #[error("connection is down")]
    Disconnected,
}

// ============================================================================
// Connection Errors (one server session)
// ============================================================================

/// Why a server session ended abnormally. Recovered by reconnecting.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("protocol error: {0}")]
    Protocol(#[from] tmi_proto::ProtocolError),

    #[error("login failed: {0}")]
    Login(#[from] SendError),

    /// The dispatcher stopped consuming contexts.
    #[error("context queue closed")]
    QueueClosed,
}

// ============================================================================
// Resolve Errors (component graph, startup only)
// ============================================================================

/// Component graph construction failures.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("component {component} depends on {dependency}, which is not registered")]
    MissingDependency {
        component: &'static str,
        dependency: &'static str,
    },

    #[error("dependency cycle among: {}", .components.join(", "))]
    Cycle { components: Vec<&'static str> },

    #[error("component {0} registered twice")]
    Duplicate(&'static str),

    #[error("component {component} asked for {requested} without declaring it")]
    UndeclaredDependency {
        component: &'static str,
        requested: &'static str,
    },

    #[error("command name or alias {name:?} claimed by both {first} and {second}")]
    CommandConflict {
        name: String,
        first: &'static str,
        second: &'static str,
    },

    #[error("component {component} failed to build: {reason}")]
    Build {
        component: &'static str,
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_is_user_facing() {
        let err = HandlerError::usage("Must give a time");
        assert_eq!(err.user_reply(), Some("Must give a time"));
        assert_eq!(err.error_code(), "usage");
    }

    #[test]
    fn test_send_error_not_user_facing() {
        let err: HandlerError = SendError::Disconnected.into();
        assert_eq!(err.user_reply(), None);
        assert_eq!(err.error_code(), "send_error");
    }

    #[test]
    fn test_cycle_display() {
        let err = ResolveError::Cycle {
            components: vec!["A", "B"],
        };
        assert_eq!(err.to_string(), "dependency cycle among: A, B");
    }
}
