//! Local control-channel framing.
//!
//! One frame per connection: `<client_id> <COMMAND> [<json-params>]`.
//! The server acknowledges with `<client_id> <COMMAND> OK`.
//!
//! ```
//! use tmi_proto::control::{ControlCommand, ControlRequest};
//!
//! let req: ControlRequest = r#"web-1 REFRESH_CHANNEL {"channel_id": 4}"#.parse().unwrap();
//! assert_eq!(req.command, ControlCommand::RefreshChannel);
//! assert_eq!(req.params["channel_id"], 4);
//! assert_eq!(req.ok_reply(), "web-1 REFRESH_CHANNEL OK");
//! ```

use std::fmt;
use std::str::FromStr;

use serde_json::Value;

use crate::error::ControlParseError;

/// Known control commands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ControlCommand {
    /// Reload cached data from storage.
    RefreshData,
    /// Reload one channel's configuration.
    RefreshChannel,
    /// Anything else, kept so the caller can reject it.
    Other(String),
}

impl ControlCommand {
    /// Wire name.
    pub fn as_str(&self) -> &str {
        match self {
            Self::RefreshData => "REFRESH_DATA",
            Self::RefreshChannel => "REFRESH_CHANNEL",
            Self::Other(s) => s,
        }
    }
}

impl From<&str> for ControlCommand {
    fn from(name: &str) -> Self {
        match name.to_ascii_uppercase().as_str() {
            "REFRESH_DATA" => Self::RefreshData,
            "REFRESH_CHANNEL" => Self::RefreshChannel,
            _ => Self::Other(name.to_owned()),
        }
    }
}

impl fmt::Display for ControlCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decoded control frame.
#[derive(Clone, Debug, PartialEq)]
pub struct ControlRequest {
    /// Caller-chosen id echoed in the reply.
    pub client_id: String,
    /// Command.
    pub command: ControlCommand,
    /// JSON parameters, `Null` when omitted.
    pub params: Value,
}

impl ControlRequest {
    /// Success acknowledgement line (without CRLF).
    pub fn ok_reply(&self) -> String {
        format!("{} {} OK", self.client_id, self.command)
    }

    /// Failure acknowledgement line (without CRLF).
    pub fn error_reply(&self, reason: &str) -> String {
        format!("{} {} ERR {}", self.client_id, self.command, reason)
    }

    /// Integer parameter by key.
    pub fn int_param(&self, key: &str) -> Option<i64> {
        self.params.get(key)?.as_i64()
    }
}

impl FromStr for ControlRequest {
    type Err = ControlParseError;

    fn from_str(frame: &str) -> Result<Self, Self::Err> {
        let frame = frame.trim();
        let mut parts = frame.splitn(3, char::is_whitespace);
        let client_id = parts
            .next()
            .filter(|s| !s.is_empty())
            .ok_or(ControlParseError::Empty)?;
        let command = parts
            .next()
            .filter(|s| !s.is_empty())
            .ok_or(ControlParseError::MissingCommand)?;
        let params = match parts.next().map(str::trim) {
            Some(raw) if !raw.is_empty() => serde_json::from_str(raw)?,
            _ => Value::Null,
        };

        Ok(Self {
            client_id: client_id.to_owned(),
            command: ControlCommand::from(command),
            params,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_without_params() {
        let req: ControlRequest = "admin REFRESH_DATA\r\n".parse().unwrap();
        assert_eq!(req.command, ControlCommand::RefreshData);
        assert!(req.params.is_null());
        assert_eq!(req.ok_reply(), "admin REFRESH_DATA OK");
    }

    #[test]
    fn test_unknown_command_kept() {
        let req: ControlRequest = "a PURGE {}".parse().unwrap();
        assert_eq!(req.command, ControlCommand::Other("PURGE".into()));
        assert_eq!(req.error_reply("unknown"), "a PURGE ERR unknown");
    }

    #[test]
    fn test_errors() {
        assert!(matches!(
            "".parse::<ControlRequest>(),
            Err(ControlParseError::Empty)
        ));
        assert!(matches!(
            "lonely".parse::<ControlRequest>(),
            Err(ControlParseError::MissingCommand)
        ));
        assert!(matches!(
            "a REFRESH_CHANNEL {nope".parse::<ControlRequest>(),
            Err(ControlParseError::InvalidParams(_))
        ));
    }

    #[test]
    fn test_int_param() {
        let req: ControlRequest = r#"a REFRESH_CHANNEL {"channel_id": 12}"#.parse().unwrap();
        assert_eq!(req.int_param("channel_id"), Some(12));
        assert_eq!(req.int_param("missing"), None);
    }
}
