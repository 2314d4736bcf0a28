//! CTCP wrappers inside PRIVMSG bodies.
//!
//! Twitch only ever sends `ACTION` (the `/me` command); other frames are
//! recognised only so they are not mistaken for actions.
//!
//! ```
//! use tmi_proto::ctcp::{Ctcp, CtcpKind};
//!
//! let ctcp = Ctcp::parse("\x01ACTION waves hello\x01").unwrap();
//! assert_eq!(ctcp.kind, CtcpKind::Action);
//! assert_eq!(ctcp.params, Some("waves hello"));
//! ```

/// The CTCP delimiter character (`\x01`).
pub(crate) const CTCP_DELIM: char = '\x01';

/// CTCP command type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CtcpKind {
    /// ACTION, produced by `/me`.
    Action,
    /// Any other command.
    Other,
}

impl CtcpKind {
    /// Classify a CTCP command name.
    pub fn parse(name: &str) -> Self {
        if name.eq_ignore_ascii_case("ACTION") {
            Self::Action
        } else {
            Self::Other
        }
    }
}

/// A parsed CTCP frame borrowing from the message body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ctcp<'a> {
    /// The CTCP command type.
    pub kind: CtcpKind,
    /// Text following the command, if any.
    pub params: Option<&'a str>,
}

impl<'a> Ctcp<'a> {
    /// Parse a CTCP frame. Returns `None` if `text` is not CTCP.
    ///
    /// The closing delimiter is optional.
    pub fn parse(text: &'a str) -> Option<Self> {
        let text = text.strip_prefix(CTCP_DELIM)?;
        let text = text.strip_suffix(CTCP_DELIM).unwrap_or(text);

        if text.is_empty() {
            return None;
        }

        let (command, params) = match text.split_once(' ') {
            Some((command, params)) if !params.is_empty() => (command, Some(params)),
            Some((command, _)) => (command, None),
            None => (text, None),
        };

        Some(Self {
            kind: CtcpKind::parse(command),
            params,
        })
    }
}

/// Unwrap an ACTION body, returning the inner text.
///
/// Returns `None` for plain messages and for non-ACTION CTCP frames.
pub fn unwrap_action(body: &str) -> Option<&str> {
    match Ctcp::parse(body)? {
        Ctcp {
            kind: CtcpKind::Action,
            params,
        } => Some(params.unwrap_or_default()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unwrap_action() {
        assert_eq!(unwrap_action("\x01ACTION waves\x01"), Some("waves"));
        assert_eq!(unwrap_action("\x01ACTION\x01"), Some(""));
        assert_eq!(unwrap_action("\x01VERSION\x01"), None);
        assert_eq!(unwrap_action("hello"), None);
    }

    #[test]
    fn test_unterminated_frame() {
        let ctcp = Ctcp::parse("\x01ACTION waves").unwrap();
        assert_eq!(ctcp.params, Some("waves"));
    }

    #[test]
    fn test_other_kinds() {
        let ctcp = Ctcp::parse("\x01version\x01").unwrap();
        assert_eq!(ctcp.kind, CtcpKind::Other);
        assert_eq!(ctcp.params, None);
    }

    #[test]
    fn test_empty_frame_is_not_ctcp() {
        assert!(Ctcp::parse("\x01\x01").is_none());
    }
}
