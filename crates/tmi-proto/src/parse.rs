//! Raw lines to [`Context`] values.
//!
//! Parsing is total: a line that cannot be understood is skipped, never an
//! error. A tag token (leading `@`) shifts every later token index by one.

use std::sync::Arc;

use crate::context::{
    sender_login, Context, ContextType, MembershipContext, MessageContext, RoomStateContext,
    UnknownContext, UserStateContext,
};
use crate::tags::Tags;

/// Lines with fewer tokens than this are skipped.
pub const MIN_TOKENS: usize = 3;

/// Parse one line (with or without its CRLF).
///
/// Returns `None` for lines that are too short or lack a required channel.
pub fn parse_line(line: &str) -> Option<Context> {
    let line = line.trim_end_matches(['\r', '\n']);
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() < MIN_TOKENS {
        return None;
    }

    let (tags, offset) = match tokens[0].strip_prefix('@') {
        Some(raw) => (Tags::parse(raw), 1),
        None => (Tags::default(), 0),
    };

    let source = *tokens.get(offset)?;
    let type_token = *tokens.get(offset + 1)?;

    let Some(kind) = ContextType::from_wire(type_token) else {
        return Some(Context::Unknown(UnknownContext {
            kind: type_token.to_owned(),
            source: source.to_owned(),
            tags,
        }));
    };

    let channel = if kind.has_channel() {
        tokens.get(offset + 2)?.trim_start_matches('#')
    } else {
        ""
    };

    let context = match kind {
        ContextType::Message => {
            let rest = tokens.get(offset + 3..).unwrap_or_default().join(" ");
            let body = rest.strip_prefix(':').unwrap_or(&rest);
            Context::Message(Arc::new(MessageContext::new(source, channel, body, tags)))
        }
        ContextType::Join | ContextType::Part => {
            let membership = MembershipContext {
                channel: channel.to_owned(),
                user: sender_login(source).map(str::to_owned),
            };
            if kind == ContextType::Join {
                Context::Join(membership)
            } else {
                Context::Part(membership)
            }
        }
        ContextType::UserState => Context::UserState(UserStateContext::from_tags(
            channel,
            sender_login(source).map(str::to_owned),
            &tags,
        )),
        ContextType::RoomState => Context::RoomState(RoomStateContext::from_tags(channel, &tags)),
        ContextType::Connected => Context::Connected,
        ContextType::Reconnect => Context::Reconnect,
        // from_wire never yields synthetic types
        ContextType::Setup
        | ContextType::Update
        | ContextType::ServerControl
        | ContextType::Unknown => return None,
    };
    Some(context)
}

/// Lazy iterator over the contexts in a multi-line buffer.
pub struct Contexts<'a> {
    lines: std::str::Lines<'a>,
}

impl Iterator for Contexts<'_> {
    type Item = Context;

    fn next(&mut self) -> Option<Context> {
        self.lines.by_ref().find_map(parse_line)
    }
}

/// Parse every CRLF-delimited line in `buffer`.
pub fn contexts(buffer: &str) -> Contexts<'_> {
    Contexts {
        lines: buffer.lines(),
    }
}

/// Lines the connection answers itself instead of dispatching.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConnectionControl {
    /// Keep-alive. Carries the host to echo back.
    Ping(String),
    /// The server will close the connection shortly.
    Reconnect,
}

/// Recognise `PING :host` and the bare `:tmi.twitch.tv RECONNECT`.
pub fn connection_control(line: &str) -> Option<ConnectionControl> {
    let line = line.trim_end_matches(['\r', '\n']);
    if let Some(rest) = line.strip_prefix("PING") {
        let host = rest.trim().trim_start_matches(':');
        return Some(ConnectionControl::Ping(host.to_owned()));
    }

    let mut tokens = line.split_whitespace().skip_while(|t| t.starts_with('@'));
    let first = tokens.next()?;
    let command = if first.starts_with(':') {
        tokens.next()?
    } else {
        first
    };
    (command == "RECONNECT").then_some(ConnectionControl::Reconnect)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_lines_skipped() {
        assert!(parse_line("").is_none());
        assert!(parse_line(":tmi.twitch.tv RECONNECT").is_none());
        assert!(parse_line("@a=b :x PRIVMSG").is_none());
    }

    #[test]
    fn test_join_part() {
        match parse_line(":bot!bot@bot.tmi.twitch.tv JOIN #chan\r\n") {
            Some(Context::Join(m)) => {
                assert_eq!(m.channel, "chan");
                assert_eq!(m.user.as_deref(), Some("bot"));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(
            parse_line(":bot!bot@bot.tmi.twitch.tv PART #chan"),
            Some(Context::Part(_))
        ));
    }

    #[test]
    fn test_connected_and_unknown() {
        assert!(matches!(
            parse_line(":tmi.twitch.tv 376 bot :>"),
            Some(Context::Connected)
        ));
        match parse_line(":tmi.twitch.tv 001 bot :Welcome, GLHF!") {
            Some(Context::Unknown(u)) => assert_eq!(u.kind, "001"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_userstate() {
        let line = "@badges=moderator/1;color=;display-name=Bot;mod=1;subscriber=0 \
                    :tmi.twitch.tv USERSTATE #chan";
        match parse_line(line) {
            Some(Context::UserState(u)) => {
                assert_eq!(u.channel, "chan");
                assert!(u.moderator);
                assert_eq!(u.username, None);
                assert_eq!(u.display_name, "Bot");
                assert_eq!(u.color, "#FFFFFF");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_roomstate_partial() {
        match parse_line("@room-id=19;slow=10 :tmi.twitch.tv ROOMSTATE #chan") {
            Some(Context::RoomState(r)) => {
                assert_eq!(r.room_id, Some(19));
                assert_eq!(r.slow, Some(10));
                assert_eq!(r.emote_only, None);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_contexts_multi_line() {
        let buffer = ":a!a@a JOIN #x\r\nbad\r\n:a!a@a PRIVMSG #x :hi\r\n";
        let kinds: Vec<_> = contexts(buffer).map(|c| c.kind()).collect();
        assert_eq!(kinds, [ContextType::Join, ContextType::Message]);
    }

    #[test]
    fn test_connection_control() {
        assert_eq!(
            connection_control("PING :tmi.twitch.tv\r\n"),
            Some(ConnectionControl::Ping("tmi.twitch.tv".into()))
        );
        assert_eq!(
            connection_control(":tmi.twitch.tv RECONNECT"),
            Some(ConnectionControl::Reconnect)
        );
        assert_eq!(connection_control(":a!a@a PRIVMSG #x :PING"), None);
    }
}
